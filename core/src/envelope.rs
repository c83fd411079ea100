//! The `{data, error, loading}` envelope returned by every request.

use crate::error::FetchError;

/// Result of one request, or the observable state of a `FetchHook`.
///
/// Fields are private so the envelope can only be built through the
/// constructors below: `data` and `error` are never both present.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    data: Option<T>,
    error: Option<FetchError>,
    loading: bool,
}

impl<T> Envelope<T> {
    /// Nothing requested yet.
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }

    /// A request is in flight and nothing has resolved yet.
    pub fn loading() -> Self {
        Self {
            data: None,
            error: None,
            loading: true,
        }
    }

    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            loading: false,
        }
    }

    pub fn failure(error: FetchError) -> Self {
        Self {
            data: None,
            error: Some(error),
            loading: false,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Error text for display, if the request failed.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(FetchError::message)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Enter a new request cycle: clear the error, keep the last data.
    pub(crate) fn begin_loading(&mut self) {
        self.error = None;
        self.loading = true;
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Converts a resolved envelope into a `Result`. An idle or loading
    /// envelope has neither data nor error and yields `None`.
    pub fn into_result(self) -> Option<Result<T, FetchError>> {
        match (self.data, self.error) {
            (Some(data), _) => Some(Ok(data)),
            (None, Some(error)) => Some(Err(error)),
            (None, None) => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> From<Result<T, FetchError>> for Envelope<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(data) => Envelope::success(data),
            Err(error) => Envelope::failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_failure_are_exclusive() {
        let ok: Envelope<u32> = Envelope::success(7);
        assert_eq!(ok.data(), Some(&7));
        assert!(ok.error().is_none());
        assert!(!ok.is_loading());

        let err: Envelope<u32> = Envelope::failure(FetchError::Cancelled);
        assert!(err.data().is_none());
        assert_eq!(err.error(), Some(&FetchError::Cancelled));
        assert!(!err.is_loading());
    }

    #[test]
    fn begin_loading_keeps_data_and_clears_error() {
        let mut state: Envelope<u32> = Envelope::success(1);
        state.begin_loading();
        assert!(state.is_loading());
        assert_eq!(state.data(), Some(&1));

        let mut state: Envelope<u32> = Envelope::failure(FetchError::Cancelled);
        state.begin_loading();
        assert!(state.is_loading());
        assert!(state.error().is_none());
    }

    #[test]
    fn idle_has_no_result() {
        assert!(Envelope::<()>::idle().into_result().is_none());
        assert!(Envelope::<()>::loading().into_result().is_none());
    }
}
