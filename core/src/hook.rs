//! Fetch-state hook: drives `ApiClient` on behalf of one UI component.
//!
//! # Design
//! A `FetchHook` owns the observable `{data, error, loading}` state of a
//! single component instance and publishes it through a `tokio::sync::watch`
//! channel. `fetch` takes `&self`, so overlapping calls can be in flight at
//! once; which of them is allowed to write the final state is decided by
//! `ResolutionPolicy`. Every call carries a child of the hook's lifetime
//! token: `unmount` (or dropping the hook) cancels all of them and no late
//! response ever touches the state afterwards.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ApiClient, RequestOptions};
use crate::envelope::Envelope;
use crate::error::FetchError;
use crate::http::HttpMethod;

pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&FetchError) + Send + Sync>;

/// Which response wins when several `fetch` calls overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Only the most recently issued call may update state; responses of
    /// superseded calls are dropped without invoking callbacks.
    #[default]
    LatestIssued,
    /// Every response updates state as it arrives, so the one resolving
    /// last wins regardless of issue order.
    LastResolved,
}

/// Configuration of a `FetchHook`.
pub struct FetchOptions<T, B = serde_json::Value> {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<B>,
    pub headers: Vec<(String, String)>,
    /// Falls back to the client's timeout when `None`.
    pub timeout: Option<Duration>,
    /// Fetch on mount and whenever the dependency set changes.
    pub immediate: bool,
    pub dependencies: Vec<serde_json::Value>,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
    pub resolution: ResolutionPolicy,
}

impl<T, B> FetchOptions<T, B> {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: HttpMethod::Get,
            body: None,
            headers: Vec::new(),
            timeout: None,
            immediate: true,
            dependencies: Vec::new(),
            on_success: None,
            on_error: None,
            resolution: ResolutionPolicy::default(),
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn dependencies(mut self, dependencies: Vec<serde_json::Value>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&FetchError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn resolution(mut self, resolution: ResolutionPolicy) -> Self {
        self.resolution = resolution;
        self
    }
}

impl<T, B: Serialize> FetchOptions<T, B> {
    /// True when switching from `self` to `other` starts a new request
    /// cycle: the request itself or a callback identity differs.
    fn differs_from(&self, other: &Self) -> bool {
        self.url != other.url
            || self.method != other.method
            || self.headers != other.headers
            || self.timeout != other.timeout
            || body_json(&self.body) != body_json(&other.body)
            || !same_callback(&self.on_success, &other.on_success)
            || !same_callback(&self.on_error, &other.on_error)
    }
}

impl<T, B: Clone> Clone for FetchOptions<T, B> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            method: self.method,
            body: self.body.clone(),
            headers: self.headers.clone(),
            timeout: self.timeout,
            immediate: self.immediate,
            dependencies: self.dependencies.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            resolution: self.resolution,
        }
    }
}

fn body_json<B: Serialize>(body: &Option<B>) -> Option<serde_json::Value> {
    body.as_ref().and_then(|b| serde_json::to_value(b).ok())
}

fn same_callback<F: ?Sized>(a: &Option<Arc<F>>, b: &Option<Arc<F>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Reactive request state bound to one component instance.
pub struct FetchHook<T, B = serde_json::Value> {
    client: ApiClient,
    options: FetchOptions<T, B>,
    state: watch::Sender<Envelope<T>>,
    issued: AtomicU64,
    in_flight: AtomicUsize,
    mounted: AtomicBool,
    lifetime: CancellationToken,
}

impl<T, B> FetchHook<T, B>
where
    T: DeserializeOwned + Clone,
    B: Serialize + Clone,
{
    pub fn new(client: ApiClient, options: FetchOptions<T, B>) -> Self {
        let (state, _) = watch::channel(Envelope::idle());
        Self {
            client,
            options,
            state,
            issued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            mounted: AtomicBool::new(false),
            lifetime: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &FetchOptions<T, B> {
        &self.options
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> Envelope<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<Envelope<T>> {
        self.state.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst) && !self.lifetime.is_cancelled()
    }

    /// First activation. Fetches once when `immediate` is set; later calls
    /// do nothing and return `None`.
    pub async fn mount(&self) -> Option<Envelope<T>> {
        if self.lifetime.is_cancelled() || self.mounted.swap(true, Ordering::SeqCst) {
            return None;
        }
        if !self.options.immediate {
            return None;
        }
        Some(self.fetch(None).await)
    }

    /// Runs one request cycle and returns this call's own envelope, whether
    /// or not it was allowed to update the hook state.
    ///
    /// `override_body` replaces the configured body for this call only.
    pub async fn fetch(&self, override_body: Option<B>) -> Envelope<T> {
        if self.lifetime.is_cancelled() {
            return Envelope::failure(FetchError::Cancelled);
        }
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = InFlight::enter(self, seq);
        self.state.send_modify(Envelope::begin_loading);

        let body = override_body.or_else(|| self.options.body.clone());
        let request = RequestOptions {
            headers: self.options.headers.clone(),
            timeout: self.options.timeout,
            cancel: Some(self.lifetime.clone()),
        };
        let envelope: Envelope<T> = self
            .client
            .request(self.options.method, &self.options.url, body.as_ref(), request)
            .await;
        let remaining = guard.finish();

        if self.lifetime.is_cancelled() {
            debug!(seq, url = %self.options.url, "hook unmounted, dropping response");
            return envelope;
        }
        if self.options.resolution == ResolutionPolicy::LatestIssued
            && seq != self.issued.load(Ordering::SeqCst)
        {
            debug!(seq, url = %self.options.url, "discarding stale response");
            return envelope;
        }

        let mut next = envelope.clone();
        if self.options.resolution == ResolutionPolicy::LastResolved {
            next.set_loading(remaining > 0);
        }
        self.state.send_replace(next);

        match (envelope.data(), envelope.error()) {
            (Some(data), _) => {
                if let Some(on_success) = &self.options.on_success {
                    on_success(data);
                }
            }
            (None, Some(error)) => {
                if let Some(on_error) = &self.options.on_error {
                    on_error(error);
                }
            }
            (None, None) => {}
        }
        envelope
    }

    /// Replaces the dependency set. A changed set starts a new request
    /// cycle when the hook is mounted and `immediate`.
    pub async fn set_dependencies(&mut self, dependencies: Vec<serde_json::Value>) -> Option<Envelope<T>> {
        if dependencies == self.options.dependencies {
            return None;
        }
        self.options.dependencies = dependencies;
        self.refetch_if_active().await
    }

    /// Replaces the whole configuration, as a component re-render does.
    /// A new request cycle starts when the request, a callback identity or
    /// the dependency set changed.
    pub async fn reconfigure(&mut self, options: FetchOptions<T, B>) -> Option<Envelope<T>> {
        let changed = self.options.differs_from(&options)
            || self.options.dependencies != options.dependencies;
        self.options = options;
        if !changed {
            return None;
        }
        self.refetch_if_active().await
    }

    /// Tears the hook down: cancels in-flight calls, resets state to idle
    /// and refuses further fetches.
    pub fn unmount(&self) {
        self.lifetime.cancel();
        self.state.send_replace(Envelope::idle());
    }

    async fn refetch_if_active(&self) -> Option<Envelope<T>> {
        if self.options.immediate && self.is_mounted() {
            Some(self.fetch(None).await)
        } else {
            None
        }
    }
}

/// Counts one outstanding `fetch`. If the call is dropped before it
/// resolves, the guard releases its slot and settles `loading` so the
/// state never claims a request that no longer exists.
struct InFlight<'a, T, B> {
    hook: &'a FetchHook<T, B>,
    seq: u64,
    finished: bool,
}

impl<'a, T, B> InFlight<'a, T, B> {
    fn enter(hook: &'a FetchHook<T, B>, seq: u64) -> Self {
        hook.in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            hook,
            seq,
            finished: false,
        }
    }

    /// Releases the slot after the call resolved; returns the calls still
    /// outstanding.
    fn finish(mut self) -> usize {
        self.finished = true;
        self.hook.in_flight.fetch_sub(1, Ordering::SeqCst) - 1
    }
}

impl<T, B> Drop for InFlight<'_, T, B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let hook = self.hook;
        let remaining = hook.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if hook.lifetime.is_cancelled() {
            return;
        }
        let loading = match hook.options.resolution {
            ResolutionPolicy::LatestIssued if self.seq != hook.issued.load(Ordering::SeqCst) => return,
            ResolutionPolicy::LatestIssued => false,
            ResolutionPolicy::LastResolved => remaining > 0,
        };
        debug!(seq = self.seq, url = %hook.options.url, "fetch dropped before resolving");
        hook.state.send_modify(|state| state.set_loading(loading));
    }
}

impl<T, B> Drop for FetchHook<T, B> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
