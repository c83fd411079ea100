//! Data-fetching layer for the MCAT prep dashboard.
//!
//! # Overview
//! `ApiClient` performs JSON round trips against the dashboard API and
//! always answers with an `Envelope` (`{data, error, loading}`); failures
//! are normalized into `FetchError` instead of escaping. `FetchHook` binds
//! a client to one UI component: it publishes request state, fetches on
//! mount and on dependency changes, and cancels everything on unmount.
//!
//! # Design
//! - `ApiClient` is stateless beyond its config and a shared `Transport`.
//! - Every call is `build_request` → `Transport::execute` (bounded by a
//!   timeout and a per-call cancellation token) → `parse_response`, so the
//!   I/O boundary is explicit and replaceable in tests.
//! - Overlapping hook fetches are ordered by an explicit `ResolutionPolicy`.
//! - `UserStore` persists only on `save`, never implicitly.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod envelope;
pub mod error;
pub mod hook;
pub mod http;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, RequestOptions};
pub use config::{ClientConfig, ConfigError};
pub use dashboard::DashboardApi;
pub use envelope::Envelope;
pub use error::{ErrorKind, FetchError};
pub use hook::{FetchHook, FetchOptions, ResolutionPolicy};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use store::{FileStorage, MemoryStorage, Storage, StoreError, User, UserStore};
pub use types::{Course, CreateCourse, ProgressSummary, SectionProgress, UpdateCourse};
