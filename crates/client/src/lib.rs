//! Client code for hamclub.
//!
//! This crate provides the HTTP fetch pipeline behind the web cache.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use fetch::url::{UrlError, canonicalize, with_path_segments};
