//! Client code for tunecache.
//!
//! This crate provides the reqwest-backed network the worker fetches
//! through, URL handling for proxied and intercepted requests, and the
//! YouTube metadata client used by the proxy endpoints.

pub mod fetch;
pub mod youtube;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, is_hop_by_hop, resolve_upstream};
pub use youtube::{EmbedCheck, SearchItem, SearchResponse, VideoInfo, YoutubeClient, YoutubeConfig, YoutubeError};
