//! Torrent index aggregation: fetch listing pages from index sites and a movie
//! API, pull items out with ordered pattern cascades, and merge them into a
//! single [`ResultSet`].

pub mod cascade;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod source;

pub use config::{Config, FetchConfig, MovieFilter, SourceConfig};
pub use error::{FetchError, ItemError, Rejection};
pub use fetch::{FetchOutcome, Fetcher, ReqwestFetcher};
pub use source::{build_sources, gather, Source, Target};
pub use tget_types::{Action, ResultItem, ResultSet, UNKNOWN_COUNT};
