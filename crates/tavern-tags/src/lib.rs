//! Per-site tag index and bounded tag search.
//!
//! Content sites are searched by tags, and users misspell tags. The
//! [`TagIndex`] remembers every tag seen on each site and resolves a
//! misspelling to its closest known tag; [`BoundedTagSearch`] uses it to
//! retry empty searches a bounded number of times.
//!
//! # Modules
//!
//! - [`index`] -- [`TagIndex`]: known tags per site, persisted append-only
//! - [`similarity`] -- Ratcliff/Obershelp scoring in integer arithmetic
//! - [`search`] -- [`ContentSource`] and [`BoundedTagSearch`]

pub mod index;
pub mod search;
pub mod similarity;

pub use index::TagIndex;
pub use search::{
    BoundedTagSearch, ContentSource, MAX_RETRY_DEPTH, Post, SearchError, SearchOutcome,
    SourceError,
};
pub use similarity::Similarity;
