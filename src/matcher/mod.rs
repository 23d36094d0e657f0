//! Address matching for vanity search.
//!
//! A [`SearchQuery`] holds an optional prefix and suffix; [`matches`] is the
//! pure predicate the search loop evaluates for every generated address.

mod query;

pub use query::{matches, SearchQuery};
