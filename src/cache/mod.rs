//! In-memory state shared by the DAO between requests.
//!
//! - **ResultCache**: memoizes paged query results per search key with
//!   single-flight fills, idle expiry, LRU bounding and predicate
//!   invalidation.
//! - **PendingCountTracker**: remembers change events whose effect on tree
//!   counts has not been confirmed by a fresh fetch yet.
//!
//! Neither structure is persisted; both are cleared when a case closes.

mod result_cache;
mod tree_counts;

pub use result_cache::ResultCache;
pub use tree_counts::PendingCountTracker;
