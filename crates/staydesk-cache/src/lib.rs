// Query cache with tag-based invalidation, plus the SQLite-backed local store
// that plays the part of browser storage

pub mod error;
pub mod key;
pub mod query;
pub mod store;
pub mod tag;

pub use error::{CacheError, FetchError};
pub use key::QueryKey;
pub use query::{CacheOptions, FetchFn, QueryCache, QuerySnapshot, QueryStatus, Subscription};
pub use store::LocalStore;
pub use tag::Tag;
