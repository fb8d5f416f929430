pub mod api;
pub mod auth;
pub mod board;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod notices;
pub mod store;
pub mod suggestions;
pub mod validate;

pub use api::{ApiClient, ApiError};
pub use cache::SnapshotCache;
pub use error::StoreError;
pub use notices::{NoticeService, NoticeStore};
pub use store::{CollectionStore, ReadTier, StoreState};
pub use suggestions::{SuggestionService, SuggestionStore};
