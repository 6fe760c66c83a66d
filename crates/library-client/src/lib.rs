//! Library backend REST client
//!
//! This crate provides a trait-based client for the library backend's
//! book, user, loan, search and statistics endpoints, with short-lived
//! response caching, retry with backoff, and cancellation of superseded
//! requests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              LibraryClient trait                │
//! │  - get_books() / create_book() / ...            │
//! │  - get_loans() / return_loan() / ...            │
//! │  - search() / get_statistics()                  │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!             ┌─────────────────────┐
//!             │     ApiClient       │  cache, retry, cancellation
//!             └─────────────────────┘
//!                        │
//!                        ▼
//!             ┌─────────────────────┐
//!             │   Transport trait   │  ReqwestTransport in production
//!             └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use library_client::{ApiClient, BookQuery, LibraryClient};
//! use library_config::AppConfig;
//!
//! # async fn example() -> Result<(), library_client::ApiError> {
//! let client = ApiClient::from_config(&AppConfig::default())?;
//! let books = client.get_books(&BookQuery::page(20, 0)).await?;
//! println!("{} books", books.items().len());
//! # Ok(())
//! # }
//! ```

pub mod api_client;
pub mod cache;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use api_client::{
    ApiClient, RequestOptions, DEFAULT_CACHE_TIME, DEFAULT_RETRY_DELAYS, STATISTICS_CACHE_TIME,
};
pub use cache::{CacheStats, RequestKey};
pub use client::LibraryClient;
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
pub use types::{
    parse_timestamp, Book, BookQuery, Collection, Entity, EntityPatch, Loan, NewBook, NewLoan,
    NewUser, Page, SearchFilters, SearchHit, SearchResults, Stats, StatsUpdate, User,
    DEFAULT_SEARCH_LIMIT,
};

// Re-export the locale so consumers can call `ApiError::user_message`
// without depending on the config crate directly.
pub use library_config::Locale;
