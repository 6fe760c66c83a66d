//! Library lander application core
//!
//! Wires the [`library_store::AppStore`], a [`library_client::LibraryClient`]
//! and the local [`library_config::Preferences`] into [`LibraryApp`], the
//! controller the views talk to.
//!
//! ```no_run
//! use library_app::LibraryApp;
//! use library_config::AppConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! library_app::logger::init()?;
//! let app = LibraryApp::from_config(AppConfig::load())?;
//! app.load_initial_data(chrono::Local::now().naive_local()).await?;
//! println!("{} books", app.store().get_state().books.len());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod logger;
pub mod search;
pub mod stats;

pub use app::{LibraryApp, INITIAL_PAGE_SIZE};
pub use search::{
    suggestions, Suggestion, SuggestionKind, MAX_SUGGESTIONS, MIN_SEARCH_LEN,
};
pub use stats::calculate_stats;
