//! Reactive application state store
//!
//! A single [`AppStore`] holds the [`AppState`] and is the only way to
//! change it. Actions flow through middleware into a pure reducer; listeners
//! subscribe to individual [`StateKey`]s and are called only when their key
//! changed.
//!
//! ```text
//! dispatch(action)
//!   -> middleware (in order, may transform or consume)
//!   -> reduce(state, action)
//!   -> changed keys (pointer identity for collections, value for scalars)
//!   -> listeners of each changed key, errors isolated per listener
//! ```

pub mod actions;
pub mod middleware;
pub mod notification;
pub mod reducer;
pub mod state;
pub mod store;

pub use actions::{Action, ActionError};
pub use middleware::{LoggingMiddleware, Middleware};
pub use notification::{Notification, NotificationDraft, NotificationLevel};
pub use reducer::reduce;
pub use state::{AppState, StateKey, StateUpdate, StateValue};
pub use store::{AppStore, IntoStateKeys, Listener, Unsubscribe};
