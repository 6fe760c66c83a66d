use crate::actions::Action;
use crate::state::AppState;

mod logging;

pub use logging::LoggingMiddleware;

/// Middleware trait - intercepts actions before they reach the reducer
///
/// Middleware runs synchronously inside `AppStore::dispatch`, in the order it
/// was added. Each one sees the output of the previous one.
pub trait Middleware {
    /// Handle an action
    ///
    /// - `action`: The action to process
    /// - `state`: Current application state
    ///
    /// Returns the action to pass on (possibly transformed), or `None` to
    /// consume it
    fn handle(&mut self, action: Action, state: &AppState) -> Option<Action>;
}

impl<F> Middleware for F
where
    F: FnMut(Action, &AppState) -> Option<Action>,
{
    fn handle(&mut self, action: Action, state: &AppState) -> Option<Action> {
        self(action, state)
    }
}
