use crate::actions::Action;
use crate::middleware::Middleware;
use crate::state::AppState;

/// LoggingMiddleware - logs all actions passing through
#[derive(Debug, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&mut self, action: Action, state: &AppState) -> Option<Action> {
        log::debug!(
            "Action: {} (books: {}, loading: {})",
            action.kind(),
            state.books.len(),
            state.loading
        );
        log::trace!("Payload: {:?}", action);

        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_action_through() {
        let mut middleware = LoggingMiddleware::new();
        let action = Action::SetPage(2);

        assert_eq!(
            middleware.handle(action.clone(), &AppState::default()),
            Some(action)
        );
    }
}
