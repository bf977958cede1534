//! Session-scoped logging.
//!
//! A [`LogContext`] carries its own `tracing` dispatcher and a span tagged with
//! the session key. Nothing is installed globally, so two sessions (or a test
//! and a session) never share log state.

use tracing::{dispatcher, Dispatch, Span};
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV_VAR: &str = "SORTDECK_LOG";
const DEFAULT_FILTER: &str = "info";

#[derive(Clone)]
pub struct LogContext {
    dispatch: Dispatch,
    span: Span,
}

impl LogContext {
    /// Logs to stderr, filtered by `filter` or by `SORTDECK_LOG` when `None`.
    pub fn stderr(filter: Option<&str>) -> Self {
        let filter = filter
            .map(str::to_string)
            .or_else(|| std::env::var(LOG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let filter_layer =
            EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let subscriber = fmt()
            .with_env_filter(filter_layer)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();

        Self::from_dispatch(Dispatch::new(subscriber))
    }

    /// Drops every event. Used by tests and by callers that do their own reporting.
    pub fn disabled() -> Self {
        Self::from_dispatch(Dispatch::none())
    }

    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            span: Span::none(),
        }
    }

    /// Returns a copy whose events are nested under a `session` span.
    pub fn for_session(&self, session_key: &str) -> Self {
        let span = dispatcher::with_default(&self.dispatch, || {
            tracing::info_span!("session", key = %session_key)
        });
        Self {
            dispatch: self.dispatch.clone(),
            span,
        }
    }

    /// Runs `f` with this context's dispatcher and span active.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        dispatcher::with_default(&self.dispatch, || self.span.in_scope(f))
    }
}

impl std::fmt::Debug for LogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogContext")
            .field("span", &self.span.metadata().map(|m| m.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_returns_closure_value() {
        let log = LogContext::disabled().for_session("/tmp/source");
        let value = log.scope(|| {
            tracing::info!("inside");
            41 + 1
        });
        assert_eq!(value, 42);
    }

    #[test]
    fn invalid_filter_falls_back_to_default() {
        let log = LogContext::stderr(Some("not a [valid filter"));
        log.scope(|| tracing::debug!("filtered out"));
    }
}
