use crate::utils::error::{AdminError, ErrorCategory, Result};

/// What a detail or list view has to show at any moment.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Error {
        category: ErrorCategory,
        message: String,
    },
    Ready(T),
}

impl<T> ViewState<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => ViewState::Ready(value),
            Err(e) => ViewState::from_error(&e),
        }
    }

    pub fn from_error(error: &AdminError) -> Self {
        ViewState::Error {
            category: error.category(),
            message: error.user_friendly_message(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        match self {
            ViewState::Loading => ViewState::Loading,
            ViewState::Error { category, message } => ViewState::Error { category, message },
            ViewState::Ready(value) => ViewState::Ready(f(value)),
        }
    }
}

/// Draws a loaded value. A failed load is handed back untouched so the
/// caller reports it and exits non-zero; it is never drawn as if loaded.
pub fn render<T>(result: Result<T>, draw: impl FnOnce(&T)) -> Result<()> {
    match result {
        Ok(value) => {
            draw(&value);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Not rendering, load failed ({:?})", e.category());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ready: ViewState<u32> = ViewState::from_result(Ok(3));
        assert_eq!(ready.clone().map(|n| n * 2), ViewState::Ready(6));
        assert!(ready.is_ready());

        let failed: ViewState<u32> = ViewState::from_result(Err(AdminError::TokenInvalid));
        match failed {
            ViewState::Error { category, .. } => assert_eq!(category, ErrorCategory::Auth),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_render_returns_load_errors() {
        let mut drawn = Vec::new();
        render(Ok(4u32), |n| drawn.push(*n)).unwrap();
        assert_eq!(drawn, vec![4]);

        let result = render(Err::<u32, _>(AdminError::TokenInvalid), |_| {
            panic!("nothing to draw")
        });
        match result {
            Err(e) => {
                assert!(matches!(e, AdminError::TokenInvalid));
                assert_eq!(e.exit_code(), 7);
            }
            Ok(()) => panic!("a failed load must not look like success"),
        }
    }
}
