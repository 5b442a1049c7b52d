use crate::domain::model::{Resource, ResourceId, VersionToken};
use crate::utils::error::{AdminError, Result};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Checking,
    Committing,
    Conflicted,
    Done,
    Discarded,
}

impl SessionState {
    fn allows(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Editing, Checking)
                | (Editing, Discarded)
                | (Checking, Committing)
                | (Checking, Conflicted)
                | (Checking, Editing)
                | (Conflicted, Committing)
                | (Conflicted, Discarded)
                | (Committing, Done)
                | (Committing, Editing)
                | (Committing, Conflicted)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Editing => "editing",
            SessionState::Checking => "checking",
            SessionState::Committing => "committing",
            SessionState::Conflicted => "conflicted",
            SessionState::Done => "done",
            SessionState::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

/// Client-side record of one in-progress edit. The baseline version is
/// captured once, when the session begins, and only replaced by a
/// successful commit or a discard-and-reload.
#[derive(Debug, Clone)]
pub struct EditSession<R: Resource> {
    resource_id: ResourceId,
    baseline_version: Option<VersionToken>,
    draft: R::Draft,
    state: SessionState,
    last_error: Option<String>,
    started_at: DateTime<Utc>,
}

impl<R: Resource> EditSession<R> {
    /// Snapshots `resource`. No I/O.
    pub fn begin(resource: &R) -> Self {
        if resource.version().is_none() {
            tracing::warn!(
                "{} {} carries no version token; conflicts cannot be detected",
                R::SINGULAR,
                resource.id()
            );
        }

        Self {
            resource_id: resource.id(),
            baseline_version: resource.version().cloned(),
            draft: resource.to_draft(),
            state: SessionState::Editing,
            last_error: None,
            started_at: Utc::now(),
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn baseline_version(&self) -> Option<&VersionToken> {
        self.baseline_version.as_ref()
    }

    pub fn draft(&self) -> &R::Draft {
        &self.draft
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, SessionState::Done | SessionState::Discarded)
    }

    pub fn draft_mut(&mut self) -> Result<&mut R::Draft> {
        self.expect_state(SessionState::Editing, "edit the draft")?;
        Ok(&mut self.draft)
    }

    pub fn set_draft(&mut self, draft: R::Draft) -> Result<()> {
        *self.draft_mut()? = draft;
        Ok(())
    }

    /// Abandons the edit. Nothing has been written, so nothing is undone.
    pub fn cancel(mut self) -> Result<()> {
        self.transition(SessionState::Discarded)?;
        tracing::debug!("Cancelled edit of {} {}", R::SINGULAR, self.resource_id);
        Ok(())
    }

    pub(crate) fn expect_state(&self, expected: SessionState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    pub(crate) fn invalid(&self, operation: &str) -> AdminError {
        AdminError::InvalidState {
            state: self.state.to_string(),
            operation: operation.to_string(),
        }
    }

    pub(crate) fn transition(&mut self, to: SessionState) -> Result<()> {
        if !self.state.allows(to) {
            return Err(self.invalid(&format!("move to {}", to)));
        }
        tracing::trace!(
            "{} {} session: {} -> {}",
            R::SINGULAR,
            self.resource_id,
            self.state,
            to
        );
        self.state = to;
        Ok(())
    }

    /// Back to `Editing` with the draft intact.
    pub(crate) fn fail(&mut self, error: &AdminError) {
        self.state = SessionState::Editing;
        self.last_error = Some(error.to_string());
    }

    pub(crate) fn complete(&mut self, committed: &R) -> Result<()> {
        self.transition(SessionState::Done)?;
        self.baseline_version = committed.version().cloned();
        self.last_error = None;
        Ok(())
    }

    /// Replaces the draft with the server's state after a discard.
    pub(crate) fn reset_to(&mut self, server: &R) {
        self.baseline_version = server.version().cloned();
        self.draft = server.to_draft();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Supplier;

    fn supplier(version: Option<&str>) -> Supplier {
        serde_json::from_value(serde_json::json!({
            "id": 11,
            "supplier_code": null,
            "name": "Grip Works",
            "updated_at": version
        }))
        .unwrap()
    }

    #[test]
    fn test_begin_captures_baseline_and_draft() {
        let session = EditSession::begin(&supplier(Some("2024-05-01T00:00:00Z")));
        assert_eq!(session.resource_id(), ResourceId(11));
        assert_eq!(
            session.baseline_version(),
            Some(&VersionToken::from("2024-05-01T00:00:00Z"))
        );
        assert_eq!(session.draft().name, "Grip Works");
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.is_open());
    }

    #[test]
    fn test_draft_is_locked_outside_editing() {
        let mut session = EditSession::begin(&supplier(Some("v1")));
        session.draft_mut().unwrap().name = "Grip Works Ltd".to_string();

        session.transition(SessionState::Checking).unwrap();
        assert!(matches!(
            session.draft_mut(),
            Err(AdminError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_failure_returns_to_editing_with_flag() {
        let mut session = EditSession::begin(&supplier(Some("v1")));
        session.draft_mut().unwrap().remarks = "call first".to_string();
        session.transition(SessionState::Checking).unwrap();
        session.transition(SessionState::Committing).unwrap();

        session.fail(&AdminError::Http {
            status: 503,
            body: "unavailable".to_string(),
        });

        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.last_error().unwrap().contains("503"));
        assert_eq!(session.draft().remarks, "call first");
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let mut session = EditSession::begin(&supplier(None));
        assert!(session.transition(SessionState::Committing).is_err());
        assert!(session.transition(SessionState::Done).is_err());
        session.transition(SessionState::Discarded).unwrap();
        assert!(!session.is_open());
        assert!(session.transition(SessionState::Editing).is_err());
    }

    #[test]
    fn test_cancel_from_editing() {
        let session = EditSession::begin(&supplier(Some("v1")));
        assert!(session.cancel().is_ok());
    }
}
