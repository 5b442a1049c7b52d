use crate::core::cache::QueryKey;
use crate::core::session::{EditSession, SessionState};
use crate::core::store::ResourceStore;
use crate::domain::model::{Resource, ResourceId, VersionToken};
use crate::domain::ports::ResourceClient;
use crate::utils::error::{AdminError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of comparing a session's baseline against the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictCheck<R> {
    Clean,
    /// `server` is `None` when the record has been deleted.
    Conflicted { server: Option<R> },
}

/// A detected conflict awaiting a decision. Consumed by
/// [`ConcurrencyGuard::resolve`].
#[derive(Debug, Clone)]
pub struct ConflictState<R: Resource> {
    resource_id: ResourceId,
    baseline_version: Option<VersionToken>,
    pending: R::Draft,
    server: Option<R>,
    detected_at: DateTime<Utc>,
}

impl<R: Resource> ConflictState<R> {
    fn new(session: &EditSession<R>, server: Option<R>) -> Self {
        Self {
            resource_id: session.resource_id(),
            baseline_version: session.baseline_version().cloned(),
            pending: session.draft().clone(),
            server,
            detected_at: Utc::now(),
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn baseline_version(&self) -> Option<&VersionToken> {
        self.baseline_version.as_ref()
    }

    pub fn pending(&self) -> &R::Draft {
        &self.pending
    }

    pub fn server(&self) -> Option<&R> {
        self.server.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.server.is_none()
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    /// Draft fields whose value differs from the current server record.
    pub fn differing_fields(&self) -> Vec<String> {
        let Some(server) = &self.server else {
            return Vec::new();
        };
        let ours = serde_json::to_value(&self.pending).unwrap_or_default();
        let theirs = serde_json::to_value(server.to_draft()).unwrap_or_default();

        match (ours, theirs) {
            (serde_json::Value::Object(ours), serde_json::Value::Object(theirs)) => {
                let mut fields: Vec<String> = ours
                    .iter()
                    .filter(|(key, value)| theirs.get(*key) != Some(*value))
                    .map(|(key, _)| key.clone())
                    .collect();
                fields.sort();
                fields
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Drop the draft and reload the server state.
    Discard,
    /// Write the draft over whatever the server holds now.
    ForceOverwrite,
    /// Drop the draft without reloading.
    Cancel,
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome<R: Resource> {
    Committed(R),
    Conflicted(ConflictState<R>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome<R> {
    /// Current server state after a discard; `None` if the record is gone.
    Reloaded(Option<R>),
    Committed(R),
    Cancelled,
}

/// The decision gate. Implementations may wait as long as they need; the
/// guard performs no write until `decide` returns.
#[async_trait]
pub trait ConflictResolver<R: Resource>: Send + Sync {
    async fn decide(&self, conflict: &ConflictState<R>) -> Resolution;
}

/// Always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedResolution(pub Resolution);

#[async_trait]
impl<R: Resource> ConflictResolver<R> for FixedResolution {
    async fn decide(&self, _conflict: &ConflictState<R>) -> Resolution {
        self.0
    }
}

/// Optimistic concurrency around record edits: snapshot on begin, re-check
/// on submit, and an explicit decision when someone else wrote first.
pub struct ConcurrencyGuard<R, C> {
    store: ResourceStore<R, C>,
}

impl<R, C: Clone> Clone for ConcurrencyGuard<R, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<R: Resource, C: ResourceClient<R>> ConcurrencyGuard<R, C> {
    pub fn new(store: ResourceStore<R, C>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ResourceStore<R, C> {
        &self.store
    }

    /// Fetches the record fresh (bypassing the cache) and snapshots it.
    pub async fn begin(&self, id: ResourceId) -> Result<EditSession<R>> {
        let resource = self.store.client().fetch(id).await?;
        self.store
            .cache()
            .put(QueryKey::detail(R::SINGULAR, id), &resource)?;
        tracing::debug!(
            "Editing {} {} at version {:?}",
            R::SINGULAR,
            id,
            resource.version()
        );
        Ok(EditSession::begin(&resource))
    }

    /// Re-fetches and compares versions by equality. A deleted record is a
    /// conflict; transport failures are returned as errors.
    pub async fn check_conflict(&self, session: &EditSession<R>) -> Result<ConflictCheck<R>> {
        let id = session.resource_id();
        let server = match self.store.client().fetch(id).await {
            Ok(server) => server,
            Err(AdminError::NotFound { .. }) => {
                tracing::warn!("{} {} was deleted while being edited", R::SINGULAR, id);
                return Ok(ConflictCheck::Conflicted { server: None });
            }
            Err(e) => return Err(e),
        };

        if server.version() == session.baseline_version() {
            Ok(ConflictCheck::Clean)
        } else {
            tracing::warn!(
                "{} {} changed on server: {:?} -> {:?}",
                R::SINGULAR,
                id,
                session.baseline_version(),
                server.version()
            );
            Ok(ConflictCheck::Conflicted {
                server: Some(server),
            })
        }
    }

    /// Checks for a conflict and commits only if clean.
    pub async fn submit(&self, session: &mut EditSession<R>) -> Result<SubmitOutcome<R>> {
        session.transition(SessionState::Checking)?;

        let check = match self.check_conflict(session).await {
            Ok(check) => check,
            Err(e) => {
                session.fail(&e);
                return Err(e);
            }
        };

        match check {
            ConflictCheck::Clean => {
                session.transition(SessionState::Committing)?;
                self.commit_or_detect(session).await
            }
            ConflictCheck::Conflicted { server } => {
                session.transition(SessionState::Conflicted)?;
                Ok(SubmitOutcome::Conflicted(ConflictState::new(session, server)))
            }
        }
    }

    /// Applies the caller's decision. The conflict must belong to `session`.
    pub async fn resolve(
        &self,
        session: &mut EditSession<R>,
        conflict: ConflictState<R>,
        resolution: Resolution,
    ) -> Result<ResolveOutcome<R>> {
        if conflict.resource_id != session.resource_id() {
            return Err(session.invalid("resolve a conflict of another record"));
        }
        session.expect_state(SessionState::Conflicted, "resolve a conflict")?;

        match resolution {
            Resolution::ForceOverwrite => {
                tracing::info!(
                    "Overwriting {} {} despite intervening changes",
                    R::SINGULAR,
                    session.resource_id()
                );
                let committed = self.commit(session, true).await?;
                Ok(ResolveOutcome::Committed(committed))
            }
            Resolution::Discard => {
                session.transition(SessionState::Discarded)?;
                let id = session.resource_id();
                self.store.invalidate_after_write(id);
                let current = match self.store.get(id).await {
                    Ok(current) => Some(current),
                    Err(AdminError::NotFound { .. }) => None,
                    Err(e) => return Err(e),
                };
                if let Some(current) = &current {
                    session.reset_to(current);
                }
                tracing::info!("Discarded edit of {} {}", R::SINGULAR, id);
                Ok(ResolveOutcome::Reloaded(current))
            }
            Resolution::Cancel => {
                session.transition(SessionState::Discarded)?;
                Ok(ResolveOutcome::Cancelled)
            }
        }
    }

    /// Writes the draft. Without `force` the session must have just passed a
    /// clean check; with `force` it must be sitting on a conflict. A failed
    /// write leaves the session in `Editing` with its draft.
    pub async fn commit(&self, session: &mut EditSession<R>, force: bool) -> Result<R> {
        match (force, session.state()) {
            (false, SessionState::Committing) => {}
            (true, SessionState::Conflicted) => session.transition(SessionState::Committing)?,
            (true, SessionState::Committing) => {}
            _ => return Err(session.invalid("commit")),
        }

        let id = session.resource_id();
        let result = self.write(session).await;
        if let Err(e) = &result {
            tracing::error!("Saving {} {} failed: {}", R::SINGULAR, id, e);
        }
        result
    }

    /// Runs the whole flow, asking `resolver` only when a conflict appears.
    pub async fn save(
        &self,
        session: &mut EditSession<R>,
        resolver: &dyn ConflictResolver<R>,
    ) -> Result<ResolveOutcome<R>> {
        match self.submit(session).await? {
            SubmitOutcome::Committed(committed) => Ok(ResolveOutcome::Committed(committed)),
            SubmitOutcome::Conflicted(conflict) => {
                let resolution = resolver.decide(&conflict).await;
                tracing::debug!("Conflict resolution chosen: {:?}", resolution);
                self.resolve(session, conflict, resolution).await
            }
        }
    }

    /// A non-forced write the server itself rejects as stale is turned into
    /// a conflict, like one found by the pre-check.
    async fn commit_or_detect(&self, session: &mut EditSession<R>) -> Result<SubmitOutcome<R>> {
        let id = session.resource_id();
        match self.store.client().commit(id, session.draft()).await {
            Ok(committed) => Ok(SubmitOutcome::Committed(self.finish(session, committed)?)),
            Err(AdminError::Conflict { .. }) => {
                tracing::warn!("Server rejected stale write of {} {}", R::SINGULAR, id);
                let server = match self.store.client().fetch(id).await {
                    Ok(server) => Some(server),
                    Err(AdminError::NotFound { .. }) => None,
                    Err(e) => {
                        session.fail(&e);
                        return Err(e);
                    }
                };
                session.transition(SessionState::Conflicted)?;
                Ok(SubmitOutcome::Conflicted(ConflictState::new(session, server)))
            }
            Err(e) => {
                tracing::error!("Saving {} {} failed: {}", R::SINGULAR, id, e);
                session.fail(&e);
                Err(e)
            }
        }
    }

    async fn write(&self, session: &mut EditSession<R>) -> Result<R> {
        let id = session.resource_id();
        match self.store.client().commit(id, session.draft()).await {
            Ok(committed) => self.finish(session, committed),
            Err(e) => {
                session.fail(&e);
                Err(e)
            }
        }
    }

    fn finish(&self, session: &mut EditSession<R>, committed: R) -> Result<R> {
        let id = session.resource_id();
        session.complete(&committed)?;
        self.store.invalidate_after_write(id);
        tracing::info!(
            "Saved {} {} at version {:?}",
            R::SINGULAR,
            id,
            committed.version()
        );
        Ok(committed)
    }
}
