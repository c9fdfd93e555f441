use std::future::Future;

use crate::{
    foundation::error::ReelResult,
    model::timeline::SessionDocument,
    timeline::mutate::Mutation,
    timeline::session::{SharedSession, lock_session},
};

/// Backing store for session edits (the persistence API collaborator).
pub trait SessionStore: Send + Sync + 'static {
    /// Persist one mutation. The server may answer with its authoritative document.
    fn persist(
        &self,
        session_id: &str,
        mutation: &Mutation,
    ) -> impl Future<Output = ReelResult<Option<SessionDocument>>> + Send;
}

/// Persist `mutation` and fold the server's answer back into `session`.
///
/// The lock is only taken before and after the store call.
#[tracing::instrument(level = "debug", skip_all, fields(op = mutation.op_name()))]
pub async fn persist_and_reconcile<S: SessionStore + ?Sized>(
    store: &S,
    session: &SharedSession,
    mutation: &Mutation,
) -> ReelResult<()> {
    let session_id = lock_session(session).config().session_id.clone();
    let answer = store.persist(&session_id, mutation).await?;
    if let Some(doc) = answer {
        lock_session(session).apply_server_document(doc)?;
    }
    Ok(())
}
