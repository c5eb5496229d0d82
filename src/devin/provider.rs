//! The session-provider seam.

use std::future::Future;

use crate::types::{SessionDetail, SessionFilter, SessionId, SessionSummary};

use super::error::DevinApiError;

/// Source of background coding sessions and their status.
///
/// [`super::DevinClient`] implements this over HTTP; tests use in-memory fakes.
pub trait SessionProvider: Send + Sync + 'static {
    /// Lists sessions, applying the coarse status filter.
    fn list_sessions(
        &self,
        filter: SessionFilter,
    ) -> impl Future<Output = Result<Vec<SessionSummary>, DevinApiError>> + Send;

    /// Fetches the authoritative detailed status of one session.
    fn get_session_detail(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<SessionDetail, DevinApiError>> + Send;

    /// Stops a session.
    fn terminate_session(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<(), DevinApiError>> + Send;
}
