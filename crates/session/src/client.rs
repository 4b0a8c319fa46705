//! Request/response layer over session transports.
//!
//! Every call opens its own [`SessionTransport`] and closes it before
//! returning.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, trace};

use sessvault_protocol::constants::RECORD_POINTER;
use sessvault_protocol::{PatchOp, RecordKind, RemoteLocation, SessionRecord};

use crate::api::{CreatedSession, SessionApi};
use crate::error::SessionError;
use crate::transport::SessionTransport;
use crate::types::RemoteConfig;

/// Boxed future returned by [`SessionClient`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote record primitive: create a session, read its record, replace it.
pub trait SessionClient: Send + Sync {
    /// Creates a new session. `kind` is informational.
    fn create<'a>(
        &'a self,
        kind: RecordKind,
        name: &'a str,
    ) -> BoxFuture<'a, Result<CreatedSession, SessionError>>;

    /// Returns the record stored in the session, `Null` if there is none.
    fn read<'a>(
        &'a self,
        location: &'a RemoteLocation,
    ) -> BoxFuture<'a, Result<serde_json::Value, SessionError>>;

    /// Replaces the session's record and waits until the write is committed.
    fn write_and_commit<'a>(
        &'a self,
        location: &'a RemoteLocation,
        record: &'a SessionRecord,
    ) -> BoxFuture<'a, Result<(), SessionError>>;

    /// Creates a session and stores `record` in it.
    fn create_and_commit<'a>(
        &'a self,
        kind: RecordKind,
        name: &'a str,
        record: &'a SessionRecord,
    ) -> BoxFuture<'a, Result<RemoteLocation, SessionError>> {
        Box::pin(async move {
            let location = self.create(kind, name).await?.location();
            self.write_and_commit(&location, record).await?;
            Ok(location)
        })
    }
}

/// [`SessionClient`] backed by the live service.
pub struct WsSessionClient {
    api: SessionApi,
    config: RemoteConfig,
}

impl WsSessionClient {
    pub fn new(config: RemoteConfig) -> Result<Self, SessionError> {
        let api = SessionApi::new(&config)?;
        Ok(Self { api, config })
    }

    #[cfg(test)]
    pub(crate) fn with_api(api: SessionApi, config: RemoteConfig) -> Self {
        Self { api, config }
    }

    fn transport(&self, location: &RemoteLocation) -> SessionTransport {
        SessionTransport::new(location.clone(), self.config.clone())
    }

    async fn fetch_state(&self, location: &RemoteLocation) -> Result<serde_json::Value, SessionError> {
        let mut transport = self.transport(location);
        let state = transport.start().await?;
        transport.close().await;
        Ok(state)
    }

    /// Writes through one connection, then connects and disconnects once
    /// more. The service only persists the change after that second
    /// session entry.
    async fn commit(
        &self,
        location: &RemoteLocation,
        record: &SessionRecord,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_value(record)?;

        let mut writer = self.transport(location);
        writer.start().await?;
        let sent = writer
            .send_change(PatchOp::replace(RECORD_POINTER, value))
            .await;
        writer.close().await;
        sent?;
        trace!(session = %location.id, "change flushed");

        let mut toucher = self.transport(location);
        toucher.start().await?;
        toucher.close().await;
        Ok(())
    }
}

impl SessionClient for WsSessionClient {
    fn create<'a>(
        &'a self,
        kind: RecordKind,
        name: &'a str,
    ) -> BoxFuture<'a, Result<CreatedSession, SessionError>> {
        Box::pin(async move {
            let session = self.api.create_session(name).await?;
            debug!(session = %session.id, %kind, "created session for record");
            Ok(session)
        })
    }

    fn read<'a>(
        &'a self,
        location: &'a RemoteLocation,
    ) -> BoxFuture<'a, Result<serde_json::Value, SessionError>> {
        Box::pin(async move {
            let state = self
                .fetch_state(location)
                .await
                .map_err(SessionError::read)?;
            debug!(session = %location.id, "record read");
            Ok(state
                .pointer(RECORD_POINTER)
                .cloned()
                .unwrap_or(serde_json::Value::Null))
        })
    }

    fn write_and_commit<'a>(
        &'a self,
        location: &'a RemoteLocation,
        record: &'a SessionRecord,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            self.commit(location, record)
                .await
                .map_err(SessionError::write)?;
            debug!(session = %location.id, kind = %record.kind(), "record committed");
            Ok(())
        })
    }
}
