//! Session manager: owns the shared messaging client and its lifecycle.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use groupgate_core::{Jid, ParticipantChangeRequest};

use crate::client::{GroupInfo, MessagingClient, OutgoingMessage, ParticipantChange, SendReceipt};
use crate::error::{ClientResult, SessionError, SessionResult};
use crate::pairing::{CodeRenderer, PairingFlow, PairingOutcome, PairingReport, TerminalRenderer};
use crate::store::CredentialStore;

/// Connection state of the session. Only [`SessionManager`] writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection.
    Disconnected,
    /// Reconnecting with a stored identity.
    Connecting,
    /// Waiting for the operator to scan a pairing code.
    AwaitingPairing,
    /// Connected and paired.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Owns the single messaging client handle.
///
/// Built once at startup and shared (behind an `Arc`) with the HTTP
/// handlers. Request-path methods delegate straight to the client without
/// extra locking.
pub struct SessionManager {
    client: Arc<dyn MessagingClient>,
    store: Arc<dyn CredentialStore>,
    renderer: Arc<dyn CodeRenderer>,
    state: watch::Sender<ConnectionState>,
}

impl SessionManager {
    /// Creates a session manager that renders pairing codes on the terminal.
    pub fn new(client: Arc<dyn MessagingClient>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            client,
            store,
            renderer: Arc::new(TerminalRenderer),
            state,
        }
    }

    /// Builder: use a different pairing code renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn CodeRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Returns the backend name.
    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribes to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Reports the client's live socket state.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Establishes the session.
    ///
    /// Loads the identity once. Without one, pairing runs on its own task
    /// while this task drives the initial connect; both must finish before
    /// this returns. With one, the client reconnects directly.
    ///
    /// # Errors
    ///
    /// Every error is fatal at startup and is never retried here.
    pub async fn connect(&self, cancel: &CancellationToken) -> SessionResult<()> {
        if self.state() == ConnectionState::Connected {
            debug!("Session already connected");
            return Ok(());
        }

        let identity = self.store.load()?;
        let result = match identity {
            Some(identity) => {
                info!(jid = %identity.jid, backend = self.client.name(), "Found stored session");
                self.reconnect(cancel).await
            }
            None => {
                info!(backend = self.client.name(), "No session found, starting pairing");
                self.pair_and_connect(cancel).await
            }
        };

        match result {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.client.disconnect();
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn reconnect(&self, cancel: &CancellationToken) -> SessionResult<()> {
        self.set_state(ConnectionState::Connecting);
        tokio::select! {
            result = self.client.connect() => result.map_err(SessionError::Connect)?,
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
        }
        info!("Reconnected");
        Ok(())
    }

    async fn pair_and_connect(&self, cancel: &CancellationToken) -> SessionResult<()> {
        self.set_state(ConnectionState::AwaitingPairing);

        // The stream must exist before connect, or early codes are lost.
        let events = self
            .client
            .pairing_events()
            .map_err(SessionError::PairingUnavailable)?;

        let pairing_cancel = cancel.child_token();
        let flow = PairingFlow::new(self.renderer.clone());
        let mut pairing = tokio::spawn(flow.run(events, pairing_cancel.clone()));
        let mut connect = self.client.connect();

        // Whichever side settles first decides; a failed pairing must not
        // wait on a connect that may never return.
        let first = tokio::select! {
            result = &mut connect => PairingStep::Connected(result),
            joined = &mut pairing => PairingStep::Paired(joined),
            _ = cancel.cancelled() => PairingStep::Cancelled,
        };

        match first {
            PairingStep::Connected(Ok(())) => {
                let report = joined_report(pairing.await)?;
                self.pairing_result(report)
            }
            PairingStep::Connected(Err(e)) => {
                pairing_cancel.cancel();
                if let Err(join) = pairing.await {
                    warn!(error = %join, "Pairing task ended abnormally");
                }
                Err(SessionError::Connect(e))
            }
            PairingStep::Paired(joined) => {
                self.pairing_result(joined_report(joined)?)?;
                tokio::select! {
                    result = &mut connect => result.map_err(SessionError::Connect),
                    _ = cancel.cancelled() => Err(SessionError::Cancelled),
                }
            }
            PairingStep::Cancelled => {
                pairing_cancel.cancel();
                if let Err(join) = pairing.await {
                    warn!(error = %join, "Pairing task ended abnormally");
                }
                Err(SessionError::Cancelled)
            }
        }
    }

    fn pairing_result(&self, report: PairingReport) -> SessionResult<()> {
        debug!(codes_shown = report.codes_shown, "Pairing attempt finished");
        match report.outcome {
            PairingOutcome::Success => {
                if self.store.load()?.is_none() {
                    warn!("Pairing succeeded but the credential store holds no identity");
                }
                Ok(())
            }
            PairingOutcome::Timeout => Err(SessionError::PairingTimeout),
            PairingOutcome::Error(message) => Err(SessionError::PairingFailed { message }),
            PairingOutcome::Cancelled => Err(SessionError::Cancelled),
        }
    }

    /// Closes the connection. Safe to call more than once.
    pub fn disconnect(&self) {
        self.client.disconnect();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Fetches group metadata.
    pub async fn group_info(&self, group: &Jid) -> ClientResult<GroupInfo> {
        self.client.group_info(group.clone()).await
    }

    /// Applies one membership change to a group.
    pub async fn update_participant(
        &self,
        group: &Jid,
        request: &ParticipantChangeRequest,
    ) -> ClientResult<Vec<ParticipantChange>> {
        self.client
            .update_group_participants(group.clone(), vec![request.participant()], request.action)
            .await
    }

    /// Sends a structured message and waits for the backend's confirmation.
    pub async fn send_message(
        &self,
        to: &Jid,
        message: OutgoingMessage,
    ) -> ClientResult<SendReceipt> {
        self.client.send_message(to.clone(), message).await
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "Connection state changed");
        }
    }
}

/// First event while pairing and connecting run side by side.
enum PairingStep {
    Connected(ClientResult<()>),
    Paired(Result<PairingReport, JoinError>),
    Cancelled,
}

fn joined_report(joined: Result<PairingReport, JoinError>) -> SessionResult<PairingReport> {
    joined.map_err(|e| SessionError::PairingTask {
        message: e.to_string(),
    })
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("backend", &self.client.name())
            .field("state", &self.state())
            .finish()
    }
}
