//! In-process loopback backend.
//!
//! [`MemoryClient`] implements [`MessagingClient`] without any network: groups
//! are ordered participant lists, sent messages are recorded, and pairing
//! replays a script of events. The binary uses it for dry runs; the test
//! suites use it as the collaborator double.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use groupgate_core::{Jid, PARTICIPANT_SERVER, ParticipantAction};

use crate::client::{
    BoxFuture, GroupInfo, GroupParticipant, MessagingClient, OutgoingMessage, ParticipantChange,
    SendReceipt,
};
use crate::error::{ClientError, ClientErrorCode, ClientResult};
use crate::identity::DeviceIdentity;
use crate::pairing::{PairingEvent, PairingEvents};
use crate::store::CredentialStore;

/// How long a scripted code claims to be valid.
const CODE_VALIDITY: Duration = Duration::from_secs(60);

/// A message accepted by the loopback backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipient.
    pub to: Jid,
    /// Payload as handed to the backend.
    pub message: OutgoingMessage,
    /// Assigned message id.
    pub id: String,
}

#[derive(Debug, Clone)]
struct PairingScript {
    events: Vec<PairingEvent>,
    step_delay: Duration,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    code: ClientErrorCode,
    message: String,
}

impl InjectedFailure {
    fn to_error(&self) -> ClientError {
        ClientError::new(self.code, self.message.clone())
    }
}

/// Loopback [`MessagingClient`].
pub struct MemoryClient {
    name: String,
    store: Arc<dyn CredentialStore>,
    connected: AtomicBool,
    calls: AtomicUsize,
    groups: Mutex<HashMap<Jid, GroupInfo>>,
    sent: Mutex<Vec<SentMessage>>,
    script: PairingScript,
    pending_pairing: Mutex<Option<mpsc::UnboundedSender<PairingEvent>>>,
    request_failure: Mutex<Option<InjectedFailure>>,
    connect_failure: Mutex<Option<InjectedFailure>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryClient {
    /// Creates a loopback client sharing the given credential store.
    ///
    /// The default pairing script shows one code and succeeds immediately.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            name: "loopback".to_string(),
            store,
            connected: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            groups: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            script: PairingScript {
                events: default_script(),
                step_delay: Duration::ZERO,
            },
            pending_pairing: Mutex::new(None),
            request_failure: Mutex::new(None),
            connect_failure: Mutex::new(None),
        }
    }

    /// Builder: register a group with its initial participants, in order.
    pub fn with_group(
        self,
        group: Jid,
        name: impl Into<String>,
        participants: impl IntoIterator<Item = Jid>,
    ) -> Self {
        let mut seen = Vec::new();
        for jid in participants {
            if !seen.contains(&jid) {
                seen.push(jid);
            }
        }
        let info = GroupInfo {
            jid: group.clone(),
            name: name.into(),
            participants: seen.into_iter().map(GroupParticipant::member).collect(),
        };
        lock(&self.groups).insert(group, info);
        self
    }

    /// Builder: replace the pairing script. Each event is emitted after
    /// `step_delay`.
    pub fn with_pairing_script(mut self, events: Vec<PairingEvent>, step_delay: Duration) -> Self {
        self.script = PairingScript { events, step_delay };
        self
    }

    /// Builder: approve pairing automatically after `delay`.
    pub fn with_auto_approve(self, delay: Duration) -> Self {
        self.with_pairing_script(default_script(), delay)
    }

    /// Makes every group call fail with the given error until cleared.
    pub fn fail_requests_with(&self, code: ClientErrorCode, message: impl Into<String>) {
        *lock(&self.request_failure) = Some(InjectedFailure {
            code,
            message: message.into(),
        });
    }

    /// Clears an injected request failure.
    pub fn clear_request_failure(&self) {
        *lock(&self.request_failure) = None;
    }

    /// Makes the next connects fail with the given error.
    pub fn fail_connect_with(&self, code: ClientErrorCode, message: impl Into<String>) {
        *lock(&self.connect_failure) = Some(InjectedFailure {
            code,
            message: message.into(),
        });
    }

    /// Simulates the socket going away without a disconnect call.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Number of group calls received (info, participant updates, sends).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Current participants of a group, in order.
    pub fn participants(&self, group: &Jid) -> Vec<Jid> {
        lock(&self.groups)
            .get(group)
            .map(|info| info.participants.iter().map(|p| p.jid.clone()).collect())
            .unwrap_or_default()
    }

    /// Messages accepted so far.
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    /// Common preamble of every group call.
    fn begin_request(&self) -> ClientResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = lock(&self.request_failure).as_ref() {
            return Err(failure.to_error());
        }
        if !self.is_connected() {
            return Err(ClientError::not_connected("client is not connected"));
        }
        Ok(())
    }

    fn group_info_now(&self, group: &Jid) -> ClientResult<GroupInfo> {
        self.begin_request()?;
        lock(&self.groups)
            .get(group)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("group {group} not found")))
    }

    fn update_now(
        &self,
        group: &Jid,
        participants: Vec<Jid>,
        action: ParticipantAction,
    ) -> ClientResult<Vec<ParticipantChange>> {
        self.begin_request()?;
        let mut groups = lock(&self.groups);
        let info = groups
            .get_mut(group)
            .ok_or_else(|| ClientError::not_found(format!("group {group} not found")))?;

        let changes = participants
            .into_iter()
            .map(|jid| {
                let position = info.participants.iter().position(|p| p.jid == jid);
                let status = match (action, position) {
                    (ParticipantAction::Add, Some(_)) => 409,
                    (ParticipantAction::Add, None) => {
                        info.participants.push(GroupParticipant::member(jid.clone()));
                        200
                    }
                    (ParticipantAction::Remove, Some(index)) => {
                        info.participants.remove(index);
                        200
                    }
                    (ParticipantAction::Remove, None) => 404,
                };
                debug!(%group, participant = %jid, %action, status, "Applied participant change");
                ParticipantChange { jid, status }
            })
            .collect();
        Ok(changes)
    }

    fn send_now(&self, to: Jid, message: OutgoingMessage) -> ClientResult<SendReceipt> {
        self.begin_request()?;
        if to.is_group() && !lock(&self.groups).contains_key(&to) {
            return Err(ClientError::not_found(format!("group {to} not found")));
        }

        let id = Uuid::new_v4().simple().to_string().to_uppercase();
        lock(&self.sent).push(SentMessage {
            to,
            message,
            id: id.clone(),
        });
        Ok(SendReceipt {
            id,
            timestamp: Utc::now(),
        })
    }

    /// Replays the pairing script into `tx`, persisting an identity right
    /// before `Success` is delivered.
    fn spawn_pairing(&self, tx: mpsc::UnboundedSender<PairingEvent>) {
        let store = self.store.clone();
        let script = self.script.clone();

        tokio::spawn(async move {
            for event in script.events {
                if !script.step_delay.is_zero() {
                    tokio::time::sleep(script.step_delay).await;
                }
                let event = match event {
                    PairingEvent::Success => match store.save(&new_identity()) {
                        Ok(()) => PairingEvent::Success,
                        Err(e) => PairingEvent::Error {
                            message: e.to_string(),
                        },
                    },
                    other => other,
                };
                let terminal = event.is_terminal();
                if tx.send(event).is_err() {
                    debug!("Pairing consumer went away");
                    return;
                }
                if terminal {
                    return;
                }
            }
        });
    }
}

impl MessagingClient for MemoryClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn pairing_events(&self) -> ClientResult<PairingEvents> {
        let existing = self
            .store
            .load()
            .map_err(|e| ClientError::internal("failed to read credential store").with_source(e))?;
        if existing.is_some() {
            return Err(ClientError::already_paired(
                "pairing requested but a device identity is already stored",
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.pending_pairing) = Some(tx);
        Ok(Box::pin(futures_util::stream::unfold(
            rx,
            |mut rx| async move { rx.recv().await.map(|event| (event, rx)) },
        )))
    }

    fn connect(&self) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            if let Some(failure) = lock(&self.connect_failure).as_ref() {
                return Err(failure.to_error());
            }
            self.connected.store(true, Ordering::SeqCst);
            info!(backend = %self.name, "Loopback connection open");

            if let Some(tx) = lock(&self.pending_pairing).take() {
                self.spawn_pairing(tx);
            }
            Ok(())
        })
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(backend = %self.name, "Loopback connection closed");
        }
        lock(&self.pending_pairing).take();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn group_info(&self, group: Jid) -> BoxFuture<'_, ClientResult<GroupInfo>> {
        Box::pin(async move { self.group_info_now(&group) })
    }

    fn update_group_participants(
        &self,
        group: Jid,
        participants: Vec<Jid>,
        action: ParticipantAction,
    ) -> BoxFuture<'_, ClientResult<Vec<ParticipantChange>>> {
        Box::pin(async move { self.update_now(&group, participants, action) })
    }

    fn send_message(
        &self,
        to: Jid,
        message: OutgoingMessage,
    ) -> BoxFuture<'_, ClientResult<SendReceipt>> {
        Box::pin(async move { self.send_now(to, message) })
    }
}

fn default_script() -> Vec<PairingEvent> {
    vec![
        PairingEvent::Code {
            code: format!("loopback-pairing:{}", Uuid::new_v4()),
            timeout: CODE_VALIDITY,
        },
        PairingEvent::Success,
    ]
}

fn new_identity() -> DeviceIdentity {
    let id = Uuid::new_v4();
    let user = format!("loopback-{}", &id.simple().to_string()[..12]);
    DeviceIdentity::new(
        Jid::new(user, PARTICIPANT_SERVER),
        (id.as_u128() as u32) & 0x3fff,
        id.simple().to_string(),
        "groupgate-loopback",
    )
}
