//! MessagingClient trait definition.
//!
//! [`MessagingClient`] is the seam to the messaging protocol library. The
//! session layer and the HTTP handlers only ever talk to a backend through
//! this trait; wire protocol, encryption and framing live behind it.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::Serialize;

use groupgate_core::{ContactCard, Jid, ParticipantAction};

use crate::error::ClientResult;
use crate::pairing::PairingEvents;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupParticipant {
    /// Participant identifier.
    pub jid: Jid,
    /// Whether the participant is a group admin.
    pub is_admin: bool,
}

impl GroupParticipant {
    /// Creates a regular (non-admin) participant.
    pub fn member(jid: Jid) -> Self {
        Self {
            jid,
            is_admin: false,
        }
    }
}

/// Group metadata as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    /// Group identifier.
    pub jid: Jid,
    /// Group subject.
    pub name: String,
    /// Participants, in the order the backend reports them.
    pub participants: Vec<GroupParticipant>,
}

impl GroupInfo {
    /// Returns the user part of every participant, preserving order.
    pub fn participant_users(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.jid.user().to_string())
            .collect()
    }
}

/// Outcome of one participant in a membership update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantChange {
    /// The participant the status refers to.
    pub jid: Jid,
    /// HTTP-like status: 200 applied, 404 not a member, 409 already a member.
    pub status: u16,
}

impl ParticipantChange {
    /// Returns true if the change was applied.
    pub fn is_applied(&self) -> bool {
        self.status == 200
    }
}

/// A contact-card message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    /// Name shown in the chat bubble.
    pub display_name: String,
    /// vCard 3.0 payload.
    pub vcard: String,
}

impl ContactMessage {
    /// Wraps a contact card into a structured message.
    pub fn from_card(card: &ContactCard) -> Self {
        Self {
            display_name: card.display_name.clone(),
            vcard: card.to_vcard(),
        }
    }
}

/// A structured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutgoingMessage {
    /// A shared contact.
    Contact(ContactMessage),
}

/// Confirmation returned once the backend accepted a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Backend-assigned message id.
    pub id: String,
    /// Server timestamp of the message.
    pub timestamp: DateTime<Utc>,
}

/// The messaging protocol client.
///
/// Implementations must be safe to call concurrently from many request
/// handlers; the session layer adds no locking of its own.
///
/// # Pairing
///
/// When no device identity exists, [`pairing_events`](Self::pairing_events)
/// must be called before [`connect`](Self::connect). The returned stream
/// yields one or more `Code` events followed by a single terminal event.
pub trait MessagingClient: Send + Sync {
    /// Returns a short name for logs (e.g. "loopback").
    fn name(&self) -> &str;

    /// Opens the pairing event stream for a new pairing attempt.
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyPaired` if the store already holds an identity.
    fn pairing_events(&self) -> ClientResult<PairingEvents>;

    /// Opens the connection.
    fn connect(&self) -> BoxFuture<'_, ClientResult<()>>;

    /// Closes the connection. Calling it on a closed client is a no-op.
    fn disconnect(&self);

    /// Reports the live socket state. Must not block.
    fn is_connected(&self) -> bool;

    /// Fetches group metadata.
    fn group_info(&self, group: Jid) -> BoxFuture<'_, ClientResult<GroupInfo>>;

    /// Adds or removes participants.
    fn update_group_participants(
        &self,
        group: Jid,
        participants: Vec<Jid>,
        action: ParticipantAction,
    ) -> BoxFuture<'_, ClientResult<Vec<ParticipantChange>>>;

    /// Sends a structured message and waits for the backend to accept it.
    fn send_message(
        &self,
        to: Jid,
        message: OutgoingMessage,
    ) -> BoxFuture<'_, ClientResult<SendReceipt>>;
}
