//! Session lifecycle and the messaging client seam.
//!
//! - [`MessagingClient`] - the trait every messaging backend implements
//! - [`CredentialStore`] - persistence of the single [`DeviceIdentity`]
//! - [`PairingFlow`] - drains pairing events when no identity exists
//! - [`SessionManager`] - owns the shared client and its connection state
//! - [`MemoryClient`] - in-process loopback backend
//!
//! # Startup
//!
//! ```text
//! CredentialStore::load ──▶ identity? ──yes──▶ connect ──▶ Connected
//!                              │
//!                              no
//!                              ▼
//!            pairing_events ──▶ PairingFlow (own task) ─┐
//!            connect ───────────────────────────────────┴─▶ join ──▶ Connected
//! ```

pub mod client;
pub mod error;
pub mod identity;
pub mod memory;
pub mod pairing;
pub mod session;
pub mod store;

pub use client::{
    BoxFuture, ContactMessage, GroupInfo, GroupParticipant, MessagingClient, OutgoingMessage,
    ParticipantChange, SendReceipt,
};
pub use error::{
    ClientError, ClientErrorCode, ClientResult, SessionError, SessionResult, StoreError,
    StoreResult,
};
pub use identity::DeviceIdentity;
pub use memory::{MemoryClient, SentMessage};
pub use pairing::{
    CodeRenderer, PairingEvent, PairingEvents, PairingFlow, PairingOutcome, PairingReport,
    PairingState, TerminalRenderer,
};
pub use session::{ConnectionState, SessionManager};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
