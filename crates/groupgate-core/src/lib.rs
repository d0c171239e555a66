//! Core types: identifiers, participant changes, contact cards, tracing

pub mod contact;
pub mod jid;
pub mod logging;
pub mod participant;

pub use contact::{ContactCard, escape_text};
pub use jid::{GROUP_SERVER, Jid, JidError, PARTICIPANT_SERVER};
pub use logging::{LogFormat, LoggingConfig, LoggingError, init_logging};
pub use participant::{ParticipantAction, ParticipantChangeRequest};
