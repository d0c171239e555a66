//! Group membership change requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::jid::Jid;

/// Membership change applied to a group participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantAction {
    /// Add the participant to the group.
    Add,
    /// Remove the participant from the group.
    Remove,
}

impl ParticipantAction {
    /// Returns the wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for ParticipantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single add/remove request, built per HTTP call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantChangeRequest {
    /// Phone number of the participant, digits only as supplied by the caller.
    pub phone_number: String,
    /// Requested action.
    pub action: ParticipantAction,
}

impl ParticipantChangeRequest {
    /// Creates a new change request.
    pub fn new(phone_number: impl Into<String>, action: ParticipantAction) -> Self {
        Self {
            phone_number: phone_number.into(),
            action,
        }
    }

    /// Returns the routable participant identifier for this request.
    pub fn participant(&self) -> Jid {
        Jid::participant(self.phone_number.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jid::PARTICIPANT_SERVER;

    #[test]
    fn request_builds_participant_identifier() {
        let request = ParticipantChangeRequest::new("15551234567", ParticipantAction::Add);
        let jid = request.participant();
        assert_eq!(jid.user(), "15551234567");
        assert_eq!(jid.server(), PARTICIPANT_SERVER);
    }

    #[test]
    fn action_names() {
        assert_eq!(ParticipantAction::Add.to_string(), "add");
        assert_eq!(ParticipantAction::Remove.as_str(), "remove");
    }
}
