//! Routable identifiers for groups and participants.
//!
//! An identifier is a local part plus a domain suffix. Participants live on
//! [`PARTICIPANT_SERVER`], groups on [`GROUP_SERVER`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain suffix for individual participants.
pub const PARTICIPANT_SERVER: &str = "s.whatsapp.net";

/// Domain suffix for groups.
pub const GROUP_SERVER: &str = "g.us";

/// Errors produced while parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JidError {
    /// The input was empty.
    #[error("identifier is empty")]
    Empty,

    /// One side of the `@` separator was empty.
    #[error("malformed identifier: {input}")]
    Malformed { input: String },

    /// The identifier does not live on the expected server.
    #[error("identifier {jid} is not on the {expected} server")]
    WrongServer { jid: String, expected: &'static str },
}

/// A routable address (`user@server`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid {
    user: String,
    server: String,
}

impl Jid {
    /// Creates an identifier from its parts.
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
        }
    }

    /// Builds a participant identifier from a phone number.
    pub fn participant(phone: impl Into<String>) -> Self {
        Self::new(phone, PARTICIPANT_SERVER)
    }

    /// Builds a group identifier from its local id.
    pub fn group(id: impl Into<String>) -> Self {
        Self::new(id, GROUP_SERVER)
    }

    /// Parses a configured group value.
    ///
    /// Accepts `id@g.us` or a bare `id`; a bare id gets the group suffix.
    pub fn parse_group(input: &str) -> Result<Self, JidError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(JidError::Empty);
        }
        if !input.contains('@') {
            return Ok(Self::group(input));
        }

        let jid: Jid = input.parse()?;
        if !jid.is_group() {
            return Err(JidError::WrongServer {
                jid: jid.to_string(),
                expected: GROUP_SERVER,
            });
        }
        Ok(jid)
    }

    /// Returns the local part.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the domain suffix.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns true if this identifier names a group.
    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.server)
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(JidError::Empty);
        }
        match s.split_once('@') {
            Some((user, server)) if !user.is_empty() && !server.is_empty() => {
                Ok(Self::new(user, server))
            }
            _ => Err(JidError::Malformed {
                input: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Jid {
    type Error = JidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}
