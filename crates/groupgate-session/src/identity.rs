//! The persisted device identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use groupgate_core::Jid;

/// Credentials that let the client reconnect without pairing again.
///
/// Created by the messaging backend when pairing succeeds; this crate only
/// reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Identifier of the paired account/device.
    pub jid: Jid,
    /// Registration id assigned during pairing.
    pub registration_id: u32,
    /// Public identity key, encoded by the backend.
    pub identity_key: String,
    /// Platform string announced during pairing.
    pub platform: String,
    /// When the pairing completed.
    pub paired_at: DateTime<Utc>,
}

impl DeviceIdentity {
    /// Creates a new identity paired now.
    pub fn new(
        jid: Jid,
        registration_id: u32,
        identity_key: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            jid,
            registration_id,
            identity_key: identity_key.into(),
            platform: platform.into(),
            paired_at: Utc::now(),
        }
    }
}
