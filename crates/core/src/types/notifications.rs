//! Web push subscription payloads.

use serde::{Deserialize, Serialize};

/// Encryption keys of a push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub auth: String,
    pub p256dh: String,
}

/// Body of `POST /me/notifications/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

impl PushSubscription {
    /// A placeholder subscription used until a real push worker is wired up.
    ///
    /// The endpoint embeds `timestamp_ms` so repeated registrations differ.
    #[must_use]
    pub fn simulated(timestamp_ms: i64) -> Self {
        Self {
            endpoint: format!("debug-simulated-{timestamp_ms}"),
            keys: PushKeys {
                auth: "debug-auth".to_string(),
                p256dh: "debug-p256".to_string(),
            },
        }
    }
}
