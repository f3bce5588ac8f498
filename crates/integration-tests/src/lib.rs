//! Integration tests for the SideQuest client.
//!
//! Every test runs the real HTTP stack against a `wiremock` server standing
//! in for the quest service, mounted under `/api` like the real backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sidequest-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `gateway` - Request contract: headers, decoding, errors, timeout, cancellation
//! - `api_client` - Typed endpoints and identity gating
//! - `onboarding_flow` - Page, cards and dashboard end to end
//! - `identity_file` - Identity persistence on disk

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use sidequest_client::{ApiClient, Gateway, IdentityContext, MemoryIdentityStore};
use wiremock::MockServer;

/// Default timeout used by test gateways.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// A mock quest service plus a client pointed at it.
pub struct TestContext {
    pub server: MockServer,
    pub identity: Arc<IdentityContext>,
    pub api: Arc<ApiClient>,
}

impl TestContext {
    /// Start a mock server and build a client with `identity` set.
    pub async fn new(identity: Option<&str>) -> Self {
        Self::with_timeouts(identity, TEST_TIMEOUT, TEST_TIMEOUT).await
    }

    pub async fn with_timeouts(
        identity: Option<&str>,
        timeout: Duration,
        quest_timeout: Duration,
    ) -> Self {
        let server = MockServer::start().await;
        let identity = Arc::new(IdentityContext::load(MemoryIdentityStore::new(identity)));
        let gateway = gateway_for(&server, timeout);
        let api = Arc::new(ApiClient::with_gateway(gateway, identity.clone(), quest_timeout));
        Self {
            server,
            identity,
            api,
        }
    }

    /// Requests the server has received so far.
    pub async fn requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// Gateway rooted at `<server>/api`.
#[must_use]
pub fn gateway_for(server: &MockServer, timeout: Duration) -> Gateway {
    Gateway::with_client(
        reqwest::Client::new(),
        format!("{}/api", server.uri()),
        timeout,
    )
}

/// A fresh profile as `GET /me` returns it.
#[must_use]
pub fn profile_json(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "display_name": null,
        "email": format!("{username}@example.com"),
        "bio": null,
        "avatar_url": null,
        "prefs": {},
        "location": null,
        "webpush_registered": false,
        "privacy": "public",
        "quest_preferences": {},
        "onboarding": {"completed": false, "step": null},
        "created_at": "2024-05-01T12:00:00.123456"
    })
}

/// Onboarding status with the given steps completed.
#[must_use]
pub fn status_json(done: [bool; 4]) -> Value {
    let [location, preferences, notifications, complete] = done;
    let ids = ["location", "preferences", "notifications", "complete"];
    let first_open = ids
        .iter()
        .zip(done)
        .find(|(_, completed)| !completed)
        .map(|(id, _)| *id);
    json!({
        "completed": complete,
        "current_step": first_open.unwrap_or("complete"),
        "next_step": first_open,
        "steps": [
            {"id": "location", "label": "Set your home base", "completed": location},
            {"id": "preferences", "label": "Tell us what you like", "completed": preferences},
            {"id": "notifications", "label": "Stay in the loop", "completed": notifications},
            {"id": "complete", "label": "You're ready to quest", "completed": complete}
        ]
    })
}
