//! Typed access to the SideQuest API.
//!
//! [`OnboardingApi`] is the seam between orchestration and transport: the
//! resolver, step cards and location pipeline only talk to this trait.
//! [`ApiClient`] implements it on top of the [`Gateway`], reading the
//! identity from the shared [`IdentityContext`] on every call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sidequest_core::{
    Identity, LocationCandidate, LocationUpdate, OnboardingStatus, PreferencesUpdate, Profile,
    PushSubscription, Quest, QuestResponse, ReverseGeocodeResponse, SearchResponse, StepId,
};
use tracing::instrument;
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::{ClientError, ValidationError};
use crate::gateway::{CallOptions, Gateway};
use crate::identity::IdentityContext;

/// Operations the onboarding engine needs from the quest service.
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    /// `GET /me`
    async fn profile(&self) -> Result<Profile, ClientError>;

    /// `GET /me/onboarding/status`
    async fn onboarding_status(&self) -> Result<OnboardingStatus, ClientError>;

    /// `POST /me/onboarding/complete-step`
    async fn complete_step(&self, step: &StepId) -> Result<(), ClientError>;

    /// `POST /me/location`
    async fn save_location(&self, update: &LocationUpdate) -> Result<(), ClientError>;

    /// `PATCH /me/preferences`
    async fn update_preferences(&self, update: &PreferencesUpdate) -> Result<(), ClientError>;

    /// `POST /me/notifications/register`
    async fn register_notifications(
        &self,
        subscription: &PushSubscription,
    ) -> Result<(), ClientError>;

    /// `DELETE /me/notifications/register`
    async fn clear_notifications(&self) -> Result<(), ClientError>;

    /// `GET /geocode?q=`
    async fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>, ClientError>;

    /// `GET /geocode/reverse?lat=&lon=`, returning the display name if any.
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<String>, ClientError>;

    /// `GET /quests/today`
    async fn quest_of_the_day(&self) -> Result<Option<Quest>, ClientError>;
}

/// [`OnboardingApi`] over HTTP.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Gateway,
    identity: Arc<IdentityContext>,
    quest_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.gateway.api_root())
            .field("quest_timeout", &self.quest_timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, identity: Arc<IdentityContext>) -> Result<Self, ClientError> {
        Ok(Self::with_gateway(
            Gateway::new(config)?,
            identity,
            config.quest_timeout,
        ))
    }

    /// Create a client around an existing gateway.
    #[must_use]
    pub const fn with_gateway(
        gateway: Gateway,
        identity: Arc<IdentityContext>,
        quest_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            identity,
            quest_timeout,
        }
    }

    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// The identity to send, or a validation error when none is set.
    ///
    /// This is what keeps requests from going out without an identity.
    fn require_identity(&self) -> Result<Identity, ClientError> {
        self.identity
            .get()
            .ok_or(ClientError::Validation(ValidationError::NoIdentity))
    }

    fn options(&self, base: CallOptions) -> Result<CallOptions, ClientError> {
        Ok(base.identity(Some(self.require_identity()?)))
    }
}

#[async_trait]
impl OnboardingApi for ApiClient {
    #[instrument(skip(self))]
    async fn profile(&self) -> Result<Profile, ClientError> {
        let options = self.options(CallOptions::get())?;
        Ok(self.gateway.call_json("/me", options).await?)
    }

    #[instrument(skip(self))]
    async fn onboarding_status(&self) -> Result<OnboardingStatus, ClientError> {
        let options = self.options(CallOptions::get())?;
        Ok(self
            .gateway
            .call_json("/me/onboarding/status", options)
            .await?)
    }

    #[instrument(skip(self), fields(step = %step))]
    async fn complete_step(&self, step: &StepId) -> Result<(), ClientError> {
        #[derive(serde::Serialize)]
        struct CompleteStep<'a> {
            step: &'a StepId,
        }

        let options = self.options(CallOptions::post().json(&CompleteStep { step })?)?;
        self.gateway
            .call("/me/onboarding/complete-step", options)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, update), fields(source = %update.source))]
    async fn save_location(&self, update: &LocationUpdate) -> Result<(), ClientError> {
        let options = self.options(CallOptions::post().json(update)?)?;
        self.gateway.call("/me/location", options).await?;
        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update_preferences(&self, update: &PreferencesUpdate) -> Result<(), ClientError> {
        let options = self.options(CallOptions::patch().json(update)?)?;
        self.gateway.call("/me/preferences", options).await?;
        Ok(())
    }

    #[instrument(skip(self, subscription))]
    async fn register_notifications(
        &self,
        subscription: &PushSubscription,
    ) -> Result<(), ClientError> {
        let options = self.options(CallOptions::post().json(subscription)?)?;
        self.gateway
            .call("/me/notifications/register", options)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_notifications(&self) -> Result<(), ClientError> {
        let options = self.options(CallOptions::delete())?;
        self.gateway
            .call("/me/notifications/register", options)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>, ClientError> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", query)
            .finish();
        let options = self.options(CallOptions::get())?;
        let response: Option<SearchResponse> = self
            .gateway
            .call_json(&format!("/geocode?{query}"), options)
            .await?;
        Ok(response.unwrap_or_default().locations)
    }

    #[instrument(skip(self))]
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<String>, ClientError> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .finish();
        let options = self.options(CallOptions::get())?;
        let response: Option<ReverseGeocodeResponse> = self
            .gateway
            .call_json(&format!("/geocode/reverse?{query}"), options)
            .await?;
        Ok(response
            .as_ref()
            .and_then(ReverseGeocodeResponse::display_name)
            .map(str::to_string))
    }

    #[instrument(skip(self))]
    async fn quest_of_the_day(&self) -> Result<Option<Quest>, ClientError> {
        let options = self.options(CallOptions::get().timeout(self.quest_timeout))?;
        let response: Option<QuestResponse> = self
            .gateway
            .call_json("/quests/today", options)
            .await?;
        Ok(response.and_then(|response| response.quest))
    }
}
