//! Command implementations.
//!
//! Every command builds its own [`Context`] from the environment, loads what
//! it needs through the client crate and prints a plain-text report.

pub mod dashboard;
pub mod identity;
pub mod location;
pub mod onboarding;

use std::fmt::Display;
use std::sync::Arc;

use sidequest_client::{
    ActionOutcome, ApiClient, ClientConfig, ClientError, ConfigError, FileIdentityStore,
    Feedback, GeolocationProvider, IdentityContext, OnboardingPage, RefreshOutcome,
    UnsupportedGeolocation,
};
use thiserror::Error;

/// Errors that end a command with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),

    /// No identity is set, so nothing can be loaded.
    #[error("No debug identity set. Run `sq-cli identity set <name>` first.")]
    NoIdentity,

    /// A card action failed; carries the card's feedback.
    #[error("{0}")]
    Action(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Configuration, identity and API client shared by the commands.
pub struct Context {
    pub config: ClientConfig,
    pub identity: Arc<IdentityContext>,
    pub api: Arc<ApiClient>,
}

impl Context {
    /// Load configuration and the persisted identity.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid or the HTTP client fails to
    /// build.
    pub fn from_env() -> Result<Self, CliError> {
        let config = ClientConfig::from_env()?;
        let store = FileIdentityStore::new(config.identity_file.clone());
        let identity = Arc::new(IdentityContext::load(store));
        let api = Arc::new(ApiClient::new(&config, identity.clone())?);

        Ok(Self {
            config,
            identity,
            api,
        })
    }

    /// Build the onboarding page and load the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CliError::NoIdentity` when no identity is set, or the
    /// translated load failure.
    pub async fn load_page(
        &self,
        geolocation: Arc<dyn GeolocationProvider>,
    ) -> Result<OnboardingPage, CliError> {
        if self.identity.get().is_none() {
            return Err(CliError::NoIdentity);
        }

        let page = OnboardingPage::new(
            self.api.clone(),
            self.identity.clone(),
            geolocation,
            self.config.default_radius_km,
        );
        if page.refresh().await == RefreshOutcome::Failed {
            let message = page.view().error.unwrap_or_default();
            return Err(CliError::Action(message));
        }

        let profile = page.resolver().snapshot().profile;
        page.preferences().sync_from_profile(profile.as_ref());
        if let Some(radius_km) = profile
            .and_then(|profile| profile.location)
            .and_then(|location| location.radius_km)
        {
            page.location().set_radius(radius_km);
        }
        Ok(page)
    }

    /// [`load_page`](Self::load_page) without a positioning device.
    ///
    /// # Errors
    ///
    /// Same as [`load_page`](Self::load_page).
    pub async fn page(&self) -> Result<OnboardingPage, CliError> {
        self.load_page(Arc::new(UnsupportedGeolocation)).await
    }
}

/// Print one line of command output.
#[allow(clippy::print_stdout)]
pub fn emit(line: impl Display) {
    println!("{line}");
}

/// Print a card's feedback and turn a failed action into an error.
///
/// # Errors
///
/// Returns `CliError::Action` when the action failed.
pub fn report(outcome: ActionOutcome, feedback: Option<Feedback>) -> Result<(), CliError> {
    match outcome {
        ActionOutcome::Failed => Err(CliError::Action(
            feedback.map_or_else(|| "Action failed".to_string(), |f| f.message),
        )),
        ActionOutcome::Disabled => {
            emit(feedback.map_or_else(|| "Nothing to do.".to_string(), |f| f.message));
            Ok(())
        }
        ActionOutcome::Succeeded | ActionOutcome::Detached => {
            if let Some(feedback) = feedback {
                emit(feedback);
            }
            Ok(())
        }
    }
}

/// Print the progress badges of a loaded page.
pub fn emit_badges(page: &OnboardingPage) {
    for badge in page.view().badges {
        emit(format_args!("  {badge}"));
    }
}
