//! SideQuest CLI - Drive the onboarding flows against a quest service.
//!
//! # Usage
//!
//! ```bash
//! # Pick the debug user every request is sent as
//! sq-cli identity set walker
//!
//! # See where onboarding stands
//! sq-cli onboard
//!
//! # Save a home base from a search result
//! sq-cli location search "Portland" --radius 5 --pick 1
//!
//! # Or from coordinates, as a device fix would report them
//! sq-cli location here --lat 45.52 --lon -122.68 --accuracy 25
//!
//! # Tell us what you like
//! sq-cli preferences --categories outdoor,art --time evening
//!
//! # Preview the daily quest
//! sq-cli quest
//! ```
//!
//! # Commands
//!
//! - `identity` - Show, set or clear the debug identity
//! - `status` / `onboard` - Onboarding progress, with the welcome panel
//! - `profile` / `quest` - Dashboard data
//! - `location`, `preferences`, `notifications`, `complete` - The step cards

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sidequest_core::{Privacy, PreferredTime, SpendLevel};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "sq-cli")]
#[command(author, version, about = "SideQuest onboarding CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the debug identity
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Show onboarding progress
    Status,
    /// Show the welcome panel and what to do next
    Onboard,
    /// Show the profile summary
    Profile,
    /// Show today's quest
    Quest,
    /// Set the home base
    Location {
        #[command(subcommand)]
        action: LocationAction,
    },
    /// Update quest preferences and privacy
    Preferences {
        /// Comma-separated category ids (art, outdoor, social, mindful)
        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<String>>,

        /// Preferred time (any, morning, afternoon, evening)
        #[arg(long)]
        time: Option<PreferredTime>,

        /// Spend level (free, under-20, splurge)
        #[arg(long)]
        spend: Option<SpendLevel>,

        /// Privacy mode (public, `friends_only`)
        #[arg(long)]
        privacy: Option<Privacy>,
    },
    /// Manage the push subscription
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },
    /// Mark onboarding complete
    Complete,
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Print the current identity
    Show,
    /// Set the identity (a blank value clears it)
    Set {
        /// Debug username
        name: String,
    },
    /// Clear the identity
    Clear,
}

#[derive(Subcommand)]
enum LocationAction {
    /// Search for a place and optionally save one of the matches
    Search {
        /// Place to look up
        query: String,

        /// Quest radius in kilometers (1-30)
        #[arg(short, long)]
        radius: Option<f64>,

        /// Save the Nth match (1-based)
        #[arg(short, long)]
        pick: Option<usize>,
    },
    /// Save the given coordinates as the current position
    Here {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Fix accuracy in meters
        #[arg(long)]
        accuracy: Option<f64>,

        /// Quest radius in kilometers (1-30)
        #[arg(short, long)]
        radius: Option<f64>,
    },
}

#[derive(Subcommand)]
enum NotificationsAction {
    /// Register a simulated push subscription
    Register,
    /// Remove the push subscription
    Clear,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sidequest_client=info,sq_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::from_env()?;

    match cli.command {
        Commands::Identity { action } => match action {
            IdentityAction::Show => commands::identity::show(&ctx),
            IdentityAction::Set { name } => commands::identity::set(&ctx, &name),
            IdentityAction::Clear => commands::identity::clear(&ctx),
        },
        Commands::Status => commands::onboarding::status(&ctx).await?,
        Commands::Onboard => commands::onboarding::onboard(&ctx).await?,
        Commands::Profile => commands::dashboard::profile(&ctx).await?,
        Commands::Quest => commands::dashboard::quest(&ctx).await?,
        Commands::Location { action } => match action {
            LocationAction::Search {
                query,
                radius,
                pick,
            } => commands::location::search(&ctx, &query, radius, pick).await?,
            LocationAction::Here {
                lat,
                lon,
                accuracy,
                radius,
            } => commands::location::here(&ctx, lat, lon, accuracy, radius).await?,
        },
        Commands::Preferences {
            categories,
            time,
            spend,
            privacy,
        } => {
            let changes = commands::onboarding::PreferenceChanges {
                categories,
                preferred_time: time,
                spend_level: spend,
                privacy,
            };
            commands::onboarding::preferences(&ctx, changes).await?;
        }
        Commands::Notifications { action } => match action {
            NotificationsAction::Register => commands::onboarding::register_notifications(&ctx).await?,
            NotificationsAction::Clear => commands::onboarding::clear_notifications(&ctx).await?,
        },
        Commands::Complete => commands::onboarding::complete(&ctx).await?,
    }
    Ok(())
}
