//! Onboarding status and the preference, notification and completion cards.

use sidequest_core::{
    OnboardingStatus, PreferredTime, Privacy, QuestCategory, SpendLevel, StepId,
};

use super::{CliError, Context, emit, emit_badges, report};

/// Preference fields given on the command line. `None` keeps the saved value.
#[derive(Debug, Default)]
pub struct PreferenceChanges {
    pub categories: Option<Vec<String>>,
    pub preferred_time: Option<PreferredTime>,
    pub spend_level: Option<SpendLevel>,
    pub privacy: Option<Privacy>,
}

/// Print progress badges plus the current and next step.
///
/// # Errors
///
/// Returns error if no identity is set or the status fails to load.
pub async fn status(ctx: &Context) -> Result<(), CliError> {
    let page = ctx.page().await?;
    let view = page.view();
    if let Some(identity) = &view.identity {
        emit(format_args!("Onboarding for {identity}"));
    }
    emit_badges(&page);
    if let Some(status) = &view.status {
        emit_progress(status);
    }
    Ok(())
}

/// Print the welcome panel for a fresh user, then what is left to do.
///
/// # Errors
///
/// Returns error if no identity is set or the status fails to load.
pub async fn onboard(ctx: &Context) -> Result<(), CliError> {
    let page = ctx.page().await?;
    let view = page.view();

    if view.show_welcome {
        emit("Welcome to SideQuest!");
        emit("Set a home base, tell us what you like and turn on reminders.");
        emit("Start with your location: sq-cli location search <place>");
        emit("");
    }

    emit_badges(&page);
    let Some(status) = view.status else {
        return Ok(());
    };
    if status.completed {
        emit("You're all set. Try `sq-cli quest` for today's quest.");
        return Ok(());
    }
    for step in status.outstanding() {
        emit(format_args!("  {:<24} {}", step.label, command_for(&step.id)));
    }
    Ok(())
}

/// Apply `changes` to the saved preferences and save them.
///
/// # Errors
///
/// Returns error on unknown categories, a missing identity, or a failed save.
pub async fn preferences(ctx: &Context, changes: PreferenceChanges) -> Result<(), CliError> {
    if let Some(unknown) = changes
        .categories
        .iter()
        .flatten()
        .find(|id| QuestCategory::find(id).is_none())
    {
        let offered: Vec<_> = QuestCategory::ALL.iter().map(|c| c.id).collect();
        return Err(CliError::InvalidArgument(format!(
            "unknown category {unknown:?}, expected one of {}",
            offered.join(", ")
        )));
    }

    let page = ctx.page().await?;
    let card = page.preferences();

    if let Some(wanted) = &changes.categories {
        let current = card.snapshot().draft.categories;
        let toggles = current
            .iter()
            .filter(|id| !wanted.contains(*id))
            .chain(wanted.iter().filter(|id| !current.contains(*id)));
        for id in toggles {
            card.toggle_category(id);
        }
    }
    if let Some(preferred_time) = changes.preferred_time {
        card.set_preferred_time(preferred_time);
    }
    if let Some(spend_level) = changes.spend_level {
        card.set_spend_level(spend_level);
    }
    if let Some(privacy) = changes.privacy {
        card.set_privacy(privacy);
    }

    let outcome = card.save().await;
    report(outcome, card.snapshot().feedback)?;
    emit_badges(&page);
    Ok(())
}

/// Register a simulated push subscription.
///
/// # Errors
///
/// Returns error if no identity is set or registration fails.
pub async fn register_notifications(ctx: &Context) -> Result<(), CliError> {
    let page = ctx.page().await?;
    let card = page.notifications();
    let outcome = card.register().await;
    report(outcome, card.snapshot().feedback)?;
    emit(card.status_text());
    Ok(())
}

/// Remove the push subscription.
///
/// # Errors
///
/// Returns error if no identity is set or removal fails.
pub async fn clear_notifications(ctx: &Context) -> Result<(), CliError> {
    let page = ctx.page().await?;
    let card = page.notifications();
    let outcome = card.clear().await;
    report(outcome, card.snapshot().feedback)?;
    emit(card.status_text());
    Ok(())
}

/// Mark onboarding complete.
///
/// # Errors
///
/// Returns error if no identity is set or the step fails.
pub async fn complete(ctx: &Context) -> Result<(), CliError> {
    let page = ctx.page().await?;
    let card = page.completion();
    if card.completed() {
        emit(card.button_label());
        return Ok(());
    }
    let outcome = card.finish().await;
    report(outcome, card.snapshot().feedback)?;
    emit_badges(&page);
    Ok(())
}

fn emit_progress(status: &OnboardingStatus) {
    if status.completed {
        emit("Onboarding complete.");
        return;
    }
    if let Some(current) = &status.current_step {
        emit(format_args!("Current step: {current}"));
    }
    if let Some(next) = &status.next_step {
        emit(format_args!("Next step: {next}"));
    }
}

fn command_for(step: &StepId) -> &'static str {
    match step {
        StepId::Location => "sq-cli location search <place>",
        StepId::Preferences => "sq-cli preferences --categories <ids>",
        StepId::Notifications => "sq-cli notifications register",
        StepId::Complete => "sq-cli complete",
        StepId::Other(_) => "",
    }
}
