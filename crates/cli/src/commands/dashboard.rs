//! Dashboard commands: profile summary and today's quest.

use sidequest_client::{Dashboard, DashboardData};
use sidequest_core::Quest;

use super::{CliError, Context, emit};

async fn load(ctx: &Context) -> Result<DashboardData, CliError> {
    if ctx.identity.get().is_none() {
        return Err(CliError::NoIdentity);
    }
    let dashboard = Dashboard::new(ctx.api.clone(), ctx.identity.clone());
    let loaded = dashboard.sync().await;
    let view = dashboard.view();
    match loaded {
        Some(Ok(data)) => Ok(data),
        _ => Err(CliError::Action(view.error.unwrap_or_default())),
    }
}

/// Print the profile summary rows.
///
/// # Errors
///
/// Returns error if no identity is set or the dashboard fails to load.
pub async fn profile(ctx: &Context) -> Result<(), CliError> {
    let data = load(ctx).await?;
    let summary = sidequest_client::ProfileSummary::new(&data.profile);
    let width = summary
        .rows
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    for (label, value) in &summary.rows {
        emit(format_args!("{label:<width$}  {value}"));
    }
    Ok(())
}

/// Print today's quest, or a note when none is available.
///
/// # Errors
///
/// Returns error if no identity is set or the dashboard fails to load.
pub async fn quest(ctx: &Context) -> Result<(), CliError> {
    match load(ctx).await?.quest {
        Some(quest) => emit_quest(&quest),
        None => emit("No quest available today."),
    }
    Ok(())
}

fn emit_quest(quest: &Quest) {
    emit(&quest.title);
    if let Some(date) = quest.date {
        emit(format_args!("  Date: {date}"));
    }
    let difficulty = quest
        .difficulty
        .map_or_else(|| "?".to_string(), |d| d.to_string());
    emit(format_args!("  Difficulty {difficulty}/5 · {}", quest.rarity));
    if !quest.description.is_empty() {
        emit(format_args!("  {}", quest.description));
    }
    if let Some(zone) = &quest.location {
        emit(format_args!("  Where: {}", zone.summary()));
    }
    for hint in &quest.hints {
        emit(format_args!("  - {hint}"));
    }
}
