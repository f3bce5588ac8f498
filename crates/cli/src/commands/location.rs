//! Location step commands.

use std::sync::Arc;

use sidequest_client::steps::location::validate_radius;
use sidequest_client::{FixedGeolocation, Position};

use super::{CliError, Context, emit, emit_badges, report};

/// Search for `query`, list the matches and save the `pick`th one if given.
///
/// # Errors
///
/// Returns error if the radius is out of range, the search fails or the
/// pick cannot be saved.
pub async fn search(
    ctx: &Context,
    query: &str,
    radius_km: Option<f64>,
    pick: Option<usize>,
) -> Result<(), CliError> {
    if let Some(radius_km) = radius_km {
        validate_radius(radius_km).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    }

    let page = ctx.page().await?;
    let card = page.location();
    card.set_query(query);
    if let Some(radius_km) = radius_km {
        card.set_radius(radius_km);
    }

    let outcome = card.search().await;
    let state = card.snapshot();
    for (index, candidate) in state.results.iter().enumerate() {
        emit(format_args!(
            "{:>2}. {} ({:.4}, {:.4})",
            index + 1,
            candidate.display_name.as_deref().unwrap_or(query),
            candidate.lat,
            candidate.lon
        ));
    }
    report(outcome, state.feedback)?;

    let Some(pick) = pick else {
        return Ok(());
    };
    let index = pick
        .checked_sub(1)
        .ok_or_else(|| CliError::InvalidArgument("--pick starts at 1".to_string()))?;
    let outcome = card.select(index).await;
    report(outcome, card.snapshot().feedback)?;
    emit_badges(&page);
    Ok(())
}

/// Save the given coordinates as if a device had reported them.
///
/// # Errors
///
/// Returns error if the radius is out of range or the save fails.
pub async fn here(
    ctx: &Context,
    lat: f64,
    lon: f64,
    accuracy_m: Option<f64>,
    radius_km: Option<f64>,
) -> Result<(), CliError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CliError::InvalidArgument(format!(
            "coordinates out of range: {lat}, {lon}"
        )));
    }

    let geolocation = Arc::new(FixedGeolocation::new(Position::new(lat, lon, accuracy_m)));
    let page = ctx.load_page(geolocation).await?;
    let card = page.location();
    if let Some(radius_km) = radius_km {
        card.set_radius(radius_km);
    }

    let outcome = card.use_current_location().await;
    report(outcome, card.snapshot().feedback)?;
    if let Some(saved) = card.saved_location() {
        emit(format_args!("Home base: {}", saved.label()));
    }
    emit_badges(&page);
    Ok(())
}
