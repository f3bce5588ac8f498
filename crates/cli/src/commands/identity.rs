//! Debug identity commands.
//!
//! The identity is persisted to `SIDEQUEST_IDENTITY_FILE` and sent as the
//! `X-Debug-User` header on every request.

use sidequest_core::Identity;

use super::{Context, emit};

pub fn show(ctx: &Context) {
    match ctx.identity.get() {
        Some(identity) => emit(identity),
        None => emit("No identity set."),
    }
}

pub fn set(ctx: &Context, name: &str) {
    match ctx.identity.set(name) {
        Some(identity) => emit(format_args!("Identity set to {identity}.")),
        None => emit("Identity cleared."),
    }
    tracing::debug!(
        identity = ctx.identity.get().as_ref().map(Identity::as_str),
        file = %ctx.config.identity_file.display(),
        "Identity persisted"
    );
}

pub fn clear(ctx: &Context) {
    ctx.identity.clear();
    emit("Identity cleared.");
}
