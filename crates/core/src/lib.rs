//! SideQuest Core - Shared types library.
//!
//! This crate provides the data model shared by every SideQuest component:
//! - `client` - Onboarding orchestration engine and API gateway
//! - `cli` - Command-line driver for the onboarding flows
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no async runtime. Everything here mirrors the wire format of the
//! remote quest service, which owns all of this state.
//!
//! # Modules
//!
//! - [`types`] - Identity, profile, onboarding status, quest and location types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
