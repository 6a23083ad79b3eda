// crates/action-dispatch-config/src/lib.rs
// ============================================================================
// Module: Action Dispatch Config Library
// Description: Canonical config model and validation for action dispatch.
// Purpose: Single source of truth for action-dispatch.toml semantics.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! `action-dispatch-config` defines the canonical configuration model for the
//! action dispatch layer: the process-wide debug switch, the parameter hint
//! policy, and the audit sink selection. Parsing is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
