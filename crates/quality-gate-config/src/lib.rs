// crates/quality-gate-config/src/lib.rs
// ============================================================================
// Module: Quality Gate Configuration
// Description: Deployment configuration loading and strict validation.
// Purpose: Reject misconfiguration at startup, before any engine is built.
// Dependencies: quality-gate-core, quality-gate-runner, quality-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Engine configuration is TOML with `deny_unknown_fields` on every section:
//! an unrecognized key fails the load rather than being silently ignored.
//! Defaults follow the deployment contract (300 s review timer, 30 s
//! fast-approval threshold, 10 rewrite cycles, 5 review cycles, 120 s
//! rewriter deadline). Validation happens once at startup; the engines
//! receive already-checked limit structs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::EngineConfig;
pub use config::RunnerSection;
