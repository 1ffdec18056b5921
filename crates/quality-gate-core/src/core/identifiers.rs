// crates/quality-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Quality Gate Identifiers
// Description: Canonical opaque identifiers for content, runs, and audits.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout the Quality
//! Gate engine. Numeric identifiers are opaque, non-zero, and 1-based; they
//! map directly onto storage row identifiers. String identifiers are opaque
//! UTF-8 values with no normalization applied by the type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Numeric Identifier Types
// ============================================================================

/// Declares a non-zero numeric identifier wrapper with stable wire form.
macro_rules! numeric_identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// # Invariants
        /// - Always >= 1 (non-zero, 1-based, storage row aligned).
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Creates a new identifier from a non-zero value.
            #[must_use]
            pub const fn new(id: NonZeroU64) -> Self {
                Self(id)
            }

            /// Creates an identifier from a raw value (returns `None` if zero).
            #[must_use]
            pub fn from_raw(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map(Self)
            }

            /// Returns the raw identifier value (always >= 1).
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.get().fmt(f)
            }
        }
    };
}

numeric_identifier!(
    /// Actor identifier for principals in the actor registry.
    ActorId
);

numeric_identifier!(
    /// Blog identifier naming a stable content identity.
    BlogId
);

numeric_identifier!(
    /// Version identifier naming one immutable content snapshot.
    VersionId
);

numeric_identifier!(
    /// Evaluation run identifier grouping scorer outputs for one version.
    RunId
);

numeric_identifier!(
    /// Rewrite cycle identifier naming one orchestrated rewrite attempt.
    CycleId
);

numeric_identifier!(
    /// Approval identifier naming one write-once approval (or revocation) row.
    ApprovalId
);

numeric_identifier!(
    /// Escalation identifier naming one automation hard-stop record.
    EscalationId
);

// ============================================================================
// SECTION: String Identifier Types
// ============================================================================

/// Optional project grouping key attached to blogs.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Creates a new project identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Scorer identifier used by the registry and detector rows.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScorerId(String);

impl ScorerId {
    /// Creates a new scorer identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScorerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ScorerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ScorerId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
