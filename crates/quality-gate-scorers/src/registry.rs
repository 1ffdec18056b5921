// crates/quality-gate-scorers/src/registry.rs
// ============================================================================
// Module: Scorer Registry
// Description: Insertion-ordered registry of scorer factories.
// Purpose: Enumerate configured scorers deterministically, with no execution.
// Dependencies: quality-gate-core
// ============================================================================

//! ## Overview
//! The registry is organizational only: it stores scorer factories and hands
//! back instances in configured order. Iteration order is insertion order
//! (entries live in a vector, never a map or set), so two processes with the
//! same registration sequence enumerate identically. The registry performs
//! no I/O and reads no environment state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use quality_gate_core::Clock;
use quality_gate_core::ScorerId;
use quality_gate_core::ScorerMetadata;
use quality_gate_core::interfaces::Scorer;
use thiserror::Error;

use crate::aeo::AeoScorer;
use crate::ai_likeness::AiLikenessScorer;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Identifier is already registered.
    #[error("scorer already registered: {0}")]
    Conflict(ScorerId),
    /// Configuration names an identifier that is not registered.
    #[error("unknown scorer: {0}")]
    Unknown(ScorerId),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Factory constructing one scorer instance.
pub type ScorerFactory = Box<dyn Fn() -> Arc<dyn Scorer> + Send + Sync>;

/// Insertion-ordered scorer registry.
///
/// # Invariants
/// - Identifiers are unique; enumeration follows insertion order.
/// - Written only at process startup; engines receive instantiated scorers.
#[derive(Default)]
pub struct ScorerRegistry {
    /// Registered factories in insertion order.
    entries: Vec<(ScorerId, ScorerFactory)>,
}

impl ScorerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in scorers registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] when a built-in id is duplicated,
    /// which cannot happen from this constructor.
    pub fn with_builtin_scorers(clock: Arc<dyn Clock>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        let ai_clock = Arc::clone(&clock);
        registry.register(
            ScorerId::new(quality_gate_core::core::evaluation::AI_LIKENESS_PROVIDER),
            Box::new(move || Arc::new(AiLikenessScorer::new(Arc::clone(&ai_clock)))),
        )?;
        registry.register(
            ScorerId::new(crate::aeo::AEO_SCORER_ID),
            Box::new(|| Arc::new(AeoScorer)),
        )?;
        Ok(registry)
    }

    /// Registers a factory under an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] when the identifier exists.
    pub fn register(&mut self, id: ScorerId, factory: ScorerFactory) -> Result<(), RegistryError> {
        if self.is_registered(&id) {
            return Err(RegistryError::Conflict(id));
        }
        self.entries.push((id, factory));
        Ok(())
    }

    /// Removes a registration; returns true when it existed.
    pub fn unregister(&mut self, id: &ScorerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| entry_id != id);
        self.entries.len() != before
    }

    /// Returns true when the identifier is registered.
    #[must_use]
    pub fn is_registered(&self, id: &ScorerId) -> bool {
        self.entries.iter().any(|(entry_id, _)| entry_id == id)
    }

    /// Lists registered identifiers in insertion order.
    #[must_use]
    pub fn list_registered(&self) -> Vec<ScorerId> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Returns the factory for an identifier.
    #[must_use]
    pub fn get_factory(&self, id: &ScorerId) -> Option<&ScorerFactory> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, factory)| factory)
    }

    /// Returns metadata for an identifier by instantiating its scorer.
    #[must_use]
    pub fn get_metadata(&self, id: &ScorerId) -> Option<ScorerMetadata> {
        self.get_factory(id).map(|factory| factory().metadata())
    }

    /// Instantiates the scorers named by the configuration, in its order.
    ///
    /// An absent configuration yields an empty list; there are no hidden
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unknown`] for each unconfigurable id (the
    /// first one encountered).
    pub fn active(
        &self,
        enabled: Option<&[ScorerId]>,
    ) -> Result<Vec<Arc<dyn Scorer>>, RegistryError> {
        let Some(enabled) = enabled else {
            return Ok(Vec::new());
        };
        let mut scorers = Vec::with_capacity(enabled.len());
        for id in enabled {
            let factory =
                self.get_factory(id).ok_or_else(|| RegistryError::Unknown(id.clone()))?;
            scorers.push(factory());
        }
        Ok(scorers)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::sync::Arc;

    use quality_gate_core::ScorerId;
    use quality_gate_core::SystemClock;

    use super::RegistryError;
    use super::ScorerRegistry;
    use crate::aeo::AeoScorer;

    #[test]
    fn duplicate_registration_conflicts() {
        let mut registry = ScorerRegistry::new();
        registry
            .register(ScorerId::new("aeo"), Box::new(|| Arc::new(AeoScorer)))
            .unwrap();
        let error = registry
            .register(ScorerId::new("aeo"), Box::new(|| Arc::new(AeoScorer)))
            .unwrap_err();
        assert_eq!(error, RegistryError::Conflict(ScorerId::new("aeo")));
    }

    #[test]
    fn enumeration_follows_insertion_order() {
        let registry = ScorerRegistry::with_builtin_scorers(Arc::new(SystemClock)).unwrap();
        let ids = registry.list_registered();
        assert_eq!(ids, vec![ScorerId::new("ai_likeness"), ScorerId::new("aeo")]);
    }

    #[test]
    fn absent_config_activates_nothing() {
        let registry = ScorerRegistry::with_builtin_scorers(Arc::new(SystemClock)).unwrap();
        assert!(registry.active(None).unwrap().is_empty());
    }

    #[test]
    fn explicit_config_preserves_order_and_rejects_unknown_ids() {
        let registry = ScorerRegistry::with_builtin_scorers(Arc::new(SystemClock)).unwrap();
        let order = [ScorerId::new("aeo"), ScorerId::new("ai_likeness")];
        let active = registry.active(Some(order.as_slice())).unwrap();
        assert_eq!(active[0].id(), ScorerId::new("aeo"));
        assert_eq!(active[1].id(), ScorerId::new("ai_likeness"));

        let unknown = [ScorerId::new("missing")];
        let error = match registry.active(Some(unknown.as_slice())) {
            Err(error) => error,
            Ok(_) => panic!("expected RegistryError::Unknown"),
        };
        assert_eq!(error, RegistryError::Unknown(ScorerId::new("missing")));
    }

    #[test]
    fn unregister_removes_the_entry() {
        let mut registry = ScorerRegistry::with_builtin_scorers(Arc::new(SystemClock)).unwrap();
        assert!(registry.unregister(&ScorerId::new("aeo")));
        assert!(!registry.is_registered(&ScorerId::new("aeo")));
        assert!(!registry.unregister(&ScorerId::new("aeo")));
    }

    #[test]
    fn metadata_reports_rubric_versions() {
        let registry = ScorerRegistry::with_builtin_scorers(Arc::new(SystemClock)).unwrap();
        let metadata = registry.get_metadata(&ScorerId::new("aeo")).unwrap();
        assert_eq!(metadata.version, "1.0.0");
        let metadata = registry.get_metadata(&ScorerId::new("ai_likeness")).unwrap();
        assert_eq!(metadata.version, "rubric_v1.0.0");
    }
}
