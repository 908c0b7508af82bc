//! Planner configuration.

/// Configuration flags consulted during planning.
///
/// Each flag is read once per planning decision; the config itself is
/// immutable once handed to the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Whether `INSERT INTO ... VALUES` statements are accepted
    pub insert_values_enabled: bool,
    /// Pre-migration key-field semantics: repartition on every GROUP BY and
    /// drop key-field renames through projections
    pub legacy_key_field_semantics: bool,
    /// Encode session-windowed aggregate keys with the pre-migration
    /// (tumbling, max-duration) window info
    pub windowed_session_key_legacy: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            insert_values_enabled: true,
            legacy_key_field_semantics: false,
            windowed_session_key_legacy: false,
        }
    }
}

impl PlannerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable `INSERT INTO ... VALUES`.
    pub fn with_insert_values_enabled(mut self, enabled: bool) -> Self {
        self.insert_values_enabled = enabled;
        self
    }

    /// Use legacy key-field semantics.
    pub fn with_legacy_key_field_semantics(mut self, legacy: bool) -> Self {
        self.legacy_key_field_semantics = legacy;
        self
    }

    /// Use the legacy session-window key encoding.
    pub fn with_windowed_session_key_legacy(mut self, legacy: bool) -> Self {
        self.windowed_session_key_legacy = legacy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert!(config.insert_values_enabled);
        assert!(!config.legacy_key_field_semantics);
        assert!(!config.windowed_session_key_legacy);
    }

    #[test]
    fn test_builders() {
        let config = PlannerConfig::new()
            .with_insert_values_enabled(false)
            .with_legacy_key_field_semantics(true);
        assert!(!config.insert_values_enabled);
        assert!(config.legacy_key_field_semantics);
    }
}
