//! Notebook settings.

/// Tunables of a [`Notebook`](crate::Notebook).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookConfig {
    /// Maximum number of undo units kept; the oldest are dropped beyond it.
    pub max_undo: usize,
    /// Maximum number of characters merged into one coalesced undo unit.
    pub max_coalesce: usize,
    /// Suffix of the temporary file written next to the target during a save.
    pub temp_suffix: String,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            max_undo: 1000,
            max_coalesce: 64,
            temp_suffix: ".tmp".to_string(),
        }
    }
}

impl NotebookConfig {
    /// Set [`max_undo`](Self::max_undo).
    pub fn with_max_undo(mut self, max_undo: usize) -> Self {
        self.max_undo = max_undo.max(1);
        self
    }

    /// Set [`max_coalesce`](Self::max_coalesce).
    pub fn with_max_coalesce(mut self, max_coalesce: usize) -> Self {
        self.max_coalesce = max_coalesce.max(1);
        self
    }

    /// Set [`temp_suffix`](Self::temp_suffix).
    pub fn with_temp_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.temp_suffix = suffix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_clamps_limits() {
        let config = NotebookConfig::default()
            .with_max_undo(0)
            .with_max_coalesce(0)
            .with_temp_suffix(".swp");
        assert_eq!(config.max_undo, 1);
        assert_eq!(config.max_coalesce, 1);
        assert_eq!(config.temp_suffix, ".swp");
    }
}
