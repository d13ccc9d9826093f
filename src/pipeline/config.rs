use serde::{Deserialize, Serialize};

/// Configuration for a [`PipelineRunner`](super::PipelineRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// How deep pipelines may nest through `append` and `join`.
    pub max_nesting_depth: usize,
    /// Whether to log the shape of the table after every step.
    pub log_tables: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            max_nesting_depth: 16,
            log_tables: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RunnerConfig = serde_json::from_str(r#"{"max_nesting_depth": 2}"#).unwrap();
        assert_eq!(config.max_nesting_depth, 2);
        assert!(config.log_tables);
    }
}
