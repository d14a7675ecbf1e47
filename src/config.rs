//! Execution settings for a `Driver`.
use serde::{Deserialize, Serialize};

/// How a driver schedules the steps of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Run independent steps concurrently on a worker pool.
    pub parallel: bool,
    /// Size of the worker pool. `None` or `Some(0)` lets rayon decide.
    pub max_workers: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { parallel: true, max_workers: None }
    }
}

impl ExecutionConfig {
    /// Strictly sequential execution on the calling thread.
    pub fn sequential() -> Self {
        Self { parallel: false, max_workers: None }
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub(crate) fn worker_count(&self) -> Option<usize> {
        self.max_workers.filter(|&n| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("{}", ExecutionConfig::default())]
    #[case(r#"{"parallel": false}"#, ExecutionConfig::sequential())]
    #[case(r#"{"max_workers": 4}"#, ExecutionConfig { parallel: true, max_workers: Some(4) })]
    fn test_parse(#[case] input: &str, #[case] expected: ExecutionConfig) {
        assert_eq!(ExecutionConfig::from_json_str(input).unwrap(), expected);
    }

    #[test]
    fn test_zero_workers_means_default() {
        let config = ExecutionConfig { parallel: true, max_workers: Some(0) };
        assert_eq!(config.worker_count(), None);
    }

    #[test]
    fn test_rejects_unknown_types() {
        assert!(ExecutionConfig::from_json_str(r#"{"parallel": "yes"}"#).is_err());
    }
}
