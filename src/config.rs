use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::Language;

pub const DEFAULT_THRESHOLD: u32 = 50;

/// Subject columns used when no config file is given.
pub const DEFAULT_SUBJECTS: [&str; 5] = ["عربي", "إنجليزي", "رياضيات", "علوم", "دراسات"];

/// Minimum passing score per subject.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PassingThresholds {
    pub default: u32,
    pub subjects: HashMap<String, u32>,
}

impl Default for PassingThresholds {
    fn default() -> Self {
        Self {
            default: DEFAULT_THRESHOLD,
            subjects: HashMap::new(),
        }
    }
}

impl PassingThresholds {
    pub fn for_subject(&self, subject: &str) -> u32 {
        self.subjects.get(subject).copied().unwrap_or(self.default)
    }
}

/// Everything the grading commands need: column order, thresholds and the
/// language of the display grade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub subjects: Vec<String>,
    pub thresholds: PassingThresholds,
    pub language: Language,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            subjects: DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect(),
            thresholds: PassingThresholds::default(),
            language: Language::default(),
        }
    }
}

impl GradingConfig {
    /// Reads a JSON config, or returns the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut config: GradingConfig = serde_json::from_str(raw)?;
        for subject in config.subjects.iter_mut() {
            *subject = subject.trim().to_string();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subjects.is_empty() {
            return Err(ConfigError::NoSubjects);
        }

        let mut seen = HashSet::new();
        for subject in &self.subjects {
            if subject.is_empty() {
                return Err(ConfigError::EmptySubject);
            }
            if !seen.insert(subject.as_str()) {
                return Err(ConfigError::DuplicateSubject(subject.clone()));
            }
        }

        if self.thresholds.default > 100 {
            return Err(ConfigError::ThresholdOutOfRange {
                subject: "default".to_string(),
                value: self.thresholds.default,
            });
        }
        for (subject, value) in &self.thresholds.subjects {
            if *value > 100 {
                return Err(ConfigError::ThresholdOutOfRange {
                    subject: subject.clone(),
                    value: *value,
                });
            }
        }

        Ok(())
    }
}
