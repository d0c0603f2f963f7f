//! Pre-execution code validation.
//!
//! The deny-list is a text filter and cannot prove code harmless; it rejects
//! the obvious cases before an interpreter process is ever started. The
//! process limits in [`super::runner`] and the public-only module views in
//! [`super::bootstrap`] are the actual boundary.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::SandboxSection;
use crate::errors::SandboxError;

/// How risky a piece of code looked to the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Result of validating a code string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_safe: bool,
    pub errors: Vec<String>,
    pub risk_level: RiskLevel,
}

impl ValidationOutcome {
    fn safe() -> Self {
        Self {
            is_safe: true,
            errors: Vec::new(),
            risk_level: RiskLevel::Low,
        }
    }

    fn reject(&mut self, reason: String) {
        self.is_safe = false;
        self.risk_level = RiskLevel::High;
        self.errors.push(reason);
    }

    /// The first rejection reason, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}

/// Compiled deny-list and size policy.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    max_code_length: usize,
    blocked_patterns: Vec<(String, Regex)>,
    blocked_functions: Vec<String>,
}

impl SecurityPolicy {
    /// Compile the policy from the `[sandbox]` section.
    ///
    /// Patterns are matched case-insensitively.
    pub fn from_config(section: &SandboxSection) -> Result<Self, SandboxError> {
        let blocked_patterns = section
            .blocked_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (pattern.clone(), re))
                    .map_err(|source| SandboxError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            max_code_length: section.max_code_length,
            blocked_patterns,
            blocked_functions: section.blocked_functions.clone(),
        })
    }

    /// Check `code` against the policy.
    ///
    /// Violations accumulate in a fixed order: emptiness, length, patterns,
    /// then function names. The same input always yields the same outcome.
    pub fn validate(&self, code: &str) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::safe();

        if code.trim().is_empty() {
            outcome.reject("Code is empty".to_string());
            return outcome;
        }

        if code.chars().count() > self.max_code_length {
            outcome.reject(format!(
                "Code too long (max {} characters)",
                self.max_code_length
            ));
        }

        for (pattern, re) in &self.blocked_patterns {
            if re.is_match(code) {
                outcome.reject(format!("Dangerous pattern: {}", pattern));
            }
        }

        for name in &self.blocked_functions {
            if code.contains(name.as_str()) {
                outcome.reject(format!("Forbidden function: {}", name));
            }
        }

        outcome
    }
}
