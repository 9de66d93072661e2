//! Configuration schema types
//!
//! A stage advertises its configurable properties as [`PropertyDescriptor`]s
//! and reports configuration problems as [`ValidationResult`]s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes one configurable property of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name, as used in configuration files.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether a value (explicit or default) must be present.
    pub required: bool,
    /// Value used when none is configured.
    pub default_value: Option<String>,
    /// Permitted values; empty means any value.
    pub allowed_values: Vec<String>,
}

impl PropertyDescriptor {
    /// Create an optional property with no default and no restrictions.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            default_value: None,
            allowed_values: Vec::new(),
        }
    }

    /// Mark the property as required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Restrict the property to a fixed set of values.
    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Validate a configured value (`None` = not configured).
    pub fn validate(&self, value: Option<&str>) -> ValidationResult {
        let effective = value.or(self.default_value.as_deref());
        match effective {
            None if self.required => {
                ValidationResult::invalid(&self.name, "property is required but has no value")
            }
            None => ValidationResult::valid(&self.name),
            Some(v) if !self.allowed_values.is_empty() && !self.allowed_values.iter().any(|a| a == v) => {
                ValidationResult::invalid(
                    &self.name,
                    format!(
                        "'{}' is not one of the allowed values [{}]",
                        v,
                        self.allowed_values.join(", ")
                    ),
                )
            }
            Some(_) => ValidationResult::valid(&self.name),
        }
    }
}

/// Outcome of validating one configuration subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// What was validated (usually a property name).
    pub subject: String,
    /// Whether the subject is valid.
    pub valid: bool,
    /// Explanation; empty for valid results.
    pub explanation: String,
}

impl ValidationResult {
    /// A passing result.
    pub fn valid(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            valid: true,
            explanation: String::new(),
        }
    }

    /// A failing result.
    pub fn invalid(subject: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            valid: false,
            explanation: explanation.into(),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "'{}' is valid", self.subject)
        } else {
            write!(f, "'{}' is invalid: {}", self.subject, self.explanation)
        }
    }
}
