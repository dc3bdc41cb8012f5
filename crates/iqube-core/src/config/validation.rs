//! Configuration validation utilities

use crate::errors::IqubeError;
use std::fmt;

/// Configuration validation result
pub type ValidationResult = std::result::Result<(), ValidationError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value is out of acceptable range
    OutOfRange {
        /// Dotted field path
        field: String,
        /// Inclusive lower bound
        min: Option<f64>,
        /// Inclusive upper bound
        max: Option<f64>,
        /// Value found
        actual: f64,
    },
    /// Value could not be parsed
    InvalidFormat {
        /// Field or variable name
        field: String,
        /// What was expected
        expected: String,
        /// Raw value found
        actual: String,
    },
    /// Custom validation failed
    Custom {
        /// Dotted field path
        field: String,
        /// What was wrong
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::InvalidFormat {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Field '{field}' has invalid format. Expected: {expected}, got: {actual}"
                )
            }
            ValidationError::Custom { field, message } => {
                write!(f, "Field '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for IqubeError {
    fn from(err: ValidationError) -> Self {
        IqubeError::config(err.to_string())
    }
}

/// Validator that accumulates errors across fields
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator for a nested section
    pub fn for_field(&self, field_name: &str) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: self.full_field_name(field_name),
        }
    }

    /// Validate that a number is within an inclusive range
    pub fn range<T>(&mut self, field_name: &str, value: T, min: Option<T>, max: Option<T>) -> &mut Self
    where
        T: PartialOrd + Copy + Into<f64>,
    {
        let below = min.map_or(false, |min| value < min);
        let above = max.map_or(false, |max| value > max);

        if below || above {
            self.errors.push(ValidationError::OutOfRange {
                field: self.full_field_name(field_name),
                min: min.map(Into::into),
                max: max.map(Into::into),
                actual: value.into(),
            });
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom<T, F>(&mut self, field_name: &str, value: &T, predicate: F, message: &str) -> &mut Self
    where
        F: FnOnce(&T) -> bool,
    {
        if !predicate(value) {
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message: message.to_string(),
            });
        }
        self
    }

    /// Record the outcome of a section's own `validate`
    pub fn check(&mut self, field_name: &str, outcome: crate::errors::Result<()>) -> &mut Self {
        if let Err(err) = outcome {
            let message = match err {
                IqubeError::Config { message } => message,
                other => other.to_string(),
            };
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message,
            });
        }
        self
    }

    /// Merge errors from a nested validator
    pub fn merge(&mut self, other: ConfigValidator) {
        self.errors.extend(other.errors);
    }

    /// First error, if any
    pub fn result(self) -> ValidationResult {
        match self.errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    /// All accumulated errors
    pub fn all_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn full_field_name(&self, field_name: &str) -> String {
        if self.field_prefix.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, field_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_messages() {
        let mut v = ConfigValidator::new();
        v.range("iterations", 10u32, Some(100), None)
            .range("ok", 5u32, Some(1), Some(9));
        let errors = v.all_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Field 'iterations' must be at least 100 (got 10)"
        );
    }

    #[test]
    fn test_nested_prefix_and_merge() {
        let mut root = ConfigValidator::new();
        let mut sealing = root.for_field("sealing");
        sealing.custom("salt_len", &0usize, |n| *n > 0, "must not be empty");
        root.merge(sealing);

        assert_eq!(
            root.result(),
            Err(ValidationError::Custom {
                field: "sealing.salt_len".to_string(),
                message: "must not be empty".to_string(),
            })
        );
    }

    #[test]
    fn test_check_keeps_config_message() {
        let mut v = ConfigValidator::new();
        v.check("scoring", Err(IqubeError::config("weights must sum to 1.0")));
        let err: IqubeError = v.result().unwrap_err().into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Field 'scoring': weights must sum to 1.0"
        );
    }
}
