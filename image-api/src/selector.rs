//! Equality-based label and field selectors.
//!
//! A [`Selector`] is a conjunction of requirements written as
//! `key=value`, `key==value` or `key!=value`, separated by commas. The empty
//! selector matches everything.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A set of named string values a selector can be matched against.
pub trait Fields {
    /// Look up the value for `key`, or `None` if the key is absent.
    fn field(&self, key: &str) -> Option<&str>;
}

impl Fields for BTreeMap<String, String> {
    fn field(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Fields for HashMap<String, String> {
    fn field(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Errors from parsing selector text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// A requirement had no `=` or `!=` operator.
    #[error("selector requirement {0:?} has no operator")]
    MissingOperator(String),

    /// A requirement had an empty key.
    #[error("selector requirement {0:?} has an empty key")]
    EmptyKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
    key: String,
    operator: Operator,
    value: String,
}

impl Requirement {
    fn matches<F: Fields + ?Sized>(&self, fields: &F) -> bool {
        let value = fields.field(&self.key).unwrap_or_default();
        match self.operator {
            Operator::Equals => value == self.value,
            Operator::NotEquals => value != self.value,
        }
    }
}

impl FromStr for Requirement {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, operator, value) = if let Some((key, value)) = s.split_once("!=") {
            (key, Operator::NotEquals, value)
        } else if let Some((key, value)) = s.split_once("==") {
            (key, Operator::Equals, value)
        } else if let Some((key, value)) = s.split_once('=') {
            (key, Operator::Equals, value)
        } else {
            return Err(SelectorError::MissingOperator(s.to_owned()));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(SelectorError::EmptyKey(s.to_owned()));
        }

        Ok(Self {
            key: key.to_owned(),
            operator,
            value: value.trim().to_owned(),
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, self.value),
            Operator::NotEquals => write!(f, "{}!={}", self.key, self.value),
        }
    }
}

/// A conjunction of equality requirements over labels or fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// A selector that matches every object.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Parse a comma-separated selector, e.g. `app=web,tier!=cache`.
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        text.parse()
    }

    /// Require `key` to equal `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.push(Requirement {
            key: key.into(),
            operator: Operator::Equals,
            value: value.into(),
        });
        self
    }

    /// Require `key` to differ from `value`.
    pub fn without(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.push(Requirement {
            key: key.into(),
            operator: Operator::NotEquals,
            value: value.into(),
        });
        self
    }

    /// Whether this selector places no constraints.
    pub fn is_everything(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Whether `fields` satisfy every requirement.
    pub fn matches<F: Fields + ?Sized>(&self, fields: &F) -> bool {
        self.requirements.iter().all(|r| r.matches(fields))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let requirements = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Requirement::from_str)
            .collect::<Result<Vec<_>, SelectorError>>()?;
        Ok(Self { requirements })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{requirement}")?;
        }
        Ok(())
    }
}
