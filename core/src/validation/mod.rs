//! # PARAMETER VALIDATION MODULE
//!
//! **TYPE COERCION AND CONSTRAINT CHECKING FOR ONE NAMED PARAMETER**
//!
//! Given a container (query, path or body fields), a key and a
//! [`ParameterSpec`], decides whether the raw value can be read as one of the
//! declared kinds, replaces it with the coerced value and reports every
//! failure as a [`ValidationError`].
//!
//! ## USAGE
//!
//! ```rust
//! use forzium_params::request::RequestContext;
//! use forzium_params::schema::ParameterSpec;
//! use forzium_params::types::{DataType, Map, Value};
//! use forzium_params::validation::validate;
//!
//! let spec = ParameterSpec::new("limit", [DataType::Number]).unwrap().with_max(100.0);
//! let mut query = Map::new();
//! query.insert("limit".into(), Value::from("20"));
//!
//! validate(&mut query, "limit", &spec, &RequestContext::default(), None).unwrap();
//! assert_eq!(query["limit"], Value::Number(20.0));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::{error_codes, ProjectError};
use crate::request::RequestContext;
use crate::schema::ParameterSpec;
use crate::types::{Map, Value};

pub mod dates;
pub mod validators;

use validators::Engine;

/// **VALIDATION ERROR KIND**
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Required parameter absent from its container
    MissingParameter,
    /// Present but unusable: wrong kind, out of bounds, not allowed, malformed
    InvalidArgument,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingParameter => "MissingParameter",
            ErrorKind::InvalidArgument => "InvalidArgument",
        }
    }
}

/// **VALIDATION ERROR**
///
/// One failure for one (possibly nested) parameter. `label` is the dotted
/// path of the offending value, e.g. `payload.items.2`.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ValidationError {
    #[serde(rename = "code")]
    pub kind: ErrorKind,
    pub label: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<Value>,
}

impl ValidationError {
    pub(crate) fn missing(label: &str) -> Self {
        Self {
            kind: ErrorKind::MissingParameter,
            label: label.to_string(),
            message: format!("Param `{label}` required"),
            received: None,
        }
    }

    pub(crate) fn invalid(label: &str, message: String, received: Value) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            label: label.to_string(),
            message,
            received: Some(received),
        }
    }

    /// `InvalidArgument` error for custom `validate` callbacks.
    pub fn invalid_argument(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            label: label.into(),
            message: message.into(),
            received: None,
        }
    }

    pub fn with_received(mut self, received: impl Into<Value>) -> Self {
        self.received = Some(received.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// **VALIDATION OPTIONS**
///
/// Runtime limits for the coercion engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationOptions {
    /// **MAXIMUM NESTING** - Levels of array elements / object children
    /// followed before a value is rejected.
    pub max_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

impl ValidationOptions {
    /// Loads options from JSON, e.g. `{"max_depth": 8}`. Missing fields keep
    /// their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ProjectError> {
        let options: Self = serde_json::from_str(raw).map_err(|e| {
            ProjectError::config(error_codes::INVALID_CONFIG, format!("Invalid validation options: {e}"))
        })?;
        options.check()?;
        Ok(options)
    }

    pub(crate) fn check(&self) -> Result<(), ProjectError> {
        if self.max_depth == 0 {
            return Err(ProjectError::config(
                error_codes::INVALID_CONFIG,
                "max_depth must be at least 1",
            ));
        }
        Ok(())
    }
}

/// **PARAMETER VALIDATOR**
///
/// Holds the options for repeated validation passes. Stateless between calls,
/// so one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ParamValidator {
    options: ValidationOptions,
}

impl ParamValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// **VALIDATE ONE PARAMETER IN PLACE**
    ///
    /// **PARAMETERS**:
    /// - `container` - the map holding the raw value under `key`
    /// - `label_prefix` - `None` for a top-level parameter, otherwise the
    ///   dotted prefix (ending in `.`) prepended to `key` in error labels
    ///
    /// **RETURNS**:
    /// - `Ok(())` - `container[key]` now holds the coerced value, or stays
    ///   absent for an optional parameter without default
    /// - `Err(errors)` - `container` is unchanged
    ///
    /// `validate` and `transform` callbacks only run at the top level.
    pub fn validate(
        &self,
        container: &mut Map,
        key: &str,
        spec: &ParameterSpec,
        ctx: &RequestContext,
        label_prefix: Option<&str>,
    ) -> Result<(), Vec<ValidationError>> {
        let label = match label_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        };
        let current = container.get(key).cloned();

        let engine = Engine::new(ctx, &self.options);
        if let Some(value) = engine.check(current, spec, &label, label_prefix.is_none(), 0)? {
            container.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// [`ParamValidator::validate`] with default options.
pub fn validate(
    container: &mut Map,
    key: &str,
    spec: &ParameterSpec,
    ctx: &RequestContext,
    label_prefix: Option<&str>,
) -> Result<(), Vec<ValidationError>> {
    ParamValidator::default().validate(container, key, spec, ctx, label_prefix)
}
