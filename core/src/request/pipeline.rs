use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{error_codes, ProjectError};
use crate::request::{ParamSources, RequestContext};
use crate::schema::{ParamSource, ParameterSpec, RouteSchema};
use crate::validation::{ParamValidator, ValidationError, ValidationOptions};

/// How many errors a failed request reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorReporting {
    /// Only the first error, in declaration order
    #[default]
    First,
    /// Every error of every parameter
    All,
}

/// **PIPELINE OPTIONS**
///
/// Loaded once at startup and shared between requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Reads every parameter from this container, ignoring declared sources.
    pub target: Option<ParamSource>,
    pub reporting: ErrorReporting,
    pub validation: ValidationOptions,
}

impl PipelineOptions {
    /// Loads options from JSON, e.g.
    /// `{"target": "body", "reporting": "all", "validation": {"max_depth": 8}}`.
    pub fn from_json_str(raw: &str) -> Result<Self, ProjectError> {
        let options: Self = serde_json::from_str(raw).map_err(|e| {
            ProjectError::config(error_codes::INVALID_CONFIG, format!("Invalid pipeline options: {e}"))
        })?;
        options.validation.check()?;
        Ok(options)
    }
}

/// **VALIDATE EVERY DECLARED PARAMETER OF A REQUEST**
///
/// Each parameter is read from, and written back to, one container:
/// 1. `options.target`, when set
/// 2. else the first of path, query, body already holding the key
/// 3. else the parameter's declared source
///
/// Parameters are checked independently. Those that pass keep their coerced
/// values even when others fail.
pub fn validate_request(
    sources: &mut ParamSources,
    parameters: &[ParameterSpec],
    ctx: &RequestContext,
    options: &PipelineOptions,
) -> Result<(), Vec<ValidationError>> {
    let validator = ParamValidator::new(options.validation.clone());
    let mut errors = Vec::new();

    for spec in parameters {
        let source = options
            .target
            .or_else(|| sources.holding(&spec.name))
            .unwrap_or(spec.source);

        if let Err(param_errors) =
            validator.validate(sources.container_mut(source), &spec.name, spec, ctx, None)
        {
            debug!(
                "[request] `{}` failed in `{}` with {} error(s)",
                spec.name,
                source,
                param_errors.len()
            );
            errors.extend(param_errors);
        }
    }

    if errors.is_empty() {
        return Ok(());
    }
    if options.reporting == ErrorReporting::First {
        errors.truncate(1);
    }
    Err(errors)
}

/// [`validate_request`] for a parsed route. The route's `paramTarget`
/// takes precedence over `options.target`.
pub fn validate_route(
    sources: &mut ParamSources,
    schema: &RouteSchema,
    ctx: &RequestContext,
    options: &PipelineOptions,
) -> Result<(), Vec<ValidationError>> {
    match schema.param_target {
        Some(target) if options.target != Some(target) => {
            let options = PipelineOptions {
                target: Some(target),
                ..options.clone()
            };
            validate_request(sources, &schema.parameters, ctx, &options)
        }
        _ => validate_request(sources, &schema.parameters, ctx, options),
    }
}
