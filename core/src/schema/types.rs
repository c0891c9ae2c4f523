use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{error_codes, ProjectError};
use crate::request::RequestContext;
use crate::types::{dedupe_data_types, DataType, Map, Value};
use crate::validation::ValidationError;

/// Computes a default from the request when the parameter is absent.
pub type DefaultFn = Arc<dyn Fn(&RequestContext, &ParameterSpec) -> Value + Send + Sync>;

/// Custom check run on the fully coerced value. An `Err` is reported as-is.
pub type ValidateFn =
    Arc<dyn Fn(&Value, &RequestContext, &ParameterSpec) -> Result<(), ValidationError> + Send + Sync>;

/// Post-validation rewrite; the returned value replaces the stored one.
pub type TransformFn = Arc<dyn Fn(Value, &RequestContext, &ParameterSpec) -> Value + Send + Sync>;

/// **DEFAULT VALUE**
///
/// Either a fixed value or one computed lazily, only when the input is absent.
#[derive(Clone)]
pub enum DefaultValue {
    Static(Value),
    Computed(DefaultFn),
}

impl DefaultValue {
    pub fn resolve(&self, ctx: &RequestContext, spec: &ParameterSpec) -> Value {
        match self {
            DefaultValue::Static(value) => value.clone(),
            DefaultValue::Computed(compute) => compute(ctx, spec),
        }
    }

    /// The fixed value, if this default does not depend on the request.
    pub fn as_static(&self) -> Option<&Value> {
        match self {
            DefaultValue::Static(value) => Some(value),
            DefaultValue::Computed(_) => None,
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// **PARAMETER SOURCE**
///
/// Which request container a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParamSource {
    /// URL path segments (`/users/{id}`)
    Path,
    /// Query string
    #[default]
    Query,
    /// Request body fields
    Body,
}

impl ParamSource {
    pub const ALL: [ParamSource; 3] = [ParamSource::Path, ParamSource::Query, ParamSource::Body];

    pub fn as_str(self) -> &'static str {
        match self {
            ParamSource::Path => "params",
            ParamSource::Query => "query",
            ParamSource::Body => "body",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamSource {
    type Err = ProjectError;

    /// Accepts both container names (`params`, `query`, `body`) and
    /// declaration source names (`path`, `querystring`, `post`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "params" | "path" => Ok(ParamSource::Path),
            "query" | "querystring" => Ok(ParamSource::Query),
            "body" | "post" => Ok(ParamSource::Body),
            _ => Err(ProjectError::schema(
                error_codes::INVALID_TARGET,
                format!("Invalid parameter target, valid options are `params,query,body`, received `{s}`"),
            )),
        }
    }
}

impl TryFrom<String> for ParamSource {
    type Error = ProjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ParamSource> for String {
    fn from(source: ParamSource) -> Self {
        source.as_str().to_string()
    }
}

/// **PARAMETER SPECIFICATION**
///
/// Normalized contract for one named input. Built once per route and shared
/// read-only between requests.
#[derive(Clone)]
pub struct ParameterSpec {
    pub name: String,
    /// Accepted kinds, deduplicated, in declared order. Never empty.
    pub data_types: Vec<DataType>,
    pub required: bool,
    pub source: ParamSource,
    pub default: Option<DefaultValue>,
    /// Allow-list for the final (coerced) value, or every element of an array.
    pub data_values: Option<Vec<Value>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sub-schema for `object` parameters.
    pub params: Option<Vec<ParameterSpec>>,
    pub validate: Option<ValidateFn>,
    pub transform: Option<TransformFn>,
    pub description: Option<String>,
    /// Extra declaration keys kept for documentation and introspection.
    /// Never read by the validator.
    pub extras: Map,
}

/// Parameter specs keyed by name, in declaration order.
pub type ParameterMap = IndexMap<String, ParameterSpec>;

impl ParameterSpec {
    /// **CONSTRUCTOR**
    ///
    /// Fails with `RUST_CORE_SCHEMA_EMPTY_DATA_TYPES` when no kind is given.
    pub fn new(
        name: impl Into<String>,
        data_types: impl IntoIterator<Item = DataType>,
    ) -> Result<Self, ProjectError> {
        let name = name.into();
        let data_types = dedupe_data_types(data_types);
        if data_types.is_empty() {
            return Err(ProjectError::schema(
                error_codes::EMPTY_DATA_TYPES,
                format!("Param `{name}` must accept at least one data type"),
            ));
        }

        Ok(Self {
            name,
            data_types,
            required: false,
            source: ParamSource::default(),
            default: None,
            data_values: None,
            min: None,
            max: None,
            params: None,
            validate: None,
            transform: None,
            description: None,
            extras: Map::new(),
        })
    }

    pub fn accepts(&self, data_type: DataType) -> bool {
        self.data_types.contains(&data_type)
    }

    /// `array|number` style label used in error messages.
    pub fn type_label(&self) -> String {
        let names: Vec<&str> = self.data_types.iter().map(|t| t.as_str()).collect();
        names.join("|")
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn from_source(mut self, source: ParamSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    pub fn with_default_fn<F>(mut self, compute: F) -> Self
    where
        F: Fn(&RequestContext, &ParameterSpec) -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Arc::new(compute)));
        self
    }

    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.data_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_params(mut self, params: Vec<ParameterSpec>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value, &RequestContext, &ParameterSpec) -> Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value, &RequestContext, &ParameterSpec) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Spec applied to each element of a multi-typed array: the same kinds
    /// minus `array`, and the same allow-list. Bounds, defaults and callbacks
    /// stay on the array itself.
    pub(crate) fn element_spec(&self) -> ParameterSpec {
        ParameterSpec {
            name: self.name.clone(),
            data_types: self
                .data_types
                .iter()
                .copied()
                .filter(|t| *t != DataType::Array)
                .collect(),
            required: false,
            source: self.source,
            default: None,
            data_values: self.data_values.clone(),
            min: None,
            max: None,
            params: None,
            validate: None,
            transform: None,
            description: None,
            extras: Map::new(),
        }
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("data_types", &self.data_types)
            .field("required", &self.required)
            .field("source", &self.source)
            .field("default", &self.default)
            .field("data_values", &self.data_values)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("params", &self.params)
            .field("validate", &self.validate.as_ref().map(|_| "<fn>"))
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("description", &self.description)
            .field("extras", &self.extras)
            .finish()
    }
}

/// **ROUTE SCHEMA**
///
/// All parameter specs declared for one route.
#[derive(Debug, Clone)]
pub struct RouteSchema {
    pub method: crate::routing::HttpMethod,
    pub path: String,
    pub parameters: Vec<ParameterSpec>,
    pub description: Option<String>,
    /// Forces every parameter of the route to be read from one container.
    pub param_target: Option<ParamSource>,
    /// Names given to the `{name}` segments of `path`, in pattern order.
    /// The route table stores matched segments under these keys.
    pub path_params: Vec<String>,
    /// Extra declaration keys kept for documentation and introspection.
    pub extras: Map,
}

impl RouteSchema {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Mutable access, used to attach callbacks after declarations are parsed.
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut ParameterSpec> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    /// Copies of every parameter spec, keyed by name.
    pub fn parameter_map(&self) -> ParameterMap {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect()
    }

    /// [`RouteSchema::parameter_map`] with `overrides` applied on top: a spec
    /// with an existing name replaces it in place, a new name is appended.
    pub fn merged_parameters<I>(&self, overrides: I) -> ParameterMap
    where
        I: IntoIterator<Item = ParameterSpec>,
    {
        let mut merged = self.parameter_map();
        for spec in overrides {
            merged.insert(spec.name.clone(), spec);
        }
        merged
    }

    /// Fresh copies of every static default, keyed by parameter name.
    /// Mutating the result never touches the route definition.
    pub fn defaults(&self) -> Map {
        self.parameters
            .iter()
            .filter_map(|p| {
                p.default
                    .as_ref()
                    .and_then(DefaultValue::as_static)
                    .map(|value| (p.name.clone(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dedupes_types() {
        let spec = ParameterSpec::new(
            "ids",
            [DataType::Array, DataType::Number, DataType::Array],
        )
        .unwrap();
        assert_eq!(spec.data_types, vec![DataType::Array, DataType::Number]);
        assert_eq!(spec.type_label(), "array|number");
    }

    #[test]
    fn test_new_rejects_empty_types() {
        let err = ParameterSpec::new("id", Vec::<DataType>::new()).unwrap_err();
        assert_eq!(err.code(), error_codes::EMPTY_DATA_TYPES);
    }

    #[test]
    fn test_element_spec_drops_array_and_bounds() {
        let spec = ParameterSpec::new("ids", [DataType::Array, DataType::Number])
            .unwrap()
            .required()
            .with_min(1.0)
            .with_values([1, 2, 3])
            .with_default(vec![1]);
        let element = spec.element_spec();
        assert_eq!(element.data_types, vec![DataType::Number]);
        assert!(element.min.is_none());
        assert!(element.default.is_none());
        assert!(!element.required);
        assert_eq!(element.data_values.unwrap().len(), 3);
    }

    #[test]
    fn test_param_source_names() {
        assert_eq!("params".parse::<ParamSource>().unwrap(), ParamSource::Path);
        assert_eq!("querystring".parse::<ParamSource>().unwrap(), ParamSource::Query);
        assert_eq!("POST".parse::<ParamSource>().unwrap(), ParamSource::Body);
        let err = "headers".parse::<ParamSource>().unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_TARGET);
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let spec = ParameterSpec::new("q", [DataType::String])
            .unwrap()
            .with_transform(|value, _, _| value);
        let rendered = format!("{spec:?}");
        assert!(rendered.contains("<fn>"));
    }

    fn route() -> RouteSchema {
        RouteSchema {
            method: crate::routing::HttpMethod::GET,
            path: "/users".to_string(),
            parameters: vec![
                ParameterSpec::new("limit", [DataType::Number]).unwrap().with_max(50.0),
                ParameterSpec::new("sort", [DataType::String]).unwrap(),
            ],
            description: None,
            param_target: None,
            path_params: Vec::new(),
            extras: Map::new(),
        }
    }

    #[test]
    fn test_parameter_map_is_a_copy() {
        let route = route();
        let mut params = route.parameter_map();
        let names: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["limit", "sort"]);

        params["limit"].max = Some(10.0);
        assert_eq!(route.parameter("limit").unwrap().max, Some(50.0));
    }

    #[test]
    fn test_merged_parameters() {
        let route = route();
        let merged = route.merged_parameters([
            ParameterSpec::new("limit", [DataType::Number]).unwrap().with_max(500.0),
            ParameterSpec::new("cursor", [DataType::String]).unwrap(),
        ]);

        let names: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["limit", "sort", "cursor"]);
        assert_eq!(merged["limit"].max, Some(500.0));
        assert_eq!(route.parameters.len(), 2);
    }
}
