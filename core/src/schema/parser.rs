use log::debug;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::errors::{error_codes, ProjectError};
use crate::routing::{parse_route_pattern, HttpMethod};
use crate::schema::types::{DefaultValue, ParamSource, ParameterSpec, RouteSchema};
use crate::types::{DataType, Map, Value};

/// **SCHEMA PARSER**
///
/// Normalizes loose route declarations into [`RouteSchema`] values.
///
/// A route declaration is a JSON object:
///
/// ```json
/// {
///   "description": "List a user's posts",
///   "paramTarget": "query",
///   "params": {
///     "limit": { "dataTypes": ["number"], "min": 1, "max": 100, "default": 20 },
///     "tags": "array,string",
///     "sort": ["string"]
///   }
/// }
/// ```
///
/// Keys registered with [`SchemaParser::with_route_properties`] and
/// [`SchemaParser::with_param_properties`] are copied verbatim into the
/// `extras` of the route or parameter.
#[derive(Debug, Clone, Default)]
pub struct SchemaParser {
    global_params: JsonMap<String, JsonValue>,
    lowercase_names: bool,
    route_properties: Vec<String>,
    param_properties: Vec<String>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters added to every route that does not declare the same name.
    pub fn with_global_params(mut self, globals: JsonMap<String, JsonValue>) -> Self {
        self.global_params = globals;
        self
    }

    /// Lowercase every parameter name, path segments included, for route
    /// tables that match keys case-insensitively.
    pub fn lowercase_names(mut self) -> Self {
        self.lowercase_names = true;
        self
    }

    /// Route declaration keys kept in [`RouteSchema::extras`].
    pub fn with_route_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.route_properties = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Parameter declaration keys kept in [`ParameterSpec::extras`].
    pub fn with_param_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_properties = keys.into_iter().map(Into::into).collect();
        self
    }

    fn normalize(&self, name: &str) -> String {
        if self.lowercase_names {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn is_declared(&self, declared: &JsonMap<String, JsonValue>, name: &str) -> bool {
        declared.keys().any(|key| self.normalize(key) == name)
    }

    /// **PARSE ROUTE**
    ///
    /// **PARAMETERS**:
    /// - `method: &str` - HTTP method of the route
    /// - `pattern: &str` - Route pattern, `{name}` segments become path parameters
    /// - `declaration: &JsonValue` - Route declaration object
    pub fn parse_route(
        &self,
        method: &str,
        pattern: &str,
        declaration: &JsonValue,
    ) -> Result<RouteSchema, ProjectError> {
        let route = parse_route_pattern(pattern, method)?;
        let empty = JsonMap::new();
        let body = match declaration {
            JsonValue::Object(body) => body,
            JsonValue::Null => &empty,
            other => {
                return Err(ProjectError::schema(
                    error_codes::INVALID_DECLARATION,
                    format!("Route `{pattern}` declaration must be an object, received `{other}`"),
                ))
            }
        };

        let mut declared = match body.get("params") {
            Some(JsonValue::Object(params)) => params.clone(),
            None | Some(JsonValue::Null) => JsonMap::new(),
            Some(other) => {
                return Err(ProjectError::schema(
                    error_codes::INVALID_DECLARATION,
                    format!("Route `{pattern}` params must be an object, received `{other}`"),
                ))
            }
        };

        for (name, global) in &self.global_params {
            if !self.is_declared(&declared, &self.normalize(name)) {
                declared.insert(name.clone(), global.clone());
            }
        }
        let path_params: Vec<String> = route.param_names.iter().map(|n| self.normalize(n)).collect();
        for name in &path_params {
            if !self.is_declared(&declared, name) {
                declared.insert(name.clone(), JsonValue::String("string".to_string()));
            }
        }

        let parameters = self.parse_params(&declared, &path_params)?;

        let param_target = match body.get("paramTarget") {
            Some(JsonValue::String(target)) => Some(target.parse::<ParamSource>()?),
            None | Some(JsonValue::Null) => None,
            Some(other) => {
                return Err(ProjectError::schema(
                    error_codes::INVALID_TARGET,
                    format!("Route `{pattern}` paramTarget must be a string, received `{other}`"),
                ))
            }
        };

        debug!(
            "[schema] route=`{} {}` params={} target={:?}",
            route.method.as_str(),
            pattern,
            parameters.len(),
            param_target
        );

        Ok(RouteSchema {
            method: route.method,
            path: pattern.to_string(),
            parameters,
            description: body
                .get("description")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            param_target,
            path_params,
            extras: extract_extras(body, &self.route_properties),
        })
    }

    /// Normalizes a `name -> declaration` map, keeping declaration order.
    /// `path_params` holds the already normalized `{name}` segment names.
    pub fn parse_params(
        &self,
        declarations: &JsonMap<String, JsonValue>,
        path_params: &[String],
    ) -> Result<Vec<ParameterSpec>, ProjectError> {
        declarations
            .iter()
            .map(|(name, declaration)| {
                let normalized = self.normalize(name);
                let from_path = path_params.iter().any(|p| *p == normalized);
                self.parse_param(name, declaration, from_path)
            })
            .collect()
    }

    fn parse_param(
        &self,
        name: &str,
        declaration: &JsonValue,
        from_path: bool,
    ) -> Result<ParameterSpec, ProjectError> {
        let name = self.normalize(name);

        let empty = JsonMap::new();
        let (types, body) = match declaration {
            JsonValue::String(_) | JsonValue::Array(_) => (parse_types(&name, declaration)?, &empty),
            JsonValue::Object(body) => {
                let raw = body.get("dataTypes").or_else(|| body.get("dataType"));
                let types = match raw {
                    Some(raw) => parse_types(&name, raw)?,
                    None if from_path => vec![DataType::String],
                    None => Vec::new(),
                };
                (types, body)
            }
            other => {
                return Err(ProjectError::schema(
                    error_codes::INVALID_DECLARATION,
                    format!("Param `{name}` declaration must be a string, list or object, received `{other}`"),
                ))
            }
        };

        let mut spec = ParameterSpec::new(name.clone(), types)?;

        spec.source = if from_path {
            ParamSource::Path
        } else {
            match body.get("paramType").and_then(JsonValue::as_str) {
                Some(kind) if kind.eq_ignore_ascii_case("post") || kind.eq_ignore_ascii_case("body") => {
                    ParamSource::Body
                }
                _ => ParamSource::Query,
            }
        };
        spec.required = from_path || body.get("required").and_then(JsonValue::as_bool).unwrap_or(false);

        if spec.accepts(DataType::Number) {
            spec.min = parse_bound(&name, "min", body.get("min"))?;
            spec.max = parse_bound(&name, "max", body.get("max"))?;
        }

        if let Some(default) = body.get("default") {
            spec.default = Some(DefaultValue::Static(Value::from(default.clone())));
        }

        match body.get("dataValues") {
            Some(JsonValue::Array(values)) => {
                spec.data_values = Some(values.iter().cloned().map(Value::from).collect());
            }
            None | Some(JsonValue::Null) => {}
            Some(other) => {
                return Err(ProjectError::schema(
                    error_codes::INVALID_DECLARATION,
                    format!("Param `{name}` dataValues must be a list, received `{other}`"),
                ))
            }
        }

        if spec.accepts(DataType::Object) {
            if let Some(JsonValue::Object(children)) = body.get("params") {
                spec.params = Some(self.parse_params(children, &[])?);
            }
        }

        spec.description = body
            .get("description")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        spec.extras = extract_extras(body, &self.param_properties);

        Ok(spec)
    }
}

fn extract_extras(body: &JsonMap<String, JsonValue>, keys: &[String]) -> Map {
    keys.iter()
        .filter_map(|key| body.get(key).map(|value| (key.clone(), Value::from(value.clone()))))
        .collect()
}

/// `"array,number"`, `"array|number"` or `["array", "number"]`.
fn parse_types(name: &str, raw: &JsonValue) -> Result<Vec<DataType>, ProjectError> {
    match raw {
        JsonValue::String(list) => list
            .split(|c| c == ',' || c == '|')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect(),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(type_name) => type_name.parse(),
                other => Err(ProjectError::schema(
                    error_codes::UNKNOWN_DATA_TYPE,
                    format!("Param `{name}` data types must be strings, received `{other}`"),
                )),
            })
            .collect(),
        other => Err(ProjectError::schema(
            error_codes::INVALID_DECLARATION,
            format!("Param `{name}` dataTypes must be a string or list, received `{other}`"),
        )),
    }
}

fn parse_bound(name: &str, bound: &str, raw: Option<&JsonValue>) -> Result<Option<f64>, ProjectError> {
    let parsed = match raw {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => crate::types::parse_number(s),
        Some(_) => None,
    };
    parsed.map(Some).ok_or_else(|| {
        ProjectError::schema(
            error_codes::INVALID_DECLARATION,
            format!("Param `{name}` {bound} must be numeric"),
        )
    })
}
