use crate::errors::{error_codes, ProjectError};
use crate::routing::parser::parse_route_pattern;
use crate::routing::types::{HttpMethod, Route, RouteMatch};
use crate::schema::RouteSchema;
use crate::types::{Map, Value};

/// Route schemas indexed by method and path pattern.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<(Route, RouteSchema)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn add_schema(&mut self, schema: RouteSchema) -> Result<(), ProjectError> {
        let mut route = parse_route_pattern(&schema.path, schema.method.as_str())?;
        // segments are stored under the parameter names the schema uses
        if schema.path_params.len() == route.param_names.len() {
            route.param_names.clone_from(&schema.path_params);
        }
        self.routes.push((route, schema));
        Ok(())
    }

    /// Every registered schema, sorted by path pattern then method.
    pub fn schemas(&self) -> Vec<&RouteSchema> {
        let mut schemas: Vec<&RouteSchema> = self.routes.iter().map(|(_, schema)| schema).collect();
        schemas.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.method.as_str().cmp(b.method.as_str()))
        });
        schemas
    }

    /// Schemas registered under exactly this path pattern, for any method.
    pub fn find_schemas(&self, pattern: &str) -> Vec<&RouteSchema> {
        self.routes
            .iter()
            .map(|(_, schema)| schema)
            .filter(|schema| schema.path == pattern)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First registered route matching `method` and `path`, with the
    /// percent-decoded path segments as raw string values.
    pub fn match_route(&self, path: &str, method: HttpMethod) -> Result<RouteMatch<'_>, ProjectError> {
        for (route, schema) in &self.routes {
            if route.method != method {
                continue;
            }

            if let Some(captures) = route.path_regex.captures(path) {
                let mut path_params = Map::new();
                for (i, param_name) in route.param_names.iter().enumerate() {
                    if let Some(segment) = captures.get(i + 1) {
                        let decoded = urlencoding::decode(segment.as_str())
                            .map(|s| s.into_owned())
                            .unwrap_or_else(|_| segment.as_str().to_string());
                        path_params.insert(param_name.clone(), Value::String(decoded));
                    }
                }

                return Ok(RouteMatch {
                    schema,
                    path_params,
                });
            }
        }

        Err(ProjectError::request(
            error_codes::ROUTE_NOT_FOUND,
            format!("No route found for {method} {path}"),
        ))
    }
}
