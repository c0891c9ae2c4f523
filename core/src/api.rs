pub use crate::errors::{error_codes, ProjectError};
pub use crate::request::{
    parse_form_body, parse_json_body, parse_query_string, validate_request, validate_route,
    ErrorReporting, ParamSources, PipelineOptions, RequestContext,
};
pub use crate::routing::{parse_route_pattern, HttpMethod, Route, RouteMatch, RouteTable};
pub use crate::schema::{
    DefaultValue, ParamSource, ParameterMap, ParameterSpec, RouteSchema, SchemaParser,
};
pub use crate::types::{DataType, Map, Value};
pub use crate::validation::{validate, ErrorKind, ParamValidator, ValidationError, ValidationOptions};
