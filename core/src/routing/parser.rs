use crate::errors::{error_codes, ProjectError};
use crate::routing::types::{HttpMethod, Route};
use regex::Regex;

/// Compiles `/users/{id}/posts/{post}` into a matcher and collects the
/// path parameter names.
pub fn parse_route_pattern(pattern: &str, method: &str) -> Result<Route, ProjectError> {
    let mut regex_pattern = String::from("^");
    let mut param_names = Vec::new();

    for part in pattern.split('/') {
        if part.starts_with('{') && part.ends_with('}') && part.len() > 2 {
            let param_name = &part[1..part.len() - 1];
            if param_names.iter().any(|name| name == param_name) {
                return Err(ProjectError::schema(
                    error_codes::INVALID_ROUTE_PATTERN,
                    format!("Duplicate path parameter `{param_name}` in `{pattern}`"),
                ));
            }
            param_names.push(param_name.to_string());
            regex_pattern.push_str(r"/([^/]+)");
        } else if !part.is_empty() {
            regex_pattern.push('/');
            regex_pattern.push_str(&regex::escape(part));
        }
    }
    if param_names.is_empty() && regex_pattern.len() == 1 {
        regex_pattern.push('/');
    }
    regex_pattern.push_str("/?$");

    let path_regex = Regex::new(&regex_pattern).map_err(|e| {
        ProjectError::schema(
            error_codes::INVALID_ROUTE_PATTERN,
            format!("Invalid route pattern: {e}"),
        )
    })?;

    Ok(Route {
        path: pattern.to_string(),
        method: method.parse::<HttpMethod>()?,
        path_regex,
        param_names,
    })
}
