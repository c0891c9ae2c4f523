use thiserror::Error;

/// Failures raised while building schemas, parsing request input or loading
/// configuration. Parameter validation failures are not `ProjectError`s; they
/// are reported as [`crate::validation::ValidationError`] values.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("SCHEMA ERROR: {code} - {message}")]
    Schema { code: String, message: String },

    #[error("REQUEST ERROR: {code} - {message}")]
    Request { code: String, message: String },

    #[error("CONFIG ERROR: {code} - {message}")]
    Config { code: String, message: String },
}

impl ProjectError {
    pub(crate) fn schema(code: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn request(code: &str, message: impl Into<String>) -> Self {
        Self::Request {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn config(code: &str, message: impl Into<String>) -> Self {
        Self::Config {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Machine readable error code.
    pub fn code(&self) -> &str {
        match self {
            Self::Schema { code, .. } | Self::Request { code, .. } | Self::Config { code, .. } => {
                code
            }
        }
    }
}

/// **ERROR CODES**
///
/// **MANDATE**: Use these standardized codes for every `ProjectError`.
pub mod error_codes {
    pub const EMPTY_DATA_TYPES: &str = "RUST_CORE_SCHEMA_EMPTY_DATA_TYPES";
    pub const UNKNOWN_DATA_TYPE: &str = "RUST_CORE_SCHEMA_UNKNOWN_DATA_TYPE";
    pub const INVALID_DECLARATION: &str = "RUST_CORE_SCHEMA_INVALID_DECLARATION";
    pub const INVALID_TARGET: &str = "RUST_CORE_SCHEMA_INVALID_TARGET";
    pub const INVALID_ROUTE_PATTERN: &str = "RUST_CORE_SCHEMA_INVALID_ROUTE_PATTERN";
    pub const INVALID_HTTP_METHOD: &str = "RUST_CORE_REQUEST_INVALID_HTTP_METHOD";
    pub const INVALID_JSON: &str = "RUST_CORE_REQUEST_INVALID_JSON";
    pub const INVALID_UTF8: &str = "RUST_CORE_REQUEST_INVALID_UTF8";
    pub const ROUTE_NOT_FOUND: &str = "RUST_CORE_REQUEST_ROUTE_NOT_FOUND";
    pub const INVALID_CONFIG: &str = "RUST_CORE_CONFIG_INVALID";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let err = ProjectError::schema(error_codes::EMPTY_DATA_TYPES, "no types for `id`");
        assert_eq!(err.code(), error_codes::EMPTY_DATA_TYPES);
        assert_eq!(
            err.to_string(),
            "SCHEMA ERROR: RUST_CORE_SCHEMA_EMPTY_DATA_TYPES - no types for `id`"
        );
    }

    #[test]
    fn test_error_codes_exist() {
        assert!(!error_codes::UNKNOWN_DATA_TYPE.is_empty());
        assert!(!error_codes::INVALID_JSON.is_empty());
        assert!(!error_codes::INVALID_CONFIG.is_empty());
    }
}
