use std::collections::HashMap;

use crate::routing::HttpMethod;
use crate::schema::ParamSource;
use crate::types::{Map, Value};

/// **REQUEST CONTEXT**
///
/// Request metadata forwarded untouched to `default`, `validate` and
/// `transform` callbacks. The validator never reads it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: HttpMethod,
    pub path: String,
    pub version: Option<String>,
    pub headers: HashMap<String, String>,
    /// Application data made available to callbacks (user ids, locale, ...).
    pub extensions: HashMap<String, Value>,
}

impl RequestContext {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// **PARAMETER SOURCES**
///
/// The three input containers of one request. Created per request and
/// mutated in place by validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSources {
    pub path: Map,
    pub query: Map,
    pub body: Map,
}

impl ParamSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: Map) -> Self {
        self.path = path;
        self
    }

    pub fn with_query(mut self, query: Map) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Map) -> Self {
        self.body = body;
        self
    }

    pub fn container(&self, source: ParamSource) -> &Map {
        match source {
            ParamSource::Path => &self.path,
            ParamSource::Query => &self.query,
            ParamSource::Body => &self.body,
        }
    }

    pub fn container_mut(&mut self, source: ParamSource) -> &mut Map {
        match source {
            ParamSource::Path => &mut self.path,
            ParamSource::Query => &mut self.query,
            ParamSource::Body => &mut self.body,
        }
    }

    /// First container (path, query, body) already holding `key`.
    pub fn holding(&self, key: &str) -> Option<ParamSource> {
        ParamSource::ALL
            .into_iter()
            .find(|source| self.container(*source).contains_key(key))
    }
}
