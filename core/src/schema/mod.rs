//! # FORZIUM PARAMETER SCHEMA
//!
//! Declarative description of what a route expects: one [`ParameterSpec`]
//! per named input, grouped in a [`RouteSchema`]. Specs are built once and
//! shared read-only by every request validated against them.

pub mod parser;
pub mod types;

pub use parser::SchemaParser;
pub use types::{
    DefaultFn, DefaultValue, ParamSource, ParameterMap, ParameterSpec, RouteSchema, TransformFn,
    ValidateFn,
};
