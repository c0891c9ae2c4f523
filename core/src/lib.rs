//! # FORZIUM PARAMETER CORE
//!
//! **DECLARATIVE REQUEST PARAMETER VALIDATION AND TYPE COERCION**
//!
//! **ARCHITECTURE**: route declarations are normalized once into
//! [`schema::RouteSchema`]s; each request is then checked parameter by
//! parameter, coercing raw strings into typed [`types::Value`]s in place.
//! **GUARANTEE**: validation failures are returned as data, never panics.
//! **CONCURRENCY**: schemas are immutable and `Send + Sync`; validation is
//! synchronous and lock-free.

pub mod api;
pub mod errors;
pub mod request;
pub mod routing;
pub mod schema;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests {
    use crate::api::*;
    use serde_json::json;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_schemas_are_shareable() {
        assert_send_sync::<ParameterSpec>();
        assert_send_sync::<RouteSchema>();
        assert_send_sync::<RouteTable>();
        assert_send_sync::<ParamValidator>();
    }

    #[test]
    fn test_shared_schema_across_threads() {
        let schema = std::sync::Arc::new(
            SchemaParser::new()
                .parse_route(
                    "GET",
                    "/items",
                    &json!({"params": {"limit": {"dataType": "number", "max": 50, "default": 10}}}),
                )
                .unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let schema = std::sync::Arc::clone(&schema);
                std::thread::spawn(move || {
                    let mut sources = ParamSources::new()
                        .with_query(parse_query_string(&format!("limit={}", i * 20)));
                    let result = validate_route(
                        &mut sources,
                        &schema,
                        &RequestContext::default(),
                        &PipelineOptions::default(),
                    );
                    (result.is_ok(), sources.query)
                })
            })
            .collect();

        let outcomes: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap().0).collect();
        assert_eq!(outcomes, vec![true, true, true, false]);
        assert_eq!(schema.defaults()["limit"], Value::Number(10.0));
    }
}
