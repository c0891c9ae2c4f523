use forzium_params::api::*;
use proptest::prelude::*;
use serde_json::json;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn users_table() -> RouteTable {
    let parser = SchemaParser::new().with_global_params(
        json!({"verbose": {"dataType": "boolean", "default": false}})
            .as_object()
            .cloned()
            .unwrap(),
    );

    let mut table = RouteTable::new();
    table
        .add_schema(
            parser
                .parse_route(
                    "GET",
                    "/users/{id}",
                    &json!({
                        "params": {
                            "id": "number",
                            "fields": {"dataTypes": ["array", "string"], "dataValues": ["name", "email", "age"]},
                            "since": "date"
                        }
                    }),
                )
                .unwrap(),
        )
        .unwrap();
    table
        .add_schema(
            parser
                .parse_route(
                    "POST",
                    "/users",
                    &json!({
                        "paramTarget": "body",
                        "params": {
                            "name": {"dataType": "string", "required": true},
                            "age": {"dataType": "number", "min": 0, "max": 150},
                            "pet": {
                                "dataType": "object",
                                "params": {
                                    "kind": {"dataType": "string", "dataValues": ["cat", "dog"], "required": true},
                                    "lives": {"dataType": "number", "default": 9}
                                }
                            }
                        }
                    }),
                )
                .unwrap(),
        )
        .unwrap();
    table
}

#[test]
fn test_get_route_end_to_end() {
    init_logging();
    let table = users_table();
    let matched = table.match_route("/users/42", HttpMethod::GET).unwrap();

    let mut sources = ParamSources::new()
        .with_path(matched.path_params.clone())
        .with_query(parse_query_string("?fields=name,email&since=1329696000&verbose"));
    let ctx = RequestContext::new(HttpMethod::GET, "/users/42");

    validate_route(&mut sources, matched.schema, &ctx, &PipelineOptions::default()).unwrap();

    assert_eq!(sources.path["id"], Value::Number(42.0));
    assert_eq!(
        sources.query["fields"],
        Value::Array(vec![Value::from("name"), Value::from("email")])
    );
    assert!(matches!(sources.query["since"], Value::Date(_)));
    assert_eq!(sources.query["verbose"], Value::Bool(true));
}

#[test]
fn test_get_route_rejects_unknown_field() {
    init_logging();
    let table = users_table();
    let matched = table.match_route("/users/abc", HttpMethod::GET).unwrap();

    let mut sources = ParamSources::new()
        .with_path(matched.path_params.clone())
        .with_query(parse_query_string("fields=name,password"));
    let options = PipelineOptions::from_json_str(r#"{"reporting": "all"}"#).unwrap();

    let errors =
        validate_route(&mut sources, matched.schema, &RequestContext::default(), &options).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].kind, ErrorKind::InvalidArgument);
    assert_eq!(
        errors[0].message,
        "Invalid param `id`, valid types are `number`, received `string`"
    );
    assert_eq!(errors[1].label, "fields.1");
    assert_eq!(
        errors[1].message,
        "Invalid param `fields.1`, valid values are `name, email, age`, received `password`"
    );
    assert_eq!(sources.query["fields"], Value::from("name,password"));
}

#[test]
fn test_post_route_with_json_body() {
    init_logging();
    let table = users_table();
    let matched = table.match_route("/users/", HttpMethod::POST).unwrap();
    assert!(matched.path_params.is_empty());

    let body = parse_json_body(br#"{"name": "Ana", "age": "31", "pet": "{\"kind\": \"cat\"}"}"#).unwrap();
    let mut sources = ParamSources::new()
        .with_query(parse_query_string("age=99"))
        .with_body(body);

    validate_route(&mut sources, matched.schema, &RequestContext::default(), &PipelineOptions::default())
        .unwrap();

    assert_eq!(sources.body["age"], Value::Number(31.0));
    assert_eq!(sources.query["age"], Value::from("99"));
    let pet = sources.body["pet"].as_object().unwrap();
    assert_eq!(pet["kind"], Value::from("cat"));
    assert_eq!(pet["lives"], Value::Number(9.0));
    assert_eq!(sources.body["verbose"], Value::Bool(false));
}

#[test]
fn test_post_route_nested_errors() {
    init_logging();
    let table = users_table();
    let matched = table.match_route("/users", HttpMethod::POST).unwrap();

    let body = parse_form_body(b"age=-1&pet=%7B%22kind%22%3A%22fish%22%7D").unwrap();
    let mut sources = ParamSources::new().with_body(body);
    let options = PipelineOptions {
        reporting: ErrorReporting::All,
        ..PipelineOptions::default()
    };

    let errors =
        validate_route(&mut sources, matched.schema, &RequestContext::default(), &options).unwrap_err();
    let labels: Vec<&str> = errors.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["name", "age", "pet.kind"]);
    assert_eq!(errors[0].kind, ErrorKind::MissingParameter);

    let serialized = serde_json::to_value(&errors).unwrap();
    assert_eq!(serialized[2]["code"], "InvalidArgument");
    assert_eq!(serialized[2]["received"], "fish");
}

#[test]
fn test_unknown_route() {
    let table = users_table();
    let err = table.match_route("/accounts/1", HttpMethod::GET).unwrap_err();
    assert_eq!(err.code(), error_codes::ROUTE_NOT_FOUND);
    assert!(table.match_route("/users/1", HttpMethod::DELETE).is_err());
}

fn raw_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000i64..1_000).prop_map(Value::from),
        "[a-z0-9,]{0,12}".prop_map(Value::from),
        Just(Value::from("1329696000")),
        Just(Value::from(r#"{"a":"1"}"#)),
    ]
}

fn data_types() -> impl Strategy<Value = Vec<DataType>> {
    proptest::sample::subsequence(DataType::PRIORITY.to_vec(), 1..=DataType::PRIORITY.len())
}

proptest! {
    #[test]
    fn prop_validation_is_idempotent(raw in raw_value(), types in data_types()) {
        let spec = ParameterSpec::new("p", types).unwrap();
        let ctx = RequestContext::default();

        let mut container = Map::new();
        container.insert("p".to_string(), raw.clone());
        match validate(&mut container, "p", &spec, &ctx, None) {
            Ok(()) => {
                let first = container.clone();
                prop_assert!(validate(&mut container, "p", &spec, &ctx, None).is_ok());
                prop_assert_eq!(container, first);
            }
            Err(errors) => {
                prop_assert!(!errors.is_empty());
                prop_assert_eq!(&container["p"], &raw);
            }
        }
    }
}
