pub mod parser;
pub mod pipeline;
pub mod types;

pub use parser::{parse_form_body, parse_json_body, parse_query_string};
pub use pipeline::{validate_request, validate_route, ErrorReporting, PipelineOptions};
pub use types::{ParamSources, RequestContext};
