pub mod matcher;
pub mod parser;
pub mod types;

pub use matcher::RouteTable;
pub use parser::parse_route_pattern;
pub use types::{HttpMethod, Route, RouteMatch};
