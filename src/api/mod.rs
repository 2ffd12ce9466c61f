pub mod expand_query;
pub mod handlers;
pub mod routes;

pub use expand_query::*;
pub use handlers::*;
pub use routes::*;
