pub mod middleware;
pub mod models;

pub use middleware::caller_middleware;
pub use models::{CurrentCaller, RequireUser};
