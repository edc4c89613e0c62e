pub mod auth;
pub mod metrics;

pub use auth::{auth_middleware, AuthContext};
pub use metrics::metrics_middleware;
