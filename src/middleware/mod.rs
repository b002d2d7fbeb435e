//! Request pipeline stages.
//!
//! Each stage has the same `(ServiceRequest, Next<B>)` shape and is mounted
//! with `actix_web::middleware::from_fn`, so the order of `.wrap` calls is
//! the order of the pipeline. Request logging is outermost; rate limiting
//! runs on the API scope only.

mod logging;
mod rate_limit;

pub use logging::request_logging;
pub use rate_limit::{client_id, rate_limit};
