mod error_handler;
mod rate_limit;

pub use error_handler::log_errors;
pub use rate_limit::{
    ClientIdentity, apply_rate_limit_headers, client_identity, quota_guard,
};
