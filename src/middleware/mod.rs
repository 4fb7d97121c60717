pub mod auth;
pub mod sanitize;

pub use auth::Authentication;
pub use sanitize::Sanitized;
