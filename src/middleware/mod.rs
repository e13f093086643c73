pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod tenant;
pub mod validate;

pub use auth::{AuthUser, RequireAdmin};
pub use rate_limit::ApiRateLimiter;
pub use tenant::TenantErp;
pub use validate::{ValidJson, ValidQuery};
