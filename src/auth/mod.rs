pub mod gateway;
pub mod identity;
pub mod middleware;
pub mod rate_limit;
pub mod role;
pub mod session;
pub mod validate;
