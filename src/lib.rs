pub mod config;
pub mod expression;
pub mod session;
pub mod types;
