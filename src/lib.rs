pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod payment;
pub mod persistence;
pub mod store;
pub mod types;
