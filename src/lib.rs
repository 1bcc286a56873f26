// Library interface for testing

// Declare all modules
pub mod avatar;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod object_store;
pub mod progress;
pub mod queries;
pub mod repository;
pub mod schema;
pub mod serve;
pub mod service;
pub mod user;

// Re-export the schema version for convenience
pub use constants::SCHEMA_VERSION;
pub use error::{AppError, Result};
