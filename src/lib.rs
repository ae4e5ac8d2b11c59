// Re-export modules
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod utils;

// Re-export models
pub mod models {
    // Common models used throughout the application
    pub use crate::db::models::*;
}
