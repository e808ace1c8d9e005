//! School Library Server
//!
//! REST JSON backend for a school library: staff accounts, borrowers
//! (students and teachers), the resource catalogue with per-resource stock
//! counters, loans, library-wide loan policy and reports.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
