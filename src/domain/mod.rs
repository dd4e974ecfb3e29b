//! # Domain Layer
//!
//! Core business logic, models, and services.
//! This layer is independent of external frameworks and infrastructure.

pub mod models;
pub mod services;

pub use models::*;
pub use services::*;
