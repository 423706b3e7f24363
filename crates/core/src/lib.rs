//! Core business logic for nagare.

pub mod services;

pub use services::*;
