//! Common utilities and shared types for nagare.
//!
//! This crate provides foundational components used across all nagare
//! crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Identity**: The resolved caller identity via [`Identity`]
//!
//! # Example
//!
//! ```no_run
//! use nagare_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod identity;

pub use config::Config;
pub use error::{AppError, AppResult, with_deadline};
pub use id::IdGenerator;
pub use identity::Identity;
