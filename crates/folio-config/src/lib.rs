//! # Folio Configuration Library
//!
//! Typed configuration for the folio pagination engine: default and maximum
//! page sizes, the stale-cursor policy, and client-side search behaviour.
//!
//! ## Features
//!
//! - Multi-format support (YAML, TOML, JSON)
//! - Validation of page-size bounds
//! - JSON Schema export for editor tooling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use folio_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("folio.toml").await?;
//!     println!("default page size: {}", config.default_page_size);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod loader;
mod pagination;

pub use loader::*;
pub use pagination::*;
