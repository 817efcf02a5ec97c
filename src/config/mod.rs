//! Configuration module
//!
//! Settings are read from environment variables with defaults for every
//! field, validated before use.
//!
//! # Example
//!
//! ```no_run
//! use spindel::config::load_settings;
//!
//! let settings = load_settings().unwrap();
//! println!("Crawling as: {}", settings.bot_name);
//! ```

mod env;
mod types;
mod validation;

pub use env::{load_settings, settings_fingerprint};
pub use types::Settings;
