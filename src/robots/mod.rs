//! Robots.txt handling
//!
//! Parsing and per-origin caching of robots.txt policies, including
//! Crawl-delay extraction.

mod cache;
mod parser;

pub use cache::{RobotsCache, RobotsDecision};
pub use parser::RobotsPolicy;
