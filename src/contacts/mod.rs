//! Contact data handling
//!
//! Email cleaning, classification and scoring; phone normalization; record
//! emission; and the masking helpers every log site must use for contact
//! values.

pub mod email;
pub mod mask;
pub mod phone;
mod record;

pub use email::EmailType;
pub use record::{build_records, ContactRecord};
