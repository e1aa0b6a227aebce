//! Sync domain models and pure algorithms.

mod filter;
mod log_model;
mod source;
mod tuning;
mod window;

pub use filter::*;
pub use log_model::*;
pub use source::*;
pub use tuning::*;
pub use window::*;
