//! Command execution functions for packager operations.

mod detect;
mod package;

pub use detect::detect;
pub use package::{options, package};
