//! Shared helpers for staging and tool execution.

pub mod fs;
pub mod ignore;
pub mod process;
pub mod tool_detection;
