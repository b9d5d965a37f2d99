//! Glue for the external tools leaf tasks launch.

mod command;
mod node_modules;

pub use command::{ExternalTool, ToolOutput, ToolVars};
pub use node_modules::{link_directory, provide};
