pub mod config;
pub mod core;
pub mod error;
pub mod files;
pub mod invoker;
pub mod log;
pub mod scopes;
pub mod tools;
pub mod util;

pub use error::{Error, Result};
