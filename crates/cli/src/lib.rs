//! Autosnap command-line front end
//!
//! Configuration layering, logging setup, the run lock and the `run`,
//! `status` and `config` commands.

pub mod cmd;
pub mod config;
pub mod locks;
pub mod logging;
pub mod util;

pub use config::{Config, ConfigError, LogFormat, LogLevel, Overrides};
pub use locks::RunLock;
