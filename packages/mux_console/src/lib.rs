// Library interface for mux_console
// The pieces wired together by the `muxconsole` binary: config, logging,
// the HTTP producer and the operator console.

pub mod config;
pub mod console;
pub mod logging;
pub mod server;

pub use config::{CONSOLE_VIEW, CliOverrides, FileConfig, LOGS_VIEW, load_config};
pub use console::{Command, Console, Outcome};
pub use server::{ServerState, SharedValue};
