//! Long-running CLI commands.

pub mod watch;

pub use watch::{run_watch, WatchOptions};
