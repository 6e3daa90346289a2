pub mod call;
pub mod config;
pub mod utils;
pub mod watch;

pub use call::{handle_call_command, CallOptions};
pub use config::{handle_config_command, load_config, ConfigCommands};
pub use watch::{handle_watch_command, WatchOptions};
