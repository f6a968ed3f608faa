#![forbid(unsafe_code)]

pub mod command;
pub mod config;
pub mod console;
pub mod events;
pub mod messages;
pub mod service;

pub use command::{CommandContext, CommandOutcome, CommandSender, COMMAND_NAME};
pub use config::{ConfigError, PurgeConfig};
pub use events::{Action, HostEvent, Reaction, StateDelta};
pub use messages::Messages;
pub use service::{ConfigSource, Lifecycle, PurgeService, ReloadSummary, RemovalReport, ServiceError};
