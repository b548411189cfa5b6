//! Command surface.
//!
//! # Data Flow
//! ```text
//! text line ("add 1 https://...")
//!     → Command::parse
//!     → handler.rs (validate URL → store → monitor)
//!     → reply text
//! ```
//!
//! # Design Decisions
//! - URL validation happens here, the monitor probes whatever it is given
//! - The store is written before the monitor on add and on remove, so a
//!   crash never leaves a probe without a durable subscription behind it
//! - `rm` takes either the URL or its 1-based position in `list`

pub mod console;
pub mod handler;

use thiserror::Error;

use crate::monitor::MonitorError;
use crate::scheduler::OwnerId;
use crate::store::StoreError;

pub use handler::CommandHandler;

pub const HELP: &str = "\
commands:
  add <owner> <url>            start monitoring an http(s) endpoint
  rm <owner> <url|index>       stop monitoring (index as shown by list)
  list <owner>                 show monitored endpoints
  help                         show this message";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("url {0} is not http/https endpoint")]
    UnsupportedScheme(String),

    #[error("index {index} is out of range, {count} endpoints are monitored")]
    IndexOutOfRange { index: usize, count: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

/// One parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { owner: OwnerId, url: String },
    Remove { owner: OwnerId, target: String },
    List { owner: OwnerId },
    Help,
}

fn parse_owner(raw: &str, usage: &'static str) -> Result<OwnerId, CommandError> {
    raw.parse().map_err(|_| CommandError::Usage(usage))
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        const ADD: &str = "add <owner> <url>";
        const RM: &str = "rm <owner> <url|index>";
        const LIST: &str = "list <owner>";

        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default().trim_start_matches('/');
        let args: Vec<&str> = parts.collect();

        match name {
            "add" => match args.as_slice() {
                [owner, url] => Ok(Command::Add {
                    owner: parse_owner(owner, ADD)?,
                    url: url.to_string(),
                }),
                _ => Err(CommandError::Usage(ADD)),
            },
            "rm" => match args.as_slice() {
                [owner, target] => Ok(Command::Remove {
                    owner: parse_owner(owner, RM)?,
                    target: target.to_string(),
                }),
                _ => Err(CommandError::Usage(RM)),
            },
            "list" => match args.as_slice() {
                [owner] => Ok(Command::List {
                    owner: parse_owner(owner, LIST)?,
                }),
                _ => Err(CommandError::Usage(LIST)),
            },
            "help" | "start" => Ok(Command::Help),
            _ => Err(CommandError::Usage("help")),
        }
    }
}
