//! Command execution against the store and the monitor.

use std::sync::Arc;

use url::Url;

use crate::commands::{Command, CommandError, HELP};
use crate::health::{HttpProber, Prober};
use crate::monitor::Monitor;
use crate::scheduler::OwnerId;
use crate::store::SubscriptionStore;

/// Check that `raw` is an absolute http(s) URL with a host.
pub fn validate_url(raw: &str) -> Result<(), CommandError> {
    let parsed = Url::parse(raw).map_err(|e| CommandError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CommandError::UnsupportedScheme(raw.to_string()));
    }

    if !parsed.has_host() {
        return Err(CommandError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(())
}

pub struct CommandHandler<P = HttpProber> {
    monitor: Arc<Monitor<P>>,
    store: SubscriptionStore,
}

impl<P: Prober> CommandHandler<P> {
    pub fn new(monitor: Arc<Monitor<P>>, store: SubscriptionStore) -> Self {
        Self { monitor, store }
    }

    /// Subscribe `owner` to `url`. Returns `false` if already subscribed.
    pub fn add(&self, owner: OwnerId, url: &str) -> Result<bool, CommandError> {
        validate_url(url)?;

        let inserted = self.store.add(owner, url)?;
        // Also covers a store entry whose monitor insert was lost
        self.monitor.add_request(owner, url)?;

        if inserted {
            tracing::info!(owner = %owner, url = %url, "Subscription added");
        }
        Ok(inserted)
    }

    /// Unsubscribe by URL or by 1-based index into [`Self::list`].
    ///
    /// Returns the removed URL, or `None` if nothing matched.
    pub fn remove(&self, owner: OwnerId, target: &str) -> Result<Option<String>, CommandError> {
        let url = match target.parse::<usize>() {
            Ok(index) => {
                let urls = self.list(owner);
                if index == 0 || index > urls.len() {
                    return Err(CommandError::IndexOutOfRange {
                        index,
                        count: urls.len(),
                    });
                }
                urls[index - 1].clone()
            }
            Err(_) => target.to_string(),
        };

        let stored = self.store.remove(owner, &url)?;
        let monitored = self.monitor.remove_request(owner, &url)?;

        if stored || monitored {
            tracing::info!(owner = %owner, url = %url, "Subscription removed");
            Ok(Some(url))
        } else {
            Ok(None)
        }
    }

    /// URLs monitored for `owner`, in the order `rm <index>` uses.
    pub fn list(&self, owner: OwnerId) -> Vec<String> {
        self.store.list(owner)
    }

    /// Run a command and render the reply.
    pub fn execute(&self, command: Command) -> Result<String, CommandError> {
        match command {
            Command::Add { owner, url } => Ok(if self.add(owner, &url)? {
                format!("Endpoint {} added to monitoring", url)
            } else {
                format!("url {} is already being monitored", url)
            }),
            Command::Remove { owner, target } => Ok(match self.remove(owner, &target)? {
                Some(url) => format!("removed endpoint: {}", url),
                None => format!("endpoint {} is not monitored", target),
            }),
            Command::List { owner } => {
                let urls = self.list(owner);
                if urls.is_empty() {
                    return Ok("You don't have any active monitored endpoints".to_string());
                }
                let mut reply = String::from("endpoints:");
                for (i, url) in urls.iter().enumerate() {
                    reply.push_str(&format!("\n  {:2}. {}", i + 1, url));
                }
                Ok(reply)
            }
            Command::Help => Ok(HELP.to_string()),
        }
    }
}
