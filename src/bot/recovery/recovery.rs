use core::fmt;
use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serenity::all::{ChannelId, GuildId, UserId};
use tracing::{error, warn};

use crate::bot::{chat_event::chat_event::EventOrigin, commands::commands::BotResult, handler::handler::ChatClient, permissions::permissions::Authorizer};

pub const ERROR_NOTICE: &str = "Error!";
pub const INTERACTION_ERROR: &str = "error executing command";

/// Why a supervised handler did not finish cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Error(String),
    Panic(String),
}

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub context: String,
    pub failure: Failure,
    pub at: DateTime<Utc>,
}

/// Runs handlers and turns any failure into an admin report plus a short-lived notice.
pub struct Recovery {
    client: Arc<dyn ChatClient>,
    auth: Arc<dyn Authorizer>,
    notice_delay: Duration,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error(msg) => write!(f, "error: {msg}"),
            Failure::Panic(msg) => write!(f, "panic: {msg}"),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guild = self.guild_id.map(|g| g.to_string()).unwrap_or_else(|| "direct message".to_string());
        writeln!(f, "⚠️ Error report ({})", self.at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Guild: {} | Channel: {} | User: {}", guild, self.channel_id, self.user_id)?;
        writeln!(f, "Command: {}", self.context)?;
        write!(f, "```{}```", self.failure)
    }
}

impl ErrorReport {
    pub fn new(origin: &EventOrigin, context: &str, failure: Failure) -> Self {
        Self {
            guild_id: origin.guild_id(),
            channel_id: origin.channel_id(),
            user_id: origin.invoker().user_id,
            context: context.to_string(),
            failure,
            at: Utc::now(),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Recovery {
    pub fn new(client: Arc<dyn ChatClient>, auth: Arc<dyn Authorizer>, notice_delay: Duration) -> Self {
        Self { client, auth, notice_delay }
    }

    /// Awaits `fut`, containing both returned errors and panics.
    ///
    /// Never panics and never returns an error; the failure, if any, is
    /// handed back only so callers can log or count it.
    pub async fn supervise<F>(&self, origin: &EventOrigin, context: &str, fut: F) -> Option<Failure>
    where
        F: Future<Output = BotResult<()>> + Send,
    {
        let failure = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => return None,
            Ok(Err(e)) => Failure::Error(e.to_string()),
            Err(panic) => Failure::Panic(panic_message(panic)),
        };

        warn!("Recovering from failure in '{}': {}", context, failure);
        self.report(ErrorReport::new(origin, context, failure.clone())).await;
        self.notify(origin).await;
        Some(failure)
    }

    async fn report(&self, report: ErrorReport) {
        let admins = self.auth.admins();
        if admins.is_empty() {
            warn!("No bot admins configured, error report dropped: {}", report.failure);
            return;
        }

        warn!("Sending error report to {} admins", admins.len());
        let content = report.to_string();
        for admin in admins {
            if let Err(e) = self.client.direct_message(admin, &content).await {
                error!("Failed to send error report to {}: {e}", admin);
            }
        }
    }

    async fn notify(&self, origin: &EventOrigin) {
        match origin {
            EventOrigin::Message(msg) => {
                let notice = match self.client.send_message(msg.channel_id, ERROR_NOTICE).await {
                    Ok(id) => id,
                    Err(e) => {
                        error!("err sending message {e}");
                        return;
                    }
                };

                tokio::time::sleep(self.notice_delay).await;
                if let Err(e) = self.client.delete_message(msg.channel_id, notice).await {
                    error!("unable to delete message {e}");
                }
            }
            EventOrigin::Interaction(interaction) => {
                if let Err(e) = self.client.edit_interaction_response(interaction, INTERACTION_ERROR).await {
                    error!("err editing interaction response {e}");
                    if let Err(e) = self.client.create_interaction_response(interaction, INTERACTION_ERROR, true).await {
                        error!("err responding to interaction {e}");
                        return;
                    }
                }

                tokio::time::sleep(self.notice_delay).await;
                if let Err(e) = self.client.delete_interaction_response(interaction).await {
                    error!("unable to delete interaction response {e}");
                }
            }
        }
    }
}
