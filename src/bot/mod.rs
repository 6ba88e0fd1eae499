use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::bot::{chat_event::chat_event::ChatEvent, dispatcher::dispatcher::Dispatcher};

pub mod state;
pub mod chat_event;
pub mod arguments;
pub mod commands;
pub mod schema;
pub mod trigger;
pub mod dispatcher;
pub mod recovery;
pub mod guild;
pub mod permissions;
pub mod handler;
pub mod platforms;

/// Drains the gateway channel, one task per event.
pub async fn run_event_loop(dispatcher: Arc<Dispatcher>, mut rx: UnboundedReceiver<ChatEvent>) {
    while let Some(event) = rx.recv().await {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(event).await;
        });
    }

    info!("Event channel closed, dispatch loop stopped");
}
