//! Update delivery: long polling or a webhook, plus the health endpoint.

/// Liveness endpoint
pub mod health;

use crate::config::Settings;
use crate::error::BotError;
use std::net::SocketAddr;
use teloxide::dispatching::{DefaultKey, Dispatcher};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::{webhooks, Polling};
use tokio::net::TcpListener;
use tracing::{info, warn};
use url::Url;

/// How updates reach the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// `getUpdates` long polling
    Polling,
    /// Telegram pushes updates to this public URL
    Webhook(Url),
}

impl Transport {
    /// Webhook mode when `WEBHOOK_URL` is set, polling otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ConfigInvalid`] if `WEBHOOK_URL` is malformed.
    pub fn from_settings(settings: &Settings) -> Result<Self, BotError> {
        Ok(settings.webhook()?.map_or(Self::Polling, Self::Webhook))
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Webhook(_) => "webhook",
        }
    }
}

/// Address the HTTP server binds to.
#[must_use]
pub fn bind_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Runs the dispatcher on `transport` until Ctrl-C.
///
/// The health router is served on `port` in both modes; in webhook mode it
/// shares the server with the webhook route.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the webhook cannot be
/// registered with Telegram.
pub async fn run(
    bot: Bot,
    mut dispatcher: Dispatcher<Bot, teloxide::RequestError, DefaultKey>,
    transport: Transport,
    port: u16,
) -> anyhow::Result<()> {
    let addr = bind_addr(port);
    info!("Starting in {} mode", transport.name());

    match transport {
        Transport::Polling => {
            let listener = TcpListener::bind(addr).await?;
            let health = tokio::spawn(health::serve(
                listener,
                health::router(),
                std::future::pending(),
            ));

            // getUpdates is refused while a webhook is registered
            let updates = Polling::builder(bot).delete_webhook().await.build();
            dispatcher
                .dispatch_with_listener(
                    updates,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;

            health.abort();
        }
        Transport::Webhook(url) => {
            let options = webhooks::Options::new(addr, url);
            let (updates, stop_flag, webhook_router) =
                webhooks::axum_to_router(bot, options).await?;

            let app = webhook_router.merge(health::router());
            let listener = TcpListener::bind(addr).await?;
            let server = tokio::spawn(health::serve(listener, app, stop_flag));

            dispatcher
                .dispatch_with_listener(
                    updates,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;

            if let Err(e) = server.await {
                warn!("HTTP server task ended abnormally: {e}");
            }
        }
    }

    info!("Dispatcher stopped");
    Ok(())
}
