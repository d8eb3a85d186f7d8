//! `mailpuff` - mail-to-chat bridge
//!
//! Polls an IMAP mailbox, publishes each unseen message as a short-lived
//! secret page and announces it in a Telegram chat.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mailpuff_core::{Bridge, ChatNotifier, ImapMailSource, TelegramNotifier};
use mailpuff_telegram::Bot;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailpuff=info,mailpuff_core=info,mailpuff_imap=warn,mailpuff_telegram=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    info!(
        imap_host = %config.imap_host,
        mailbox = %config.imap_mailbox,
        chat_id = config.telegram_chat_id,
        mark_action = ?config.mark_action,
        "starting mailpuff"
    );

    let mail = Arc::new(ImapMailSource::new(config.imap_settings()));
    let telegram = Arc::new(TelegramNotifier::new(Bot::new(config.telegram_token.clone())));
    let bridge = Bridge::new(
        &config.bridge_config(),
        mail,
        Arc::clone(&telegram) as Arc<dyn ChatNotifier>,
        telegram,
    )
    .context("invalid VIEWER_URL_BASE")?;

    let listener = TcpListener::bind(config.http_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;

    let (shutdown, _) = broadcast::channel::<()>(1);
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
        }
        let _ = signal.send(());
    });

    bridge.run(listener, &shutdown).await?;
    info!("mailpuff stopped");
    Ok(())
}
