//! Startup configuration, read once from flags or environment variables.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use mailpuff_core::{BridgeConfig, ImapSettings, MarkAction, StoreConfig};

/// Command-line and environment configuration.
#[derive(Parser)]
#[command(name = "mailpuff", version)]
#[command(about = "Publish unseen mail as ephemeral pages and announce them in Telegram")]
pub struct Config {
    /// IMAP server host
    #[arg(long, env = "IMAP_HOST")]
    pub imap_host: String,

    /// IMAP server port
    #[arg(long, env = "IMAP_PORT", default_value_t = 993)]
    pub imap_port: u16,

    /// IMAP login
    #[arg(long, env = "IMAP_USERNAME")]
    pub imap_username: String,

    /// IMAP password
    #[arg(long, env = "IMAP_PASSWORD", hide_env_values = true)]
    pub imap_password: String,

    /// Implicit TLS (true) or plain TCP (false)
    #[arg(long, env = "IMAP_TLS", default_value = "true", value_parser = BoolishValueParser::new(), action = ArgAction::Set)]
    pub imap_tls: bool,

    /// Mailbox to poll
    #[arg(long, env = "IMAP_MAILBOX", default_value = "INBOX")]
    pub imap_mailbox: String,

    /// Time between polls, e.g. 60s or 5m
    #[arg(long, env = "IMAP_POLL_INTERVAL", default_value = "60s", value_parser = parse_poll_interval)]
    pub imap_poll_interval: Duration,

    /// Mark mail as read when its page is first opened
    #[arg(long, env = "IMAP_MARK_SEEN", default_value = "false", value_parser = BoolishValueParser::new(), action = ArgAction::Set)]
    pub imap_mark_seen: bool,

    /// Limit for TCP connect plus TLS handshake
    #[arg(long, env = "IMAP_CONNECT_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    pub imap_connect_timeout: Duration,

    /// Limit for a single IMAP command
    #[arg(long, env = "IMAP_IO_TIMEOUT", default_value = "2m", value_parser = parse_duration)]
    pub imap_io_timeout: Duration,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// Chat receiving notifications
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true, value_parser = parse_chat_id)]
    pub telegram_chat_id: i64,

    /// Public base URL of the viewer, e.g. https://mail.example.com/view
    #[arg(long, env = "VIEWER_URL_BASE")]
    pub viewer_url_base: String,

    /// HTTP listen address; ":port" listens on all interfaces
    #[arg(long, env = "HTTP_ADDR", default_value = ":8080", value_parser = parse_listen_addr)]
    pub http_addr: String,

    /// Page lifetime
    #[arg(long, env = "VIEWER_PAGE_TTL", default_value = "48h", value_parser = parse_duration)]
    pub viewer_page_ttl: Duration,

    /// Views allowed per page; 0 means unlimited
    #[arg(long, env = "VIEWER_PAGE_MAX_VIEWS", default_value_t = 3)]
    pub viewer_page_max_views: u32,

    /// How mark-as-read is offered: none, button or link
    #[arg(long, env = "MARK_ACTION", default_value = "button")]
    pub mark_action: MarkAction,
}

impl Config {
    /// Mail server settings.
    pub fn imap_settings(&self) -> ImapSettings {
        ImapSettings {
            host: self.imap_host.clone(),
            port: self.imap_port,
            tls: self.imap_tls,
            username: self.imap_username.clone(),
            password: self.imap_password.clone(),
            mailbox: self.imap_mailbox.clone(),
            connect_timeout: self.imap_connect_timeout,
            io_timeout: self.imap_io_timeout,
        }
    }

    /// Bridge settings.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            chat_id: self.telegram_chat_id,
            viewer_url_base: self.viewer_url_base.clone(),
            mark_action: self.mark_action,
            mark_seen_on_view: self.imap_mark_seen,
            poll_interval: self.imap_poll_interval,
            store: StoreConfig {
                default_ttl: self.viewer_page_ttl,
                default_max_views: self.viewer_page_max_views,
            },
        }
    }
}

/// Parses `90`, `90s`, `15m`, `48h`, `1h30m` or `250ms`.
///
/// A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let invalid = || format!("invalid duration '{input}'");
    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "" => return Err(format!("missing unit in duration '{input}'")),
            unit => return Err(format!("unknown unit '{unit}' in duration '{input}'")),
        };
        rest = &rest[unit_len..];
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(invalid)?;
    }
    Ok(total)
}

/// Parses a poll interval of at least one second.
pub fn parse_poll_interval(input: &str) -> Result<Duration, String> {
    let interval = parse_duration(input)?;
    if interval < Duration::from_secs(1) {
        return Err(format!("poll interval '{input}' must be at least 1s"));
    }
    Ok(interval)
}

/// Parses a chat id, which must not be zero.
pub fn parse_chat_id(input: &str) -> Result<i64, String> {
    match input.trim().parse::<i64>() {
        Ok(0) => Err("chat id must not be 0".to_string()),
        Ok(id) => Ok(id),
        Err(e) => Err(format!("invalid chat id '{input}': {e}")),
    }
}

/// Expands `:port` to `0.0.0.0:port`.
pub fn parse_listen_addr(input: &str) -> Result<String, String> {
    let addr = input.trim();
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| format!("listen address '{input}' has no port"))?;
    port.parse::<u16>()
        .map_err(|e| format!("invalid port in listen address '{input}': {e}"))?;
    if host.is_empty() {
        Ok(format!("0.0.0.0:{port}"))
    } else {
        Ok(addr.to_string())
    }
}
