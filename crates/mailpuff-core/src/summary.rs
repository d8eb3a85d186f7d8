//! Extracts what a notification needs from a raw RFC 5322 message.

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, PartType};

/// Header fields and renderable body of one mail message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSummary {
    /// `Subject`, empty when absent.
    pub subject: String,
    /// Display name of the first `From` address.
    pub from_name: String,
    /// Address of the first `From` mailbox.
    pub from_address: String,
    /// Address of the first `To` mailbox.
    pub to_address: String,
    /// `Date` header.
    pub date: Option<DateTime<Utc>>,
    /// HTML to publish; `None` when the message has no body at all.
    pub html_body: Option<String>,
}

/// Parses a raw message.
///
/// The first HTML part wins; otherwise the first text part is escaped and
/// wrapped in a wrapping `<pre>`. Unparsable input yields an empty summary.
#[must_use]
pub fn summarize(raw: &[u8]) -> MailSummary {
    let Some(message) = MessageParser::default().parse(raw) else {
        return MailSummary::default();
    };

    let from = message.from().and_then(|addresses| addresses.first());
    let to = message.to().and_then(|addresses| addresses.first());

    // mail-parser also lists converted text parts as HTML bodies; only a
    // genuine text/html part counts here.
    let html = message.html_part(0).and_then(|part| match &part.body {
        PartType::Html(html) if !html.trim().is_empty() => Some(html.to_string()),
        _ => None,
    });
    let html_body = html.or_else(|| {
        message
            .body_text(0)
            .filter(|text| !text.trim().is_empty())
            .map(|text| preformatted(&text))
    });

    MailSummary {
        subject: message.subject().unwrap_or_default().trim().to_string(),
        from_name: from
            .and_then(|addr| addr.name())
            .unwrap_or_default()
            .trim()
            .to_string(),
        from_address: from
            .and_then(|addr| addr.address())
            .unwrap_or_default()
            .trim()
            .to_string(),
        to_address: to
            .and_then(|addr| addr.address())
            .unwrap_or_default()
            .trim()
            .to_string(),
        date: message
            .date()
            .and_then(|date| DateTime::from_timestamp(date.to_timestamp(), 0)),
        html_body,
    }
}

fn preformatted(text: &str) -> String {
    format!(
        "<pre style=\"white-space:pre-wrap;word-wrap:break-word;\">{}</pre>",
        html_escape::encode_text(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_message() {
        let raw = concat!(
            "From: \"Ann Example\" <ann@example.com>\r\n",
            "To: bob@example.org\r\n",
            "Subject: Quarterly report\r\n",
            "Date: Tue, 1 Jul 2025 10:00:00 +0000\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/alternative; boundary=\"b1\"\r\n",
            "\r\n",
            "--b1\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "plain version\r\n",
            "--b1\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "<p>html version</p>\r\n",
            "--b1--\r\n",
        );

        let summary = summarize(raw.as_bytes());
        assert_eq!(summary.subject, "Quarterly report");
        assert_eq!(summary.from_name, "Ann Example");
        assert_eq!(summary.from_address, "ann@example.com");
        assert_eq!(summary.to_address, "bob@example.org");
        assert_eq!(
            summary.date.map(|d| d.to_rfc3339()),
            Some("2025-07-01T10:00:00+00:00".to_string())
        );
        assert!(summary.html_body.unwrap().contains("<p>html version</p>"));
    }

    #[test]
    fn test_text_only_message_is_escaped_into_pre() {
        let raw = concat!(
            "From: plain@example.com\r\n",
            "Subject: hi\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "a < b & <script>\r\n",
        );

        let summary = summarize(raw.as_bytes());
        assert_eq!(summary.from_name, "");
        assert_eq!(summary.from_address, "plain@example.com");
        let body = summary.html_body.unwrap();
        assert!(body.starts_with("<pre style=\"white-space:pre-wrap;word-wrap:break-word;\">"));
        assert!(body.contains("a &lt; b &amp; &lt;script&gt;"));
        assert!(body.ends_with("</pre>"));
    }

    #[test]
    fn test_no_body() {
        let raw = "From: a@example.com\r\nSubject: empty\r\n\r\n";
        let summary = summarize(raw.as_bytes());
        assert_eq!(summary.subject, "empty");
        assert_eq!(summary.html_body, None);
    }

    #[test]
    fn test_garbage_input() {
        assert_eq!(summarize(b"").html_body, None);
    }
}
