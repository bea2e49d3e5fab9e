//! Single-part message assembly for personalised bulk sends.

use std::fmt::Write;

use base64::{Engine, engine::general_purpose::STANDARD};

use super::error::{ClientError, Result};

/// Base64 body lines are wrapped at this width (RFC 2045 section 6.8).
const LINE_WIDTH: usize = 76;

/// Builder for an RFC 5322 message with a single text part.
///
/// Non-ASCII subjects and display names are encoded as RFC 2047 words and the
/// body travels base64-encoded, so the output is always 7-bit clean.
///
/// # Examples
///
/// ```
/// use courier_smtp::client::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .sender_name("Equipo Finanzas")
///     .to("recipient@example.com")
///     .subject("Hola")
///     .html()
///     .body("<p>Hola</p>")
///     .build()
///     .unwrap();
///
/// assert!(message.contains("Content-Type: text/html; charset=utf-8"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    sender_name: Option<String>,
    to: Vec<String>,
    subject: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<String>,
    content_type: Option<&'static str>,
    message_id_domain: Option<String>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From address.
    #[must_use]
    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(email.into());
        self
    }

    /// Display name shown alongside the From address.
    #[must_use]
    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Adds a recipient to the To header.
    #[must_use]
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.to.push(email.into());
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a custom header. Headers are written in insertion order.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, content: impl Into<String>) -> Self {
        self.body = Some(content.into());
        self
    }

    /// Marks the body as `text/html`.
    #[must_use]
    pub const fn html(mut self) -> Self {
        self.content_type = Some("text/html");
        self
    }

    /// Sets the body MIME type explicitly. Defaults to `text/plain`.
    #[must_use]
    pub const fn content_type(mut self, mime: &'static str) -> Self {
        self.content_type = Some(mime);
        self
    }

    /// Domain used on the right-hand side of the generated Message-ID.
    /// Defaults to the domain of the From address.
    #[must_use]
    pub fn message_id_domain(mut self, domain: impl Into<String>) -> Self {
        self.message_id_domain = Some(domain.into());
        self
    }

    /// Assembles the message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidMessage`] if the From address or every
    /// recipient is missing, or a header would break the message framing.
    pub fn build(self) -> Result<String> {
        let from = self
            .from
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| ClientError::InvalidMessage("Missing From address".to_string()))?;

        if self.to.is_empty() {
            return Err(ClientError::InvalidMessage("Missing recipient".to_string()));
        }

        for (name, value) in &self.headers {
            if name.is_empty() || name.contains([':', ' ', '\r', '\n']) {
                return Err(ClientError::InvalidMessage(format!(
                    "Invalid header name '{name}'"
                )));
            }
            if value.contains(['\r', '\n']) {
                return Err(ClientError::InvalidMessage(format!(
                    "Header '{name}' contains a line break"
                )));
            }
        }

        let domain = self
            .message_id_domain
            .as_deref()
            .or_else(|| from.rsplit_once('@').map(|(_, d)| d))
            .unwrap_or("localhost");

        let mut message = String::with_capacity(1024);

        // Infallible: writing into a String.
        let _ = write!(message, "Date: {}\r\n", chrono::Utc::now().to_rfc2822());
        match self.sender_name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => {
                let _ = write!(message, "From: {} <{from}>\r\n", display_name(name));
            }
            None => {
                let _ = write!(message, "From: {from}\r\n");
            }
        }
        let _ = write!(message, "To: {}\r\n", self.to.join(", "));
        if let Some(subject) = &self.subject {
            let _ = write!(message, "Subject: {}\r\n", encode_header_value(subject));
        }
        let _ = write!(message, "Message-ID: <{}@{domain}>\r\n", ulid::Ulid::new());

        for (name, value) in &self.headers {
            let _ = write!(message, "{name}: {}\r\n", encode_header_value(value));
        }

        let _ = write!(message, "MIME-Version: 1.0\r\n");
        let _ = write!(
            message,
            "Content-Type: {}; charset=utf-8\r\n",
            self.content_type.unwrap_or("text/plain")
        );
        let _ = write!(message, "Content-Transfer-Encoding: base64\r\n");
        message.push_str("\r\n");

        message.push_str(&wrapped_base64(self.body.unwrap_or_default().as_bytes()));

        Ok(message)
    }
}

/// Encodes a header value as an RFC 2047 `B` word when it is not plain ASCII.
///
/// ASCII input is returned unchanged.
#[must_use]
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value))
    }
}

/// A display name safe to place before `<address>`.
fn display_name(name: &str) -> String {
    if !name.is_ascii() {
        return encode_header_value(name);
    }
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || "!#$%&'*+-/=?^_`{|}~".contains(c))
    {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn wrapped_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH * 2 + 2);

    // The alphabet is ASCII, so byte offsets are char boundaries.
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        out.push_str(line);
        out.push_str("\r\n");
        rest = tail;
    }

    out
}
