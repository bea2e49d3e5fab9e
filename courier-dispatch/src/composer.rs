//! Binds a recipient into the message template.

use courier_common::config::{ConfigurationError, MessageConfig};
use courier_smtp::{MessageBuilder, client};

use crate::types::{OutgoingMessage, Recipient};

/// Renders the template and subject for each recipient and wraps them in a
/// complete message.
///
/// Rendering is a pure function of the template and the recipient; only the
/// `Date` and `Message-ID` headers differ between two compositions.
#[derive(Debug, Clone)]
pub struct Composer {
    template: String,
    subject: String,
    sender_address: String,
    sender_name: Option<String>,
    name_token: String,
    address_token: String,
    fallback_name: String,
    content_type: &'static str,
}

impl Composer {
    #[must_use]
    pub fn new(config: &MessageConfig, template: String, sender_address: String) -> Self {
        Self {
            template,
            subject: config.subject.clone(),
            sender_address,
            sender_name: config.sender_name.clone(),
            name_token: config.name_token.clone(),
            address_token: config.address_token.clone(),
            fallback_name: config.fallback_name.clone(),
            content_type: config.content_type.mime(),
        }
    }

    /// Reads the template named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Unreadable`] if the template cannot be read.
    pub async fn load(
        config: &MessageConfig,
        sender_address: String,
    ) -> Result<Self, ConfigurationError> {
        let template = tokio::fs::read_to_string(&config.template_path)
            .await
            .map_err(|e| ConfigurationError::Unreadable {
                path: config.template_path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self::new(config, template, sender_address))
    }

    #[must_use]
    pub fn sender_address(&self) -> &str {
        &self.sender_address
    }

    /// The salutation name: the first word of the display name, title-cased.
    #[must_use]
    pub fn first_name(&self, display_name: &str) -> String {
        display_name
            .split_whitespace()
            .next()
            .map_or_else(|| self.fallback_name.clone(), title_case)
    }

    fn substitute(&self, text: &str, recipient: &Recipient) -> String {
        text.replace(&self.name_token, &self.first_name(&recipient.display_name))
            .replace(&self.address_token, &recipient.address)
    }

    #[must_use]
    pub fn render_body(&self, recipient: &Recipient) -> String {
        self.substitute(&self.template, recipient)
    }

    #[must_use]
    pub fn render_subject(&self, recipient: &Recipient) -> String {
        self.substitute(&self.subject, recipient)
    }

    /// Builds the full message for `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`client::ClientError::InvalidMessage`] if the message cannot be
    /// assembled, for instance when the sender address is empty.
    pub fn compose(&self, recipient: &Recipient) -> client::Result<OutgoingMessage> {
        let body = self.render_body(recipient);

        let mut builder = MessageBuilder::new()
            .from(self.sender_address.clone())
            .to(recipient.address.clone())
            .subject(self.render_subject(recipient))
            .content_type(self.content_type)
            .body(body.clone());

        if let Some(name) = &self.sender_name {
            builder = builder.sender_name(name.clone());
        }

        Ok(OutgoingMessage {
            sender: self.sender_address.clone(),
            recipient: recipient.address.clone(),
            body,
            data: builder.build()?,
        })
    }
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the
/// rest, so `"o'BRIEN"` becomes `"O'Brien"`.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_start = true;

    for c in word.chars() {
        if c.is_alphabetic() {
            if at_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_start = false;
        } else {
            out.push(c);
            at_start = true;
        }
    }

    out
}
