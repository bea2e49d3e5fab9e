//! SMTP client implementation.
//!
//! # Example
//!
//! ```no_run
//! use courier_smtp::client::{MessageBuilder, SmtpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = SmtpClient::connect_tls("smtp.example.com:465", "smtp.example.com".into(), false).await?;
//! client.read_greeting().await?;
//! client.ehlo("client.example.com").await?;
//! client.authenticate("user@example.com", "secret").await?;
//!
//! let message = MessageBuilder::new()
//!     .from("user@example.com")
//!     .to("friend@example.org")
//!     .subject("Hello")
//!     .body("Hi there")
//!     .build()?;
//!
//! client.mail_from("user@example.com").await?;
//! client.rcpt_to("friend@example.org").await?;
//! client.data().await?;
//! client.send_data(&message).await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod connection;
mod error;
mod message;
mod response;
mod smtp_client;

pub use auth::Mechanism;
pub use error::{ClientError, Result};
pub use message::{MessageBuilder, encode_header_value};
pub use response::{Response, ResponseLine};
pub use smtp_client::SmtpClient;
