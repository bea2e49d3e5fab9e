//! SASL mechanisms used for submission (RFC 4954).

use base64::{Engine, engine::general_purpose::STANDARD};

/// Authentication mechanisms the client can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// `AUTH PLAIN` with an initial response.
    Plain,
    /// `AUTH LOGIN`, username and password in two challenge rounds.
    Login,
}

impl Mechanism {
    /// Pick a mechanism from the EHLO capability lines.
    ///
    /// PLAIN is preferred. When the server advertises no AUTH line at all,
    /// PLAIN is attempted anyway and the server's answer decides.
    #[must_use]
    pub fn select<'a>(capabilities: impl IntoIterator<Item = &'a str>) -> Self {
        let mechanisms: Vec<String> = capabilities
            .into_iter()
            .filter_map(|line| {
                let upper = line.to_ascii_uppercase();
                upper
                    .strip_prefix("AUTH ")
                    .or_else(|| upper.strip_prefix("AUTH="))
                    .map(|rest| {
                        rest.split_whitespace()
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    })
            })
            .flatten()
            .collect();

        let offers = |name: &str| mechanisms.iter().any(|m| m == name);
        if offers("LOGIN") && !offers("PLAIN") {
            Self::Login
        } else {
            Self::Plain
        }
    }
}

/// `base64("\0user\0password")`
pub(super) fn plain_initial_response(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{username}\0{password}"))
}

pub(super) fn login_token(value: &str) -> String {
    STANDARD.encode(value)
}
