//! Reads the ordered recipient list from a CSV file with a header row.
//!
//! Fields may be quoted; inside quotes, commas and line breaks are literal and
//! `""` is an escaped quote. Columns are located by header name, compared
//! case-insensitively, so extra columns and any column order are accepted.

use std::path::Path;

use courier_common::{
    config::{ConfigurationError, RecipientSourceConfig},
    tracing,
};
use mailparse::MailAddr;

use crate::types::Recipient;

/// Loads every usable row from the configured file, in file order.
///
/// # Errors
///
/// [`ConfigurationError::Unreadable`] if the file cannot be read,
/// [`ConfigurationError::Malformed`] if it is empty or lacks a required column.
pub async fn load(config: &RecipientSourceConfig) -> Result<Vec<Recipient>, ConfigurationError> {
    let content = tokio::fs::read_to_string(&config.path)
        .await
        .map_err(|e| ConfigurationError::Unreadable {
            path: config.path.clone(),
            reason: e.to_string(),
        })?;

    parse(&content, config, &config.path)
}

/// Parses CSV `content`. `origin` is only used in error messages.
///
/// # Errors
///
/// See [`load`].
pub fn parse(
    content: &str,
    config: &RecipientSourceConfig,
    origin: &Path,
) -> Result<Vec<Recipient>, ConfigurationError> {
    let malformed = |reason: String| ConfigurationError::Malformed {
        path: origin.to_path_buf(),
        reason,
    };

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = parse_records(content).into_iter();

    let header = records
        .next()
        .ok_or_else(|| malformed("no header row".to_string()))?;

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                malformed(format!(
                    "missing required column '{name}' (found: {})",
                    header.join(", ")
                ))
            })
    };
    let name_index = column(&config.name_column)?;
    let address_index = column(&config.address_column)?;

    let mut recipients = Vec::new();
    // Header is row 1.
    for (row, record) in records.enumerate().map(|(i, r)| (i + 2, r)) {
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let address = record.get(address_index).map_or("", |a| a.trim());
        if !is_mailbox(address) {
            tracing::warn!(row, address, "Skipping row without a usable address");
            continue;
        }

        let display_name = record.get(name_index).map_or("", |n| n.trim());
        recipients.push(Recipient::new(display_name, address));
    }

    Ok(recipients)
}

/// A single bare mailbox, e.g. `leo@gmail.com`.
fn is_mailbox(address: &str) -> bool {
    if address.is_empty() {
        return false;
    }

    mailparse::addrparse(address).is_ok_and(|list| {
        list.len() == 1
            && matches!(&list[0], MailAddr::Single(info)
                if info.display_name.is_none() && info.addr.contains('@'))
    })
}

/// Splits CSV text into records of fields. Accepts `\n` and `\r\n` endings.
fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_default(content: &str) -> Result<Vec<Recipient>, ConfigurationError> {
        parse(
            content,
            &RecipientSourceConfig::default(),
            &PathBuf::from("contacts.csv"),
        )
    }

    #[test]
    fn test_parse_records_quoting() {
        let records = parse_records("a,\"b,c\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",x\n");
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b,c".to_string(), "say \"hi\"".to_string()],
                vec!["multi\nline".to_string(), "x".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_records_without_trailing_newline() {
        assert_eq!(
            parse_records("a,b\nc,"),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_recipients_in_source_order() {
        let recipients =
            parse_default("Nombre,Email\nAna Ruiz,ana@x.com\nLeo, leo@gmail.com \n").unwrap();
        assert_eq!(
            recipients,
            vec![
                Recipient::new("Ana Ruiz", "ana@x.com"),
                Recipient::new("Leo", "leo@gmail.com"),
            ]
        );
    }

    #[test]
    fn test_columns_located_by_name() {
        let recipients =
            parse_default("\u{feff}email,Ciudad,NOMBRE\nana@x.com,Lima,Ana\n").unwrap();
        assert_eq!(recipients, vec![Recipient::new("Ana", "ana@x.com")]);
    }

    #[test]
    fn test_missing_column_is_configuration_error() {
        let err = parse_default("Nombre,Correo\nAna,ana@x.com\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::Malformed { .. }));
        assert!(err.to_string().contains("Email"));
    }

    #[test]
    fn test_empty_file_is_configuration_error() {
        assert!(parse_default("").is_err());
    }

    #[test]
    fn test_unusable_rows_skipped() {
        let recipients = parse_default(
            "Nombre,Email\nNadie,\n,,\nRoto,not-an-address\nLeo,leo@gmail.com\nSin Email\n",
        )
        .unwrap();
        assert_eq!(recipients, vec![Recipient::new("Leo", "leo@gmail.com")]);
    }

    #[test]
    fn test_missing_name_kept_empty() {
        let recipients = parse_default("Nombre,Email\n,ana@x.com\n").unwrap();
        assert_eq!(recipients, vec![Recipient::new("", "ana@x.com")]);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecipientSourceConfig {
            path: dir.path().join("contacts.csv"),
            ..RecipientSourceConfig::default()
        };
        assert!(matches!(
            load(&config).await,
            Err(ConfigurationError::Unreadable { .. })
        ));
    }
}
