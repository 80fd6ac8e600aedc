//! 🎟️ Ticket keys: `TKTS-1234`, `tkts-1234`, or just `1234` if you're in a hurry.
//!
//! Two jobs live here:
//! - [`TicketKey::parse`]: validate user input *before* anything touches the network.
//! - [`TicketKeyScanner`]: fish every `PREFIX-<digits>` out of free text (mail subjects, bodies).

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::{FetchError, FetchResult};

/// 🎟️ A validated, upper-cased ticket identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketKey(String);

impl TicketKey {
    /// 🔍 Turn user input into a key.
    ///
    /// - surrounding whitespace is ignored
    /// - a bare digit string gets the project prefix glued on
    /// - anything else must look like `PREFIX-<digits>` (any case)
    pub fn parse(input: &str, prefix: &str) -> FetchResult<Self> {
        let trimmed = input.trim();
        let invalid = || FetchError::InvalidTicketKey {
            input: input.to_string(),
            prefix: prefix.to_string(),
        };

        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self(format!("{}-{}", prefix.to_uppercase(), trimmed)));
        }

        let (head, digits) = trimmed.split_once('-').ok_or_else(invalid)?;
        let digits_ok = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        if !head.eq_ignore_ascii_case(prefix) || !digits_ok {
            return Err(invalid());
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 🔦 Finds ticket mentions in text. Case-insensitive in, upper-case out.
#[derive(Debug, Clone)]
pub struct TicketKeyScanner {
    pattern: Regex,
}

impl TicketKeyScanner {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&format!(r"{}-\d+", regex::escape(prefix)))
            .case_insensitive(true)
            .build()?;
        Ok(Self { pattern })
    }

    /// 📋 Every match in `text`, upper-cased, in order of appearance (duplicates included).
    pub fn scan<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        self.pattern
            .find_iter(text)
            .map(|found| found.as_str().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_bare_digits_get_adopted_by_the_project() {
        let key = TicketKey::parse("1234", "TKTS").unwrap();
        assert_eq!(key.as_str(), "TKTS-1234");
        assert_eq!(TicketKey::parse("  77 ", "TKTS").unwrap().as_str(), "TKTS-77");
    }

    #[test]
    fn the_one_where_lowercase_keys_stand_up_straight() {
        assert_eq!(TicketKey::parse("tkts-42", "TKTS").unwrap().to_string(), "TKTS-42");
    }

    #[test]
    fn the_one_where_impostors_are_turned_away_at_the_door() {
        for nonsense in ["", "abc", "TKTS-", "TKTS-12a", "OPS-12", "TKTS12", "-12", "TKTS--12"] {
            let err = TicketKey::parse(nonsense, "TKTS").unwrap_err();
            assert!(
                matches!(err, FetchError::InvalidTicketKey { .. }),
                "'{nonsense}' should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn the_one_where_the_scanner_shouts_every_mention() {
        let scanner = TicketKeyScanner::new("TKTS").unwrap();
        let found: Vec<String> = scanner
            .scan("Please prioritise tkts-100 and TKTS-200 (dup: Tkts-100), not OPS-5")
            .collect();
        assert_eq!(found, vec!["TKTS-100", "TKTS-200", "TKTS-100"]);
    }
}
