//! Turns one line of free text into an amount and a description.
//!
//! Two surface forms are accepted, order-insensitive: `<amount> <description>`
//! and `<description> <amount>`. The amount is a non-negative decimal with at
//! most two fractional digits. Anything else is a malformed line.

use crate::error::ParseError;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

lazy_static! {
    // Amount-first is preferred; amount-last is the fallback. The alternation
    // order encodes that preference, so "120 450" reads as 120 spent on "450".
    static ref EXPENSE_LINE: Regex =
        Regex::new(r"^(?:(\d+(?:\.\d{1,2})?)\s+(.+)|(.+?)\s+(\d+(?:\.\d{1,2})?))$").unwrap();
}

/// The raw parse result for one line: how much, and on what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpense {
    pub amount: Decimal,
    /// Title-cased per word, single-spaced, never empty.
    pub description: String,
}

/// Parses one line of chat text into an expense.
///
/// Leading and trailing whitespace is insignificant. On success the
/// description is title-cased word by word and internal whitespace runs are
/// collapsed to single spaces. A line with no description (e.g. a bare
/// number) is malformed.
pub fn parse_line(line: &str) -> Result<ParsedExpense, ParseError> {
    let trimmed = line.trim();
    let malformed = || ParseError::MalformedLine(trimmed.to_string());

    let caps = EXPENSE_LINE.captures(trimmed).ok_or_else(malformed)?;
    let (amount_token, raw_description) = match (caps.get(1), caps.get(2)) {
        (Some(amount), Some(description)) => (amount.as_str(), description.as_str()),
        _ => match (caps.get(3), caps.get(4)) {
            (Some(description), Some(amount)) => (amount.as_str(), description.as_str()),
            _ => return Err(malformed()),
        },
    };

    let amount = Decimal::from_str(amount_token).map_err(|_| malformed())?;
    let description = title_case(raw_description);
    if description.is_empty() {
        return Err(malformed());
    }

    Ok(ParsedExpense {
        amount,
        description,
    })
}

/// Uppercases the first character of each word and lowercases the rest,
/// rejoining with single spaces.
fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
