//! Free-text expense parser
//!
//! Amount-first grammar: the first numeric token is the amount,
//! everything else is the description, optionally followed by
//! `with <name>, <name> and <name>`.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Placeholder used when the text carries only an amount
pub const DEFAULT_DESCRIPTION: &str = "expense";

/// Largest amount the ledger column holds (NUMERIC(10,2)).
/// 9_999_999_999 at scale 2, split into 32-bit words.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// A token made only of number characters: sign, currency, digits, `,` and `.`,
/// plus trailing punctuation. Words like `3pm` or `2nd` are not candidates.
static NUMERIC_LOOKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?[$€£¥]?[-+]?[0-9][0-9,.]*[$€£¥]?[;:!?]*$").expect("static regex")
});

/// Full amount grammar. No thousands separators, at most two fractional digits.
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<sign>[-+])?[$€£¥]?(?P<sign2>[-+])?(?P<int>[0-9]+)(?:\.(?P<frac>[0-9]{1,2}))?[$€£¥]?$",
    )
    .expect("static regex")
});

/// The word "and" between two names, or dangling at either end of a piece.
static AND_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s+)and(?:\s+|$)").expect("static regex"));

/// Successfully parsed expense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpense {
    /// Always carries exactly two decimal places
    pub amount: Decimal,
    pub description: String,
    /// Names as typed, in order of appearance
    pub involved: Vec<String>,
}

/// Why a line could not be turned into an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("no amount found")]
    NoAmount,
    #[error("amount must be a positive number with at most two decimals")]
    InvalidAmount,
}

/// Parse a raw chat line into an expense.
pub fn parse_expense(raw: &str) -> Result<ParsedExpense, ParseFailure> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseFailure::NoAmount);
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let (amount_index, amount_token) = tokens
        .iter()
        .enumerate()
        .find(|(_, token)| NUMERIC_LOOKING.is_match(token))
        .ok_or(ParseFailure::NoAmount)?;

    let amount = parse_amount(amount_token)?;

    let rest: Vec<&str> = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != amount_index)
        .map(|(_, token)| *token)
        .collect();
    let (description, involved) = split_description(&rest);

    Ok(ParsedExpense {
        amount,
        description,
        involved,
    })
}

fn parse_amount(token: &str) -> Result<Decimal, ParseFailure> {
    let token = token.trim_end_matches([',', ';', ':', '.', '!', '?']);
    let caps = AMOUNT.captures(token).ok_or(ParseFailure::InvalidAmount)?;

    let negative = [caps.name("sign"), caps.name("sign2")]
        .into_iter()
        .flatten()
        .any(|m| m.as_str() == "-");
    let int = caps.name("int").map_or("0", |m| m.as_str());
    let literal = match caps.name("frac") {
        Some(frac) => format!("{int}.{}", frac.as_str()),
        None => int.to_string(),
    };

    // Overflowing digit runs fail here rather than being truncated
    let mut amount = Decimal::from_str(&literal).map_err(|_| ParseFailure::InvalidAmount)?;
    if negative {
        amount.set_sign_negative(true);
    }

    if amount <= Decimal::ZERO || amount > MAX_AMOUNT {
        return Err(ParseFailure::InvalidAmount);
    }

    Ok(normalize_amount(amount))
}

/// Round to cents and fix the scale so `20` renders as `20.00`.
pub fn normalize_amount(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded
}

fn split_description(rest: &[&str]) -> (String, Vec<String>) {
    let with_at = rest.iter().position(|t| t.eq_ignore_ascii_case("with"));

    let (before, after) = match with_at {
        Some(i) => (&rest[..i], Some(&rest[i + 1..])),
        None => (rest, None),
    };

    let description = if before.is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        before.join(" ")
    };

    let involved = after.map(|names| split_names(&names.join(" "))).unwrap_or_default();

    (description, involved)
}

/// Commas first, then "and" inside each piece, so `Bob, and Carol` yields `Carol`.
fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .flat_map(|piece| AND_SEPARATOR.split(piece.trim()))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
