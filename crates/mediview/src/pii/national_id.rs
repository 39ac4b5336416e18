//! Korean resident registration numbers (`YYMMDD-NNNNNNN`).
//!
//! A number only needs non-digit neighbours, so it is found even when OCR
//! glues it to a label (`주민등록번호990101-1234567`) or a suffix.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

// The leading non-digit is part of the match; the trailing one is checked by
// hand so that it stays available as the next match's leading boundary.
static RESIDENT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([0-9]{6})-?([0-9]{7})").unwrap());

/// Number of leading digits left visible after masking.
const VISIBLE_DIGITS: usize = 7;
const MASK: &str = "******";

/// One plausible resident number inside a larger text.
struct Found {
    span: Range<usize>,
    digits: String,
}

/// True if the 13 digits carry a possible birth month and day.
fn is_plausible(digits: &str) -> bool {
    let field = |range: Range<usize>| digits.get(range).and_then(|s| s.parse::<u32>().ok());
    matches!(
        (field(2..4), field(4..6)),
        (Some(month), Some(day)) if (1..=12).contains(&month) && (1..=31).contains(&day)
    )
}

fn find_all(text: &str) -> impl Iterator<Item = Found> + '_ {
    RESIDENT_NUMBER.captures_iter(text).filter_map(move |caps| {
        let (birth, serial) = (caps.get(1)?, caps.get(2)?);
        if text[serial.end()..].starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        let digits = format!("{}{}", birth.as_str(), serial.as_str());
        is_plausible(&digits).then(|| Found {
            span: birth.start()..serial.end(),
            digits,
        })
    })
}

/// True if `text` contains at least one plausible resident number.
pub fn contains(text: &str) -> bool {
    find_all(text).next().is_some()
}

/// Replaces each plausible resident number with its first seven digits
/// followed by six asterisks. The hyphen is dropped; surrounding text is kept.
pub fn mask(text: &str) -> String {
    let mut masked = String::with_capacity(text.len());
    let mut last = 0;
    for found in find_all(text) {
        masked.push_str(&text[last..found.span.start]);
        masked.push_str(&found.digits[..VISIBLE_DIGITS]);
        masked.push_str(MASK);
        last = found.span.end;
    }
    masked.push_str(&text[last..]);
    masked
}
