//! Korean personal names, accepted only near a labelling keyword.

use std::sync::LazyLock;

use regex::Regex;

/// 2 to 4 Hangul syllables at the start of the text, ending on a word boundary.
static NAME_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[가-힣]{2,4}\b").unwrap());

/// Items on each side of the candidate that make up its context window.
pub const CONTEXT_RADIUS: usize = 3;

/// Largest keyword-to-candidate gap, in words, that still counts as a label.
pub const MAX_WORD_DISTANCE: usize = 2;

/// Keywords that label a nearby name.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "환자",
    "환자명",
    "성명",
    "이름",
    "보호자",
    "담당자",
    "patient",
    "name",
    "guardian",
    "contact person",
];

/// Returns the name candidate at the start of `text`, if any.
pub fn candidate(text: &str) -> Option<&str> {
    NAME_CANDIDATE.find(text.trim_start()).map(|m| m.as_str())
}

/// Masks a name by character count.
///
/// Two characters keep the first, three keep the first two, four keep the
/// first two and the last. Shorter inputs never panic: empty stays empty and
/// a single character gains one asterisk.
pub fn mask_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    match chars.as_slice() {
        [] => String::new(),
        [first] | [first, _] => format!("{}*", first),
        [first, second, _] => format!("{}{}*", first, second),
        [first, second, .., last] => format!("{}{}*{}", first, second, last),
    }
}

/// Checks whether any keyword appears within [`MAX_WORD_DISTANCE`] words of
/// the item at `index`, looking at the [`CONTEXT_RADIUS`] items on each side.
///
/// The window is the items joined by single spaces and lower-cased; distance
/// is the difference in the number of whitespace-separated words preceding
/// the keyword and the candidate.
pub fn has_keyword_nearby(texts: &[&str], index: usize, keywords: &[String]) -> bool {
    if index >= texts.len() {
        return false;
    }
    let start = index.saturating_sub(CONTEXT_RADIUS);
    let end = (index + CONTEXT_RADIUS + 1).min(texts.len());

    let mut window = String::new();
    let mut candidate_offset = 0;
    for (i, text) in texts[start..end].iter().enumerate() {
        if i > 0 {
            window.push(' ');
        }
        let lowered = text.to_lowercase();
        if start + i == index {
            candidate_offset = window.len() + (lowered.len() - lowered.trim_start().len());
        }
        window.push_str(&lowered);
    }

    let words_before = |pos: usize| window[..pos].split_whitespace().count();
    let candidate_words = words_before(candidate_offset);

    keywords.iter().filter(|k| !k.is_empty()).any(|keyword| {
        window
            .match_indices(keyword.as_str())
            .any(|(pos, _)| words_before(pos).abs_diff(candidate_words) <= MAX_WORD_DISTANCE)
    })
}
