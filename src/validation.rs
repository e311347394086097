//! Field cleaners for raw scraped values.
//!
//! Each cleaner returns `None` when the value cannot be salvaged. All of them are
//! idempotent: cleaning an already-cleaned value returns it unchanged.

use regex::Regex;
use std::sync::OnceLock;

/// Shortest and longest accepted phone numbers, counted in digits.
pub const PHONE_MIN_DIGITS: usize = 10;
pub const PHONE_MAX_DIGITS: usize = 13;

fn name_disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Letters (with combining marks), digits, whitespace, hyphen, period, ampersand, apostrophe
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{M}\p{N}\s\-.&']").expect("name pattern compiles"))
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("email pattern compiles")
    })
}

/// Strip disallowed characters from a business name and normalize its capitalization.
///
/// Returns `None` when nothing printable is left.
pub fn clean_name(raw: &str, stopwords: &[String]) -> Option<String> {
    let stripped = name_disallowed_chars().replace_all(raw.trim(), "");
    let name = capitalize_business_name(&stripped, stopwords);

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Capitalize every word except stopwords, which stay lower-case unless they open the name.
///
/// Words are re-joined with single spaces.
///
/// ```
/// use lead_processor::validation::capitalize_business_name;
///
/// let stopwords = vec!["de".to_string(), "la".to_string()];
/// assert_eq!(
///     capitalize_business_name("TORTILLERÍA DE LA ESQUINA", &stopwords),
///     "Tortillería de la Esquina"
/// );
/// ```
pub fn capitalize_business_name(name: &str, stopwords: &[String]) -> String {
    let lowered = name.to_lowercase();

    lowered
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && stopwords.iter().any(|s| s == word) {
                word.to_string()
            } else {
                capitalize_word(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut out = String::with_capacity(word.len());
    // Multi-char uppercase forms (ß -> SS) keep only their first char upper-case,
    // so a second pass produces the same word.
    let mut upper = first.to_uppercase();
    out.extend(upper.next());
    out.extend(upper.flat_map(char::to_lowercase));
    out.push_str(chars.as_str());
    out
}

/// Count ASCII digits in a phone string.
pub fn digit_count(phone: &str) -> usize {
    phone.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Keep digits, `+`, whitespace, hyphens and parentheses; accept 10 to 13 digits.
///
/// The formatted (not digit-only) string is returned, trimmed.
pub fn clean_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '+' | '-' | '(' | ')'))
        .collect();
    let cleaned = cleaned.trim();

    let digits = digit_count(cleaned);
    if (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits) {
        Some(cleaned.to_string())
    } else {
        tracing::debug!("Discarding phone with {} digits: {}", digits, raw);
        None
    }
}

/// Check a (trimmed, lower-cased) address against `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Trim and lower-case an email, keeping it only if it is well-formed.
pub fn clean_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();

    if is_valid_email(&email) {
        Some(email)
    } else {
        if !email.is_empty() {
            tracing::debug!("Discarding invalid email: {}", raw);
        }
        None
    }
}
