//! Phone number normalization for the messaging provider.
//!
//! The provider expects international numbers. Anything that does not reduce
//! to a strict `+<countrycode><digits>` form is rejected locally, before any
//! outbound call.

/// Strip formatting characters, keeping only digits and a leading `+`.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// True for `+` followed by a non-zero digit and 1 to 14 further digits.
pub fn is_valid(number: &str) -> bool {
    let Some(rest) = number.strip_prefix('+') else {
        return false;
    };
    if !(2..=15).contains(&rest.len()) {
        return false;
    }
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if ('1'..='9').contains(&c) => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_digit())
}

/// Canonical international form, or `None` when the number is malformed.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned = clean(raw);
    is_valid(&cleaned).then_some(cleaned)
}

/// The wire form the provider wants: canonical digits without the `+`.
pub fn wire_format(normalized: &str) -> &str {
    normalized.strip_prefix('+').unwrap_or(normalized)
}
