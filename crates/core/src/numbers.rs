//! Phone-number normalization and region-aware comparison.
//!
//! Two numbers are "the same" iff their canonical forms compare equal, or
//! the loose comparison matches (one side dialed without a country code).
//! Canonicalization is pure and idempotent.

/// Minimum trailing digits two numbers must share for a loose match when
/// only one side carries a country code.
const MIN_LOOSE_MATCH_DIGITS: usize = 7;

/// Canonical comparable form of a phone number for a given region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedNumber(String);

impl NormalizedNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digits(&self) -> &str {
        self.0.strip_prefix('+').unwrap_or(&self.0)
    }
}

impl std::fmt::Display for NormalizedNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Country calling codes and trunk prefixes for the regions the device can
/// report. Unlisted regions fall back to no-country-code canonical forms,
/// which still compare correctly within one region.
fn region_info(region: &str) -> Option<(&'static str, Option<char>)> {
    let (cc, trunk) = match region.to_ascii_uppercase().as_str() {
        "US" | "CA" => ("1", None),
        "GB" => ("44", Some('0')),
        "IN" => ("91", Some('0')),
        "DE" => ("49", Some('0')),
        "FR" => ("33", Some('0')),
        "IT" => ("39", None),
        "ES" => ("34", None),
        "AU" => ("61", Some('0')),
        "JP" => ("81", Some('0')),
        "BR" => ("55", Some('0')),
        "MX" => ("52", None),
        "NL" => ("31", Some('0')),
        _ => return None,
    };
    Some((cc, trunk))
}

/// Strip separators and map keypad letters to digits, keeping a leading
/// `+`. Returns `None` when nothing dialable remains.
pub fn normalize(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '0'..='9' => out.push(c),
            '+' if i == 0 || out.is_empty() => {
                if out.is_empty() {
                    out.push('+');
                }
            }
            'a'..='z' | 'A'..='Z' => out.push(keypad_digit(c)),
            // Separators and formatting characters.
            _ => {}
        }
    }
    if out.chars().any(|c| c.is_ascii_digit()) {
        Some(out)
    } else {
        None
    }
}

fn keypad_digit(c: char) -> char {
    match c.to_ascii_uppercase() {
        'A'..='C' => '2',
        'D'..='F' => '3',
        'G'..='I' => '4',
        'J'..='L' => '5',
        'M'..='O' => '6',
        'P'..='S' => '7',
        'T'..='V' => '8',
        _ => '9',
    }
}

/// Canonicalize a raw number against a region: `+<cc><national number>`
/// when the region is known, bare digits otherwise. Already-canonical
/// input passes through unchanged.
pub fn canonicalize(raw: &str, region: &str) -> Option<NormalizedNumber> {
    let normalized = normalize(raw)?;
    if let Some(rest) = normalized.strip_prefix('+') {
        // Already carries a country code; idempotent.
        return Some(NormalizedNumber(format!("+{}", rest)));
    }
    let Some((cc, trunk)) = region_info(region) else {
        return Some(NormalizedNumber(normalized));
    };
    let mut national = normalized.as_str();
    if let Some(t) = trunk {
        if national.len() > 1 {
            national = national.strip_prefix(t).unwrap_or(national);
        }
    }
    // A full international number dialed without '+'.
    if national.len() >= 11 && national.starts_with(cc) {
        return Some(NormalizedNumber(format!("+{}", national)));
    }
    Some(NormalizedNumber(format!("+{}{}", cc, national)))
}

/// Region-aware comparison: canonical equality, with a loose fallback for
/// the case where one side was stored without enough prefix information
/// (at least [`MIN_LOOSE_MATCH_DIGITS`] trailing digits must agree).
pub fn are_same(a: &NormalizedNumber, b: &NormalizedNumber) -> bool {
    if a == b {
        return true;
    }
    let (da, db) = (a.digits(), b.digits());
    let (short, long) = if da.len() <= db.len() { (da, db) } else { (db, da) };
    short.len() >= MIN_LOOSE_MATCH_DIGITS && long.ends_with(short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("+1-555-0100"), Some("+15550100".to_string()));
        assert_eq!(normalize("(555) 010-0199"), Some("5550100199".to_string()));
        assert_eq!(normalize("555.0100"), Some("5550100".to_string()));
        assert_eq!(normalize("---"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn test_normalize_maps_keypad_letters() {
        assert_eq!(normalize("1-800-FLOWERS"), Some("18003569377".to_string()));
    }

    #[test]
    fn test_canonicalize_adds_country_code() {
        assert_eq!(
            canonicalize("5550100", "US").unwrap().as_str(),
            "+15550100"
        );
        assert_eq!(
            canonicalize("+1-555-0100", "US").unwrap().as_str(),
            "+15550100"
        );
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize("07911 123456", "GB").unwrap();
        let twice = canonicalize(once.as_str(), "GB").unwrap();
        assert_eq!(once, twice);

        let once = canonicalize("555-0100", "US").unwrap();
        let twice = canonicalize(once.as_str(), "US").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_canonicalize_strips_trunk_prefix() {
        assert_eq!(
            canonicalize("07911123456", "GB").unwrap().as_str(),
            "+447911123456"
        );
    }

    #[test]
    fn test_canonicalize_full_international_without_plus() {
        assert_eq!(
            canonicalize("919876543210", "IN").unwrap().as_str(),
            "+919876543210"
        );
    }

    #[test]
    fn test_unknown_region_falls_back_to_digits() {
        assert_eq!(canonicalize("5550100", "ZZ").unwrap().as_str(), "5550100");
    }

    #[test]
    fn test_are_same_local_vs_international() {
        let stored = canonicalize("+1-555-010-0123", "US").unwrap();
        let incoming = canonicalize("5550100123", "US").unwrap();
        assert!(are_same(&stored, &incoming));

        let other = canonicalize("5550199123", "US").unwrap();
        assert!(!are_same(&stored, &other));
    }

    #[test]
    fn test_loose_match_requires_enough_digits() {
        let a = canonicalize("0100", "ZZ").unwrap();
        let b = canonicalize("5550100", "ZZ").unwrap();
        assert!(!are_same(&a, &b)); // 4 shared digits is not a match
    }
}
