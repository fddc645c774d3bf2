//! Canonical slug normalization.
//!
//! [`normalize`] is the only place display text becomes a URL fragment.
//! Heading anchors, sub-item lookups, stored entity keys and the CLI all call
//! it, so an anchor computed while rendering markdown always matches the one a
//! table of contents links to.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Letters that canonical decomposition cannot reduce to ASCII.
///
/// Each entry maps to exactly one ASCII letter. Case is preserved here and
/// folded at the end of [`normalize`].
const TRANSLITERATIONS: &[(char, char)] = &[
    ('ı', 'i'),
    ('İ', 'I'),
    ('ğ', 'g'),
    ('Ğ', 'G'),
    ('ş', 's'),
    ('Ş', 'S'),
    ('ç', 'c'),
    ('Ç', 'C'),
    ('ö', 'o'),
    ('Ö', 'O'),
    ('ü', 'u'),
    ('Ü', 'U'),
    ('ß', 's'),
    ('ẞ', 'S'),
    ('æ', 'a'),
    ('Æ', 'A'),
    ('œ', 'o'),
    ('Œ', 'O'),
    ('ø', 'o'),
    ('Ø', 'O'),
    ('đ', 'd'),
    ('Đ', 'D'),
    ('ð', 'd'),
    ('Ð', 'D'),
    ('ł', 'l'),
    ('Ł', 'L'),
    ('þ', 't'),
    ('Þ', 'T'),
];

/// Punctuation removed before separators are collapsed.
///
/// `-` and `_` are not listed: hyphens are separators and
/// underscores survive into the slug.
const DENYLIST: &[char] = &[
    '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '.', '/', ':', ';', '<', '=',
    '>', '?', '@', '[', '\\', ']', '^', '`', '{', '|', '}', '~', '‘', '’', '“', '”', '«', '»',
    '…', '–', '—', '¿', '¡', '·',
];

fn transliterate(c: char) -> char {
    TRANSLITERATIONS
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

/// Convert arbitrary display text into a canonical slug.
///
/// Steps, in order: transliterate the fixed letter table, decompose (NFD) and
/// drop combining marks, drop denylisted punctuation, collapse each run of
/// whitespace or hyphens into one hyphen (never leading or trailing), and
/// lowercase. Characters outside the table and the denylist pass through.
///
/// The function is total and idempotent.
///
/// ```
/// use slugline::slug::normalize;
///
/// assert_eq!(normalize("Özel Ürün"), "ozel-urun");
/// assert_eq!(normalize("  Fast   Onboarding! "), "fast-onboarding");
/// assert_eq!(normalize(&normalize("Crème Brûlée")), normalize("Crème Brûlée"));
/// ```
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let substituted: String = text.chars().map(transliterate).collect();

    let mut slug = String::with_capacity(substituted.len());
    let mut pending_separator = false;

    for c in substituted
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !DENYLIST.contains(c))
    {
        if c.is_whitespace() || c == '-' {
            pending_separator = !slug.is_empty();
            continue;
        }
        if pending_separator {
            slug.push('-');
            pending_separator = false;
        }
        slug.extend(c.to_lowercase());
    }

    slug
}

/// Turn a slug back into a display label: hyphens become spaces and every
/// word is title-cased.
///
/// This is a lossy heuristic for display only. It is never used to match
/// anything.
pub fn humanize(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
