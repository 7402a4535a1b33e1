//! Text normalization for obfuscation-resistant matching.

/// Look-alike substitutions, applied one after another over the whole text.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('0', "o"),
    ('@', "o"),
    ('1', "i"),
    ('!', "i"),
    ('|', "i"),
    ('l', "i"),
    ('3', "e"),
    ('4', "a"),
    ('5', "s"),
    ('$', "s"),
    ('7', "t"),
    ('8', "b"),
    ('9', "g"),
];

/// Canonicalize `text` for matching.
///
/// Lowercases, replaces look-alike digits and symbols with the letter they
/// imitate, drops separators (whitespace, `.`, `_`, `-`, `*`) and finally
/// drops every remaining non-word character. Empty input yields empty output.
pub fn normalize(text: &str) -> String {
    let mut canonical = text.to_lowercase();

    for &(from, to) in SUBSTITUTIONS {
        if canonical.contains(from) {
            canonical = canonical.replace(from, to);
        }
    }

    canonical
        .chars()
        .filter(|&c| !is_separator(c))
        .filter(|&c| is_word_char(c))
        .collect()
}

/// Characters people put between letters to dodge matching.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | '_' | '-' | '*')
}

/// Unicode-aware `\w`: letters, digits and underscore.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
