//! Disease-name normalisation.
//!
//! Free-text disease names are mapped onto canonical rule keys: an exact key
//! match wins, otherwise the longest alias fragment contained in the name.

/// Lower-case, trim and collapse internal whitespace. Typographic
/// apostrophes become ASCII so "Parkinson’s" and "Parkinson's" agree.
pub fn normalise_disease_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(['\u{2019}', '\u{2018}'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Key of the longest `(fragment, key)` pair whose fragment occurs in
/// `haystack`. On equal length the earlier pair wins.
pub fn longest_fragment<'a, I>(haystack: &str, pairs: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut best: Option<(&'a str, &'a str)> = None;
    for (fragment, key) in pairs {
        if fragment.is_empty() || !haystack.contains(fragment) {
            continue;
        }
        match best {
            Some((current, _)) if current.len() >= fragment.len() => {}
            _ => best = Some((fragment, key)),
        }
    }
    best.map(|(_, key)| key)
}
