use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
}

/// Tokenize one phrase (line) of text into surface-form words, NFKC-normalized
/// and lowercased. No stemming or stopword removal: generated features must
/// match a vocabulary built from surface forms.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|mat| mat.as_str().to_string())
        .collect()
}

/// Split a document into per-line phrases and tokenize each, dropping lines
/// with no tokens. Feature windows never cross a phrase boundary.
pub fn phrases(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(tokenize)
        .filter(|tokens| !tokens.is_empty())
        .collect()
}
