use std::fmt;
use std::str::FromStr;

/// Feature generation modes. The n-gram kinds carry a fixed window width;
/// the gap-driven kinds take their reach from the `max_gap` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    OneGram,
    TwoGram,
    ThreeGram,
    FourGram,
    FiveGram,
    GappyBigram,
    GappyBigramTagged,
    OrthogonalSparseBigram,
}

impl FeatureKind {
    /// Window width for the n-gram kinds, 0 for the gap-driven kinds.
    pub fn width(self) -> usize {
        match self {
            FeatureKind::OneGram => 1,
            FeatureKind::TwoGram => 2,
            FeatureKind::ThreeGram => 3,
            FeatureKind::FourGram => 4,
            FeatureKind::FiveGram => 5,
            _ => 0,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::OneGram => "one-gram",
            FeatureKind::TwoGram => "two-gram",
            FeatureKind::ThreeGram => "three-gram",
            FeatureKind::FourGram => "four-gram",
            FeatureKind::FiveGram => "five-gram",
            FeatureKind::GappyBigram => "gappy-bigram",
            FeatureKind::GappyBigramTagged => "gappy-bigram-tagged",
            FeatureKind::OrthogonalSparseBigram => "osb",
        };
        f.write_str(name)
    }
}

impl FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-gram" => Ok(FeatureKind::OneGram),
            "two-gram" => Ok(FeatureKind::TwoGram),
            "three-gram" => Ok(FeatureKind::ThreeGram),
            "four-gram" => Ok(FeatureKind::FourGram),
            "five-gram" => Ok(FeatureKind::FiveGram),
            "gappy-bigram" => Ok(FeatureKind::GappyBigram),
            "gappy-bigram-tagged" => Ok(FeatureKind::GappyBigramTagged),
            "osb" | "orthogonal-sparse-bigram" => Ok(FeatureKind::OrthogonalSparseBigram),
            other => Err(format!("unknown feature kind: {other}")),
        }
    }
}

/// Turn a token sequence into an ordered sequence of feature strings.
/// `max_gap` is ignored by the n-gram kinds.
pub fn generate(tokens: &[String], max_gap: usize, kind: FeatureKind) -> Vec<String> {
    match kind {
        FeatureKind::OneGram
        | FeatureKind::TwoGram
        | FeatureKind::ThreeGram
        | FeatureKind::FourGram
        | FeatureKind::FiveGram => ngrams(tokens, kind.width()),
        FeatureKind::GappyBigram => gappy_bigrams(tokens, max_gap),
        FeatureKind::GappyBigramTagged => tagged_gappy_bigrams(tokens, max_gap),
        FeatureKind::OrthogonalSparseBigram => orthogonal_sparse_bigrams(tokens, max_gap),
    }
}

/// Sliding window of exactly `n` tokens joined with single spaces. Fewer than
/// `n` tokens yields nothing; otherwise exactly L-n+1 windows, left to right.
pub fn ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// All token pairs within `max_gap` positions of each other, in traversal
/// order; the actual distance is not recorded.
pub fn gappy_bigrams(tokens: &[String], max_gap: usize) -> Vec<String> {
    let mut out = Vec::new();
    for i in 0..tokens.len() {
        for j in 1..=max_gap {
            if i + j >= tokens.len() {
                break;
            }
            out.push(format!("{} {}", tokens[i], tokens[i + j]));
        }
    }
    out
}

/// Gappy bigrams suffixed with the configured `max_gap` (not the actual gap),
/// so they can be queried against a vocabulary built from orthogonal sparse
/// bigrams without building a separate gappy model.
pub fn tagged_gappy_bigrams(tokens: &[String], max_gap: usize) -> Vec<String> {
    let mut out = Vec::new();
    for i in 0..tokens.len() {
        for j in 1..=max_gap {
            if i + j >= tokens.len() {
                break;
            }
            out.push(format!("{} {} {}", tokens[i], tokens[i + j], max_gap));
        }
    }
    out
}

/// Orthogonal sparse bigrams: each in-range pair is emitted once per distance
/// value k from its true gap minus one up to `max_gap - 1`, so a pair at gap j
/// also satisfies queries built with any larger configured gap. A `max_gap`
/// below 2 can leave the k range empty for j = max_gap; that is accepted.
pub fn orthogonal_sparse_bigrams(tokens: &[String], max_gap: usize) -> Vec<String> {
    let mut out = Vec::new();
    for i in 0..tokens.len() {
        for j in 1..=max_gap {
            if i + j >= tokens.len() {
                break;
            }
            for k in (j - 1)..max_gap {
                out.push(format!("{} {} {}", tokens[i], tokens[i + j], k));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn ngram_short_input_is_empty() {
        let t = toks(&["the", "quick"]);
        assert!(ngrams(&t, 3).is_empty());
        assert!(generate(&[], 0, FeatureKind::OneGram).is_empty());
    }

    #[test]
    fn ngram_window_count_and_order() {
        let t = toks(&["the", "quick", "brown", "fox"]);
        let grams = generate(&t, 0, FeatureKind::TwoGram);
        assert_eq!(grams, vec!["the quick", "quick brown", "brown fox"]);
        let tri = generate(&t, 0, FeatureKind::ThreeGram);
        assert_eq!(tri, vec!["the quick brown", "quick brown fox"]);
        assert_eq!(generate(&t, 0, FeatureKind::OneGram).len(), 4);
    }

    #[test]
    fn gappy_bigram_exact_sequence() {
        let t = toks(&["the", "quick", "brown", "fox"]);
        let gb = generate(&t, 2, FeatureKind::GappyBigram);
        assert_eq!(
            gb,
            vec![
                "the quick",
                "the brown",
                "quick brown",
                "quick fox",
                "brown fox"
            ]
        );
        // Count is sum over i of min(max_gap, L-1-i).
        let sum: usize = (0..t.len()).map(|i| 2usize.min(t.len() - 1 - i)).sum();
        assert_eq!(gb.len(), sum);
    }

    #[test]
    fn tagged_gappy_bigram_appends_configured_gap() {
        let t = toks(&["a", "b", "c"]);
        let gb = generate(&t, 2, FeatureKind::GappyBigramTagged);
        assert_eq!(gb, vec!["a b 2", "a c 2", "b c 2"]);
    }

    #[test]
    fn osb_emits_every_distance_from_true_gap() {
        let t = toks(&["the", "quick", "brown", "fox"]);
        let osb = generate(&t, 2, FeatureKind::OrthogonalSparseBigram);
        // i=0, j=1 yields k in 0..2.
        assert_eq!(&osb[..2], &["the quick 0", "the quick 1"]);
        // i=0, j=2 yields only k=1.
        assert_eq!(osb[2], "the brown 1");
    }

    #[test]
    fn osb_accepts_tiny_gap() {
        let t = toks(&["a", "b", "c"]);
        let osb = generate(&t, 1, FeatureKind::OrthogonalSparseBigram);
        assert_eq!(osb, vec!["a b 0", "b c 0"]);
    }

    #[test]
    fn feature_kind_round_trips_through_names() {
        for kind in [
            FeatureKind::OneGram,
            FeatureKind::FiveGram,
            FeatureKind::GappyBigram,
            FeatureKind::GappyBigramTagged,
            FeatureKind::OrthogonalSparseBigram,
        ] {
            assert_eq!(kind.to_string().parse::<FeatureKind>(), Ok(kind));
        }
        assert!("six-gram".parse::<FeatureKind>().is_err());
    }
}
