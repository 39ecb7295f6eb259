//! Content fingerprinting: stable identity for records plus a fuzzy
//! similarity signal, so the write path can refuse (or warn about) duplicate
//! submissions. Everything in here is pure -- no storage, no config, no
//! clocks -- which is also what makes it testable in isolation.

use ::regex::Regex;
use ::sha2::{Digest, Sha256};
use ::hex;

use ::models::article::Article;

lazy_static! {
    static ref RE_SCHEME: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").unwrap();
    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Article ids look like `art_<16 hex chars>`
pub const ID_PREFIX: &'static str = "art_";
const ID_DIGEST_CHARS: usize = 16;

/// score >= HIGH (or key equality) is a blocking-grade match
pub const SCORE_HIGH: f64 = 0.95;
/// HIGH > score >= MEDIUM is a warn-grade match; below MEDIUM we stay quiet
pub const SCORE_MEDIUM: f64 = 0.85;

/// Lowercase, trim, collapse runs of whitespace. Every natural-key
/// comparison in this module goes through here first.
pub fn normalize(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").to_lowercase()
}

/// Normalize a URL for identity purposes: the scheme and any trailing slash
/// don't make it a different story.
pub fn normalize_url(url: &str) -> String {
    let normalized = normalize(url);
    let stripped = RE_SCHEME.replace(&normalized[..], "");
    String::from(stripped.trim_right_matches('/'))
}

/// Derive the stable id for an article from its natural keys. Two logically
/// identical submissions (same fields modulo case/whitespace/scheme) always
/// produce the same id.
pub fn generate_article_id(url: &str, author: &str, headline: &str) -> String {
    let key = format!("{}\n{}\n{}", normalize_url(url), normalize(author), normalize(headline));
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    let digest_hex = hex::encode(&digest[..]);
    format!("{}{}", ID_PREFIX, &digest_hex[..ID_DIGEST_CHARS])
}

/// Plain levenshtein over chars, two-row DP.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() == 0 { return b.len(); }
    if b.len() == 0 { return a.len(); }

    let mut prev: Vec<usize> = (0..(b.len() + 1)).collect();
    let mut cur: Vec<usize> = vec![0; b.len() + 1];
    for i in 0..a.len() {
        cur[0] = i + 1;
        for j in 0..b.len() {
            let sub_cost = if a[i] == b[j] { 0 } else { 1 };
            let del = prev[j + 1] + 1;
            let ins = cur[j] + 1;
            let sub = prev[j] + sub_cost;
            cur[j + 1] = del.min(ins).min(sub);
        }
        ::std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Normalized edit-distance similarity in [0, 1]. Empty vs empty is a
/// perfect match, empty vs anything else is no match at all.
pub fn similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 && len_b == 0 { return 1.0; }
    if len_a == 0 || len_b == 0 { return 0.0; }
    let max_len = if len_a > len_b { len_a } else { len_b };
    1.0 - (levenshtein(a, b) as f64) / (max_len as f64)
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum MatchType {
    #[serde(rename = "exact-key")]
    ExactKey,
    #[serde(rename = "fuzzy-text")]
    FuzzyText,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
}

/// One existing record a candidate collided with.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Match {
    /// id of the existing record
    pub id: String,
    /// similarity in [0, 1]
    pub score: f64,
    pub match_type: MatchType,
    pub confidence: Confidence,
}

impl Match {
    pub fn is_high(&self) -> bool {
        self.confidence == Confidence::High
    }
}

/// Score a candidate article against a set of existing ones. Exact key
/// matches (normalized URL, or the content-derived id itself) short-circuit
/// to a High/1.0 match and skip fuzzy scoring for that record; otherwise the
/// headlines are compared by normalized edit distance and anything under the
/// Medium cutoff is excluded. Results come back sorted best-first.
///
/// Policy belongs to the caller: only a High match may block a write, and
/// Medium matches ride along as warnings.
pub fn detect_duplicates(candidate: &Article, existing: &Vec<Article>) -> Vec<Match> {
    let cand_url = candidate.url.as_ref().map(|x| normalize_url(x)).unwrap_or(String::new());
    let cand_headline = candidate.headline.as_ref().map(|x| normalize(x)).unwrap_or(String::new());

    let mut matches: Vec<Match> = Vec::new();
    for other in existing {
        let other_id = match other.id.as_ref() {
            Some(x) => x.clone(),
            None => continue,
        };

        let url_hit = {
            let other_url = other.url.as_ref().map(|x| normalize_url(x)).unwrap_or(String::new());
            cand_url != "" && cand_url == other_url
        };
        let id_hit = match candidate.id.as_ref() {
            Some(id) => *id == other_id,
            None => false,
        };
        if url_hit || id_hit {
            matches.push(Match {
                id: other_id,
                score: 1.0,
                match_type: MatchType::ExactKey,
                confidence: Confidence::High,
            });
            continue;
        }

        let other_headline = other.headline.as_ref().map(|x| normalize(x)).unwrap_or(String::new());
        let score = similarity(&cand_headline[..], &other_headline[..]);
        if score >= SCORE_HIGH {
            matches.push(Match { id: other_id, score: score, match_type: MatchType::FuzzyText, confidence: Confidence::High });
        } else if score >= SCORE_MEDIUM {
            matches.push(Match { id: other_id, score: score, match_type: MatchType::FuzzyText, confidence: Confidence::Medium });
        }
    }
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(::std::cmp::Ordering::Equal));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: Option<&str>, url: &str, author: &str, headline: &str) -> Article {
        let mut art = Article::new();
        art.id = id.map(|x| String::from(x));
        art.url = Some(String::from(url));
        art.author = Some(String::from(author));
        art.headline = Some(String::from(headline));
        art
    }

    #[test]
    fn id_generation_is_deterministic() {
        let id1 = generate_article_id("http://x.com/a", "Jane", "Man killed");
        let id2 = generate_article_id("http://x.com/a", "Jane", "Man killed");
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), ID_PREFIX.len() + 16);
        assert!(id1.starts_with(ID_PREFIX));
    }

    #[test]
    fn id_generation_normalizes() {
        // scheme, case, and whitespace padding don't change identity
        let id1 = generate_article_id("http://x.com/a", "Jane", "Man killed");
        let id2 = generate_article_id("HTTPS://X.com/a/", "  jane ", "man   KILLED");
        assert_eq!(id1, id2);
        // but an actually-different input does
        let id3 = generate_article_id("http://x.com/b", "Jane", "Man killed");
        assert!(id1 != id3);
        let id4 = generate_article_id("http://x.com/a", "Joan", "Man killed");
        assert!(id1 != id4);
    }

    #[test]
    fn similarity_bounds() {
        let fixtures = vec![
            ("", ""),
            ("", "man killed"),
            ("man killed", "man killed"),
            ("man killed", "woman killed"),
            ("shooting on 5th street", "stabbing on 5th avenue"),
        ];
        for (a, b) in fixtures {
            let s = similarity(a, b);
            assert!(s >= 0.0 && s <= 1.0, "similarity({:?}, {:?}) = {} out of bounds", a, b, s);
            assert_eq!(similarity(a, b), similarity(b, a));
        }
        assert_eq!(similarity("man killed", "man killed"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "man killed"), 0.0);
        assert_eq!(similarity("man killed", ""), 0.0);
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn exact_key_match_short_circuits() {
        // identical url/author/headline against one existing record
        let cand = article(None, "http://x.com/a", "Jane", "Man killed");
        let existing = vec![article(Some("art_abc"), "http://x.com/a", "Jane", "Man killed")];
        let matches = detect_duplicates(&cand, &existing);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "art_abc");
        assert_eq!(matches[0].score, 1.0);
        assert_eq!(matches[0].confidence, Confidence::High);
        assert_eq!(matches[0].match_type, MatchType::ExactKey);
    }

    #[test]
    fn fuzzy_tiers_and_exclusion() {
        let cand = article(None, "http://x.com/new", "Jane", "man shot dead on 5th street");
        let existing = vec![
            // one char off: high confidence fuzzy
            article(Some("art_close"), "http://y.com/1", "Joan", "man shot dead on 5th streot"),
            // a few chars off: medium
            article(Some("art_kinda"), "http://y.com/2", "Joan", "men shot dead on 6th streets"),
            // nothing alike: excluded
            article(Some("art_far"), "http://y.com/3", "Joan", "city council passes budget"),
        ];
        let matches = detect_duplicates(&cand, &existing);
        assert_eq!(matches.len(), 2);
        // sorted descending by score
        assert!(matches[0].score >= matches[1].score);
        assert_eq!(matches[0].id, "art_close");
        assert_eq!(matches[0].confidence, Confidence::High);
        assert_eq!(matches[0].match_type, MatchType::FuzzyText);
        assert_eq!(matches[1].id, "art_kinda");
        assert_eq!(matches[1].confidence, Confidence::Medium);
    }

    #[test]
    fn empty_headlines_dont_false_positive() {
        // both headlines empty compares as similarity 1.0 by contract, and
        // that's a real match (two records with no text and different urls
        // are probably the same placeholder entry)
        let cand = article(None, "http://x.com/a", "", "");
        let existing = vec![article(Some("art_blank"), "http://y.com/b", "", "")];
        let matches = detect_duplicates(&cand, &existing);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 1.0);
    }
}
