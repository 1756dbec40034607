use std::collections::BTreeSet;
use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use copilot_core::domain::sentiment::{Confidence, SentimentLabel, SentimentScore};

use crate::providers::{
    Enrichment, NlpEnricher, SentenceSentiment, SentimentDetail, NO_ENTITIES, NO_KEY_PHRASES,
};

const POSITIVE_TERMS: [&str; 12] = [
    "comfortable",
    "confident",
    "excited",
    "glad",
    "good",
    "great",
    "growth",
    "happy",
    "love",
    "optimistic",
    "pleased",
    "thrilled",
];

const NEGATIVE_TERMS: [&str; 12] = [
    "afraid",
    "anxious",
    "bad",
    "concerned",
    "debt",
    "lose",
    "loss",
    "nervous",
    "scared",
    "stressed",
    "unhappy",
    "worried",
];

const FINANCIAL_TERMS: [&str; 14] = [
    "annuity",
    "bonds",
    "college",
    "conservative",
    "dividends",
    "equities",
    "income",
    "inheritance",
    "mortgage",
    "pension",
    "portfolio",
    "retirement",
    "savings",
    "stocks",
];

fn pii_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d[\d\- ]{2,}\d").expect("valid pii pattern"))
}

/// Offline enricher scoring sentences against a small keyword lexicon.
#[derive(Clone, Debug, Default)]
pub struct LexiconEnricher;

impl LexiconEnricher {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, utterance: &str) -> Enrichment {
        let sentences = split_sentences(utterance);
        let scored: Vec<SentenceSentiment> = sentences
            .iter()
            .map(|sentence| SentenceSentiment {
                text: sentence.to_string(),
                score: score_tokens(&tokenize(sentence)),
            })
            .collect();

        let sentiment = (!scored.is_empty()).then(|| SentimentDetail {
            overall: score_tokens(&tokenize(utterance)),
            sentences: scored,
        });

        Enrichment {
            key_phrases: extract_key_phrases(utterance),
            entities: extract_entities(&sentences),
            pii_redacted: redact_pii(utterance),
            sentiment,
        }
    }
}

#[async_trait]
impl NlpEnricher for LexiconEnricher {
    async fn enrich(&self, utterance: &str) -> Result<Enrichment> {
        Ok(self.analyze(utterance))
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| sentence.chars().any(char::is_alphanumeric))
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|character: char| !character.is_alphanumeric() && character != '\'')
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

fn score_tokens(tokens: &[String]) -> SentimentScore {
    let positive = tokens.iter().filter(|token| POSITIVE_TERMS.contains(&token.as_str())).count();
    let negative = tokens.iter().filter(|token| NEGATIVE_TERMS.contains(&token.as_str())).count();

    let total = positive + negative;
    if total == 0 {
        return SentimentScore::new(SentimentLabel::Neutral, Confidence::new(0.1, 0.1, 0.8));
    }

    let positive_share = positive as f64 / total as f64;
    let confidence =
        Confidence::new(0.05 + 0.8 * positive_share, 0.05 + 0.8 * (1.0 - positive_share), 0.1);
    let label = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => SentimentLabel::Positive,
        std::cmp::Ordering::Less => SentimentLabel::Negative,
        std::cmp::Ordering::Equal => SentimentLabel::Mixed,
    };
    SentimentScore::new(label, confidence)
}

fn extract_key_phrases(text: &str) -> String {
    let phrases: BTreeSet<String> = tokenize(text)
        .into_iter()
        .filter(|token| {
            FINANCIAL_TERMS.contains(&token.as_str())
                || POSITIVE_TERMS.contains(&token.as_str())
                || NEGATIVE_TERMS.contains(&token.as_str())
        })
        .collect();

    if phrases.is_empty() {
        NO_KEY_PHRASES.to_string()
    } else {
        phrases.into_iter().collect::<Vec<_>>().join(", ")
    }
}

/// Capitalised words that do not open a sentence are treated as named entities.
fn extract_entities(sentences: &[&str]) -> String {
    let mut entities = BTreeSet::new();
    for sentence in sentences {
        for word in sentence.split_whitespace().skip(1) {
            let word = word.trim_matches(|character: char| !character.is_alphanumeric());
            if word.chars().next().is_some_and(char::is_uppercase) && word != "I" {
                entities.insert(word.to_string());
            }
        }
    }

    if entities.is_empty() {
        NO_ENTITIES.to_string()
    } else {
        entities.into_iter().collect::<Vec<_>>().join(", ")
    }
}

fn redact_pii(text: &str) -> String {
    pii_pattern()
        .replace_all(text, |captures: &regex::Captures<'_>| "*".repeat(captures[0].len()))
        .into_owned()
}
