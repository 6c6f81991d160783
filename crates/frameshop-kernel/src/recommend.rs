use std::collections::HashSet;

use frameshop_contracts::{OwnershipRecord, Product};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::country::verified_country;
use crate::criterion::Criterion;
use crate::registry::{OutcomeData, VerificationOutcome};

pub const RUNNING_KEYWORDS: &[&str] = &["run", "running", "jog"];
pub const SPECIAL_KEYWORDS: &[&str] = &["special"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("catalog has no candidate products")]
    EmptyCatalog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchReason {
    Running,
    Country(String),
    Special,
    Poap,
    Precomputed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch<'a> {
    Matched {
        product: &'a Product,
        reason: MatchReason,
    },
    NoMatch { attribute: Option<String> },
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation<'a> {
    pub product: &'a Product,
    pub rule: RuleMatch<'a>,
}

impl Recommendation<'_> {
    pub fn is_fallback(&self) -> bool {
        !matches!(self.rule, RuleMatch::Matched { .. })
    }
}

pub fn recommend<'a, R: Rng + ?Sized>(
    criterion: &Criterion,
    outcome: &VerificationOutcome,
    products: &'a [Product],
    rng: &mut R,
) -> Result<Recommendation<'a>, EngineError> {
    let rule = rule_match(criterion, outcome, products, rng);
    if let RuleMatch::Matched { product, .. } = rule {
        return Ok(Recommendation { product, rule });
    }
    let product = products.choose(rng).ok_or(EngineError::EmptyCatalog)?;
    Ok(Recommendation { product, rule })
}

pub fn rule_match<'a, R: Rng + ?Sized>(
    criterion: &Criterion,
    outcome: &VerificationOutcome,
    products: &'a [Product],
    rng: &mut R,
) -> RuleMatch<'a> {
    if !outcome.valid {
        return RuleMatch::NotApplicable;
    }

    let matched = |product: Option<&'a Product>, reason: MatchReason| match product {
        Some(product) => RuleMatch::Matched { product, reason },
        None => RuleMatch::NoMatch { attribute: None },
    };

    match (criterion, &outcome.data) {
        (Criterion::ReceiptsRunning, _) => matched(
            first_with_keyword(products, RUNNING_KEYWORDS),
            MatchReason::Running,
        ),
        (Criterion::CoinbaseAccount | Criterion::CoinbaseOne, _) => matched(
            first_with_keyword(products, SPECIAL_KEYWORDS),
            MatchReason::Special,
        ),
        (Criterion::CoinbaseCountry, OutcomeData::Attestation(Some(attestation))) => {
            let Some(country) = verified_country(
                &attestation.data,
                attestation.decoded_data_json.as_deref(),
            ) else {
                return RuleMatch::NoMatch { attribute: None };
            };
            let found = first_with_keyword(products, &[country.as_str()]);
            match found {
                Some(product) => RuleMatch::Matched {
                    product,
                    reason: MatchReason::Country(country),
                },
                None => RuleMatch::NoMatch {
                    attribute: Some(country),
                },
            }
        }
        (Criterion::PoapsOwned, OutcomeData::Poaps(poaps)) => {
            let ranked = rank_by_poaps(poaps, products);
            matched(ranked.choose(rng).copied(), MatchReason::Poap)
        }
        (Criterion::All, OutcomeData::Rows(rows)) => {
            let primary = rows.first().and_then(|r| r.primary_product_id());
            matched(
                primary.and_then(|id| products.iter().find(|p| p.id == id)),
                MatchReason::Precomputed,
            )
        }
        _ => RuleMatch::NoMatch { attribute: None },
    }
}

pub fn first_with_keyword<'a>(products: &'a [Product], keywords: &[&str]) -> Option<&'a Product> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    products.iter().find(|p| {
        let description = p.description.to_lowercase();
        needles.iter().any(|k| description.contains(k.as_str()))
    })
}

pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect()
}

pub fn overlap_score(event_name: &str, title: &str) -> usize {
    let event = tokenize(event_name);
    let title = tokenize(title);
    event.intersection(&title).count()
}

// Ties keep catalog order; across badges the first occurrence wins.
pub fn rank_by_poaps<'a>(poaps: &[OwnershipRecord], products: &'a [Product]) -> Vec<&'a Product> {
    let mut seen = HashSet::new();
    let mut ranked = Vec::new();
    for poap in poaps {
        let mut scored: Vec<(usize, &Product)> = products
            .iter()
            .map(|p| (overlap_score(poap.event_name(), &p.title), p))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, product) in scored {
            if seen.insert(product.id.as_str()) {
                ranked.push(product);
            }
        }
    }
    ranked
}
