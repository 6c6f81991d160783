use crate::criterion::Criterion;
use crate::recommend::{MatchReason, RuleMatch};
use crate::registry::VerificationRegistry;

pub fn render(
    registry: &VerificationRegistry,
    criterion: &Criterion,
    valid: bool,
    address: &str,
    rule: &RuleMatch<'_>,
) -> String {
    let Some(entry) = registry.lookup(criterion) else {
        return format!(
            "No onchain data or matching product found for {address}. A random product is recommended."
        );
    };

    match (criterion, rule) {
        (
            Criterion::CoinbaseCountry,
            RuleMatch::Matched {
                reason: MatchReason::Country(country),
                ..
            },
        ) => format!("Country of residence verified as {country} for {address} on Coinbase Onchain"),
        (
            Criterion::CoinbaseCountry,
            RuleMatch::NoMatch {
                attribute: Some(country),
            },
        ) => format!(
            "Product not found for country of residence verified as {country} for {address} on Coinbase Onchain. A random product is recommended."
        ),
        (Criterion::PoapsOwned, RuleMatch::Matched { product, .. }) => format!(
            "Product found from visited country on Poap {} for {address} based on Poaps",
            product.title
        ),
        (Criterion::PoapsOwned, RuleMatch::NoMatch { .. }) => format!(
            "No product matched for countries visited for {address} based on Poaps. A random product is recommended."
        ),
        (_, RuleMatch::NoMatch { .. }) => format!(
            "Onchain data verified for {address} but no matching product was found. A random product is recommended."
        ),
        (_, RuleMatch::Matched { .. }) => entry.render(true, address),
        (_, RuleMatch::NotApplicable) => entry.render(valid, address),
    }
}
