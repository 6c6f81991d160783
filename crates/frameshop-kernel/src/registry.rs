use std::collections::HashMap;

use frameshop_contracts::{Attestation, OwnershipRecord, RecommendationRow};

use crate::criterion::Criterion;
use crate::gateway::{
    fetch_valid_attestations, AttestationGateway, AttestationQuery, GatewayError,
    OwnershipGateway, ProductCatalog,
};

pub const DEFAULT_RECEIPTS_MIN_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub receipts_attester: String,
    pub receipts_running_schema: String,
    pub receipts_min_count: usize,
    pub coinbase_attester: String,
    pub coinbase_country_schema: String,
    pub coinbase_account_schema: String,
    pub coinbase_one_schema: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationRule {
    CountThreshold {
        schema_id: String,
        attester_id: String,
        min_count: usize,
    },
    Existence {
        schema_id: String,
        attester_id: String,
    },
    Ownership,
    Aggregate,
}

// Templates use `{address}` and, for count rules, `{threshold}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub rule: VerificationRule,
    pub success: &'static str,
    pub failure: &'static str,
}

impl RuleEntry {
    pub fn render(&self, valid: bool, address: &str) -> String {
        let template = if valid { self.success } else { self.failure };
        let text = template.replace("{address}", address);
        match &self.rule {
            VerificationRule::CountThreshold { min_count, .. } => {
                text.replace("{threshold}", &min_count.to_string())
            }
            _ => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeData {
    Count(usize),
    Attestation(Option<Attestation>),
    Poaps(Vec<OwnershipRecord>),
    Rows(Vec<RecommendationRow>),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub data: OutcomeData,
}

impl VerificationOutcome {
    pub fn unrecognized() -> Self {
        Self {
            valid: false,
            data: OutcomeData::Unrecognized,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Gateways<'a> {
    pub attestations: &'a dyn AttestationGateway,
    pub ownership: &'a dyn OwnershipGateway,
    pub catalog: &'a dyn ProductCatalog,
}

#[derive(Debug, Clone)]
pub struct VerificationRegistry {
    entries: HashMap<Criterion, RuleEntry>,
}

impl VerificationRegistry {
    pub fn new(cfg: &VerificationConfig) -> Self {
        let existence = |schema: &str| VerificationRule::Existence {
            schema_id: schema.to_string(),
            attester_id: cfg.coinbase_attester.clone(),
        };

        let mut entries = HashMap::new();
        entries.insert(
            Criterion::ReceiptsRunning,
            RuleEntry {
                rule: VerificationRule::CountThreshold {
                    schema_id: cfg.receipts_running_schema.clone(),
                    attester_id: cfg.receipts_attester.clone(),
                    min_count: cfg.receipts_min_count,
                },
                success: "{threshold} or more attestations found on Receipts.xyz for {address}. A special product is recommended.",
                failure: "Not more than {threshold} attestations found on Receipts.xyz for {address}. A random product is recommended.",
            },
        );
        entries.insert(
            Criterion::CoinbaseCountry,
            RuleEntry {
                rule: existence(&cfg.coinbase_country_schema),
                success: "Country of residence verified for {address} on Coinbase Onchain. A product based on the country is recommended.",
                failure: "Country of residence not verified for {address} on Coinbase Onchain. A random product is recommended.",
            },
        );
        entries.insert(
            Criterion::CoinbaseAccount,
            RuleEntry {
                rule: existence(&cfg.coinbase_account_schema),
                success: "Coinbase account member attestation for {address}. A special product is recommended.",
                failure: "No Coinbase account member attestation for {address}. A random product is recommended.",
            },
        );
        entries.insert(
            Criterion::CoinbaseOne,
            RuleEntry {
                rule: existence(&cfg.coinbase_one_schema),
                success: "Coinbase One account member attestation for {address}. A special product is recommended.",
                failure: "No Coinbase One account member attestation for {address}. A random product is recommended.",
            },
        );
        entries.insert(
            Criterion::PoapsOwned,
            RuleEntry {
                rule: VerificationRule::Ownership,
                success: "POAPs owned by {address}. A specific product might be recommended.",
                failure: "No POAPs owned by {address}. A random product is recommended.",
            },
        );
        entries.insert(
            Criterion::All,
            RuleEntry {
                rule: VerificationRule::Aggregate,
                success: "Related onchain data found for {address}. A specific product might be recommended.",
                failure: "No related onchain data found for {address}. A specific product might be recommended.",
            },
        );
        Self { entries }
    }

    pub fn lookup(&self, criterion: &Criterion) -> Option<&RuleEntry> {
        self.entries.get(criterion)
    }

    pub async fn verify(
        &self,
        criterion: &Criterion,
        address: &str,
        frame_id: i64,
        gateways: Gateways<'_>,
    ) -> Result<VerificationOutcome, GatewayError> {
        let Some(entry) = self.lookup(criterion) else {
            return Ok(VerificationOutcome::unrecognized());
        };

        match &entry.rule {
            VerificationRule::CountThreshold {
                schema_id,
                attester_id,
                min_count,
            } => {
                let found = fetch_valid_attestations(
                    gateways.attestations,
                    &query(address, schema_id, attester_id),
                )
                .await?;
                Ok(VerificationOutcome {
                    valid: found.len() >= *min_count,
                    data: OutcomeData::Count(found.len()),
                })
            }
            VerificationRule::Existence {
                schema_id,
                attester_id,
            } => {
                let found = fetch_valid_attestations(
                    gateways.attestations,
                    &query(address, schema_id, attester_id),
                )
                .await?;
                Ok(VerificationOutcome {
                    valid: !found.is_empty(),
                    data: OutcomeData::Attestation(found.into_iter().next()),
                })
            }
            VerificationRule::Ownership => {
                let poaps = gateways.ownership.poaps(address).await?;
                Ok(VerificationOutcome {
                    valid: !poaps.is_empty(),
                    data: OutcomeData::Poaps(poaps),
                })
            }
            VerificationRule::Aggregate => {
                let rows = gateways
                    .catalog
                    .recommendation_rows(address, frame_id)
                    .await?;
                Ok(VerificationOutcome {
                    valid: !rows.is_empty(),
                    data: OutcomeData::Rows(rows),
                })
            }
        }
    }
}

fn query(address: &str, schema_id: &str, attester_id: &str) -> AttestationQuery {
    AttestationQuery {
        recipient: address.to_string(),
        schema_id: Some(schema_id.to_string()),
        attester_id: Some(attester_id.to_string()),
    }
}
