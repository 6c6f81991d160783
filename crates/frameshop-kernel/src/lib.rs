pub mod country;
pub mod criterion;
pub mod explain;
pub mod gateway;
pub mod recommend;
pub mod registry;

#[cfg(test)]
mod testing;

pub use criterion::Criterion;
pub use gateway::{
    fetch_valid_attestations, valid_attestations, AttestationGateway, AttestationQuery,
    GatewayError, OwnershipGateway, ProductCatalog,
};
pub use recommend::{recommend, EngineError, MatchReason, Recommendation, RuleMatch};
pub use registry::{
    Gateways, OutcomeData, RuleEntry, VerificationConfig, VerificationOutcome,
    VerificationRegistry, VerificationRule, DEFAULT_RECEIPTS_MIN_COUNT,
};
