use async_trait::async_trait;
use frameshop_contracts::{Attestation, Frame, OwnershipRecord, Product, RecommendationRow};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("malformed upstream response: {0}")]
    Decode(String),
    #[error("store failed: {0}")]
    Store(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationQuery {
    pub recipient: String,
    pub schema_id: Option<String>,
    pub attester_id: Option<String>,
}

#[async_trait]
pub trait AttestationGateway: Send + Sync {
    async fn attestations(&self, query: &AttestationQuery)
        -> Result<Vec<Attestation>, GatewayError>;
}

#[async_trait]
pub trait OwnershipGateway: Send + Sync {
    async fn poaps(&self, owner: &str) -> Result<Vec<OwnershipRecord>, GatewayError>;
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn frame(&self, id: i64) -> Result<Option<Frame>, GatewayError>;
    async fn products_for_shop(&self, shop: &str) -> Result<Vec<Product>, GatewayError>;
    async fn recommendation_rows(
        &self,
        address: &str,
        frame_id: i64,
    ) -> Result<Vec<RecommendationRow>, GatewayError>;
}

// The remote filter is only an optimisation; this check is authoritative.
pub fn valid_attestations(records: Vec<Attestation>, schema_id: Option<&str>) -> Vec<Attestation> {
    records
        .into_iter()
        .filter(|a| a.revocation_time == 0 && a.expiration_time == 0)
        .filter(|a| schema_id.map_or(true, |s| a.schema.id.eq_ignore_ascii_case(s)))
        .collect()
}

pub async fn fetch_valid_attestations(
    gateway: &dyn AttestationGateway,
    query: &AttestationQuery,
) -> Result<Vec<Attestation>, GatewayError> {
    let records = gateway.attestations(query).await?;
    Ok(valid_attestations(records, query.schema_id.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameshop_contracts::SchemaRef;

    fn attestation(schema: &str, revoked_at: u64, expires_at: u64) -> Attestation {
        Attestation {
            id: "0x1".to_string(),
            attester: "0xatt".to_string(),
            recipient: "0xr".to_string(),
            revocation_time: revoked_at,
            expiration_time: expires_at,
            revoked: revoked_at != 0,
            data: "0x".to_string(),
            schema: SchemaRef {
                id: schema.to_string(),
            },
            decoded_data_json: None,
        }
    }

    #[test]
    fn revoked_or_expiring_records_are_dropped() {
        let kept = valid_attestations(
            vec![
                attestation("0xs", 0, 0),
                attestation("0xs", 1_700_000_000, 0),
                attestation("0xs", 0, 1_900_000_000),
                attestation("0xs", 5, 5),
            ],
            None,
        );
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn schema_mismatch_is_dropped_even_if_remote_ignored_filter() {
        let kept = valid_attestations(
            vec![attestation("0xAB", 0, 0), attestation("0xcd", 0, 0)],
            Some("0xab"),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].schema.id, "0xAB");
    }
}
