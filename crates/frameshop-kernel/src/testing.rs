use std::sync::Mutex;

use async_trait::async_trait;
use frameshop_contracts::{
    Attestation, Frame, OwnershipRecord, PoapEvent, Product, RecommendationRow, SchemaRef,
};

use crate::gateway::{
    AttestationGateway, AttestationQuery, GatewayError, OwnershipGateway, ProductCatalog,
};
use crate::registry::Gateways;

#[derive(Default)]
pub struct StubGateways {
    attestations: Vec<Attestation>,
    poaps: Vec<OwnershipRecord>,
    rows: Vec<RecommendationRow>,
    fail: bool,
    queries: Mutex<Vec<AttestationQuery>>,
}

impl StubGateways {
    pub fn with_attestations(mut self, records: Vec<Attestation>) -> Self {
        self.attestations = records;
        self
    }

    pub fn with_poaps(mut self, records: Vec<OwnershipRecord>) -> Self {
        self.poaps = records;
        self
    }

    pub fn with_rows(mut self, rows: Vec<RecommendationRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn attestation_queries(&self) -> Vec<AttestationQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn gateways(&self) -> Gateways<'_> {
        Gateways {
            attestations: self,
            ownership: self,
            catalog: self,
        }
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.fail {
            return Err(GatewayError::Transport("stub offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AttestationGateway for StubGateways {
    async fn attestations(
        &self,
        query: &AttestationQuery,
    ) -> Result<Vec<Attestation>, GatewayError> {
        self.check()?;
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.attestations.clone())
    }
}

#[async_trait]
impl OwnershipGateway for StubGateways {
    async fn poaps(&self, _owner: &str) -> Result<Vec<OwnershipRecord>, GatewayError> {
        self.check()?;
        Ok(self.poaps.clone())
    }
}

#[async_trait]
impl ProductCatalog for StubGateways {
    async fn frame(&self, _id: i64) -> Result<Option<Frame>, GatewayError> {
        self.check()?;
        Ok(None)
    }

    async fn products_for_shop(&self, _shop: &str) -> Result<Vec<Product>, GatewayError> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn recommendation_rows(
        &self,
        address: &str,
        frame_id: i64,
    ) -> Result<Vec<RecommendationRow>, GatewayError> {
        self.check()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| r.wallet_address == address && r.frame_id == frame_id)
            .cloned()
            .collect())
    }
}

pub fn attestation(schema: &str, revoked_at: u64, expires_at: u64) -> Attestation {
    Attestation {
        id: "0xatt".to_string(),
        attester: "0xattester".to_string(),
        recipient: "0xuser".to_string(),
        revocation_time: revoked_at,
        expiration_time: expires_at,
        revoked: false,
        data: "0x".to_string(),
        schema: SchemaRef {
            id: schema.to_string(),
        },
        decoded_data_json: None,
    }
}

pub fn poap(event_name: &str) -> OwnershipRecord {
    OwnershipRecord {
        event_id: "1".to_string(),
        token_id: "100".to_string(),
        poap_event: PoapEvent {
            event_name: event_name.to_string(),
            description: String::new(),
        },
    }
}

pub fn product(id: &str, title: &str, description: &str) -> Product {
    Product {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        shop: "shop.example".to_string(),
        handle: id.to_string(),
        variant_id: None,
        image: format!("https://cdn.example/{id}.png"),
        price: Some("$10.00".to_string()),
    }
}
