use std::time::Duration;

use async_trait::async_trait;
use frameshop_config::{MessageValidation, Upstream};
use frameshop_contracts::{Attestation, FrameRequest, OwnershipRecord, ValidatedMessage};
use frameshop_kernel::{
    AttestationGateway, AttestationQuery, GatewayError, OwnershipGateway,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[async_trait]
pub trait MessageValidator: Send + Sync {
    async fn validate(&self, request: &FrameRequest) -> Result<ValidatedMessage, GatewayError>;
}

const ATTESTATIONS_QUERY: &str = r#"
query Attestations($where: AttestationWhereInput) {
  attestations(where: $where) {
    id
    attester
    recipient
    refUID
    revocable
    revocationTime
    revoked
    expirationTime
    data
    decodedDataJson
    schema {
      id
    }
  }
}
"#;

const POAPS_QUERY: &str = r#"
query Poaps($owner: Identity!) {
  Poaps(input: {filter: {owner: {_in: [$owner]}}, blockchain: ALL}) {
    Poap {
      eventId
      tokenId
      poapEvent {
        eventName
        description
      }
    }
  }
}
"#;

fn build_client(timeout_ms: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| e.to_string())
}

fn resolve_api_key(env_name: Option<&str>) -> Option<String> {
    env_name
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.is_empty())
}

async fn post_json<T: DeserializeOwned>(
    client: &Client,
    endpoint: &str,
    auth: Option<(&str, &str)>,
    body: &Value,
) -> Result<T, GatewayError> {
    let mut request = client.post(endpoint).json(body);
    if let Some((header, value)) = auth {
        request = request.header(header, value);
    }
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;
    if !response.status().is_success() {
        return Err(GatewayError::Status(response.status().as_u16()));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

impl<T> GraphQlResponse<T> {
    fn into_data(self) -> Result<T, GatewayError> {
        match (self.data, self.errors) {
            (Some(data), _) => Ok(data),
            (None, Some(errors)) if !errors.is_empty() => Err(GatewayError::Decode(format!(
                "graphql errors: {}",
                Value::Array(errors)
            ))),
            _ => Err(GatewayError::Decode("graphql response without data".to_string())),
        }
    }
}

pub struct EasGateway {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct AttestationsData {
    #[serde(default)]
    attestations: Option<Vec<Attestation>>,
}

impl EasGateway {
    pub fn new(cfg: &Upstream) -> Result<Self, String> {
        Ok(Self {
            client: build_client(cfg.timeout_ms)?,
            endpoint: cfg.endpoint.clone(),
        })
    }
}

pub(crate) fn attestation_filter(query: &AttestationQuery) -> Value {
    let mut filter = json!({
        "recipient": {"equals": query.recipient, "mode": "insensitive"},
    });
    if let Some(schema_id) = &query.schema_id {
        filter["schemaId"] = json!({"equals": schema_id, "mode": "insensitive"});
    }
    if let Some(attester_id) = &query.attester_id {
        filter["attester"] = json!({"equals": attester_id, "mode": "insensitive"});
    }
    filter
}

#[async_trait]
impl AttestationGateway for EasGateway {
    async fn attestations(
        &self,
        query: &AttestationQuery,
    ) -> Result<Vec<Attestation>, GatewayError> {
        let body = json!({
            "query": ATTESTATIONS_QUERY,
            "variables": {"where": attestation_filter(query)},
        });
        let response: GraphQlResponse<AttestationsData> =
            post_json(&self.client, &self.endpoint, None, &body).await?;
        Ok(response.into_data()?.attestations.unwrap_or_default())
    }
}

pub struct AirstackGateway {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoapsData {
    #[serde(rename = "Poaps")]
    poaps: Option<PoapsPage>,
}

#[derive(Debug, Deserialize)]
struct PoapsPage {
    #[serde(rename = "Poap")]
    poap: Option<Vec<OwnershipRecord>>,
}

impl AirstackGateway {
    pub fn new(cfg: &Upstream) -> Result<Self, String> {
        Ok(Self {
            client: build_client(cfg.timeout_ms)?,
            endpoint: cfg.endpoint.clone(),
            api_key: resolve_api_key(cfg.api_key_env.as_deref()),
        })
    }
}

#[async_trait]
impl OwnershipGateway for AirstackGateway {
    async fn poaps(&self, owner: &str) -> Result<Vec<OwnershipRecord>, GatewayError> {
        let body = json!({
            "query": POAPS_QUERY,
            "variables": {"owner": owner},
        });
        let auth = self.api_key.as_deref().map(|key| ("Authorization", key));
        let response: GraphQlResponse<PoapsData> =
            post_json(&self.client, &self.endpoint, auth, &body).await?;
        Ok(response
            .into_data()?
            .poaps
            .and_then(|page| page.poap)
            .unwrap_or_default())
    }
}

pub struct HubValidator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HubValidation {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    action: Option<HubAction>,
}

#[derive(Debug, Default, Deserialize)]
struct HubAction {
    #[serde(default)]
    interactor: Option<HubInteractor>,
    #[serde(default)]
    input: Option<HubInput>,
}

#[derive(Debug, Default, Deserialize)]
struct HubInteractor {
    #[serde(default)]
    verified_accounts: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HubInput {
    #[serde(default)]
    text: Option<String>,
}

impl From<HubValidation> for ValidatedMessage {
    fn from(v: HubValidation) -> Self {
        let action = v.action.unwrap_or_default();
        ValidatedMessage {
            valid: v.valid,
            input: action.input.and_then(|i| i.text),
            verified_accounts: action
                .interactor
                .map(|i| i.verified_accounts)
                .unwrap_or_default(),
        }
    }
}

impl HubValidator {
    pub fn new(cfg: &MessageValidation) -> Result<Self, String> {
        Ok(Self {
            client: build_client(cfg.timeout_ms)?,
            endpoint: cfg.endpoint.clone(),
            api_key: resolve_api_key(cfg.api_key_env.as_deref()),
        })
    }
}

#[async_trait]
impl MessageValidator for HubValidator {
    async fn validate(&self, request: &FrameRequest) -> Result<ValidatedMessage, GatewayError> {
        let body = json!({"message_bytes_in_hex": request.trusted_data.message_bytes});
        let auth = self.api_key.as_deref().map(|key| ("api_key", key));
        let response: HubValidation = post_json(&self.client, &self.endpoint, auth, &body).await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attestation_filter_omits_absent_fields() {
        let filter = attestation_filter(&AttestationQuery {
            recipient: "0xabc".to_string(),
            schema_id: None,
            attester_id: Some("0xatt".to_string()),
        });
        assert_eq!(filter["recipient"]["equals"], "0xabc");
        assert_eq!(filter["attester"]["mode"], "insensitive");
        assert!(filter.get("schemaId").is_none());
    }

    #[test]
    fn graphql_without_data_is_a_decode_error() {
        let parsed: GraphQlResponse<AttestationsData> =
            serde_json::from_value(json!({"errors": [{"message": "boom"}]})).unwrap();
        assert!(matches!(parsed.into_data(), Err(GatewayError::Decode(_))));
    }

    #[test]
    fn null_poap_page_is_empty() {
        let parsed: GraphQlResponse<PoapsData> =
            serde_json::from_value(json!({"data": {"Poaps": {"Poap": null}}})).unwrap();
        let page = parsed.into_data().unwrap();
        assert!(page.poaps.and_then(|p| p.poap).unwrap_or_default().is_empty());
    }

    #[test]
    fn hub_validation_maps_input_and_accounts() {
        let parsed: HubValidation = serde_json::from_value(json!({
            "valid": true,
            "action": {
                "interactor": {"fid": 3, "verified_accounts": ["0xv1", "0xv2"]},
                "input": {"text": "0xdev"}
            }
        }))
        .unwrap();
        let msg = ValidatedMessage::from(parsed);
        assert!(msg.valid);
        assert_eq!(msg.input.as_deref(), Some("0xdev"));
        assert_eq!(msg.verified_accounts, vec!["0xv1", "0xv2"]);
    }
}
