use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: i64,
    pub title: String,
    pub shop: String,
    pub matching_criteria: String,
    pub image: String,
    pub button_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub shop: String,
    pub handle: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub image: String,
    #[serde(default)]
    pub price: Option<String>,
}

// The first of `product_ids` is the primary recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRow {
    pub wallet_address: String,
    pub frame_id: i64,
    pub product_ids: Vec<String>,
}

impl RecommendationRow {
    pub fn primary_product_id(&self) -> Option<&str> {
        self.product_ids.first().map(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaRef {
    pub id: String,
}

// A zero revocation or expiration time means "never".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub attester: String,
    pub recipient: String,
    #[serde(default)]
    pub revocation_time: u64,
    #[serde(default)]
    pub expiration_time: u64,
    #[serde(default)]
    pub revoked: bool,
    #[serde(default)]
    pub data: String,
    pub schema: SchemaRef,
    #[serde(default)]
    pub decoded_data_json: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoapEvent {
    pub event_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRecord {
    pub event_id: String,
    pub token_id: String,
    pub poap_event: PoapEvent,
}

impl OwnershipRecord {
    pub fn event_name(&self) -> &str {
        &self.poap_event.event_name
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastId {
    #[serde(default)]
    pub fid: u64,
    #[serde(default)]
    pub hash: String,
}

// Only `trustedData` is authoritative; clients vary in which of these they send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UntrustedData {
    pub fid: u64,
    pub url: String,
    pub message_hash: String,
    pub timestamp: u64,
    pub network: u64,
    pub button_index: u32,
    pub input_text: Option<String>,
    pub state: Option<String>,
    pub cast_id: CastId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedData {
    pub message_bytes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    #[serde(default)]
    pub untrusted_data: UntrustedData,
    pub trusted_data: TrustedData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedMessage {
    pub valid: bool,
    pub input: Option<String>,
    pub verified_accounts: Vec<String>,
}

impl ValidatedMessage {
    // Non-blank free-text input switches the request into developer mode.
    pub fn dev_input(&self) -> Option<&str> {
        self.input.as_deref().filter(|v| !v.trim().is_empty())
    }

    pub fn account_address(&self) -> String {
        self.dev_input()
            .or_else(|| self.verified_accounts.first().map(|v| v.as_str()))
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Link,
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameButton {
    pub label: String,
    pub action: ButtonAction,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExplainState {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}
