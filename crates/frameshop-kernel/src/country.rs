use alloy_primitives::hex;
use alloy_sol_types::SolValue;
use serde_json::Value;

const FIELD: &str = "verifiedCountry";

pub fn verified_country(data: &str, decoded_data_json: Option<&str>) -> Option<String> {
    decode_abi_string(data)
        .or_else(|| decoded_data_json.and_then(country_from_decoded_json))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn decode_abi_string(data: &str) -> Option<String> {
    let bytes = hex::decode(data.trim()).ok()?;
    String::abi_decode(&bytes, true).ok()
}

fn country_from_decoded_json(text: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(text).ok()?;
    parsed.as_array()?.iter().find_map(|field| {
        if field.get("name").and_then(|v| v.as_str()) != Some(FIELD) {
            return None;
        }
        let value = field.get("value")?;
        value
            .get("value")
            .unwrap_or(value)
            .as_str()
            .map(|v| v.to_string())
    })
}

#[cfg(test)]
pub(crate) fn encode_abi_string(value: &str) -> String {
    hex::encode_prefixed(value.to_string().abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_abi_encoded_country() {
        let data = encode_abi_string("Japan");
        assert_eq!(decode_abi_string(&data).as_deref(), Some("Japan"));
        assert_eq!(verified_country(&data, None).as_deref(), Some("Japan"));
    }

    #[test]
    fn falls_back_to_decoded_json() {
        let json = r#"[{"name":"verifiedCountry","type":"string","signature":"string verifiedCountry","value":{"name":"verifiedCountry","type":"string","value":"FR"}}]"#;
        assert_eq!(verified_country("0x", Some(json)).as_deref(), Some("FR"));
    }

    #[test]
    fn truncated_payload_yields_nothing() {
        let data = encode_abi_string("Japan");
        assert!(decode_abi_string(&data[..70]).is_none());
        assert!(verified_country("not-hex", None).is_none());
        assert!(verified_country(&encode_abi_string(""), None).is_none());
    }

    #[test]
    fn decodes_attestation_payload_bytes() {
        let data = "0x000000000000000000000000000000000000000000000000000000000000002000000000000000000000000000000000000000000000000000000000000000054a6170616e000000000000000000000000000000000000000000000000000000";
        assert_eq!(verified_country(data, None).as_deref(), Some("Japan"));
        assert_eq!(data, encode_abi_string("Japan"));
    }
}
