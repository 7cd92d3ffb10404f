use serde::{Deserialize, Deserializer};

/// One Cloudflare firewall event as returned by `firewallEventsAdaptive`.
///
/// Every field decodes an absent key or an explicit `null` to an empty
/// string, so a sparse record never fails the whole zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FirewallEvent {
    #[serde(deserialize_with = "null_as_empty")]
    pub action: String,

    #[serde(deserialize_with = "null_as_empty")]
    pub source: String,

    #[serde(rename = "clientIP", deserialize_with = "null_as_empty")]
    pub client_ip: String,

    /// Cloudflare returns this as a string, older payloads as a number.
    #[serde(rename = "clientAsn", deserialize_with = "string_or_number")]
    pub client_asn: String,

    #[serde(rename = "clientASNDescription", deserialize_with = "null_as_empty")]
    pub client_asn_description: String,

    /// Two-letter country code despite the field name.
    #[serde(rename = "clientCountryName", deserialize_with = "null_as_empty")]
    pub client_country: String,

    #[serde(rename = "clientRequestHTTPMethodName", deserialize_with = "null_as_empty")]
    pub method: String,

    #[serde(rename = "clientRequestHTTPProtocol", deserialize_with = "null_as_empty")]
    pub protocol: String,

    #[serde(rename = "clientRequestPath", deserialize_with = "null_as_empty")]
    pub path: String,

    #[serde(rename = "clientRequestQuery", deserialize_with = "null_as_empty")]
    pub query: String,

    #[serde(deserialize_with = "null_as_empty")]
    pub datetime: String,

    #[serde(rename = "rayName", deserialize_with = "null_as_empty")]
    pub ray_name: String,

    #[serde(rename = "ruleId", deserialize_with = "null_as_empty")]
    pub rule_id: String,

    #[serde(rename = "userAgent", deserialize_with = "null_as_empty")]
    pub user_agent: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for clientAsn, got {}",
            other
        ))),
    }
}
