//! Hue bridge HTTP client and sensor data model.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// Endpoint used to locate a bridge on the local network.
const DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// Per-request timeout for bridge API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hue API error type reported while the link button has not been pressed.
const LINK_BUTTON_ERROR_TYPE: i32 = 101;

/// Error type for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("link button not pressed")]
    ButtonNotPressed,
    #[error("bridge API error {kind}: {description}")]
    Api { kind: i32, description: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no bridge found on the local network")]
    NoBridgeFound,
    #[error("no credential bound to bridge client")]
    NoCredential,
    #[error("unexpected response from bridge: {0}")]
    UnexpectedResponse(String),
}

/// A single untyped state reading reported by a sensor.
///
/// The bridge reports state fields as free-form JSON; only numbers and
/// booleans can become metric values, everything else is carried as
/// [`StateValue::Other`] so callers can decide how to handle it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Number(f64),
    Bool(bool),
    Other(serde_json::Value),
}

/// A sensor attached to the bridge, snapshotted at fetch time.
#[derive(Debug, Clone, Deserialize)]
pub struct Sensor {
    pub name: String,
    /// Sensor type tag as reported by the bridge (e.g. "ZLLTemperature").
    #[serde(rename = "type")]
    pub kind: String,
    /// Stable unique identifier. Some built-in sensors (e.g. daylight)
    /// report none; the field is then empty.
    #[serde(rename = "uniqueid", default)]
    pub unique_id: String,
    #[serde(default)]
    pub state: HashMap<String, StateValue>,
}

/// Client-side view of the bridge API used by the poller and the
/// registration flow.
#[allow(async_fn_in_trait)]
pub trait BridgeClient {
    /// Ask the bridge to issue a new credential for `device_type`.
    async fn create_user(&self, device_type: &str) -> Result<String, BridgeError>;

    /// Fetch the full current set of sensors.
    async fn get_sensors(&self) -> Result<Vec<Sensor>, BridgeError>;
}

/// One entry in the discovery response.
#[derive(Debug, Deserialize)]
struct DiscoveredBridge {
    #[serde(rename = "internalipaddress")]
    internal_ip_address: String,
}

/// One element of the success/error envelope the Hue API wraps
/// mutating responses in.
#[derive(Debug, Deserialize)]
struct ApiResult {
    success: Option<serde_json::Value>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: i32,
    description: String,
}

impl ApiError {
    fn into_bridge_error(self) -> BridgeError {
        if self.kind == LINK_BUTTON_ERROR_TYPE {
            BridgeError::ButtonNotPressed
        } else {
            BridgeError::Api {
                kind: self.kind,
                description: self.description,
            }
        }
    }
}

/// The sensors endpoint returns either an id->sensor object or an error
/// envelope, depending on whether the request was accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SensorsResponse {
    Sensors(HashMap<String, Sensor>),
    Envelope(Vec<ApiResult>),
}

/// HTTP client for a single Hue bridge.
pub struct HueClient {
    http: reqwest::Client,
    host: String,
    user: Option<String>,
}

impl HueClient {
    /// Create a client for a bridge at a known address.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
            user: None,
        }
    }

    /// Locate a bridge on the local network via the Hue discovery service.
    pub async fn discover() -> Result<Self, BridgeError> {
        let http = reqwest::Client::new();
        let bridges: Vec<DiscoveredBridge> = http
            .get(DISCOVERY_URL)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let bridge = bridges.into_iter().next().ok_or(BridgeError::NoBridgeFound)?;
        debug!(host = %bridge.internal_ip_address, "bridge discovered");

        Ok(Self {
            http,
            host: bridge.internal_ip_address,
            user: None,
        })
    }

    /// Address of the bridge this client talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Bind the access credential used for authenticated calls.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = Some(user.into());
    }
}

impl BridgeClient for HueClient {
    async fn create_user(&self, device_type: &str) -> Result<String, BridgeError> {
        let url = format!("http://{}/api", self.host);
        let body = serde_json::json!({ "devicetype": device_type });

        let results: Vec<ApiResult> = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_create_user(results)
    }

    async fn get_sensors(&self) -> Result<Vec<Sensor>, BridgeError> {
        let user = self.user.as_deref().ok_or(BridgeError::NoCredential)?;
        let url = format!("http://{}/api/{}/sensors", self.host, user);

        let response: SensorsResponse = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response {
            SensorsResponse::Sensors(by_id) => Ok(by_id.into_values().collect()),
            SensorsResponse::Envelope(results) => {
                Err(envelope_error(results, "sensors request rejected"))
            }
        }
    }
}

/// Extract the new username from a registration response envelope.
fn parse_create_user(results: Vec<ApiResult>) -> Result<String, BridgeError> {
    for result in results {
        if let Some(error) = result.error {
            return Err(error.into_bridge_error());
        }

        if let Some(success) = result.success
            && let Some(username) = success.get("username").and_then(|u| u.as_str())
        {
            return Ok(username.to_string());
        }
    }

    Err(BridgeError::UnexpectedResponse(
        "registration response carried neither success nor error".to_string(),
    ))
}

/// Turn an error envelope into a [`BridgeError`], with a fallback message
/// when the envelope is empty or malformed.
fn envelope_error(results: Vec<ApiResult>, context: &str) -> BridgeError {
    results
        .into_iter()
        .find_map(|r| r.error)
        .map(ApiError::into_bridge_error)
        .unwrap_or_else(|| BridgeError::UnexpectedResponse(context.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_value_deserializes_numbers() {
        let v: StateValue = serde_json::from_str("2150").unwrap();
        assert_eq!(v, StateValue::Number(2150.0));

        let v: StateValue = serde_json::from_str("21.5").unwrap();
        assert_eq!(v, StateValue::Number(21.5));
    }

    #[test]
    fn state_value_deserializes_booleans() {
        let v: StateValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, StateValue::Bool(true));
    }

    #[test]
    fn state_value_falls_back_to_other() {
        let v: StateValue = serde_json::from_str("\"2024-01-01T00:00:00\"").unwrap();
        assert!(matches!(v, StateValue::Other(_)));

        let v: StateValue = serde_json::from_str("null").unwrap();
        assert!(matches!(v, StateValue::Other(serde_json::Value::Null)));
    }

    #[test]
    fn sensor_deserializes_bridge_payload() {
        let json = r#"{
            "name": "Hue temperature sensor 1",
            "type": "ZLLTemperature",
            "uniqueid": "00:17:88:01:02:03:04:05-02-0402",
            "state": {
                "temperature": 2150,
                "lastupdated": "2024-01-01T00:00:00"
            }
        }"#;

        let sensor: Sensor = serde_json::from_str(json).unwrap();
        assert_eq!(sensor.kind, "ZLLTemperature");
        assert_eq!(sensor.unique_id, "00:17:88:01:02:03:04:05-02-0402");
        assert_eq!(
            sensor.state.get("temperature"),
            Some(&StateValue::Number(2150.0))
        );
    }

    #[test]
    fn sensor_without_uniqueid_gets_empty_id() {
        let json = r#"{ "name": "Daylight", "type": "Daylight", "state": {} }"#;
        let sensor: Sensor = serde_json::from_str(json).unwrap();
        assert_eq!(sensor.unique_id, "");
    }

    #[test]
    fn create_user_success_envelope() {
        let results: Vec<ApiResult> =
            serde_json::from_str(r#"[{"success":{"username":"abcdef0123"}}]"#).unwrap();
        assert_eq!(parse_create_user(results).unwrap(), "abcdef0123");
    }

    #[test]
    fn create_user_link_button_error() {
        let results: Vec<ApiResult> = serde_json::from_str(
            r#"[{"error":{"type":101,"address":"","description":"link button not pressed"}}]"#,
        )
        .unwrap();
        assert!(matches!(
            parse_create_user(results),
            Err(BridgeError::ButtonNotPressed)
        ));
    }

    #[test]
    fn create_user_other_api_error() {
        let results: Vec<ApiResult> = serde_json::from_str(
            r#"[{"error":{"type":7,"address":"","description":"invalid value"}}]"#,
        )
        .unwrap();
        match parse_create_user(results) {
            Err(BridgeError::Api { kind, description }) => {
                assert_eq!(kind, 7);
                assert_eq!(description, "invalid value");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn sensors_response_parses_error_envelope() {
        let response: SensorsResponse = serde_json::from_str(
            r#"[{"error":{"type":1,"address":"/sensors","description":"unauthorized user"}}]"#,
        )
        .unwrap();
        match response {
            SensorsResponse::Envelope(results) => {
                let err = envelope_error(results, "sensors request rejected");
                assert!(matches!(err, BridgeError::Api { kind: 1, .. }));
            }
            SensorsResponse::Sensors(_) => panic!("parsed envelope as sensor map"),
        }
    }

    #[test]
    fn sensors_response_parses_sensor_map() {
        let json = r#"{
            "1": { "name": "Daylight", "type": "Daylight", "state": { "daylight": true } },
            "4": { "name": "Motion", "type": "ZLLPresence",
                   "uniqueid": "00:17:88:01-02-0406",
                   "state": { "presence": false } }
        }"#;

        let response: SensorsResponse = serde_json::from_str(json).unwrap();
        match response {
            SensorsResponse::Sensors(by_id) => assert_eq!(by_id.len(), 2),
            SensorsResponse::Envelope(_) => panic!("parsed sensor map as envelope"),
        }
    }
}
