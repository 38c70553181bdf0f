use serde::{
    Deserialize,
    Serialize,
};

use crate::core::{
    IncludedRuleSet,
    RuleSetBundle,
    StudioError,
};

pub const CONNECT_NAMESPACE: &str = "/connect";
pub const TABLE_NAMESPACE: &str = "/table";
pub const CONVERT_NAMESPACE: &str = "/convert";

pub const CONNECTION_RESPONSE: &str = "connection response";
pub const TABLE_EVENT: &str = "table event";
pub const TABLE_RESPONSE: &str = "table response";
pub const CONVERSION_EVENT: &str = "conversion event";
pub const CONVERSION_RESPONSE: &str = "conversion response";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BundleState {
    AwaitingBundle,
    Populated,
}

/// Every frame on the socket: which logical channel, which event, and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub namespace: String,
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Echo of the table request a `table response` answers. Table payloads are
    /// bare lists, so the id rides on the envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEvent {
    pub in_lang: String,
    pub out_lang: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableResponse {
    pub bundle: RuleSetBundle,
    pub request_id: Option<u64>,
}

impl From<RuleSetBundle> for TableResponse {
    fn from(bundle: RuleSetBundle) -> Self {
        Self { bundle, request_id: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub input_string: String,
    pub mappings: Vec<IncludedRuleSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionData {
    #[serde(flatten)]
    pub request: ConversionRequest,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub data: ConversionData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub output_string: String,
    #[serde(default)]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Table(TableEvent),
    Conversion(ConversionEvent),
}

impl OutboundMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundMessage::Table(_) => TABLE_EVENT,
            OutboundMessage::Conversion(_) => CONVERSION_EVENT,
        }
    }

    pub fn into_envelope(self) -> Result<Envelope, StudioError> {
        let (namespace, event, data) = match self {
            OutboundMessage::Table(table) => {
                (TABLE_NAMESPACE, TABLE_EVENT, serde_json::to_value(table)?)
            }
            OutboundMessage::Conversion(conversion) => {
                (CONVERT_NAMESPACE, CONVERSION_EVENT, serde_json::to_value(conversion)?)
            }
        };
        Ok(Envelope {
            namespace: namespace.to_string(),
            event: event.to_string(),
            data,
            request_id: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    ConnectionResponse(ConnectionResponse),
    TableResponse(TableResponse),
    ConversionResponse(ConversionResponse),
}

impl InboundMessage {
    /// `Ok(None)` for events this client does not listen to.
    pub fn from_envelope(envelope: Envelope) -> Result<Option<Self>, StudioError> {
        let message = match (envelope.namespace.as_str(), envelope.event.as_str()) {
            (CONNECT_NAMESPACE, CONNECTION_RESPONSE) => {
                InboundMessage::ConnectionResponse(serde_json::from_value(envelope.data)?)
            }
            (TABLE_NAMESPACE, TABLE_RESPONSE) => {
                InboundMessage::TableResponse(TableResponse {
                    bundle: serde_json::from_value(envelope.data)?,
                    request_id: envelope.request_id,
                })
            }
            (CONVERT_NAMESPACE, CONVERSION_RESPONSE) => {
                InboundMessage::ConversionResponse(serde_json::from_value(envelope.data)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(message))
    }
}

/// What the transport task reports back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected(Option<String>),
    Message(InboundMessage),
}
