use tokio::sync::mpsc::UnboundedSender;
use tracing::{
    debug,
    info,
    warn,
};

use super::types::{
    BundleState,
    ConnectionState,
    ConversionData,
    ConversionEvent,
    ConversionRequest,
    ConversionResponse,
    InboundMessage,
    OutboundMessage,
    TableEvent,
    TableResponse,
};
use crate::{
    core::{
        RuleSetBundle,
        StudioError,
    },
    languages::LanguagePair,
};

/// What the session has to do about an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    StatusChanged(String),
    ReplaceRegistry(RuleSetBundle),
    ShowOutput(String),
    Discarded,
}

/// Maps session intents onto the connect/table/convert channels and inbound
/// traffic back onto session actions.
pub struct SyncProtocolClient {
    outbound: UnboundedSender<OutboundMessage>,
    connection: ConnectionState,
    status: String,
    bundle: BundleState,
    discard_stale: bool,
    request_counter: u64,
    latest_applied: Option<u64>,
    latest_table_request: Option<u64>,
    // Requests numbered at or below this were built against a replaced registry.
    bundle_floor: u64,
}

impl SyncProtocolClient {
    pub fn new(outbound: UnboundedSender<OutboundMessage>, discard_stale: bool) -> Self {
        Self {
            outbound,
            connection: ConnectionState::Disconnected,
            status: String::new(),
            bundle: BundleState::AwaitingBundle,
            discard_stale,
            request_counter: 0,
            latest_applied: None,
            latest_table_request: None,
            bundle_floor: 0,
        }
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn status_text(&self) -> &str {
        &self.status
    }

    pub fn bundle_state(&self) -> &BundleState {
        &self.bundle
    }

    pub fn last_request_id(&self) -> u64 {
        self.request_counter
    }

    pub fn on_transport_connected(&mut self) {
        info!("[CONNECT] Transport connected");
        self.connection = ConnectionState::Connected;
    }

    pub fn on_transport_disconnected(&mut self, reason: Option<&str>) -> ClientAction {
        match reason {
            Some(reason) => warn!("[CONNECT] Transport disconnected: {}", reason),
            None => info!("[CONNECT] Transport disconnected"),
        }
        self.connection = ConnectionState::Disconnected;
        self.status = "(Disconnected)".to_string();
        ClientAction::StatusChanged(self.status.clone())
    }

    /// Requests a fresh bundle for `pair`. The bundle channel waits until the
    /// matching `table response` arrives.
    pub fn request_bundle(&mut self, pair: &LanguagePair) -> Result<bool, StudioError> {
        self.request_counter += 1;
        let request_id = self.request_counter;
        self.bundle = BundleState::AwaitingBundle;
        self.latest_table_request = Some(request_id);
        info!(
            "[TABLE] Requesting rule sets for {} -> {} (request_id {})",
            pair.in_lang, pair.out_lang, request_id
        );
        self.send(OutboundMessage::Table(TableEvent {
            in_lang: pair.in_lang.clone(),
            out_lang: pair.out_lang.clone(),
            request_id: Some(request_id),
        }))
    }

    /// Sends a conversion request tagged with the next request id and returns that id.
    pub fn send_conversion(&mut self, request: ConversionRequest) -> Result<u64, StudioError> {
        self.request_counter += 1;
        let request_id = self.request_counter;
        debug!(
            "[CONVERT] Sending request_id {} with {} rule set(s)",
            request_id,
            request.mappings.len()
        );
        self.send(OutboundMessage::Conversion(ConversionEvent {
            data: ConversionData { request, request_id: Some(request_id) },
        }))?;
        Ok(request_id)
    }

    // No queueing: while disconnected, outbound traffic is dropped.
    fn send(&self, message: OutboundMessage) -> Result<bool, StudioError> {
        if !self.is_connected() {
            warn!("[WS] Not connected, dropping {}", message.event_name());
            return Ok(false);
        }
        self.outbound.send(message)?;
        Ok(true)
    }

    pub fn handle_inbound(&mut self, message: InboundMessage) -> ClientAction {
        match message {
            InboundMessage::ConnectionResponse(response) => {
                self.status = format!("({})", response.data);
                ClientAction::StatusChanged(self.status.clone())
            }
            InboundMessage::TableResponse(response) => self.handle_table(response),
            InboundMessage::ConversionResponse(response) => self.handle_conversion(response),
        }
    }

    /// Only the answer to the most recent table request replaces the registry.
    /// Responses without an id cannot be matched and are applied as they come.
    fn handle_table(&mut self, response: TableResponse) -> ClientAction {
        let TableResponse { bundle, request_id } = response;
        if self.discard_stale {
            if let Some(request_id) = request_id {
                if self.latest_table_request != Some(request_id) {
                    debug!(
                        "[TABLE] Discarding bundle for request_id {}: a newer language pair was requested",
                        request_id
                    );
                    return ClientAction::Discarded;
                }
            }
        }

        info!("[TABLE] Received bundle with {} rule set(s)", bundle.len());
        self.bundle = BundleState::Populated;
        self.bundle_floor = self.request_counter;
        ClientAction::ReplaceRegistry(bundle)
    }

    fn handle_conversion(&mut self, response: ConversionResponse) -> ClientAction {
        let Some(request_id) = response.request_id else {
            // Engines that do not echo ids get the unconditional overwrite.
            return ClientAction::ShowOutput(response.output_string);
        };

        if self.discard_stale {
            if request_id <= self.bundle_floor {
                debug!(
                    "[CONVERT] Discarding request_id {}: issued before the current bundle",
                    request_id
                );
                return ClientAction::Discarded;
            }
            if self.latest_applied.is_some_and(|latest| request_id <= latest) {
                debug!("[CONVERT] Discarding request_id {}: newer output already shown", request_id);
                return ClientAction::Discarded;
            }
        }

        self.latest_applied = Some(self.latest_applied.map_or(request_id, |l| l.max(request_id)));
        ClientAction::ShowOutput(response.output_string)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::{
        self,
        UnboundedReceiver,
    };

    use super::*;
    use crate::protocol::types::ConnectionResponse;

    fn connected_client(discard_stale: bool) -> (SyncProtocolClient, UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut client = SyncProtocolClient::new(tx, discard_stale);
        client.on_transport_connected();
        (client, rx)
    }

    fn request(input: &str) -> ConversionRequest {
        ConversionRequest { input_string: input.to_string(), mappings: Vec::new() }
    }

    fn response(output: &str, request_id: Option<u64>) -> InboundMessage {
        InboundMessage::ConversionResponse(ConversionResponse {
            output_string: output.to_string(),
            request_id,
        })
    }

    #[test]
    fn test_connectivity_status() {
        let (mut client, _rx) = connected_client(true);
        assert!(client.is_connected());

        let action = client.handle_inbound(InboundMessage::ConnectionResponse(ConnectionResponse {
            data: "Connected".to_string(),
        }));
        assert_eq!(action, ClientAction::StatusChanged("(Connected)".to_string()));

        client.on_transport_disconnected(None);
        assert_eq!(client.connection_state(), &ConnectionState::Disconnected);
        assert_eq!(client.status_text(), "(Disconnected)");
    }

    #[test]
    fn test_requests_while_disconnected_are_lost() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut client = SyncProtocolClient::new(tx, true);

        assert!(!client.request_bundle(&LanguagePair::new("dan", "eng")).unwrap());
        client.send_conversion(request("hej")).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_bundle_channel_state_machine() {
        let (mut client, mut rx) = connected_client(true);
        assert_eq!(client.bundle_state(), &BundleState::AwaitingBundle);

        client.request_bundle(&LanguagePair::new("dan", "eng-arpabet")).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::Table(TableEvent {
                in_lang: "dan".to_string(),
                out_lang: "eng-arpabet".to_string(),
                request_id: Some(1),
            })
        );

        let action = client.handle_inbound(InboundMessage::TableResponse(Vec::new().into()));
        assert_eq!(action, ClientAction::ReplaceRegistry(Vec::new()));
        assert_eq!(client.bundle_state(), &BundleState::Populated);

        client.request_bundle(&LanguagePair::custom()).unwrap();
        assert_eq!(client.bundle_state(), &BundleState::AwaitingBundle);
    }

    fn bundle_named(name: &str, request_id: Option<u64>) -> InboundMessage {
        let mut entry = crate::core::BundleEntry::default();
        entry.kwargs.display_name = name.to_string();
        InboundMessage::TableResponse(TableResponse { bundle: vec![entry], request_id })
    }

    #[test]
    fn test_only_latest_table_request_replaces_registry() {
        let (mut client, _rx) = connected_client(true);
        client.request_bundle(&LanguagePair::new("dan", "dan-ipa")).unwrap();
        let first = client.last_request_id();
        client.request_bundle(&LanguagePair::new("fra", "fra-ipa")).unwrap();
        let second = client.last_request_id();

        assert!(matches!(
            client.handle_inbound(bundle_named("fra", Some(second))),
            ClientAction::ReplaceRegistry(_)
        ));
        assert_eq!(client.handle_inbound(bundle_named("dan", Some(first))), ClientAction::Discarded);
        assert_eq!(client.bundle_state(), &BundleState::Populated);
    }

    #[test]
    fn test_uncorrelated_table_responses_apply_in_arrival_order() {
        let (mut client, _rx) = connected_client(true);
        client.request_bundle(&LanguagePair::new("dan", "dan-ipa")).unwrap();
        client.request_bundle(&LanguagePair::new("fra", "fra-ipa")).unwrap();

        assert!(matches!(client.handle_inbound(bundle_named("fra", None)), ClientAction::ReplaceRegistry(_)));
        assert!(matches!(client.handle_inbound(bundle_named("dan", None)), ClientAction::ReplaceRegistry(_)));
    }

    #[test]
    fn test_request_ids_increase() {
        let (mut client, mut rx) = connected_client(true);
        let first = client.send_conversion(request("a")).unwrap();
        let second = client.send_conversion(request("ab")).unwrap();
        assert!(second > first);

        match rx.try_recv().unwrap() {
            OutboundMessage::Conversion(event) => {
                assert_eq!(event.data.request_id, Some(first));
                assert_eq!(event.data.request.input_string, "a");
            }
            other => panic!("Expected conversion event, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_order_responses_are_discarded() {
        let (mut client, _rx) = connected_client(true);
        let first = client.send_conversion(request("h")).unwrap();
        let second = client.send_conversion(request("he")).unwrap();

        assert_eq!(
            client.handle_inbound(response("HE", Some(second))),
            ClientAction::ShowOutput("HE".to_string())
        );
        assert_eq!(client.handle_inbound(response("H", Some(first))), ClientAction::Discarded);
    }

    #[test]
    fn test_responses_from_before_bundle_replace_are_discarded() {
        let (mut client, _rx) = connected_client(true);
        let before = client.send_conversion(request("hej")).unwrap();
        client.handle_inbound(InboundMessage::TableResponse(Vec::new().into()));
        let after = client.send_conversion(request("hej")).unwrap();

        assert_eq!(client.handle_inbound(response("old", Some(before))), ClientAction::Discarded);
        assert_eq!(
            client.handle_inbound(response("new", Some(after))),
            ClientAction::ShowOutput("new".to_string())
        );
    }

    #[test]
    fn test_race_is_reproduced_when_discarding_is_off() {
        let (mut client, _rx) = connected_client(false);
        let first = client.send_conversion(request("h")).unwrap();
        let second = client.send_conversion(request("he")).unwrap();

        client.handle_inbound(response("HE", Some(second)));
        assert_eq!(
            client.handle_inbound(response("H", Some(first))),
            ClientAction::ShowOutput("H".to_string())
        );
    }

    #[test]
    fn test_responses_without_id_always_apply() {
        let (mut client, _rx) = connected_client(true);
        let id = client.send_conversion(request("he")).unwrap();
        client.handle_inbound(response("HE", Some(id)));
        assert_eq!(
            client.handle_inbound(response("legacy", None)),
            ClientAction::ShowOutput("legacy".to_string())
        );
    }
}
