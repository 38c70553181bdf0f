use futures_util::{
    SinkExt,
    Stream,
    StreamExt,
};
use tokio::{
    sync::mpsc::{
        self,
        UnboundedReceiver,
        UnboundedSender,
    },
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self,
        protocol::Message,
    },
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

use super::types::{
    Envelope,
    InboundMessage,
    OutboundMessage,
    TransportEvent,
};
use crate::core::errors::StudioError;

/// Opens the realtime socket in the background. Outbound messages go in
/// through the returned sender; everything the socket produces comes back
/// through `events`, ending with exactly one `Disconnected`.
pub fn spawn_transport(
    url: String,
    events: UnboundedSender<TransportEvent>,
) -> (UnboundedSender<OutboundMessage>, JoinHandle<()>) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<OutboundMessage>();

    let handle = tokio::spawn(async move {
        let reason = match run_transport(&url, outbound_rx, events.clone()).await {
            Ok(()) => None,
            Err(e) => {
                error!("[WS] Transport to {} failed: {}", url, e);
                Some(e.to_string())
            }
        };
        let _ = events.send(TransportEvent::Disconnected(reason));
    });

    (outbound_tx, handle)
}

async fn run_transport(
    url: &str,
    mut outbound_rx: UnboundedReceiver<OutboundMessage>,
    events: UnboundedSender<TransportEvent>,
) -> Result<(), StudioError> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("[WS] WebSocket connection established with: {}", url);
    events.send(TransportEvent::Connected)?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let forward_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let event = message.event_name();
            let json = match message.into_envelope().and_then(|envelope| {
                serde_json::to_string(&envelope).map_err(StudioError::from)
            }) {
                Ok(json) => json,
                Err(e) => {
                    error!("[WS] Failed to encode {}: {}", event, e);
                    continue;
                }
            };
            if ws_sender.send(Message::text(json)).await.is_err() {
                break;
            }
        }
    });

    let result = receive_frames(&mut ws_receiver, &events).await;
    forward_task.abort();
    result
}

async fn receive_frames<S>(
    ws_receiver: &mut S,
    events: &UnboundedSender<TransportEvent>,
) -> Result<(), StudioError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match decode_frame(text.as_str()) {
                Ok(Some(message)) => events.send(TransportEvent::Message(message))?,
                Ok(None) => debug!("[WS] Ignoring unhandled event: {}", text.as_str()),
                Err(e) => warn!("[WS] Received message that's not a valid envelope: {}", e),
            },
            Ok(Message::Close(_)) => {
                info!("[WS] Server closed the connection");
                break;
            }
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }
    Ok(())
}

fn decode_frame(text: &str) -> Result<Option<InboundMessage>, StudioError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    InboundMessage::from_envelope(envelope)
}
