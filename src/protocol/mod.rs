pub mod client;
pub mod connection;
pub mod types;

pub use client::{
    ClientAction,
    SyncProtocolClient,
};
pub use connection::spawn_transport;
pub use types::{
    BundleState,
    ConnectionState,
    ConversionRequest,
    InboundMessage,
    OutboundMessage,
    TableResponse,
    TransportEvent,
};
