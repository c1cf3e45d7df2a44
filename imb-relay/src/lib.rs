//! IMBuildings uplink relay
//!
//! Accepts uplinks over HTTP, decodes them with [`imb_payload`] and forwards
//! successful records to a metrics sink.
//!
//! - `GET /` reports service health
//! - `POST /uplink` decodes one frame and forwards the record

pub mod config;
pub mod error;
pub mod ingress;
pub mod sink;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use imb_payload::ImbDecoder;

pub use config::RelayConfig;
pub use error::RelayError;
pub use ingress::UplinkRequest;
pub use sink::{Envelope, HttpSink, MetricsSink, SinkError};

/// Shared state for request handlers
#[derive(Debug)]
pub struct AppState<K> {
    pub config: RelayConfig,
    pub decoder: ImbDecoder,
    pub sink: K,
}

impl<K: MetricsSink> AppState<K> {
    pub fn new(config: RelayConfig, sink: K) -> Self {
        Self {
            config,
            decoder: ImbDecoder::new(),
            sink,
        }
    }
}

/// Build the relay router
pub fn router<K: MetricsSink>(state: Arc<AppState<K>>) -> Router {
    Router::new()
        .route("/", get(ingress::health))
        .route("/uplink", post(ingress::uplink::<K>))
        .with_state(state)
}
