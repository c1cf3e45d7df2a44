//! HTTP ingress handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use hex::FromHex;
use imb_payload::classify::DEVICE_ID_LEN;
use imb_payload::record::format_datetime;
use imb_payload::{DecodeError, DecodeInput, DecodeOutput, PayloadDecoder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RelayError;
use crate::sink::{Envelope, MetricsSink};
use crate::AppState;

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Body of `POST /uplink`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UplinkRequest {
    /// Frame bytes as hex
    pub payload: Option<String>,
    pub port: Option<u8>,
    /// 8-byte device EUI as hex
    pub device_eui: Option<String>,
    /// Explicit header flag, inferred when absent
    pub header: Option<bool>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "imb-relay" }))
}

/// Decode one uplink and forward it to the sink
pub async fn uplink<K: MetricsSink>(
    State(state): State<Arc<AppState<K>>>,
    headers: HeaderMap,
    body: Result<Json<UplinkRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    authorize(&headers, state.config.api_key())?;
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!("Rejected uplink body: {}", rejection.body_text());
        RelayError::InvalidBody(rejection)
    })?;

    let payload = request
        .payload
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(RelayError::MissingPayload)?;
    let bytes = hex::decode(payload).map_err(|_| RelayError::InvalidHex("payload"))?;

    let mut input = DecodeInput::new(&bytes);
    if let Some(port) = request.port {
        input = input.with_port(port);
    }
    if let Some(header) = request.header {
        input = input.with_header(header);
    }
    if let Some(eui) = request.device_eui.as_deref() {
        let eui = <[u8; DEVICE_ID_LEN]>::from_hex(eui.trim())
            .map_err(|_| RelayError::InvalidHex("device_eui"))?;
        input = input.with_device_eui(eui);
    }

    let record = match state.decoder.decode(input) {
        Ok(record) => record,
        Err(err) if err.is_unrecognized() => {
            tracing::debug!(
                "Ignoring unrecognized frame on port {:?}: {}",
                request.port,
                payload
            );
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        Err(err) => {
            tracing::warn!("Rejected frame on port {:?}: {}", request.port, err);
            return Err(RelayError::Decode(err));
        }
    };

    tracing::info!("Decoded {}", record);

    let envelope = Envelope {
        received_at: format_datetime(&Utc::now()),
        port: request.port,
        record: record.clone(),
    };
    state.sink.deliver(envelope).await.map_err(|err| {
        tracing::error!("Failed to forward record: {}", err);
        RelayError::from(err)
    })?;

    Ok(Json(DecodeOutput::from(Ok::<_, DecodeError>(record))).into_response())
}

/// Check the API key, accepting either the key header or a bearer token
pub fn authorize(headers: &HeaderMap, api_key: Option<&str>) -> Result<(), RelayError> {
    let Some(expected) = api_key else {
        return Ok(());
    };

    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });

    if presented == Some(expected) {
        Ok(())
    } else {
        tracing::warn!("Rejected uplink with missing or wrong API key");
        Err(RelayError::Unauthorized)
    }
}
