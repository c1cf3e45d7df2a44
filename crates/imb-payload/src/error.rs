//! Error types for payload decoding

use thiserror::Error;

/// Classification of a reportable decode failure
///
/// The numeric codes match the error codes used by the vendor payload parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ErrorKind {
    /// Frame length does not fit the classified variant
    UnknownPayload,
    /// Port 10 frame is not a downlink echo
    ExpectedDownlinkResponse,
    /// Payload type is not handled by this decoder
    UnknownPayloadType,
    /// Variant is not handled for an otherwise supported type
    UnknownPayloadVariant,
}

impl ErrorKind {
    /// Vendor error code
    pub fn code(self) -> u8 {
        match self {
            ErrorKind::UnknownPayload => 1,
            ErrorKind::ExpectedDownlinkResponse => 2,
            ErrorKind::UnknownPayloadType => 3,
            ErrorKind::UnknownPayloadVariant => 4,
        }
    }

    /// Fixed human-readable message reported for this kind
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::UnknownPayload => {
                "Unable to detect correct payload. Please check your device configuration"
            }
            ErrorKind::ExpectedDownlinkResponse => "Expected downlink response",
            ErrorKind::UnknownPayloadType => "Unknown payload type",
            ErrorKind::UnknownPayloadVariant => "Unknown payload variant",
        }
    }
}

/// Errors that can occur while decoding a frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is too short or malformed for the variant it was classified as
    #[error("Unable to detect correct payload. Please check your device configuration")]
    UnknownPayload,

    /// Port 10 frame did not echo a downlink
    #[error("Expected downlink response")]
    ExpectedDownlinkResponse,

    /// Resolved payload type has no handler
    #[error("Unknown payload type")]
    UnknownPayloadType(u8),

    /// Resolved variant has no handler for its payload type
    #[error("Unknown payload variant")]
    UnknownPayloadVariant { payload_type: u8, variant: u8 },

    /// Headerless frame on a port with no known layout.
    ///
    /// Carries no messages: callers should drop the frame without reporting it.
    #[error("frame not recognized on this port")]
    Unrecognized,
}

impl DecodeError {
    /// The reportable kind, or `None` for [`DecodeError::Unrecognized`]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DecodeError::UnknownPayload => Some(ErrorKind::UnknownPayload),
            DecodeError::ExpectedDownlinkResponse => Some(ErrorKind::ExpectedDownlinkResponse),
            DecodeError::UnknownPayloadType(_) => Some(ErrorKind::UnknownPayloadType),
            DecodeError::UnknownPayloadVariant { .. } => Some(ErrorKind::UnknownPayloadVariant),
            DecodeError::Unrecognized => None,
        }
    }

    /// Messages to report upstream; empty for the unrecognized outcome
    pub fn messages(&self) -> Vec<&'static str> {
        self.kind().map(|k| vec![k.message()]).unwrap_or_default()
    }

    /// Whether this is the silent "not a frame for us" outcome
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, DecodeError::Unrecognized)
    }
}
