//! IMBuildings Payload Library
//!
//! This crate decodes the fixed-layout uplink frames sent by IMBuildings
//! LoRaWAN and NB-IoT sensors into structured records.
//!
//! # Architecture
//!
//! Decoding is a pure function of the frame and its metadata:
//! - [`classify`] decides the payload type and variant, first from the
//!   self-describing header and then from the LoRaWAN port
//! - [`people_counter`] extracts the variant fields, most of which are
//!   addressed from the end of the frame
//! - [`DecodeError`] reports the vendor error kinds, plus a silent
//!   "unrecognized" outcome for frames on unmapped ports
//!
//! The same bytes can mean different things depending on the port:
//! - `02 07 ...` with length 15 is a headered totals frame
//! - 5 bytes on port 27 is a headerless totals frame
//! - 5 bytes on port 99 is not a frame this decoder knows about
//!
//! # Example
//!
//! ```rust
//! use imb_payload::{decode, DecodeInput};
//!
//! // Headerless totals frame on port 27: sensor status 1, totals 5 and 7
//! let bytes = [0x01, 0x00, 0x05, 0x00, 0x07];
//! let record = decode(DecodeInput::new(&bytes).with_port(27)).unwrap();
//!
//! assert_eq!(record.payload_type, 0x02);
//! assert_eq!(record.payload_variant, 0x07);
//! assert_eq!(record.total_counter_a, Some(5));
//! assert_eq!(record.total_counter_b, Some(7));
//! ```

pub mod classify;
pub mod error;
pub mod people_counter;
pub mod record;
pub mod wire;

pub use classify::{DecodeContext, DecodeInput};
pub use error::{DecodeError, ErrorKind};
pub use people_counter::PeopleCounterVariant;
pub use record::{BatteryVoltage, DecodeOutput, DecodedRecord};

/// Payload types used by IMBuildings devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PayloadType {
    /// Temperature, humidity and CO2
    ComfortSensor = 0x01,
    /// Bi-directional people counter
    PeopleCounter = 0x02,
    /// Feedback buttons
    Buttons = 0x03,
    /// Pulse counter
    PulseCounter = 0x04,
    /// Echo of a downlink command
    Downlink = 0xF1,
}

impl PayloadType {
    /// Wire code
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable name for the payload type
    pub fn name(&self) -> &'static str {
        match self {
            PayloadType::ComfortSensor => "Comfort sensor",
            PayloadType::PeopleCounter => "People counter",
            PayloadType::Buttons => "Buttons",
            PayloadType::PulseCounter => "Pulse counter",
            PayloadType::Downlink => "Downlink response",
        }
    }
}

impl TryFrom<u8> for PayloadType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::ComfortSensor),
            0x02 => Ok(Self::PeopleCounter),
            0x03 => Ok(Self::Buttons),
            0x04 => Ok(Self::PulseCounter),
            0xF1 => Ok(Self::Downlink),
            _ => Err(DecodeError::UnknownPayloadType(value)),
        }
    }
}

/// Trait for decoders that turn a raw frame into a [`DecodedRecord`]
pub trait PayloadDecoder: Send + Sync {
    /// Decode one frame
    fn decode(&self, input: DecodeInput<'_>) -> Result<DecodedRecord, DecodeError>;
}

/// Decoder for IMBuildings frames
#[derive(Debug, Clone, Copy, Default)]
pub struct ImbDecoder;

impl ImbDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl PayloadDecoder for ImbDecoder {
    fn decode(&self, input: DecodeInput<'_>) -> Result<DecodedRecord, DecodeError> {
        decode(input)
    }
}

/// Decode one frame
pub fn decode(input: DecodeInput<'_>) -> Result<DecodedRecord, DecodeError> {
    let ctx = DecodeContext::classify(&input)?;
    tracing::trace!(
        payload_type = ctx.payload_type,
        variant = ctx.variant,
        header = ctx.header_present,
        "classified frame"
    );

    match PayloadType::try_from(ctx.payload_type)? {
        PayloadType::PeopleCounter => people_counter::parse(ctx, input.bytes),
        PayloadType::Downlink => {
            if ctx.variant != classify::DOWNLINK_ECHO_VARIANT {
                return Err(DecodeError::UnknownPayloadVariant {
                    payload_type: ctx.payload_type,
                    variant: ctx.variant,
                });
            }
            Ok(DecodedRecord::classified(ctx))
        }
        PayloadType::ComfortSensor | PayloadType::Buttons | PayloadType::PulseCounter => {
            Err(DecodeError::UnknownPayloadType(ctx.payload_type))
        }
    }
}
