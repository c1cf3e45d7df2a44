//! Frame classification
//!
//! The wire format is ambiguous: a short headerless frame cannot be told
//! apart from a malformed one by its contents alone. Classification therefore
//! runs two ordered tables:
//!
//! 1. [`HEADER_LAYOUTS`]: a frame carries the 10-byte self-describing header
//!    only if its first two bytes *and* its exact length match an entry.
//! 2. [`PORT_LAYOUTS`]: otherwise the LoRaWAN port number selects the
//!    type and variant, and each port expects one fixed length.
//!
//! # Header Format
//! ```text
//! [type] [variant] [device id: 8 bytes] [variant fields...]
//! ```

use crate::error::DecodeError;
use crate::wire::{to_hex, FrameReader};
use crate::PayloadType;

/// Length of the self-describing header
pub const HEADER_LEN: usize = 10;

/// Length of the device id carried in the header
pub const DEVICE_ID_LEN: usize = 8;

/// Port on which devices echo downlink commands
pub const DOWNLINK_PORT: u8 = 10;

/// Variant byte of a downlink echo
pub const DOWNLINK_ECHO_VARIANT: u8 = 0x01;

/// A headered frame layout, identified by its leading bytes and exact length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub payload_type: PayloadType,
    pub variant: u8,
    pub length: usize,
}

/// Every headered layout the decoder recognizes, tried in order
pub const HEADER_LAYOUTS: &[HeaderLayout] = &[
    HeaderLayout {
        payload_type: PayloadType::PeopleCounter,
        variant: 0x04,
        length: 24,
    },
    HeaderLayout {
        payload_type: PayloadType::PeopleCounter,
        variant: 0x06,
        length: 23,
    },
    HeaderLayout {
        payload_type: PayloadType::PeopleCounter,
        variant: 0x07,
        length: 15,
    },
    HeaderLayout {
        payload_type: PayloadType::PeopleCounter,
        variant: 0x08,
        length: 14,
    },
];

/// What a port implies about a headerless frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRule {
    /// Frame must start with the downlink type and echo variant
    DownlinkEcho,
    /// Frame is a fixed-length body of the given type and variant
    Fixed {
        payload_type: PayloadType,
        variant: u8,
        length: usize,
    },
}

/// A port-keyed layout for frames without a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortLayout {
    pub port: u8,
    pub rule: PortRule,
}

/// Port table consulted when header detection fails
pub const PORT_LAYOUTS: &[PortLayout] = &[
    PortLayout {
        port: DOWNLINK_PORT,
        rule: PortRule::DownlinkEcho,
    },
    PortLayout {
        port: 11,
        rule: PortRule::Fixed {
            payload_type: PayloadType::ComfortSensor,
            variant: 0x01,
            length: 7,
        },
    },
    PortLayout {
        port: 24,
        rule: PortRule::Fixed {
            payload_type: PayloadType::PeopleCounter,
            variant: 0x04,
            length: 12,
        },
    },
    PortLayout {
        port: 26,
        rule: PortRule::Fixed {
            payload_type: PayloadType::PeopleCounter,
            variant: 0x06,
            length: 13,
        },
    },
    PortLayout {
        port: 27,
        rule: PortRule::Fixed {
            payload_type: PayloadType::PeopleCounter,
            variant: 0x07,
            length: 5,
        },
    },
    PortLayout {
        port: 28,
        rule: PortRule::Fixed {
            payload_type: PayloadType::PeopleCounter,
            variant: 0x08,
            length: 4,
        },
    },
];

/// Find the headered layout a frame matches, if any
pub fn detect_header(bytes: &[u8]) -> Option<&'static HeaderLayout> {
    let (&payload_type, &variant) = (bytes.first()?, bytes.get(1)?);
    HEADER_LAYOUTS.iter().find(|layout| {
        layout.payload_type.code() == payload_type
            && layout.variant == variant
            && layout.length == bytes.len()
    })
}

/// Look up the layout for a port
pub fn port_layout(port: u8) -> Option<&'static PortLayout> {
    PORT_LAYOUTS.iter().find(|layout| layout.port == port)
}

/// One frame plus the metadata it arrived with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeInput<'a> {
    /// Raw frame
    pub bytes: &'a [u8],
    /// LoRaWAN application port
    pub port: Option<u8>,
    /// Forces header parsing on (`Some(true)`) or off (`Some(false)`);
    /// inferred from [`HEADER_LAYOUTS`] when `None`
    pub header: Option<bool>,
    /// Network-assigned device EUI, used as the device id of headerless frames
    pub device_eui: Option<[u8; DEVICE_ID_LEN]>,
}

impl<'a> DecodeInput<'a> {
    /// Input with no metadata
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            port: None,
            header: None,
            device_eui: None,
        }
    }

    pub fn with_port(mut self, port: u8) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = Some(header);
        self
    }

    pub fn with_device_eui(mut self, eui: [u8; DEVICE_ID_LEN]) -> Self {
        self.device_eui = Some(eui);
        self
    }
}

/// Classification result, computed once per frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeContext {
    pub payload_type: u8,
    pub variant: u8,
    /// Whether the frame starts with the self-describing header
    pub header_present: bool,
    pub device_id: Option<String>,
}

impl DecodeContext {
    /// Classify a frame by header, then by port
    pub fn classify(input: &DecodeInput<'_>) -> Result<Self, DecodeError> {
        let header = input
            .header
            .unwrap_or_else(|| detect_header(input.bytes).is_some());

        if header {
            Self::from_header(input.bytes)
        } else {
            Self::from_port(input)
        }
    }

    fn from_header(bytes: &[u8]) -> Result<Self, DecodeError> {
        let reader = FrameReader::new(bytes);
        reader.require(HEADER_LEN)?;

        Ok(Self {
            payload_type: reader.u8(0)?,
            variant: reader.u8(1)?,
            header_present: true,
            device_id: Some(reader.hex(2, DEVICE_ID_LEN)?),
        })
    }

    fn from_port(input: &DecodeInput<'_>) -> Result<Self, DecodeError> {
        let Some(layout) = input.port.and_then(port_layout) else {
            tracing::trace!(port = ?input.port, "no layout for port");
            return Err(DecodeError::Unrecognized);
        };
        let device_id = input.device_eui.as_ref().map(|eui| to_hex(eui));

        match layout.rule {
            PortRule::DownlinkEcho => {
                let downlink = PayloadType::Downlink.code();
                match input.bytes {
                    [t, v, ..] if *t == downlink && *v == DOWNLINK_ECHO_VARIANT => Ok(Self {
                        payload_type: downlink,
                        variant: DOWNLINK_ECHO_VARIANT,
                        header_present: false,
                        device_id,
                    }),
                    _ => Err(DecodeError::ExpectedDownlinkResponse),
                }
            }
            PortRule::Fixed {
                payload_type,
                variant,
                length,
            } => {
                if input.bytes.len() != length {
                    tracing::trace!(
                        port = layout.port,
                        len = input.bytes.len(),
                        expected = length,
                        "length mismatch for port"
                    );
                    return Err(DecodeError::UnknownPayload);
                }
                Ok(Self {
                    payload_type: payload_type.code(),
                    variant,
                    header_present: false,
                    device_id,
                })
            }
        }
    }
}
