//! Decoded record and the uplink-decoder output shape

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::classify::DecodeContext;
use crate::error::DecodeError;
use crate::PayloadType;

/// Battery voltage as reported on the wire, in centivolts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatteryVoltage {
    centivolts: u16,
}

impl BatteryVoltage {
    /// Wrap a raw centivolt reading
    pub fn from_centivolts(centivolts: u16) -> Self {
        Self { centivolts }
    }

    /// Raw reading
    pub fn centivolts(&self) -> u16 {
        self.centivolts
    }

    /// Voltage in volts
    pub fn volts(&self) -> f64 {
        f64::from(self.centivolts) / 100.0
    }
}

impl fmt::Display for BatteryVoltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} V", self.centivolts / 100, self.centivolts % 100)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for BatteryVoltage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.volts())
    }
}

/// Render a device timestamp the way the uplink output reports it
pub fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(feature = "serde")]
fn serialize_datetime<S: serde::Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(datetime) => serializer.serialize_str(&format_datetime(datetime)),
        None => serializer.serialize_none(),
    }
}

/// A fully classified frame
///
/// Which optional fields are present depends on the payload type and variant.
/// Absent fields are skipped when serialized.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodedRecord {
    pub payload_type: u8,
    pub payload_variant: u8,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub device_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub device_status: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub battery_voltage: Option<BatteryVoltage>,
    /// Signal strength in dBm
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub rssi: Option<i8>,
    #[cfg_attr(
        feature = "serde",
        serde(
            skip_serializing_if = "Option::is_none",
            serialize_with = "serialize_datetime"
        )
    )]
    pub datetime: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub counter_a: Option<u16>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub counter_b: Option<u16>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub total_counter_a: Option<u16>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub total_counter_b: Option<u16>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub sensor_status: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub payload_counter: Option<u8>,
}

impl DecodedRecord {
    /// Record carrying only what classification established
    pub(crate) fn classified(ctx: DecodeContext) -> Self {
        Self {
            payload_type: ctx.payload_type,
            payload_variant: ctx.variant,
            device_id: ctx.device_id,
            device_status: None,
            battery_voltage: None,
            rssi: None,
            datetime: None,
            counter_a: None,
            counter_b: None,
            total_counter_a: None,
            total_counter_b: None,
            sensor_status: None,
            payload_counter: None,
        }
    }

    /// Device timestamp in ISO-8601 with millisecond precision
    pub fn datetime_iso(&self) -> Option<String> {
        self.datetime.as_ref().map(format_datetime)
    }
}

impl fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(payload_type) = PayloadType::try_from(self.payload_type) {
            write!(f, "{} ", payload_type.name())?;
        }
        write!(
            f,
            "type=0x{:02X} variant=0x{:02X}",
            self.payload_type, self.payload_variant
        )?;
        if let Some(id) = &self.device_id {
            write!(f, " device={}", id)?;
        }
        if let Some(battery) = &self.battery_voltage {
            write!(f, " battery={}", battery)?;
        }
        if let Some(rssi) = self.rssi {
            write!(f, " rssi={}dBm", rssi)?;
        }
        if let Some(datetime) = self.datetime_iso() {
            write!(f, " at={}", datetime)?;
        }
        if let (Some(a), Some(b)) = (self.counter_a, self.counter_b) {
            write!(f, " counters={}/{}", a, b)?;
        }
        if let (Some(a), Some(b)) = (self.total_counter_a, self.total_counter_b) {
            write!(f, " totals={}/{}", a, b)?;
        }
        Ok(())
    }
}

/// Uplink-decoder result: `{"data": ...}` or `{"errors": [...]}`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodeOutput {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub data: Option<DecodedRecord>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub errors: Option<Vec<&'static str>>,
}

impl From<Result<DecodedRecord, DecodeError>> for DecodeOutput {
    fn from(result: Result<DecodedRecord, DecodeError>) -> Self {
        match result {
            Ok(record) => Self {
                data: Some(record),
                errors: None,
            },
            Err(err) => Self {
                data: None,
                errors: Some(err.messages()),
            },
        }
    }
}
