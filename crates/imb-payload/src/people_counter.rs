//! People counter (payload type 0x02)
//!
//! Variant fields sit at fixed offsets from the *end* of the frame, so the
//! same parser handles headered and headerless frames. Only variant 0x04 also
//! reads from the start of the frame, and only when a header is present.
//!
//! # Variant 0x04 (headered, 24 bytes)
//! ```text
//! 02 04 [id: 6] [dev status] [battery: 2] [rssi] [datetime: 7 BCD] [A: 2] [B: 2] [sensor status]
//! ```
//!
//! # Variant 0x06 tail (13 bytes)
//! ```text
//! [dev status] [battery: 2] [A: 2] [B: 2] [sensor status] [total A: 2] [total B: 2] [payload counter]
//! ```
//!
//! # Variant 0x07 tail (5 bytes)
//! ```text
//! [sensor status] [total A: 2] [total B: 2]
//! ```
//!
//! # Variant 0x08 tail (4 bytes)
//! ```text
//! [dev status] [battery: 2] [sensor status]
//! ```

use chrono::{DateTime, Duration, Months, TimeZone, Utc};

use crate::classify::DecodeContext;
use crate::error::DecodeError;
use crate::record::{BatteryVoltage, DecodedRecord};
use crate::wire::{unbcd, FrameReader};

/// Length of the device id re-read by headered variant 0x04 frames
const SHORT_DEVICE_ID_LEN: usize = 6;

/// Known people counter variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeopleCounterVariant {
    /// Period counters with a device timestamp
    Counters = 0x04,
    /// Period and total counters with battery and payload counter
    Extended = 0x06,
    /// Total counters only
    Totals = 0x07,
    /// Battery and status heartbeat
    Status = 0x08,
}

impl PeopleCounterVariant {
    /// All variants with a dedicated layout
    pub const ALL: [PeopleCounterVariant; 4] = [
        PeopleCounterVariant::Counters,
        PeopleCounterVariant::Extended,
        PeopleCounterVariant::Totals,
        PeopleCounterVariant::Status,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x04 => Some(Self::Counters),
            0x06 => Some(Self::Extended),
            0x07 => Some(Self::Totals),
            0x08 => Some(Self::Status),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Smallest frame the variant can be read from
    pub fn min_len(self) -> usize {
        match self {
            Self::Counters => 12,
            Self::Extended => 13,
            Self::Totals => 5,
            Self::Status => 4,
        }
    }

    /// Port used when the device sends this variant without a header
    pub fn port(self) -> u8 {
        match self {
            Self::Counters => 24,
            Self::Extended => 26,
            Self::Totals => 27,
            Self::Status => 28,
        }
    }
}

/// Extract variant fields into a record
///
/// Variants without a layout keep only the classified fields.
pub(crate) fn parse(ctx: DecodeContext, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    let reader = FrameReader::new(bytes);
    let header_present = ctx.header_present;
    let variant = PeopleCounterVariant::from_code(ctx.variant);
    let mut record = DecodedRecord::classified(ctx);

    let Some(variant) = variant else {
        tracing::trace!(
            variant = record.payload_variant,
            "people counter variant has no layout"
        );
        return Ok(record);
    };
    reader.require(variant.min_len())?;

    match variant {
        PeopleCounterVariant::Counters => {
            if header_present {
                record.device_id = Some(reader.hex(2, SHORT_DEVICE_ID_LEN)?);
                record.device_status = Some(reader.u8(8)?);
                record.battery_voltage = Some(BatteryVoltage::from_centivolts(reader.u16_be(9)?));
                record.rssi = Some(reader.i8(11)?);
            }
            record.datetime = Some(read_datetime(&reader, reader.back(12)?)?);
            record.counter_a = Some(reader.u16_be_back(5)?);
            record.counter_b = Some(reader.u16_be_back(3)?);
            record.sensor_status = Some(reader.u8_back(1)?);
        }
        PeopleCounterVariant::Extended => {
            record.device_status = Some(reader.u8_back(13)?);
            record.battery_voltage =
                Some(BatteryVoltage::from_centivolts(reader.u16_be_back(12)?));
            record.counter_a = Some(reader.u16_be_back(10)?);
            record.counter_b = Some(reader.u16_be_back(8)?);
            record.sensor_status = Some(reader.u8_back(6)?);
            record.total_counter_a = Some(reader.u16_be_back(5)?);
            record.total_counter_b = Some(reader.u16_be_back(3)?);
            record.payload_counter = Some(reader.u8_back(1)?);
        }
        PeopleCounterVariant::Totals => {
            record.sensor_status = Some(reader.u8_back(5)?);
            record.total_counter_a = Some(reader.u16_be_back(4)?);
            record.total_counter_b = Some(reader.u16_be_back(2)?);
        }
        PeopleCounterVariant::Status => {
            record.device_status = Some(reader.u8_back(4)?);
            record.battery_voltage = Some(BatteryVoltage::from_centivolts(reader.u16_be_back(3)?));
            record.sensor_status = Some(reader.u8_back(1)?);
        }
    }

    Ok(record)
}

/// Read a 7-byte BCD timestamp: century, year, month, day, hour, minute, second
///
/// Components past their range carry into the next unit (month 13 is January
/// of the following year, second 60 the next minute). Two-digit years are
/// taken as 19xx.
fn read_datetime(reader: &FrameReader<'_>, start: usize) -> Result<DateTime<Utc>, DecodeError> {
    let digit = |i: usize| reader.u8(start + i).map(|b| i64::from(unbcd(b)));

    let mut year = digit(0)? * 100 + digit(1)?;
    if year < 100 {
        year += 1900;
    }
    let month = digit(2)?;
    let day = digit(3)?;
    let hour = digit(4)?;
    let minute = digit(5)?;
    let second = digit(6)?;

    let offset = Duration::days(day - 1)
        + Duration::hours(hour)
        + Duration::minutes(minute)
        + Duration::seconds(second);

    // Year is at most 16665, well inside i32
    Utc.with_ymd_and_hms(year as i32, 1, 1, 0, 0, 0)
        .single()
        .and_then(|jan1| match month {
            0 => jan1.checked_sub_months(Months::new(1)),
            m => jan1.checked_add_months(Months::new((m - 1) as u32)),
        })
        .and_then(|dt| dt.checked_add_signed(offset))
        .ok_or_else(|| {
            tracing::trace!(year, month, day, hour, minute, second, "unrepresentable device datetime");
            DecodeError::UnknownPayload
        })
}

#[cfg(test)]
mod tests {
    use super::{parse, read_datetime, PeopleCounterVariant};
    use crate::classify::DecodeContext;
    use crate::wire::FrameReader;
    use crate::DecodeError;

    fn headerless(variant: u8) -> DecodeContext {
        DecodeContext {
            payload_type: 0x02,
            variant,
            header_present: false,
            device_id: None,
        }
    }

    #[test]
    fn test_read_datetime() {
        let bytes = [0x20, 0x24, 0x03, 0x15, 0x10, 0x30, 0x00];
        let reader = FrameReader::new(&bytes);
        let datetime = read_datetime(&reader, 0).unwrap();
        assert_eq!(
            crate::record::format_datetime(&datetime),
            "2024-03-15T10:30:00.000Z"
        );
    }

    fn datetime_iso(bytes: [u8; 7]) -> String {
        let reader = FrameReader::new(&bytes);
        crate::record::format_datetime(&read_datetime(&reader, 0).unwrap())
    }

    #[test]
    fn test_read_datetime_carries_overflow() {
        // second 60
        assert_eq!(
            datetime_iso([0x20, 0x24, 0x03, 0x15, 0x10, 0x30, 0x60]),
            "2024-03-15T10:31:00.000Z"
        );
        // month 13
        assert_eq!(
            datetime_iso([0x20, 0x24, 0x13, 0x15, 0x10, 0x30, 0x00]),
            "2025-01-15T10:30:00.000Z"
        );
        // day 32 in March
        assert_eq!(
            datetime_iso([0x20, 0x24, 0x03, 0x32, 0x00, 0x00, 0x00]),
            "2024-04-01T00:00:00.000Z"
        );
        // hour 24
        assert_eq!(
            datetime_iso([0x20, 0x23, 0x12, 0x31, 0x24, 0x00, 0x00]),
            "2024-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_read_datetime_zero_month_and_day_step_back() {
        // month 0 is December of the previous year
        assert_eq!(
            datetime_iso([0x20, 0x24, 0x00, 0x15, 0x10, 0x30, 0x00]),
            "2023-12-15T10:30:00.000Z"
        );
        // day 0 is the last day of the previous month
        assert_eq!(
            datetime_iso([0x20, 0x24, 0x03, 0x00, 0x00, 0x00, 0x00]),
            "2024-02-29T00:00:00.000Z"
        );
    }

    #[test]
    fn test_read_datetime_two_digit_year() {
        assert_eq!(
            datetime_iso([0x00, 0x24, 0x03, 0x15, 0x10, 0x30, 0x00]),
            "1924-03-15T10:30:00.000Z"
        );
    }

    #[test]
    fn test_read_datetime_short_frame() {
        let bytes = [0x20, 0x24, 0x03];
        let reader = FrameReader::new(&bytes);
        assert_eq!(read_datetime(&reader, 0), Err(DecodeError::UnknownPayload));
    }

    #[test]
    fn test_counters_without_header_skips_device_fields() {
        // 2023-12-31 23:59:58, A = 300, B = 2, sensor status 0
        let bytes = [
            0x20, 0x23, 0x12, 0x31, 0x23, 0x59, 0x58, 0x01, 0x2C, 0x00, 0x02, 0x00,
        ];
        let record = parse(headerless(0x04), &bytes).unwrap();
        assert_eq!(record.device_status, None);
        assert_eq!(record.battery_voltage, None);
        assert_eq!(record.rssi, None);
        assert_eq!(
            record.datetime_iso().as_deref(),
            Some("2023-12-31T23:59:58.000Z")
        );
        assert_eq!(record.counter_a, Some(300));
        assert_eq!(record.counter_b, Some(2));
        assert_eq!(record.sensor_status, Some(0));
    }

    #[test]
    fn test_extended() {
        let bytes = [
            0x00, 0x01, 0x4A, 0x00, 0x03, 0x00, 0x04, 0x01, 0x01, 0x00, 0x02, 0x00, 0x7F,
        ];
        let record = parse(headerless(0x06), &bytes).unwrap();
        assert_eq!(record.device_status, Some(0));
        assert_eq!(record.battery_voltage.unwrap().centivolts(), 330);
        assert_eq!(record.counter_a, Some(3));
        assert_eq!(record.counter_b, Some(4));
        assert_eq!(record.sensor_status, Some(1));
        assert_eq!(record.total_counter_a, Some(256));
        assert_eq!(record.total_counter_b, Some(512));
        assert_eq!(record.payload_counter, Some(0x7F));
    }

    #[test]
    fn test_status() {
        let record = parse(headerless(0x08), &[0x01, 0x09, 0x60, 0x02]).unwrap();
        assert_eq!(record.device_status, Some(1));
        assert_eq!(record.battery_voltage.unwrap().volts(), 24.0);
        assert_eq!(record.sensor_status, Some(2));
        assert_eq!(record.counter_a, None);
    }

    #[test]
    fn test_short_frame_is_unknown_payload() {
        for variant in PeopleCounterVariant::ALL {
            let bytes = vec![0u8; variant.min_len() - 1];
            assert_eq!(
                parse(headerless(variant.code()), &bytes),
                Err(DecodeError::UnknownPayload),
                "variant 0x{:02X}",
                variant.code()
            );
        }
    }

    #[test]
    fn test_unlisted_variant_keeps_classified_fields() {
        let record = parse(headerless(0x05), &[0x00; 3]).unwrap();
        assert_eq!(record.payload_type, 0x02);
        assert_eq!(record.payload_variant, 0x05);
        assert_eq!(record.sensor_status, None);
    }

    #[test]
    fn test_variant_ports() {
        assert_eq!(PeopleCounterVariant::Counters.port(), 24);
        assert_eq!(PeopleCounterVariant::Extended.port(), 26);
        assert_eq!(PeopleCounterVariant::Totals.port(), 27);
        assert_eq!(PeopleCounterVariant::Status.port(), 28);
        assert_eq!(PeopleCounterVariant::from_code(0x05), None);
    }
}
