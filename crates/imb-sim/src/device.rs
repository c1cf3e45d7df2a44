//! Virtual people counter
//!
//! Provides a simulated device that keeps counter state and encodes it into
//! the same frames a real sensor would send, with or without the header.

use chrono::{DateTime, Datelike, SubsecRound, Timelike, Utc};
use imb_payload::classify::{DEVICE_ID_LEN, DOWNLINK_ECHO_VARIANT, DOWNLINK_PORT};
use imb_payload::wire::bcd;
use imb_payload::{DecodeInput, PayloadType, PeopleCounterVariant};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// How a frame identifies its type and variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Framing {
    /// Self-describing 10-byte header, no port
    Header,
    /// Bare variant body on the variant's LoRaWAN port
    Port,
}

/// An encoded uplink as it would arrive at the network server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimFrame {
    pub bytes: Vec<u8>,
    pub port: Option<u8>,
    /// Present for headerless frames, where the network supplies the identity
    pub device_eui: Option<[u8; DEVICE_ID_LEN]>,
}

impl SimFrame {
    /// Decoder input for this frame
    pub fn input(&self) -> DecodeInput<'_> {
        DecodeInput {
            bytes: &self.bytes,
            port: self.port,
            header: None,
            device_eui: self.device_eui,
        }
    }

    /// Payload as lowercase hex, the form the relay accepts
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Device EUI as lowercase hex
    pub fn device_eui_hex(&self) -> Option<String> {
        self.device_eui.map(hex::encode)
    }
}

/// Configuration for creating a virtual device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualDeviceConfig {
    /// Display name
    pub name: String,
    /// 8-byte device id (also used as the EUI)
    pub device_id: [u8; DEVICE_ID_LEN],
    /// Initial battery reading in centivolts
    pub battery_centivolts: u16,
    /// Initial signal strength in dBm
    pub rssi: i8,
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            name: "Virtual People Counter".to_string(),
            device_id: [0x00, 0x04, 0xA3, 0x0B, 0x00, 0x00, 0x00, 0x01],
            battery_centivolts: 360,
            rssi: -80,
        }
    }
}

/// A simulated people counter
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    name: String,
    device_id: [u8; DEVICE_ID_LEN],
    device_status: u8,
    sensor_status: u8,
    battery_centivolts: u16,
    rssi: i8,
    counter_a: u16,
    counter_b: u16,
    total_counter_a: u16,
    total_counter_b: u16,
    payload_counter: u8,
    clock: DateTime<Utc>,
}

impl VirtualDevice {
    /// Create a device with default readings
    pub fn new(device_id: [u8; DEVICE_ID_LEN]) -> Self {
        Self::from_config(VirtualDeviceConfig {
            device_id,
            ..Default::default()
        })
    }

    /// Create a device from configuration
    pub fn from_config(config: VirtualDeviceConfig) -> Self {
        Self {
            name: config.name,
            device_id: config.device_id,
            device_status: 0,
            sensor_status: 0,
            battery_centivolts: config.battery_centivolts,
            rssi: config.rssi,
            counter_a: 0,
            counter_b: 0,
            total_counter_a: 0,
            total_counter_b: 0,
            payload_counter: 0,
            clock: Utc::now().trunc_subsecs(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> [u8; DEVICE_ID_LEN] {
        self.device_id
    }

    /// Period counters since the last counters frame
    pub fn counters(&self) -> (u16, u16) {
        (self.counter_a, self.counter_b)
    }

    /// Lifetime counters
    pub fn totals(&self) -> (u16, u16) {
        (self.total_counter_a, self.total_counter_b)
    }

    pub fn payload_counter(&self) -> u8 {
        self.payload_counter
    }

    pub fn clock(&self) -> DateTime<Utc> {
        self.clock
    }

    /// Set the device clock (sub-second precision is dropped)
    pub fn set_clock(&mut self, clock: DateTime<Utc>) {
        self.clock = clock.trunc_subsecs(0);
    }

    pub fn set_battery_centivolts(&mut self, centivolts: u16) {
        self.battery_centivolts = centivolts;
    }

    pub fn set_rssi(&mut self, rssi: i8) {
        self.rssi = rssi;
    }

    pub fn set_device_status(&mut self, status: u8) {
        self.device_status = status;
    }

    pub fn set_sensor_status(&mut self, status: u8) {
        self.sensor_status = status;
    }

    /// Count people passing in each direction
    pub fn record_passages(&mut self, a: u16, b: u16) {
        self.counter_a = self.counter_a.saturating_add(a);
        self.counter_b = self.counter_b.saturating_add(b);
        self.total_counter_a = self.total_counter_a.saturating_add(a);
        self.total_counter_b = self.total_counter_b.saturating_add(b);
        tracing::debug!(
            "Virtual device {} counted {}/{} (totals {}/{})",
            self.name,
            a,
            b,
            self.total_counter_a,
            self.total_counter_b
        );
    }

    /// Encode a frame for a variant code
    pub fn frame_from_code(&mut self, code: u8, framing: Framing) -> Result<SimFrame, SimError> {
        let variant =
            PeopleCounterVariant::from_code(code).ok_or(SimError::UnsupportedVariant(code))?;
        self.frame(variant, framing)
    }

    /// Encode the current state as one frame
    ///
    /// Counters and extended frames close the counting period; extended
    /// frames also advance the payload counter.
    pub fn frame(
        &mut self,
        variant: PeopleCounterVariant,
        framing: Framing,
    ) -> Result<SimFrame, SimError> {
        let mut bytes = Vec::with_capacity(24);

        match framing {
            Framing::Header => {
                bytes.push(PayloadType::PeopleCounter.code());
                bytes.push(variant.code());
                if variant == PeopleCounterVariant::Counters {
                    bytes.extend_from_slice(&self.device_id[..6]);
                    bytes.push(self.device_status);
                    bytes.extend_from_slice(&self.battery_centivolts.to_be_bytes());
                    bytes.push(self.rssi as u8);
                } else {
                    bytes.extend_from_slice(&self.device_id);
                }
            }
            Framing::Port => {}
        }

        match variant {
            PeopleCounterVariant::Counters => {
                bytes.extend_from_slice(&self.clock_bcd()?);
                bytes.extend_from_slice(&self.counter_a.to_be_bytes());
                bytes.extend_from_slice(&self.counter_b.to_be_bytes());
                bytes.push(self.sensor_status);
                self.close_period();
            }
            PeopleCounterVariant::Extended => {
                bytes.push(self.device_status);
                bytes.extend_from_slice(&self.battery_centivolts.to_be_bytes());
                bytes.extend_from_slice(&self.counter_a.to_be_bytes());
                bytes.extend_from_slice(&self.counter_b.to_be_bytes());
                bytes.push(self.sensor_status);
                bytes.extend_from_slice(&self.total_counter_a.to_be_bytes());
                bytes.extend_from_slice(&self.total_counter_b.to_be_bytes());
                bytes.push(self.payload_counter);
                self.payload_counter = self.payload_counter.wrapping_add(1);
                self.close_period();
            }
            PeopleCounterVariant::Totals => {
                bytes.push(self.sensor_status);
                bytes.extend_from_slice(&self.total_counter_a.to_be_bytes());
                bytes.extend_from_slice(&self.total_counter_b.to_be_bytes());
            }
            PeopleCounterVariant::Status => {
                bytes.push(self.device_status);
                bytes.extend_from_slice(&self.battery_centivolts.to_be_bytes());
                bytes.push(self.sensor_status);
            }
        }

        let frame = match framing {
            Framing::Header => SimFrame {
                bytes,
                port: None,
                device_eui: None,
            },
            Framing::Port => SimFrame {
                bytes,
                port: Some(variant.port()),
                device_eui: Some(self.device_id),
            },
        };
        tracing::debug!(
            "Virtual device {} emitted {:?} frame ({:?}): {:02X?}",
            self.name,
            variant,
            framing,
            frame.bytes
        );
        Ok(frame)
    }

    /// Downlink echo frame on port 10
    pub fn downlink_ack(&self) -> SimFrame {
        SimFrame {
            bytes: vec![PayloadType::Downlink.code(), DOWNLINK_ECHO_VARIANT],
            port: Some(DOWNLINK_PORT),
            device_eui: Some(self.device_id),
        }
    }

    fn close_period(&mut self) {
        self.counter_a = 0;
        self.counter_b = 0;
    }

    fn clock_bcd(&self) -> Result<[u8; 7], SimError> {
        let year = self.clock.year();
        // Two-digit years decode as 19xx
        if !(100..=9999).contains(&year) {
            return Err(SimError::ClockOutOfRange(year));
        }
        // Every component is at most 99 after the range check above
        let two = |v: u32| bcd(v as u8);
        Ok([
            two((year / 100) as u32),
            two((year % 100) as u32),
            two(self.clock.month()),
            two(self.clock.day()),
            two(self.clock.hour()),
            two(self.clock.minute()),
            two(self.clock.second()),
        ])
    }
}
