//! IMBuildings Device Simulation Library
//!
//! This crate provides a simulation layer for testing the payload decoder and
//! the relay without physical sensors. It includes:
//!
//! - **VirtualDevice**: Simulates a people counter with protocol-accurate frame encoding
//! - **SimFrame**: An encoded uplink together with the port it would arrive on
//!
//! # Example
//!
//! ```rust
//! use imb_sim::{Framing, VirtualDevice};
//! use imb_payload::{decode, PeopleCounterVariant};
//!
//! let mut device = VirtualDevice::new([0x00, 0x04, 0xA3, 0x0B, 0x00, 0xF1, 0x2C, 0x01]);
//! device.record_passages(3, 1);
//!
//! let frame = device
//!     .frame(PeopleCounterVariant::Totals, Framing::Header)
//!     .unwrap();
//! let record = decode(frame.input()).unwrap();
//! assert_eq!(record.total_counter_a, Some(3));
//! ```

pub mod device;
pub mod error;

pub use device::{Framing, SimFrame, VirtualDevice, VirtualDeviceConfig};
pub use error::SimError;
