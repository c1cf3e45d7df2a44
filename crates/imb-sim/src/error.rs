//! Error types for frame simulation

use thiserror::Error;

/// Errors that can occur while encoding a simulated frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Variant code has no encoder
    #[error("unsupported people counter variant: 0x{0:02X}")]
    UnsupportedVariant(u8),

    /// Device clock year is not one the decoder reads back unchanged
    #[error("device clock year {0} out of BCD range")]
    ClockOutOfRange(i32),
}
