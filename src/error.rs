use thiserror::Error;

use crate::types::Ecc;

#[derive(Debug, Error)]
pub enum QrForgeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data too long: {needed_bits} bits needed, {capacity_bits} bits available")]
    CapacityExceeded {
        needed_bits: usize,
        capacity_bits: usize,
    },

    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    #[error("Logo covers {coverage:.0}% of the symbol, above the {cap:.0}% budget for level {level}")]
    LogoTooLarge { coverage: f32, cap: f32, level: Ecc },

    #[error("Failed to decode logo: {0}")]
    LogoDecode(String),

    #[error("Canvas too large: {width}x{height} exceeds maximum {max_dimension}x{max_dimension}")]
    CanvasTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },

    #[error("Failed to render image")]
    RenderFailed,
}

pub type Result<T> = std::result::Result<T, QrForgeError>;
