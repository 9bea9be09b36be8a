pub mod ecc;
pub mod encoder;
pub mod error;
pub mod matrix;
pub mod render;
mod segment;
pub mod types;

pub use encoder::{encode, encode_with_version};
pub use error::{QrForgeError, Result};
pub use matrix::QrSymbol;
pub use render::{render, render_with_logo};
pub use types::{DotShape, Ecc, EyeShape, GenerateRequest, LogoPolicy, Rgba, StyleConfig};

/// Full pipeline: validate the request, encode the text, render the styled
/// PNG. This is the one call a request handler needs.
pub fn generate(request: &GenerateRequest) -> Result<Vec<u8>> {
    if request.text.is_empty() {
        return Err(QrForgeError::InvalidInput("text is empty".to_string()));
    }

    let symbol = match request.version {
        Some(v) => encoder::encode_with_version(&request.text, request.ec_level, v)?,
        None => encoder::encode(&request.text, request.ec_level)?,
    };
    render::render_with_logo(&symbol, &request.style, request.logo.as_deref())
}
