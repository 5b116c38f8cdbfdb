//! Join links and their QR codes.

use qrcode::{EcLevel, QrCode, render::svg};

use crate::error::ServiceError;

const QR_MIN_DIMENSION: u32 = 200;

/// Link participants open to join `pin`, e.g. `http://localhost:8080?pin=123456`.
pub fn join_link(base_url: &str, pin: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}pin={pin}")
}

/// Render `link` as an SVG QR code. Generated on every call, never cached.
pub fn qr_svg(link: &str) -> Result<String, ServiceError> {
    let code = QrCode::with_error_correction_level(link.as_bytes(), EcLevel::L)
        .map_err(|err| ServiceError::Internal(format!("failed to encode QR code: {err}")))?;

    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build())
}
