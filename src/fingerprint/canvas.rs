//! Canvas rendering probe.
//!
//! Draws a fixed scene and reads the pixels back. Antialiasing, subpixel
//! text rendering and emoji fonts differ between GPUs, drivers and font
//! stacks, so the encoding varies across devices while staying stable on
//! one device.

use crate::env::EnvironmentProbe;
use crate::error::ProbeError;

pub const CANVAS_WIDTH: u32 = 280;
pub const CANVAS_HEIGHT: u32 = 60;

/// Mixed Latin, emoji and Greek so several font fallbacks are exercised.
pub const SCENE_TEXT: &str = "Sensor \u{1F510} probe \u{03A9}\u{03B1}\u{03B2}\u{03B3}\u{03B4}\u{03B5}";

pub const SENTINEL_UNSUPPORTED: &str = "canvas-not-supported";
pub const SENTINEL_ERROR: &str = "canvas-error";

/// Render the scene and return the encoded pixels.
pub async fn probe(env: &dyn EnvironmentProbe) -> Result<String, ProbeError> {
    let mut ctx = env.canvas(CANVAS_WIDTH, CANVAS_HEIGHT)?;

    ctx.set_text_baseline("alphabetic");
    ctx.set_fill_style("#f60");
    ctx.fill_rect(125.0, 1.0, 62.0, 20.0);

    ctx.set_fill_style("#069");
    ctx.set_font("11pt \"Times New Roman\"");
    ctx.fill_text(SCENE_TEXT, 2.0, 15.0)?;

    ctx.set_fill_style("rgba(102, 204, 0, 0.7)");
    ctx.set_font("18pt Arial");
    ctx.fill_text(SCENE_TEXT, 4.0, 45.0)?;

    ctx.set_composite_operation("multiply")?;
    ctx.set_fill_style("rgb(255,0,255)");
    ctx.fill_circle(50.0, 50.0, 50.0)?;
    ctx.set_fill_style("rgb(0,255,255)");
    ctx.fill_circle(100.0, 50.0, 50.0)?;

    ctx.encode()
}

/// Sentinel for a failed canvas probe.
pub fn sentinel(error: &ProbeError) -> String {
    match error {
        ProbeError::Unavailable(_) => SENTINEL_UNSUPPORTED.to_string(),
        _ => SENTINEL_ERROR.to_string(),
    }
}
