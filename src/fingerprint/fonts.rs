//! Installed-font probe.
//!
//! A font counts as installed when stacking it ahead of `monospace`
//! changes the rendered width of the probe string.

use crate::env::EnvironmentProbe;
use crate::error::ProbeError;

/// Wide and narrow glyphs so most families measure differently.
pub const PROBE_TEXT: &str = "mmmmmmmmmmlli";
const PROBE_SIZE: &str = "72px";

/// Families from `candidates` that are installed, in candidate order.
pub async fn probe(
    env: &dyn EnvironmentProbe,
    candidates: &[String],
) -> Result<Vec<String>, ProbeError> {
    let mut ctx = env.canvas(1, 1)?;

    ctx.set_font(&format!("{PROBE_SIZE} monospace"));
    let baseline = ctx.measure_text(PROBE_TEXT)?;

    let mut detected = Vec::new();
    for family in candidates {
        ctx.set_font(&format!("{PROBE_SIZE} \"{family}\", monospace"));
        let width = ctx.measure_text(PROBE_TEXT)?;
        if width != baseline {
            detected.push(family.clone());
        }
    }

    Ok(detected)
}
