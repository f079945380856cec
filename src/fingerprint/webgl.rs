//! WebGL capability probe.

use crate::env::{EnvironmentProbe, GlParameter};
use crate::error::ProbeError;
use serde::{Deserialize, Serialize};

pub const SENTINEL_UNSUPPORTED: &str = "webgl-not-supported";
pub const SENTINEL_ERROR: &str = "webgl-error";
pub const UNKNOWN: &str = "unknown";

/// Numeric/version parameters joined ahead of vendor and renderer.
const CAPABILITY_PARAMETERS: &[GlParameter] = &[
    GlParameter::Version,
    GlParameter::ShadingLanguageVersion,
    GlParameter::MaxTextureSize,
    GlParameter::MaxVertexAttribs,
    GlParameter::MaxVertexUniformVectors,
    GlParameter::MaxVaryingVectors,
    GlParameter::MaxFragmentUniformVectors,
];

/// Result of the WebGL probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebGlSignal {
    /// Capability parameters, vendor and renderer joined with `|`
    pub fingerprint: String,
    pub vendor: String,
    pub renderer: String,
}

impl WebGlSignal {
    /// Sentinel for a failed WebGL probe.
    pub fn sentinel(error: &ProbeError) -> Self {
        let fingerprint = match error {
            ProbeError::Unavailable(_) => SENTINEL_UNSUPPORTED,
            _ => SENTINEL_ERROR,
        };
        Self {
            fingerprint: fingerprint.to_string(),
            vendor: UNKNOWN.to_string(),
            renderer: UNKNOWN.to_string(),
        }
    }
}

/// Read vendor, renderer and the capability battery.
///
/// Prefers the unmasked strings from `WEBGL_debug_renderer_info` and falls
/// back to the standard (often masked) ones.
pub async fn probe(env: &dyn EnvironmentProbe) -> Result<WebGlSignal, ProbeError> {
    let gl = env.webgl()?;

    let (vendor_param, renderer_param) = if gl.has_debug_renderer_info() {
        (GlParameter::UnmaskedVendor, GlParameter::UnmaskedRenderer)
    } else {
        (GlParameter::Vendor, GlParameter::Renderer)
    };
    let vendor = gl.parameter(vendor_param)?;
    let renderer = gl.parameter(renderer_param)?;

    let mut parts = CAPABILITY_PARAMETERS
        .iter()
        .map(|&p| gl.parameter(p))
        .collect::<Result<Vec<_>, _>>()?;
    parts.push(vendor.clone());
    parts.push(renderer.clone());

    Ok(WebGlSignal {
        fingerprint: parts.join("|"),
        vendor,
        renderer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::recorded::{EnvironmentProfile, RecordedEnvironment, WebGlProfile};
    use std::collections::HashMap;

    fn parameters() -> HashMap<GlParameter, String> {
        [
            (GlParameter::Vendor, "WebKit"),
            (GlParameter::Renderer, "WebKit WebGL"),
            (GlParameter::UnmaskedVendor, "NVIDIA Corporation"),
            (GlParameter::UnmaskedRenderer, "GeForce RTX 3060"),
            (GlParameter::Version, "WebGL 1.0"),
            (GlParameter::ShadingLanguageVersion, "WebGL GLSL ES 1.0"),
            (GlParameter::MaxTextureSize, "16384"),
            (GlParameter::MaxVertexAttribs, "16"),
            (GlParameter::MaxVertexUniformVectors, "4096"),
            (GlParameter::MaxVaryingVectors, "30"),
            (GlParameter::MaxFragmentUniformVectors, "1024"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    fn env(debug_renderer_info: bool, parameters: HashMap<GlParameter, String>) -> RecordedEnvironment {
        RecordedEnvironment::new(EnvironmentProfile {
            webgl: Some(WebGlProfile {
                debug_renderer_info,
                parameters,
            }),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_prefers_unmasked_strings() {
        let env = env(true, parameters());
        let signal = probe(&env).await.unwrap();
        assert_eq!(signal.vendor, "NVIDIA Corporation");
        assert_eq!(signal.renderer, "GeForce RTX 3060");
        assert_eq!(
            signal.fingerprint,
            "WebGL 1.0|WebGL GLSL ES 1.0|16384|16|4096|30|1024|NVIDIA Corporation|GeForce RTX 3060"
        );
        assert_eq!(env.open_canvases(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_standard_strings() {
        let signal = probe(&env(false, parameters())).await.unwrap();
        assert_eq!(signal.vendor, "WebKit");
        assert_eq!(signal.renderer, "WebKit WebGL");
        assert!(signal.fingerprint.ends_with("|WebKit|WebKit WebGL"));
    }

    #[tokio::test]
    async fn test_parameter_failure_is_error() {
        let mut params = parameters();
        params.remove(&GlParameter::MaxVaryingVectors);
        let err = probe(&env(true, params)).await.unwrap_err();
        let sentinel = WebGlSignal::sentinel(&err);
        assert_eq!(sentinel.fingerprint, SENTINEL_ERROR);
        assert_eq!(sentinel.vendor, UNKNOWN);
    }

    #[test]
    fn test_unavailable_sentinel() {
        let sentinel = WebGlSignal::sentinel(&ProbeError::Unavailable("webgl"));
        assert_eq!(sentinel.fingerprint, SENTINEL_UNSUPPORTED);
        assert_eq!(sentinel.renderer, UNKNOWN);
    }
}
