//! Environment with no measurement surfaces.
//!
//! Used outside browsers and in locked-down hosts, so the crate works on
//! any target without pulling in DOM bindings.

use crate::env::{
    AudioGraph, AudioGraphSpec, Canvas2d, EnvironmentProbe, NavigatorInfo, ProbeFuture,
    ScreenInfo, WebGlSurface,
};
use crate::error::ProbeError;
use std::time::Duration;

/// An environment where every surface is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DegradedEnvironment;

impl EnvironmentProbe for DegradedEnvironment {
    fn name(&self) -> &'static str {
        "degraded"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn canvas(&self, _width: u32, _height: u32) -> Result<Box<dyn Canvas2d>, ProbeError> {
        Err(ProbeError::Unavailable("canvas"))
    }

    fn webgl(&self) -> Result<Box<dyn WebGlSurface>, ProbeError> {
        Err(ProbeError::Unavailable("webgl"))
    }

    fn audio_graph(&self, _spec: &AudioGraphSpec) -> Result<Box<dyn AudioGraph>, ProbeError> {
        Err(ProbeError::Unavailable("audio"))
    }

    fn navigator(&self) -> Result<NavigatorInfo, ProbeError> {
        Err(ProbeError::Unavailable("navigator"))
    }

    fn screen(&self) -> Result<ScreenInfo, ProbeError> {
        Err(ProbeError::Unavailable("screen"))
    }

    fn timezone(&self) -> Result<String, ProbeError> {
        Err(ProbeError::Unavailable("intl"))
    }

    /// Resolves immediately; there is no event loop to wait on.
    fn sleep(&self, _duration: Duration) -> ProbeFuture<'_, ()> {
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_surface_unavailable() {
        let env = DegradedEnvironment;
        assert!(!env.is_supported());
        assert!(env.canvas(10, 10).is_err());
        assert!(env.webgl().is_err());
        assert!(env.navigator().is_err());
        assert!(env.screen().is_err());
        assert_eq!(env.timezone(), Err(ProbeError::Unavailable("intl")));
    }
}
