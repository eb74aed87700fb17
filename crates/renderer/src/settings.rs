//! Everything the passes read from configuration, grouped per pass.
//!
//! The application builds one of these from its controls and hands it to the
//! frame by reference; no pass mutates it.

use crate::occlusion::OcclusionSettings;
use crate::particles::ParticleSettings;
use crate::post::{BloomSettings, FilmSettings, GodRaySettings, PostProcessType};
use crate::reflection::WaterSettings;
use crate::resolve::{CloudShadowSettings, FogSettings, LightingSettings};
use crate::shadow::ShadowSettings;
use crate::sky::SkySettings;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderSettings {
    pub post_type: PostProcessType,
    /// Show the shadow map instead of the frame.
    pub debug_shadow: bool,
    pub sky: SkySettings,
    pub lighting: LightingSettings,
    pub fog: FogSettings,
    pub clouds: CloudShadowSettings,
    pub water: WaterSettings,
    pub shadow: ShadowSettings,
    pub occlusion: OcclusionSettings,
    pub particles: ParticleSettings,
    pub god_rays: GodRaySettings,
    pub bloom: BloomSettings,
    pub film: FilmSettings,
}
