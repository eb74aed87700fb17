//! Scene controls (window, post chain, lighting knobs). Loaded from config.ron at startup.

use glam::Vec3;
use procgen::{FlatPatch, HeightFieldConfig, NoiseParams};
use renderer::{
    BloomSettings, CloudShadowSettings, FilmSettings, FogSettings, GodRaySettings, LightingSettings, OcclusionSettings,
    ParticleSettings, PostProcessType, RenderSettings, ShadowSettings, SkySettings, WaterSettings,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent scene settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneControls {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default)]
    pub fullscreen: bool,
    /// `-1` resolves straight to the screen, `0` runs god rays, bloom and film.
    #[serde(default = "default_post_processing")]
    pub post_processing: i32,
    /// Show the shadow map instead of the scene.
    #[serde(default)]
    pub debug_shadow: bool,
    /// Start the scripted camera immediately instead of waiting for `P`.
    #[serde(default)]
    pub demo_on_start: bool,
    /// Demo clock multiplier.
    #[serde(default = "default_one")]
    pub demo_speed: f32,
    /// Seed for terrain noise and scatter placement.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_particle_count")]
    pub particle_count: u32,
    /// Orbit drag multiplier (1.0 = default).
    #[serde(default = "default_one")]
    pub orbit_sensitivity: f32,
    #[serde(default)]
    pub terrain: TerrainControls,
    #[serde(default)]
    pub materials: MaterialControls,
    #[serde(default)]
    pub lighting: LightingControls,
    #[serde(default)]
    pub clouds: CloudControls,
    #[serde(default)]
    pub palette: PaletteControls,
    #[serde(default)]
    pub sky: SkyControls,
    #[serde(default = "default_fog_density")]
    pub fog_density: f32,
    #[serde(default)]
    pub water: WaterControls,
    /// Slides the shadow light along z.
    #[serde(default = "default_shadow_mover")]
    pub shadow_mover: f32,
    /// Moves the god-ray light proxy away from the sun.
    #[serde(default)]
    pub god_ray_offset: [f32; 3],
    #[serde(default)]
    pub god_rays: GodRayControls,
    #[serde(default)]
    pub bloom: BloomControls,
    #[serde(default)]
    pub film: FilmControls,
    #[serde(default)]
    pub particles: ParticleControls,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainControls {
    /// Near terrain extent in world units.
    pub size: f32,
    /// Far terrain extent; its centre is flattened under the near terrain.
    pub far_size: f32,
    /// Cells per side, shared by both terrains.
    pub divisions: u32,
    pub octaves: u32,
    pub depth: f32,
    pub noise_size: f32,
}

impl Default for TerrainControls {
    fn default() -> Self {
        let terrain = HeightFieldConfig::default();
        Self {
            size: terrain.width,
            far_size: 2000.0,
            divisions: terrain.segments_x,
            octaves: terrain.noise.octaves,
            depth: terrain.noise.depth,
            noise_size: terrain.noise.size,
        }
    }
}

impl TerrainControls {
    /// Square height field of `extent` units with these noise knobs.
    pub fn height_field(&self, extent: f32, seed: u64, flat_patch: Option<FlatPatch>) -> HeightFieldConfig {
        HeightFieldConfig {
            width: extent,
            height: extent,
            segments_x: self.divisions,
            segments_y: self.divisions,
            noise: NoiseParams {
                octaves: self.octaves,
                size: self.noise_size,
                seed: seed as f32,
                depth: self.depth,
            },
            flat_patch,
        }
    }
}

/// Surface colours, 0-255 per channel. The sand highlight colour, strength and
/// shininess feed the lighting resolve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialControls {
    pub sand_diffuse: [f32; 3],
    pub sand_specular: [f32; 3],
    pub specular: f32,
    pub shininess: f32,
    pub monument_diffuse: [f32; 3],
    pub ribbon_diffuse: [f32; 3],
}

impl Default for MaterialControls {
    fn default() -> Self {
        Self {
            sand_diffuse: [227.0, 208.0, 147.0],
            sand_specular: [255.0, 225.0, 155.0],
            specular: 1.0,
            shininess: 20.0,
            monument_diffuse: [80.0, 51.0, 20.0],
            ribbon_diffuse: [237.0, 48.0, 59.0],
        }
    }
}

/// Normalise a 0-255 colour.
pub fn rgb(color: [f32; 3]) -> Vec3 {
    Vec3::from_array(color) / 255.0
}

fn rgb255(color: Vec3) -> [f32; 3] {
    (color * 255.0).round().to_array()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingControls {
    pub brightness: f32,
    pub ambient: f32,
    /// Scales direct light.
    pub level: f32,
    pub roughness: f32,
    /// Water fresnel sharpness.
    pub edge_pow: f32,
}

impl Default for LightingControls {
    fn default() -> Self {
        let lighting = LightingSettings::default();
        Self {
            brightness: lighting.brightness,
            ambient: lighting.ambient,
            level: lighting.level,
            roughness: lighting.roughness,
            edge_pow: lighting.edge_pow,
        }
    }
}

/// Cloud shadows on the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudControls {
    pub edge: f32,
    pub size: f32,
    pub speed: f32,
    pub speed2: f32,
    pub noise: f32,
    pub strength: f32,
    /// Light left under a full cloud.
    pub light: f32,
}

impl Default for CloudControls {
    fn default() -> Self {
        let clouds = CloudShadowSettings::default();
        Self {
            edge: clouds.edge,
            size: clouds.size,
            speed: clouds.speed,
            speed2: clouds.speed2,
            noise: clouds.noise,
            strength: clouds.strength,
            light: clouds.light,
        }
    }
}

/// Day and sunset colour pairs, 0-255 per channel. The sky inclination blends between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteControls {
    pub light: [f32; 3],
    pub sunset_light: [f32; 3],
    pub fog: [f32; 3],
    pub sunset_fog: [f32; 3],
    pub sky: [f32; 3],
    pub sunset_sky: [f32; 3],
    /// God-ray tint.
    pub flare: [f32; 3],
}

impl Default for PaletteControls {
    fn default() -> Self {
        let lighting = LightingSettings::default();
        let fog = FogSettings::default();
        let sky = SkySettings::default();
        Self {
            light: rgb255(lighting.light_color),
            sunset_light: rgb255(lighting.sunset_light_color),
            fog: rgb255(fog.color),
            sunset_fog: rgb255(fog.sunset_color),
            sky: rgb255(sky.day_color),
            sunset_sky: rgb255(sky.sunset_color),
            flare: rgb255(GodRaySettings::default().flare_color),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyControls {
    /// 0 is the sunset palette, 0.5 full day.
    pub inclination: f32,
    pub azimuth: f32,
    pub luminance: f32,
    pub turbidity: f32,
}

impl Default for SkyControls {
    fn default() -> Self {
        let sky = SkySettings::default();
        Self {
            inclination: sky.inclination,
            azimuth: sky.azimuth,
            luminance: sky.luminance,
            turbidity: sky.turbidity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterControls {
    pub size: f32,
    pub distortion_scale: f32,
}

impl Default for WaterControls {
    fn default() -> Self {
        let water = WaterSettings::default();
        Self {
            size: water.size,
            distortion_scale: water.distortion_scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GodRayControls {
    pub density: f32,
    pub weight: f32,
    pub decay: f32,
    pub exposure: f32,
    pub samples: u32,
}

impl Default for GodRayControls {
    fn default() -> Self {
        let rays = GodRaySettings::default();
        Self {
            density: rays.density,
            weight: rays.weight,
            decay: rays.decay,
            exposure: rays.exposure,
            samples: rays.samples,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomControls {
    pub original_weight: f32,
    pub highlight_weight: f32,
}

impl Default for BloomControls {
    fn default() -> Self {
        let bloom = BloomSettings::default();
        Self {
            original_weight: bloom.original_weight,
            highlight_weight: bloom.highlight_weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmControls {
    pub aberration: f32,
    pub noise: f32,
    pub vignette_intensity: f32,
    pub vignette_power: f32,
}

impl Default for FilmControls {
    fn default() -> Self {
        let film = FilmSettings::default();
        Self {
            aberration: film.aberration,
            noise: film.noise,
            vignette_intensity: film.vignette_intensity,
            vignette_power: film.vignette_power,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleControls {
    pub size: f32,
    pub edge: f32,
    /// 0-255 per channel.
    pub color: [f32; 3],
}

impl Default for ParticleControls {
    fn default() -> Self {
        let particles = ParticleSettings::default();
        Self {
            size: particles.size,
            edge: particles.edge,
            color: rgb255(particles.color),
        }
    }
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_post_processing() -> i32 {
    PostProcessType::None.as_i32()
}
fn default_one() -> f32 {
    1.0
}
fn default_seed() -> u64 {
    3
}
fn default_particle_count() -> u32 {
    renderer::PARTICLE_COUNT
}
fn default_fog_density() -> f32 {
    FogSettings::default().density
}
fn default_shadow_mover() -> f32 {
    ShadowSettings::default().mover
}

impl Default for SceneControls {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            fullscreen: false,
            post_processing: default_post_processing(),
            debug_shadow: false,
            demo_on_start: false,
            demo_speed: default_one(),
            seed: default_seed(),
            particle_count: default_particle_count(),
            orbit_sensitivity: default_one(),
            terrain: TerrainControls::default(),
            materials: MaterialControls::default(),
            lighting: LightingControls::default(),
            clouds: CloudControls::default(),
            palette: PaletteControls::default(),
            sky: SkyControls::default(),
            fog_density: default_fog_density(),
            water: WaterControls::default(),
            shadow_mover: default_shadow_mover(),
            god_ray_offset: [0.0; 3],
            god_rays: GodRayControls::default(),
            bloom: BloomControls::default(),
            film: FilmControls::default(),
            particles: ParticleControls::default(),
        }
    }
}

impl SceneControls {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Save current config to `config.ron`. Logs on error.
    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }

    /// The post selector, falling back to no post chain for unknown values.
    pub fn post_type(&self) -> PostProcessType {
        PostProcessType::from_i32(self.post_processing).unwrap_or_else(|| {
            log::warn!("Unknown post_processing {}, using -1", self.post_processing);
            PostProcessType::None
        })
    }

    /// Everything the renderer reads this frame.
    pub fn render_settings(&self) -> RenderSettings {
        let defaults = RenderSettings::default();
        let palette = &self.palette;
        RenderSettings {
            post_type: self.post_type(),
            debug_shadow: self.debug_shadow,
            sky: SkySettings {
                inclination: self.sky.inclination,
                azimuth: self.sky.azimuth,
                luminance: self.sky.luminance,
                turbidity: self.sky.turbidity,
                day_color: rgb(palette.sky),
                sunset_color: rgb(palette.sunset_sky),
                ..defaults.sky
            },
            lighting: LightingSettings {
                light_color: rgb(palette.light),
                sunset_light_color: rgb(palette.sunset_light),
                brightness: self.lighting.brightness,
                ambient: self.lighting.ambient,
                roughness: self.lighting.roughness,
                level: self.lighting.level,
                specular: defaults.lighting.specular,
                shininess: self.materials.shininess,
                sand_specular: rgb(self.materials.sand_specular),
                edge_pow: self.lighting.edge_pow,
            },
            fog: FogSettings {
                density: self.fog_density,
                color: rgb(palette.fog),
                sunset_color: rgb(palette.sunset_fog),
            },
            clouds: CloudShadowSettings {
                edge: self.clouds.edge,
                size: self.clouds.size,
                speed: self.clouds.speed,
                speed2: self.clouds.speed2,
                noise: self.clouds.noise,
                strength: self.clouds.strength,
                light: self.clouds.light,
            },
            water: WaterSettings {
                size: self.water.size,
                distortion_scale: self.water.distortion_scale,
            },
            shadow: ShadowSettings {
                mover: self.shadow_mover,
            },
            occlusion: OcclusionSettings {
                offset: Vec3::from_array(self.god_ray_offset),
            },
            particles: ParticleSettings {
                size: self.particles.size,
                edge: self.particles.edge,
                color: rgb(self.particles.color),
                ..defaults.particles
            },
            god_rays: GodRaySettings {
                density: self.god_rays.density,
                weight: self.god_rays.weight,
                decay: self.god_rays.decay,
                exposure: self.god_rays.exposure,
                samples: self.god_rays.samples,
                flare_color: rgb(palette.flare),
                ..defaults.god_rays
            },
            bloom: BloomSettings {
                original_weight: self.bloom.original_weight,
                highlight_weight: self.bloom.highlight_weight,
                ..defaults.bloom
            },
            film: FilmSettings {
                aberration: self.film.aberration,
                noise: self.film.noise,
                vignette_intensity: self.film.vignette_intensity,
                vignette_power: self.film.vignette_power,
            },
        }
    }
}

pub fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use renderer::{ResolveFrame, ResolveUniform};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("duneshade-config-{}-{}", std::process::id(), name))
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let controls: SceneControls = ron::from_str("()").unwrap();
        assert_eq!(controls, SceneControls::default());
    }

    /// Unlisted fields, including inside nested sections, keep their defaults.
    #[test]
    fn partial_file_overrides_only_listed_fields() {
        let controls: SceneControls = ron::from_str("(post_processing: 0, sky: (inclination: 0.1))").unwrap();
        assert_eq!(controls.post_type(), PostProcessType::Default);
        assert_eq!(controls.sky.inclination, 0.1);
        assert_eq!(controls.sky.azimuth, SkyControls::default().azimuth);
        assert_eq!(controls.window_width, 1280);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let path = temp_path("roundtrip.ron");
        let controls = SceneControls {
            demo_speed: 2.5,
            seed: 42,
            god_ray_offset: [1.0, 2.0, 3.0],
            ..Default::default()
        };
        controls.save_to(&path);
        let loaded = SceneControls::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, controls);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let path = temp_path("broken.ron");
        std::fs::write(&path, "(window_width: \"wide\")").unwrap();
        let loaded = SceneControls::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, SceneControls::default());
    }

    #[test]
    fn unknown_post_type_disables_chain() {
        let controls = SceneControls {
            post_processing: 7,
            ..Default::default()
        };
        assert_eq!(controls.post_type(), PostProcessType::None);
    }

    #[test]
    fn defaults_match_renderer_defaults() {
        let settings = SceneControls::default().render_settings();
        let expected = RenderSettings::default();
        assert_eq!(settings.sky, expected.sky);
        assert_eq!(settings.lighting, expected.lighting);
        assert_eq!(settings.fog, expected.fog);
        assert_eq!(settings.clouds, expected.clouds);
        assert_eq!(settings.shadow, expected.shadow);
        assert_eq!(settings.god_rays, expected.god_rays);
        assert_eq!(settings.film, expected.film);
        assert!((settings.particles.color - expected.particles.color).length() < 1e-3);
    }

    /// Default terrain knobs reproduce the stock near terrain exactly.
    #[test]
    fn terrain_defaults_match_height_field_defaults() {
        let controls = SceneControls::default();
        let config = controls.terrain.height_field(controls.terrain.size, controls.seed, None);
        let stock = HeightFieldConfig::default();
        assert_eq!(config.width, stock.width);
        assert_eq!(config.segments_y, stock.segments_y);
        assert_eq!(config.noise, stock.noise);
        assert!(config.flat_patch.is_none());
    }

    #[test]
    fn render_settings_carry_controls() {
        let controls = SceneControls {
            shadow_mover: -100.0,
            god_ray_offset: [0.0, 50.0, 0.0],
            debug_shadow: true,
            ..Default::default()
        };
        let settings = controls.render_settings();
        assert_eq!(settings.shadow.mover, -100.0);
        assert_eq!(settings.occlusion.offset, Vec3::new(0.0, 50.0, 0.0));
        assert!(settings.debug_shadow);
    }

    /// The sand highlight knobs reach the resolve uniform the shader reads.
    #[test]
    fn sand_specular_reaches_resolve() {
        let mut controls = SceneControls::default();
        controls.materials.sand_specular = [0.0, 255.0, 0.0];
        controls.materials.shininess = 77.0;
        let frame = ResolveFrame {
            light_view_proj: Mat4::IDENTITY,
            eye: Vec3::ZERO,
            time: 0.0,
            width: 4,
            height: 4,
        };
        let uniform = ResolveUniform::new(&controls.render_settings(), &frame);
        assert_eq!(uniform.sand_specular, [0.0, 1.0, 0.0, 77.0]);
    }

    #[test]
    fn cloud_and_palette_sections_reach_settings() {
        let controls: SceneControls = ron::from_str(
            "(clouds: (edge: 0.5, light: 0.9), \
              palette: (fog: (255.0, 0.0, 0.0), flare: (0.0, 0.0, 255.0)), \
              lighting: (ambient: 0.4))",
        )
        .unwrap();
        let settings = controls.render_settings();
        assert_eq!(settings.clouds.edge, 0.5);
        assert_eq!(settings.clouds.light, 0.9);
        assert_eq!(settings.clouds.size, CloudShadowSettings::default().size);
        assert_eq!(settings.fog.color, Vec3::X);
        assert_eq!(settings.fog.sunset_color, FogSettings::default().sunset_color);
        assert_eq!(settings.god_rays.flare_color, Vec3::Z);
        assert_eq!(settings.lighting.ambient, 0.4);
        assert_eq!(settings.lighting.brightness, LightingSettings::default().brightness);
    }
}
