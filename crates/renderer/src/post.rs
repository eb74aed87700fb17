//! Screen-space post chain.
//!
//! [`PostChain::plan`] is the whole ordering policy: which effects run, which
//! targets each one reads and which it writes. [`PostPass`] records that plan
//! as full-screen draws. Later steps deliberately re-read earlier results
//! (bloom reads the god-ray composite from step 2), so targets are named
//! rather than blindly alternated.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;

use crate::camera::CameraMode;
use crate::pipeline::{clear_attachment, create_fullscreen_pipeline, create_shader, depth_texture_entry, Layouts};
use crate::renderer::{FrameTargets, RenderContext};
use crate::settings::RenderSettings;
use crate::texture::{Texture, HDR_FORMAT};

/// Upper bound on god-ray samples per pixel, whatever the config asks for.
pub const MAX_GOD_RAY_SAMPLES: u32 = 200;

/// Post-processing selector as stored in config (`-1` or `0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostProcessType {
    /// Resolve straight to the display (or to the fade source in demo mode).
    #[default]
    None,
    /// The full god-ray, bloom and film chain.
    Default,
}

impl PostProcessType {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::None),
            0 => Some(Self::Default),
            _ => Option::None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::None => -1,
            Self::Default => 0,
        }
    }
}

/// Every surface a post step can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostTarget {
    Occlusion,
    /// The resolved scene.
    Original,
    PingA,
    PingB,
    Scratch,
    /// Display-format copy of the frame, waiting for the fade.
    FadeSource,
    Surface,
}

impl PostTarget {
    /// Display-format targets; everything else is float.
    pub fn is_display(self) -> bool {
        matches!(self, Self::FadeSource | Self::Surface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostEffect {
    GodRays,
    /// Streaks over the scene.
    Combine,
    Bright,
    BlurHorizontal,
    BlurVertical,
    /// Blurred highlights over the god-ray composite.
    Bloom,
    Film,
    Fade,
}

impl PostEffect {
    /// Film and fade tonemap into the display format.
    pub fn output_is_display(self) -> bool {
        matches!(self, Self::Film | Self::Fade)
    }

    fn entry_point(self) -> &'static str {
        match self {
            Self::GodRays => "fs_god_rays",
            Self::Combine => "fs_combine",
            Self::Bright => "fs_bright",
            Self::BlurHorizontal => "fs_blur_h",
            Self::BlurVertical => "fs_blur_v",
            Self::Bloom => "fs_bloom",
            Self::Film => "fs_film",
            Self::Fade => "fs_fade",
        }
    }

    fn inputs(self) -> usize {
        match self {
            Self::Combine | Self::Bloom => 2,
            _ => 1,
        }
    }
}

/// One full-screen draw. For two-input effects `reads[0]` is the highlight layer and `reads[1]` the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostStep {
    pub effect: PostEffect,
    pub reads: &'static [PostTarget],
    pub writes: PostTarget,
}

impl PostStep {
    const fn new(effect: PostEffect, reads: &'static [PostTarget], writes: PostTarget) -> Self {
        Self { effect, reads, writes }
    }
}

pub struct PostChain;

impl PostChain {
    pub fn plan(mode: CameraMode, post_type: PostProcessType) -> Vec<PostStep> {
        use PostEffect::*;
        use PostTarget::*;

        let demo = mode == CameraMode::Demo;
        let mut steps = Vec::with_capacity(8);
        if post_type == PostProcessType::Default {
            steps.extend([
                PostStep::new(GodRays, &[Occlusion], PingA),
                PostStep::new(Combine, &[PingA, Original], PingB),
                PostStep::new(Bright, &[PingB], PingA),
                PostStep::new(BlurHorizontal, &[PingA], Scratch),
                PostStep::new(BlurVertical, &[Scratch], PingA),
                PostStep::new(Bloom, &[PingA, PingB], Scratch),
                PostStep::new(Film, &[Scratch], if demo { FadeSource } else { Surface }),
            ]);
        }
        if demo {
            steps.push(PostStep::new(Fade, &[FadeSource], Surface));
        }
        steps
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GodRaySettings {
    pub density: f32,
    pub weight: f32,
    pub decay: f32,
    pub exposure: f32,
    pub samples: u32,
    pub flare_color: Vec3,
    /// Scene weight in the combine step.
    pub original_weight: f32,
    /// Streak weight in the combine step.
    pub highlight_weight: f32,
}

impl Default for GodRaySettings {
    fn default() -> Self {
        Self {
            density: 0.91,
            weight: 0.01,
            decay: 0.97,
            exposure: 2.05,
            samples: 100,
            flare_color: Vec3::ONE,
            original_weight: 1.0,
            highlight_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    pub original_weight: f32,
    pub highlight_weight: f32,
    /// Luminance above which a pixel counts as a highlight.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            original_weight: 0.8,
            highlight_weight: 0.7,
            threshold: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilmSettings {
    pub aberration: f32,
    pub noise: f32,
    pub vignette_intensity: f32,
    pub vignette_power: f32,
}

impl Default for FilmSettings {
    fn default() -> Self {
        Self {
            aberration: 0.06,
            noise: 10.0,
            vignette_intensity: 21.0,
            vignette_power: 0.1,
        }
    }
}

/// Per-frame values the post uniform needs besides the settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostFrame {
    /// Sun proxy in `[0, 1]²` with y up, or `None` when it is behind the camera.
    pub light_screen: Option<Vec2>,
    pub fade: f32,
    pub time: f32,
    pub width: u32,
    pub height: u32,
}

/// Shared by every post effect (must match `Post` in post.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PostUniform {
    /// width, height, 1/width, 1/height
    pub screen: [f32; 4],
    /// light x, light y, fade, time
    pub light: [f32; 4],
    /// density, weight, decay, exposure
    pub god_ray: [f32; 4],
    /// samples, scene weight, streak weight, unused
    pub god_ray2: [f32; 4],
    pub flare: [f32; 4],
    /// scene weight, highlight weight, threshold, unused
    pub bloom: [f32; 4],
    /// aberration, noise, vignette intensity, vignette power
    pub film: [f32; 4],
}

impl PostUniform {
    pub fn new(settings: &RenderSettings, frame: &PostFrame) -> Self {
        let g = &settings.god_rays;
        let b = &settings.bloom;
        let f = &settings.film;
        let width = frame.width.max(1) as f32;
        let height = frame.height.max(1) as f32;
        // No streaks while the sun is behind the eye.
        let (light, weight) = match frame.light_screen {
            Some(p) => (p, g.weight),
            None => (Vec2::splat(0.5), 0.0),
        };
        Self {
            screen: [width, height, 1.0 / width, 1.0 / height],
            light: [light.x, light.y, frame.fade, frame.time],
            god_ray: [g.density, weight, g.decay, g.exposure],
            god_ray2: [
                g.samples.min(MAX_GOD_RAY_SAMPLES) as f32,
                g.original_weight,
                g.highlight_weight,
                0.0,
            ],
            flare: g.flare_color.extend(1.0).to_array(),
            bloom: [b.original_weight, b.highlight_weight, b.threshold, 0.0],
            film: [f.aberration, f.noise, f.vignette_intensity, f.vignette_power],
        }
    }
}

fn target_view<'a>(
    targets: &'a FrameTargets,
    target: PostTarget,
    surface: &'a wgpu::TextureView,
) -> &'a wgpu::TextureView {
    match target {
        PostTarget::Occlusion => &targets.occlusion.view,
        PostTarget::Original => &targets.original.view,
        PostTarget::PingA => &targets.ping[0].view,
        PostTarget::PingB => &targets.ping[1].view,
        PostTarget::Scratch => &targets.scratch.view,
        PostTarget::FadeSource => &targets.fade_source.view,
        PostTarget::Surface => surface,
    }
}

struct EffectPipelines {
    god_rays: wgpu::RenderPipeline,
    combine: wgpu::RenderPipeline,
    bright: wgpu::RenderPipeline,
    blur_h: wgpu::RenderPipeline,
    blur_v: wgpu::RenderPipeline,
    bloom: wgpu::RenderPipeline,
    film: wgpu::RenderPipeline,
    fade: wgpu::RenderPipeline,
}

impl EffectPipelines {
    fn get(&self, effect: PostEffect) -> &wgpu::RenderPipeline {
        match effect {
            PostEffect::GodRays => &self.god_rays,
            PostEffect::Combine => &self.combine,
            PostEffect::Bright => &self.bright,
            PostEffect::BlurHorizontal => &self.blur_h,
            PostEffect::BlurVertical => &self.blur_v,
            PostEffect::Bloom => &self.bloom,
            PostEffect::Film => &self.film,
            PostEffect::Fade => &self.fade,
        }
    }
}

pub struct PostPass {
    pipelines: EffectPipelines,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    depth_layout: wgpu::BindGroupLayout,
    depth_pipeline: wgpu::RenderPipeline,
}

impl PostPass {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, surface_format: wgpu::TextureFormat) -> Self {
        let shader = create_shader(device, "Post Shader", include_str!("shaders/post.wgsl"));
        let build = |effect: PostEffect| {
            let format = if effect.output_is_display() {
                surface_format
            } else {
                HDR_FORMAT
            };
            create_fullscreen_pipeline(
                device,
                &format!("Post {effect:?} Pipeline"),
                &shader,
                effect.entry_point(),
                &[&layouts.post],
                format,
                None,
            )
        };
        let pipelines = EffectPipelines {
            god_rays: build(PostEffect::GodRays),
            combine: build(PostEffect::Combine),
            bright: build(PostEffect::Bright),
            blur_h: build(PostEffect::BlurHorizontal),
            blur_v: build(PostEffect::BlurVertical),
            bloom: build(PostEffect::Bloom),
            film: build(PostEffect::Film),
            fade: build(PostEffect::Fade),
        };

        let depth_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Depth Preview Layout"),
            entries: &[depth_texture_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });
        let depth_shader = create_shader(device, "Depth Preview Shader", include_str!("shaders/depth_preview.wgsl"));
        let depth_pipeline = create_fullscreen_pipeline(
            device,
            "Depth Preview Pipeline",
            &depth_shader,
            "fs_main",
            &[&depth_layout],
            surface_format,
            None,
        );

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Post Uniform Buffer"),
            contents: bytemuck::bytes_of(&PostUniform::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipelines,
            uniform_buffer,
            sampler,
            depth_layout,
            depth_pipeline,
        }
    }

    pub fn prepare(&self, queue: &wgpu::Queue, uniform: &PostUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Record `steps` in order. Each step clears and fully overwrites its output.
    pub fn run(
        &self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        steps: &[PostStep],
        surface: &wgpu::TextureView,
    ) {
        for step in steps {
            debug_assert_eq!(step.effect.output_is_display(), step.writes.is_display());
            debug_assert_eq!(step.effect.inputs(), step.reads.len());

            let Some(&first) = step.reads.first() else {
                continue;
            };
            let second = step.reads.get(1).copied().unwrap_or(first);
            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Post Bind Group"),
                layout: &ctx.layouts.post,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(target_view(&ctx.targets, first, surface)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(target_view(&ctx.targets, second, surface)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.uniform_buffer.as_entire_binding(),
                    },
                ],
            });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(step.effect.entry_point()),
                color_attachments: &[clear_attachment(target_view(&ctx.targets, step.writes, surface))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(self.pipelines.get(step.effect));
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    /// Show a depth texture (the shadow map) on screen instead of the frame.
    pub fn show_depth(
        &self,
        ctx: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        depth: &Texture,
        surface: &wgpu::TextureView,
    ) {
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Depth Preview Bind Group"),
            layout: &self.depth_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&depth.view),
            }],
        });
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Depth Preview Pass"),
            color_attachments: &[clear_attachment(surface)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.depth_pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effects(steps: &[PostStep]) -> Vec<PostEffect> {
        steps.iter().map(|s| s.effect).collect()
    }

    #[test]
    fn selector_round_trips_config_values() {
        assert_eq!(PostProcessType::from_i32(-1), Some(PostProcessType::None));
        assert_eq!(PostProcessType::from_i32(0), Some(PostProcessType::Default));
        assert_eq!(PostProcessType::from_i32(3), None);
        for ty in [PostProcessType::None, PostProcessType::Default] {
            assert_eq!(PostProcessType::from_i32(ty.as_i32()), Some(ty));
        }
    }

    #[test]
    fn interactive_without_post_runs_nothing() {
        assert!(PostChain::plan(CameraMode::Interactive, PostProcessType::None).is_empty());
    }

    #[test]
    fn demo_without_post_only_fades() {
        let steps = PostChain::plan(CameraMode::Demo, PostProcessType::None);
        assert_eq!(
            steps,
            vec![PostStep::new(PostEffect::Fade, &[PostTarget::FadeSource], PostTarget::Surface)]
        );
    }

    #[test]
    fn full_chain_order() {
        use PostEffect::*;
        let interactive = PostChain::plan(CameraMode::Interactive, PostProcessType::Default);
        assert_eq!(
            effects(&interactive),
            vec![GodRays, Combine, Bright, BlurHorizontal, BlurVertical, Bloom, Film]
        );
        assert_eq!(interactive.last().map(|s| s.writes), Some(PostTarget::Surface));

        let demo = PostChain::plan(CameraMode::Demo, PostProcessType::Default);
        assert_eq!(demo.len(), 8);
        assert_eq!(demo[6].writes, PostTarget::FadeSource);
        assert_eq!(demo[7].effect, Fade);
        assert_eq!(demo[7].reads, &[PostTarget::FadeSource]);
    }

    /// Steps 1..5 each read what the step before them wrote.
    #[test]
    fn chain_reads_previous_outputs() {
        let steps = PostChain::plan(CameraMode::Interactive, PostProcessType::Default);
        assert_eq!(steps[0].reads, &[PostTarget::Occlusion]);
        for pair in steps[..5].windows(2) {
            assert!(pair[1].reads.contains(&pair[0].writes), "{:?} does not read {:?}", pair[1].effect, pair[0].writes);
        }
        assert!(steps[1].reads.contains(&PostTarget::Original));
    }

    /// Bloom re-reads the combine output; nothing between may overwrite it.
    #[test]
    fn bloom_sees_the_god_ray_composite() {
        let steps = PostChain::plan(CameraMode::Demo, PostProcessType::Default);
        let combine = steps.iter().position(|s| s.effect == PostEffect::Combine).unwrap();
        let bloom = steps.iter().position(|s| s.effect == PostEffect::Bloom).unwrap();
        let composite = steps[combine].writes;
        assert!(steps[bloom].reads.contains(&composite));
        assert!(steps[combine + 1..bloom].iter().all(|s| s.writes != composite));
    }

    #[test]
    fn no_step_reads_its_own_output() {
        for mode in [CameraMode::Interactive, CameraMode::Demo] {
            for ty in [PostProcessType::None, PostProcessType::Default] {
                for step in PostChain::plan(mode, ty) {
                    assert!(!step.reads.contains(&step.writes), "{step:?}");
                    assert_eq!(step.effect.output_is_display(), step.writes.is_display());
                    assert_eq!(step.effect.inputs(), step.reads.len());
                }
            }
        }
    }

    #[test]
    fn hidden_light_disables_streaks() {
        let settings = RenderSettings::default();
        let mut frame = PostFrame {
            light_screen: Some(Vec2::new(0.25, 0.75)),
            fade: 0.5,
            time: 3.0,
            width: 800,
            height: 400,
        };
        let visible = PostUniform::new(&settings, &frame);
        assert_eq!(visible.god_ray[1], 0.01);
        assert_eq!(visible.light, [0.25, 0.75, 0.5, 3.0]);
        assert_eq!(visible.screen, [800.0, 400.0, 1.0 / 800.0, 1.0 / 400.0]);

        frame.light_screen = None;
        assert_eq!(PostUniform::new(&settings, &frame).god_ray[1], 0.0);
    }

    #[test]
    fn sample_count_is_capped() {
        let mut settings = RenderSettings::default();
        settings.god_rays.samples = 10_000;
        let frame = PostFrame {
            light_screen: None,
            fade: 1.0,
            time: 0.0,
            width: 1,
            height: 1,
        };
        assert_eq!(PostUniform::new(&settings, &frame).god_ray2[0], MAX_GOD_RAY_SAMPLES as f32);
    }
}
