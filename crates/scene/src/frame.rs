//! Per-frame pass ordering.

use anyhow::Result;
use renderer::{
    light_screen_position, CameraUniform, GBufferSubmission, PostChain, PostFrame, PostProcessType, PostUniform,
    ResolveFrame, ResolveInputs, ResolveTarget, ResolveUniform, WaterDraw,
};

use crate::SceneState;

pub fn run(state: &mut SceneState) -> Result<()> {
    let (output, mut encoder) = match state.renderer.begin_frame() {
        Ok(frame) => frame,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            log::warn!("Surface lost or outdated, reconfiguring");
            state.renderer.reconfigure();
            return Ok(());
        }
        Err(wgpu::SurfaceError::Timeout) => {
            log::debug!("Surface acquire timed out, skipping frame");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let surface_view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

    let renderer = &mut state.renderer;
    let settings = &state.settings;
    let scene = &state.scene;
    let camera = &state.camera;
    let time = state.time.elapsed_seconds();
    let dt = state.time.delta_seconds();
    let (width, height) = renderer.dimensions();
    let aspect = renderer.aspect();

    let mut camera_uniform = CameraUniform::new();
    camera_uniform.update(camera, time);
    renderer.ctx.camera.write(&renderer.ctx.queue, &camera_uniform);

    let casters = scene.shadow_casters();
    if renderer
        .shadow
        .update(&renderer.ctx, &mut encoder, &settings.shadow, aspect, &casters)
    {
        log::debug!("Shadow map rebaked for light at {:?}", settings.shadow.light_position());
    }

    if settings.debug_shadow {
        renderer
            .post
            .show_depth(&renderer.ctx, &mut encoder, renderer.shadow.map(), &surface_view);
        renderer.end_frame(output, encoder);
        return Ok(());
    }

    let near_terrain = [&scene.near_terrain];
    let far_terrain = [&scene.far_terrain];
    let swords = [&scene.swords];
    let monuments = [&scene.monuments];
    let ribbons = [&scene.ribbons];
    let submissions = [
        GBufferSubmission { material: &scene.near_sand, drawables: &near_terrain },
        GBufferSubmission { material: &scene.far_sand, drawables: &far_terrain },
        GBufferSubmission { material: &scene.sword_material, drawables: &swords },
        GBufferSubmission { material: &scene.monument_material, drawables: &monuments },
        GBufferSubmission { material: &scene.ribbon_material, drawables: &ribbons },
    ];
    let water = WaterDraw {
        drawable: &scene.water,
        material: &scene.water_material,
        reflection_view_proj: scene.water_surface.reflection_view_proj(camera),
    };
    renderer.gbuffer.clear(&mut encoder, &renderer.ctx.targets.gbuffer);
    renderer
        .gbuffer
        .run(&renderer.ctx, &mut encoder, &submissions, Some(&water), time);

    renderer.sky.prepare(&renderer.ctx.queue, &settings.sky, time);
    renderer.sky.render(
        &mut encoder,
        "Sky Pass",
        &renderer.ctx.camera.bind_group,
        &renderer.ctx.sky_box,
        &renderer.ctx.targets.sky.view,
    );
    renderer
        .reflection
        .run(&renderer.ctx, &mut encoder, &renderer.sky, camera, &scene.water_surface, time);

    renderer
        .particles
        .simulate(&renderer.ctx.queue, &mut encoder, &settings.particles, time, dt);
    renderer.particles.draw(&renderer.ctx, &mut encoder);

    if settings.post_type == PostProcessType::Default {
        let occluders = scene.occluders();
        renderer
            .occlusion
            .run(&renderer.ctx, &mut encoder, &settings.occlusion, &occluders);
    }

    let resolve_uniform = ResolveUniform::new(
        settings,
        &ResolveFrame {
            light_view_proj: renderer.shadow.light_view_proj(),
            eye: camera.shading_eye(),
            time,
            width,
            height,
        },
    );
    renderer.resolve.prepare(&renderer.ctx.queue, &resolve_uniform);
    renderer.resolve.run(
        &renderer.ctx,
        &mut encoder,
        &ResolveInputs {
            shadow_map: renderer.shadow.map(),
            reflection: renderer.reflection.target(),
            water_normal: Some(scene.water_normal),
        },
        ResolveTarget::select(camera.mode(), settings.post_type),
        &surface_view,
    );

    let steps = PostChain::plan(camera.mode(), settings.post_type);
    if !steps.is_empty() {
        let post_uniform = PostUniform::new(
            settings,
            &PostFrame {
                light_screen: light_screen_position(
                    settings.occlusion.proxy_center(),
                    camera.view_projection_matrix(),
                ),
                fade: camera.fade_level(),
                time,
                width,
                height,
            },
        );
        renderer.post.prepare(&renderer.ctx.queue, &post_uniform);
        renderer.post.run(&renderer.ctx, &mut encoder, &steps, &surface_view);
    }

    renderer.end_frame(output, encoder);
    Ok(())
}
