//! Scene wiring: terrains, scatter sets, water, materials and the demo camera script.

use std::path::Path;

use glam::{Mat4, Vec2, Vec3};
use procgen::{
    random_indices, water_normal_map, FlatPatch, HeightField, MeshBuffers, ScatterMode, ScatterSet, TerrainVertex,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::{
    load_gltf, CameraRig, Drawable, KeyframeInterval, Material, MaterialTag, Mesh, Renderer, TextureId, WaterSurface,
};

use crate::config::{rgb, SceneControls};

pub const INITIAL_EYE: Vec3 = Vec3::new(-3.44, 71.84, 115.52);
pub const INITIAL_CENTER: Vec3 = Vec3::new(-3.44, 51.84, -4.47);

/// Demo script length in seconds.
pub const DEMO_LENGTH: f32 = 70.0;
const DEMO_FADES: [(f32, f32); 2] = [(12.0, 18.0), (51.0, 59.0)];

/// Keeps the far terrain's flat cut-out just inside the near terrain's edge.
const FLAT_PATCH_INSET: f32 = 10.0;
const WATER_EXTENT: f32 = 10_000.0;
const WATER_OFFSET: Vec3 = Vec3::new(0.0, 0.0, -1.0);

const SWORD_COUNT: usize = 100;
const MONUMENT_COUNT: usize = 50;

/// One scripted camera stage: eye and target both move linearly over `[start, end)`.
struct Stage {
    start: f32,
    end: f32,
    eye: (Vec3, Vec3),
    target: (Vec3, Vec3),
}

const DEMO_STAGES: [Stage; 4] = [
    Stage {
        start: 2.0,
        end: 15.0,
        eye: (Vec3::new(80.0, 80.0, 100.0), Vec3::new(80.0, 100.0, 80.0)),
        target: (Vec3::new(-20.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)),
    },
    Stage {
        start: 15.0,
        end: 30.0,
        eye: (Vec3::new(0.0, 63.0, 10.0), Vec3::new(0.0, 88.0, 10.0)),
        target: (Vec3::new(0.0, 40.0, -300.0), Vec3::new(0.0, 75.0, -330.0)),
    },
    Stage {
        start: 30.0,
        end: 55.0,
        eye: (Vec3::new(-35.0, 90.0, 125.0), Vec3::new(270.0, 140.0, 285.0)),
        target: (Vec3::new(20.0, 30.0, 0.0), Vec3::new(80.0, 10.0, -30.0)),
    },
    Stage {
        start: 55.0,
        end: 70.0,
        eye: (Vec3::new(-50.0, 115.0, 65.0), Vec3::new(40.0, 55.0, 20.0)),
        target: (Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, 50.0, 0.0)),
    },
];

/// Add the default fades and keyframes to `camera`. Launching is left to the caller.
pub fn install_demo_script(camera: &mut CameraRig) {
    for (start, end) in DEMO_FADES {
        camera.add_fade_window(start, end);
    }
    for stage in &DEMO_STAGES {
        camera.add_position_keyframe(KeyframeInterval::new(stage.start, stage.end, stage.eye.0, stage.eye.1));
        camera.add_target_keyframe(KeyframeInterval::new(stage.start, stage.end, stage.target.0, stage.target.1));
    }
}

/// Everything drawn each frame, built once at startup.
pub struct Scene {
    pub near_terrain: Drawable,
    pub far_terrain: Drawable,
    pub swords: Drawable,
    pub monuments: Drawable,
    pub ribbons: Drawable,
    pub water: Drawable,
    pub water_surface: WaterSurface,

    pub near_sand: Material,
    pub far_sand: Material,
    pub sword_material: Material,
    pub monument_material: Material,
    pub ribbon_material: Material,
    pub water_material: Material,
    pub water_normal: TextureId,
}

impl Scene {
    pub fn build(renderer: &mut Renderer, controls: &SceneControls) -> Self {
        let terrain = &controls.terrain;
        let near = HeightField::generate(terrain.height_field(terrain.size, controls.seed, None));
        let far = HeightField::generate(terrain.height_field(
            terrain.far_size,
            controls.seed,
            Some(FlatPatch::centered(terrain.size - FLAT_PATCH_INSET)),
        ));
        log::info!(
            "Terrain ready: near {} vertices, far {} vertices",
            near.vertices().len(),
            far.vertices().len()
        );

        let mut rng = StdRng::seed_from_u64(controls.seed);
        let planted = random_indices(SWORD_COUNT, near.vertices().len(), &mut rng);
        let monument_spots = random_indices(MONUMENT_COUNT, near.vertices().len(), &mut rng);

        let aligned = ScatterMode::NormalAligned { tilt: 1.0 };
        let swords = ScatterSet::build(&template("assets/models/sword.glb", blade), &near, &planted, aligned);
        let monuments = ScatterSet::build(&template("assets/models/monument.glb", slab), &near, &monument_spots, aligned);
        let ribbons = ScatterSet::build(
            &template("assets/models/ribbon.glb", ribbon),
            &near,
            &planted,
            ScatterMode::wind_default(),
        );

        let textures = &mut renderer.ctx.textures;
        let sand_texture = textures.request("assets/textures/sand.png", true, None);
        let monument_texture = textures.request("assets/textures/monument_color.png", true, None);
        let water_normal = textures.request(
            "assets/textures/waternormals.jpg",
            false,
            Some(water_normal_map(256, controls.seed as u32, 1.0)),
        );

        let colors = &controls.materials;
        let sand = Material::new(MaterialTag::Terrain)
            .with_diffuse(rgb(colors.sand_diffuse))
            .with_specular(colors.specular)
            .with_params([3.0, 0.2, 0.2, 0.05])
            .with_texture(sand_texture);
        let stone = Material::new(MaterialTag::Standard).with_texture(monument_texture);

        let device = &renderer.ctx.device;
        let water_surface = WaterSurface::new(WATER_EXTENT, WATER_OFFSET);
        let identity = Mat4::IDENTITY;
        Self {
            near_terrain: Drawable::new(Mesh::from_buffers(device, "Near Terrain", &near.mesh), identity),
            far_terrain: Drawable::new(Mesh::from_buffers(device, "Far Terrain", &far.mesh), identity),
            swords: Drawable::new(Mesh::from_buffers(device, "Swords", &swords.mesh), identity),
            monuments: Drawable::new(Mesh::from_buffers(device, "Monuments", &monuments.mesh), identity),
            ribbons: Drawable::new(Mesh::from_buffers(device, "Ribbons", &ribbons.mesh), identity),
            water: Drawable::new(Mesh::from_buffers(device, "Water", &procgen::unit_quad()), water_surface.model()),
            water_surface,

            near_sand: sand.clone().with_grid_size(terrain.size),
            far_sand: sand.with_grid_size(terrain.far_size),
            sword_material: stone.clone(),
            monument_material: stone.with_diffuse(rgb(colors.monument_diffuse)),
            ribbon_material: Material::new(MaterialTag::Foliage)
                .with_diffuse(rgb(colors.ribbon_diffuse))
                .with_params([0.0, 1.0, 6.2, 3.4])
                .with_texture(monument_texture),
            water_material: Material::new(MaterialTag::Water)
                .with_params([controls.water.size, controls.water.distortion_scale, 0.0, 0.0]),
            water_normal,
        }
    }

    /// Baked into the shadow map.
    pub fn shadow_casters(&self) -> [&Drawable; 2] {
        [&self.swords, &self.monuments]
    }

    /// Drawn black over the light proxy for god rays.
    pub fn occluders(&self) -> [&Drawable; 2] {
        [&self.near_terrain, &self.far_terrain]
    }
}

/// Load a scatter template, or build the procedural stand-in when the file is missing or broken.
fn template(path: &str, stand_in: fn() -> MeshBuffers) -> MeshBuffers {
    match load_gltf(Path::new(path)) {
        Ok(mesh) => mesh,
        Err(err) => {
            log::warn!("{}; using procedural stand-in", err);
            stand_in()
        }
    }
}

/// Quad spanned by `u` and `v` around `center`, counter-clockwise seen from `u × v`.
fn push_face(mesh: &mut MeshBuffers, center: Vec3, u: Vec3, v: Vec3) {
    let normal = u.cross(v).normalize_or_zero();
    let base = mesh.vertices.len() as u32;
    let corners = [
        (center - u - v, Vec2::new(0.0, 0.0)),
        (center + u - v, Vec2::new(1.0, 0.0)),
        (center + u + v, Vec2::new(1.0, 1.0)),
        (center - u + v, Vec2::new(0.0, 1.0)),
    ];
    for (position, uv) in corners {
        mesh.vertices.push(TerrainVertex::new(position, normal, uv));
    }
    mesh.indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
}

fn push_box(mesh: &mut MeshBuffers, center: Vec3, half: Vec3) {
    let (x, y, z) = (Vec3::X * half.x, Vec3::Y * half.y, Vec3::Z * half.z);
    push_face(mesh, center + x, -z, y);
    push_face(mesh, center - x, z, y);
    push_face(mesh, center + z, x, y);
    push_face(mesh, center - z, -x, y);
    push_face(mesh, center + y, x, -z);
    push_face(mesh, center - y, x, z);
}

/// A sword stuck in the sand: long thin blade, short crossguard. Buried 2 units.
fn blade() -> MeshBuffers {
    let mut mesh = MeshBuffers::default();
    push_box(&mut mesh, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.15, 7.0, 0.6));
    push_box(&mut mesh, Vec3::new(0.0, 9.0, 0.0), Vec3::new(0.25, 0.25, 1.8));
    mesh
}

/// A standing stone.
fn slab() -> MeshBuffers {
    let mut mesh = MeshBuffers::default();
    push_box(&mut mesh, Vec3::new(0.0, 4.0, 0.0), Vec3::new(2.0, 6.0, 1.0));
    mesh
}

/// A cloth strip trailing along -X: `uv.y` runs along the strip, `uv.x` across it.
fn ribbon() -> MeshBuffers {
    const LENGTH: f32 = 30.0;
    const WIDTH: f32 = 1.5;
    const SEGMENTS: u32 = 16;
    let mut mesh = MeshBuffers::default();
    for i in 0..=SEGMENTS {
        let t = i as f32 / SEGMENTS as f32;
        let x = -LENGTH * t;
        mesh.vertices.push(TerrainVertex::new(Vec3::new(x, 0.0, 0.0), Vec3::NEG_Z, Vec2::new(0.0, t)));
        mesh.vertices.push(TerrainVertex::new(Vec3::new(x, WIDTH, 0.0), Vec3::NEG_Z, Vec2::new(1.0, t)));
    }
    for i in 0..SEGMENTS {
        let (a, b, c, d) = (2 * i, 2 * i + 1, 2 * i + 2, 2 * i + 3);
        mesh.indices.extend([a, b, c, c, b, d]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::CameraMode;

    struct Still;

    impl renderer::OrbitSource for Still {
        fn eye(&self) -> Vec3 {
            INITIAL_EYE
        }
        fn center(&self) -> Vec3 {
            INITIAL_CENTER
        }
    }

    #[test]
    fn demo_script_has_no_overlaps() {
        let mut camera = CameraRig::new(INITIAL_EYE, INITIAL_CENTER);
        install_demo_script(&mut camera);
        camera.launch_demo(DEMO_LENGTH);
        assert!(camera.validate_schedule().is_empty());
    }

    /// Stages tile the script back to back and end with it.
    #[test]
    fn stages_are_contiguous() {
        for pair in DEMO_STAGES.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(DEMO_STAGES[DEMO_STAGES.len() - 1].end, DEMO_LENGTH);
    }

    #[test]
    fn demo_runs_to_completion() {
        let mut camera = CameraRig::new(INITIAL_EYE, INITIAL_CENTER);
        install_demo_script(&mut camera);
        camera.launch_demo(DEMO_LENGTH);

        let mut orbit = Still;
        camera.update(20.0, &mut orbit);
        assert!(camera.is_demo());
        let second = &DEMO_STAGES[1];
        let t = (20.0 - second.start) / (second.end - second.start);
        assert!((camera.position() - second.eye.0.lerp(second.eye.1, t)).length() < 1e-3);

        for _ in 0..60 {
            camera.update(1.0, &mut orbit);
        }
        assert_eq!(camera.mode(), CameraMode::Interactive);
    }

    /// Every box face winds counter-clockwise around its stored normal.
    #[test]
    fn stand_in_faces_match_normals() {
        for mesh in [blade(), slab()] {
            for tri in mesh.indices.chunks(3) {
                let v: Vec<Vec3> = tri.iter().map(|&i| Vec3::from_array(mesh.vertices[i as usize].position)).collect();
                let normal = Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
                assert!((v[1] - v[0]).cross(v[2] - v[0]).dot(normal) > 0.0);
            }
        }
    }

    #[test]
    fn ribbon_trails_along_negative_x() {
        let mesh = ribbon();
        assert!(mesh.vertices.iter().all(|v| v.position[0] <= 0.0 && v.position[0] >= -30.0));
        assert_eq!(mesh.index_count(), 16 * 6);
    }
}
