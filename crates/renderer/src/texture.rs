//! Textures, offscreen render targets, and the pending texture registry.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use procgen::TextureData;

use crate::error::AssetError;

/// Format of every HDR offscreen target, including the normal and albedo G-buffer slots.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// World position G-buffer slot. Full precision; read with `textureLoad`.
/// Together with two HDR slots this stays inside the default 32 bytes per sample.
pub const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A texture with its default view and sampler.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// 1x1 opaque white, bound wherever a real texture has not arrived yet.
    pub fn white_pixel(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let data = TextureData::filled(1, 1, [255, 255, 255, 255]);
        Self::from_rgba(device, queue, &data, "White Pixel", true)
    }

    /// Upload tightly packed RGBA8 pixels. Sampler repeats and filters linearly.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &TextureData,
        label: &str,
        srgb: bool,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: data.width.max(1),
                    height: data.height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self { texture, view, sampler }
    }

    /// Color target that later passes sample. Clamp-to-edge, linear filtering
    /// (the G-buffer format is not filterable and is only read with `textureLoad`).
    pub fn render_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let filter = if format == GBUFFER_FORMAT {
            wgpu::FilterMode::Nearest
        } else {
            wgpu::FilterMode::Linear
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });
        Self { texture, view, sampler }
    }

    /// Depth attachment that can also be sampled. The sampler is a `LessEqual` comparison sampler.
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        Self { texture, view, sampler }
    }
}

/// Read and decode an image file into RGBA8.
pub fn decode_image_file(path: &Path) -> Result<TextureData, AssetError> {
    let display = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: display.clone(),
        source,
    })?;
    let image = image::load_from_memory(&bytes)
        .map_err(|source| AssetError::Image { path: display, source })?
        .to_rgba8();
    Ok(TextureData {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Handle into [`PendingTextures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(usize);

/// Where a registry entry stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextureState {
    /// Decode still running; the placeholder is bound.
    Pending,
    Ready,
    /// Decode failed and there was no fallback; the placeholder stays bound.
    Failed,
}

struct Slot {
    path: PathBuf,
    srgb: bool,
    fallback: Option<TextureData>,
    state: TextureState,
    texture: Option<Texture>,
}

type LoadResult = (TextureId, Result<TextureData, AssetError>);

/// Textures decoded off the render thread and swapped in when ready.
///
/// Every request starts bound to a 1x1 white placeholder. [`PendingTextures::poll`]
/// drains finished decodes once per frame and uploads them; a failed decode keeps
/// the placeholder (or uploads the caller's fallback) and logs a warning.
pub struct PendingTextures {
    slots: Vec<Slot>,
    sender: mpsc::Sender<LoadResult>,
    receiver: mpsc::Receiver<LoadResult>,
    placeholder: Texture,
}

impl PendingTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            slots: Vec::new(),
            sender,
            receiver,
            placeholder: Texture::white_pixel(device, queue),
        }
    }

    /// Start decoding `path` on a worker thread. `fallback` is uploaded instead if decoding fails.
    pub fn request(&mut self, path: impl Into<PathBuf>, srgb: bool, fallback: Option<TextureData>) -> TextureId {
        let id = TextureId(self.slots.len());
        let path = path.into();
        self.slots.push(Slot {
            path: path.clone(),
            srgb,
            fallback,
            state: TextureState::Pending,
            texture: None,
        });

        let sender = self.sender.clone();
        std::thread::spawn(move || {
            let result = decode_image_file(&path);
            // The registry may be gone if the app shut down mid-load.
            let _ = sender.send((id, result));
        });
        id
    }

    /// Upload every decode that finished since the last call. Returns how many slots changed.
    pub fn poll(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> usize {
        let mut changed = 0;
        while let Ok((id, result)) = self.receiver.try_recv() {
            let Some(slot) = self.slots.get_mut(id.0) else {
                continue;
            };
            let label = slot.path.display().to_string();
            match result {
                Ok(data) => {
                    log::info!("Texture ready: {} ({}x{})", label, data.width, data.height);
                    slot.texture = Some(Texture::from_rgba(device, queue, &data, &label, slot.srgb));
                    slot.state = TextureState::Ready;
                }
                Err(err) => match slot.fallback.take() {
                    Some(data) => {
                        log::warn!("{}; using generated stand-in", err);
                        slot.texture = Some(Texture::from_rgba(device, queue, &data, &label, slot.srgb));
                        slot.state = TextureState::Ready;
                    }
                    None => {
                        log::warn!("{}; keeping placeholder", err);
                        slot.state = TextureState::Failed;
                    }
                },
            }
            changed += 1;
        }
        changed
    }

    /// The loaded texture, or the white placeholder while pending/failed.
    pub fn get(&self, id: TextureId) -> &Texture {
        match self.slots.get(id.0) {
            Some(Slot {
                state: TextureState::Ready,
                texture: Some(texture),
                ..
            }) => texture,
            _ => &self.placeholder,
        }
    }

    pub fn placeholder(&self) -> &Texture {
        &self.placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("duneshade-{}-{}", std::process::id(), name))
    }

    #[test]
    fn decodes_png_to_rgba() {
        let path = temp_path("checker.png");
        let mut img = image::RgbaImage::new(2, 2);
        img.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let data = decode_image_file(&path).unwrap();
        assert_eq!((data.width, data.height), (2, 2));
        assert_eq!(data.pixel(1, 0), [10, 20, 30, 255]);
        assert_eq!(data.rgba.len(), 16);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = decode_image_file(&temp_path("missing.png")).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn garbage_reports_decode_error() {
        let path = temp_path("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = decode_image_file(&path).unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
        let _ = std::fs::remove_file(path);
    }
}
