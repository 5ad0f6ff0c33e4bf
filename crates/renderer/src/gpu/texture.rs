use std::path::Path;

use anyhow::{Context, Result};
use image::GenericImageView;
use wgpu::util::{DeviceExt, TextureDataOrder};

use super::context::SurfaceColorSpace;

/// A sampled 2D texture bound to a plane as `tex0`.
pub(crate) struct PlaneTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub resolution: [u32; 2],
}

impl PlaneTexture {
    /// Loads an image from disk. Rows are uploaded top-first so texcoord v=0 samples the top.
    pub(crate) fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        color_space: SurfaceColorSpace,
    ) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to open plane texture at {}", path.display()))?;
        let (width, height) = image.dimensions();
        let rgba = image.to_rgba8();
        Ok(Self::from_rgba(
            device,
            queue,
            &format!("plane texture {}", path.display()),
            width,
            height,
            rgba.as_raw(),
            color_space,
        ))
    }

    /// 1x1 opaque white, used when a plane has no texture.
    pub(crate) fn placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_space: SurfaceColorSpace,
    ) -> Self {
        Self::from_rgba(
            device,
            queue,
            "placeholder plane texture",
            1,
            1,
            &[255, 255, 255, 255],
            color_space,
        )
    }

    fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        data: &[u8],
        color_space: SurfaceColorSpace,
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: color_space.texture_format(),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
            resolution: [width, height],
        }
    }
}

/// Depth buffer (and optional MSAA colour buffer) sized to the surface.
pub(crate) struct RenderTargets {
    _depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    multisample: Option<(wgpu::Texture, wgpu::TextureView)>,
}

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

impl RenderTargets {
    pub(crate) fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let multisample = (sample_count > 1).then(|| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("msaa color target"),
                size: extent,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: color_format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        });

        Self {
            _depth_texture: depth_texture,
            depth_view,
            multisample,
        }
    }

    /// The view to render into and the resolve target, if MSAA is active.
    pub(crate) fn color_attachment<'a>(
        &'a self,
        frame_view: &'a wgpu::TextureView,
    ) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>) {
        match &self.multisample {
            Some((_, view)) => (view, Some(frame_view)),
            None => (frame_view, None),
        }
    }
}
