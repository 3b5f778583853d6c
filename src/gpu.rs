//! wgpu renderer drawing the scene into the window surface.
//!
//! Geometry is uploaded the first time a mesh becomes visible and kept for the
//! lifetime of the renderer, since scene meshes are never removed. Model
//! matrices and colors are rewritten every frame so offsets and albedo swaps
//! applied by the coordinator show up without re-uploading vertices.

use std::{collections::HashMap, iter, sync::Arc};

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::ArcRotateCamera,
    data_structures::{
        scene_graph::{MeshId, MeshNode, SceneGraph},
        texture::{Texture, TextureData},
    },
    pipelines::mesh::{self, CameraUniform, MeshUniform},
    render::{FrameStats, Renderer, RendererConstructor},
};

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Source of the albedo bound in `bind_group`.
    albedo: Option<String>,
}

pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: wgpu::TextureView,
    textures: HashMap<String, wgpu::TextureView>,
    meshes: HashMap<MeshId, GpuMesh>,
    last: FrameStats,
}

impl GpuRenderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("Could not create a surface for the viewer window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No graphics adapter can present to the viewer window")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flow-tones device"),
                required_features: wgpu::Features::empty(),
                // WebGL2 lacks several of the default limits
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("Could not open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colors and relies on an sRGB surface to encode them.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let is_surface_configured = size.width > 0 && size.height > 0;
        if is_surface_configured {
            surface.configure(&device, &config);
        }

        let camera_layout = mesh::camera_bind_group_layout(&device);
        let mesh_layout = mesh::mesh_bind_group_layout(&device);
        let pipeline = mesh::mk_mesh_pipeline(&device, config.format, &camera_layout, &mesh_layout);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new(
                &ArcRotateCamera::default(),
                config.width as f32 / config.height as f32,
                None,
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white = upload_texture(
            &device,
            &queue,
            &TextureData {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            },
            "white",
        );
        let depth_view = create_depth_view(&device, config.width, config.height);

        log::info!("Rendering with {:?} to a {:?} surface", adapter.get_info().backend, surface_format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            is_surface_configured,
            depth_view,
            pipeline,
            camera_buffer,
            camera_bind_group,
            mesh_layout,
            sampler,
            white,
            textures: HashMap::new(),
            meshes: HashMap::new(),
            last: FrameStats::default(),
        })
    }

    /// A constructor `flow::run` calls once the window exists.
    pub fn constructor() -> RendererConstructor {
        Box::new(|window| {
            Box::pin(async move {
                let renderer = GpuRenderer::new(window).await?;
                Ok(Box::new(renderer) as Box<dyn Renderer>)
            })
        })
    }

    fn prepare_mesh(&mut self, id: MeshId, node: &MeshNode) {
        let albedo = node
            .material
            .as_ref()
            .and_then(|material| material.albedo())
            .filter(|texture| texture.data.is_some());
        let source = albedo.map(|texture| texture.source.clone());
        if let Some(texture) = albedo {
            self.ensure_texture(texture);
        }

        let uniform = MeshUniform::new(node);
        let Some(gpu_mesh) = self.meshes.get(&id) else {
            let gpu_mesh = self.upload_mesh(node, &uniform, source);
            self.meshes.insert(id, gpu_mesh);
            return;
        };
        self.queue
            .write_buffer(&gpu_mesh.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
        if gpu_mesh.albedo == source {
            return;
        }

        let bind_group = self.mesh_bind_group(&gpu_mesh.uniform_buffer, self.albedo_view(source.as_deref()));
        if let Some(gpu_mesh) = self.meshes.get_mut(&id) {
            gpu_mesh.bind_group = bind_group;
            gpu_mesh.albedo = source;
        }
    }

    fn upload_mesh(&self, node: &MeshNode, uniform: &MeshUniform, albedo: Option<String>) -> GpuMesh {
        let vertices = mesh::vertices(&node.geometry);
        let indices = mesh::indices(&node.geometry);
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", node.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", node.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Uniform Buffer", node.name)),
            contents: bytemuck::cast_slice(&[*uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = self.mesh_bind_group(&uniform_buffer, self.albedo_view(albedo.as_deref()));
        log::debug!("Uploaded {} ({} vertices)", node.name, vertices.len());

        GpuMesh {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
            uniform_buffer,
            bind_group,
            albedo,
        }
    }

    fn ensure_texture(&mut self, texture: &Texture) {
        if self.textures.contains_key(&texture.source) {
            return;
        }
        if let Some(data) = &texture.data {
            let view = upload_texture(&self.device, &self.queue, data, &texture.source);
            self.textures.insert(texture.source.clone(), view);
        }
    }

    fn albedo_view(&self, source: Option<&str>) -> &wgpu::TextureView {
        source
            .and_then(|source| self.textures.get(source))
            .unwrap_or(&self.white)
    }

    fn mesh_bind_group(&self, uniform_buffer: &wgpu::Buffer, view: &wgpu::TextureView) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.mesh_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("mesh_bind_group"),
        })
    }
}

impl Renderer for GpuRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, width, height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, scene: &SceneGraph, camera: &ArcRotateCamera) -> anyhow::Result<()> {
        let stats = FrameStats::collect(scene, self.last.frame + 1);
        if stats.visible_meshes != self.last.visible_meshes {
            log::debug!("Frame {}: drawing {} meshes", stats.frame, stats.visible_meshes);
        }
        self.last = stats;
        if !self.is_surface_configured {
            return Ok(());
        }

        let aspect = self.config.width as f32 / self.config.height as f32;
        let camera_uniform = CameraUniform::new(camera, aspect, scene.light.as_ref());
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera_uniform]));
        for (id, node) in scene.visible_meshes() {
            if !node.geometry.is_empty() {
                self.prepare_mesh(id, node);
            }
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let [r, g, b] = scene
            .environment
            .as_ref()
            .map_or([0.0; 3], |environment| environment.skybox_color);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            for (id, _) in scene.visible_meshes() {
                if let Some(gpu_mesh) = self.meshes.get(&id) {
                    render_pass.set_bind_group(1, &gpu_mesh.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(gpu_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..gpu_mesh.num_indices, 0, 0..1);
                }
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: mesh::DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[mesh::DEPTH_FORMAT],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    data: &TextureData,
    label: &str,
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        &data.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * data.width),
            rows_per_image: Some(data.height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
