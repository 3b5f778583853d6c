//! Lit, optionally textured mesh pipeline.
//!
//! Every scene mesh is drawn with the same pipeline. Group 0 carries the camera
//! and the light, group 1 the per-mesh model matrix, color and albedo texture.

use cgmath::{Matrix4, Rad, Vector3, perspective};

use crate::{
    camera::ArcRotateCamera,
    data_structures::{
        material::Material,
        mesh::Geometry,
        scene_graph::{DirectionalLight, MeshNode},
    },
};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertical field of view in radians.
pub const FOV_Y: f32 = 0.8;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

/// cgmath produces OpenGL clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleaves the geometry streams. Missing normals point up, missing uvs are zero.
pub fn vertices(geometry: &Geometry) -> Vec<MeshVertex> {
    geometry
        .positions
        .iter()
        .enumerate()
        .map(|(idx, position)| MeshVertex {
            position: *position,
            normal: geometry.normals.get(idx).copied().unwrap_or([0.0, 1.0, 0.0]),
            tex_coords: geometry.uvs.get(idx).copied().unwrap_or([0.0, 0.0]),
        })
        .collect()
}

/// The index stream, or one triangle per three vertices for unindexed geometry.
pub fn indices(geometry: &Geometry) -> Vec<u32> {
    if geometry.indices.is_empty() {
        (0..geometry.vertex_count() as u32).collect()
    } else {
        geometry.indices.clone()
    }
}

pub fn projection(aspect: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * perspective(Rad(FOV_Y), aspect, Z_NEAR, Z_FAR)
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub light_direction: [f32; 4],
}

impl CameraUniform {
    pub fn new(camera: &ArcRotateCamera, aspect: f32, light: Option<&DirectionalLight>) -> Self {
        let eye = camera.position();
        let direction = light
            .map(|light| light.direction)
            .unwrap_or(Vector3::new(0.0, -1.0, 0.0));
        Self {
            view_proj: (projection(aspect) * camera.view_matrix()).into(),
            eye: [eye.x, eye.y, eye.z, 1.0],
            light_direction: [direction.x, direction.y, direction.z, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub uv_scale: [f32; 2],
    /// 1.0 when the albedo texture is sampled, 0.0 for flat color.
    pub use_texture: f32,
    _padding: f32,
}

impl MeshUniform {
    pub fn new(node: &MeshNode) -> Self {
        let (base_color, albedo) = match &node.material {
            Some(Material::Pbr(pbr)) => (pbr.base_color, pbr.albedo.as_ref()),
            Some(Material::Standard(standard)) => {
                let [r, g, b] = standard.diffuse_color;
                ([r, g, b, 1.0], None)
            }
            None => ([1.0; 4], None),
        };
        let albedo = albedo.filter(|texture| texture.data.is_some());
        Self {
            model: node.transform.to_matrix().into(),
            base_color,
            uv_scale: albedo.map_or([1.0, 1.0], |texture| [texture.u_scale, texture.v_scale]),
            use_texture: if albedo.is_some() { 1.0 } else { 0.0 },
            _padding: 0.0,
        }
    }
}

pub fn camera_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

pub fn mesh_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("mesh_bind_group_layout"),
    })
}

pub fn mk_mesh_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    mesh_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, mesh_bind_group_layout],
        ..Default::default()
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Mesh Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Mesh Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[MeshVertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // imported characters are not guaranteed to be closed
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
