use crate::camera::Camera3D;
use crate::registry::SceneRegistry;
use crate::scene::NodeId;
use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;

/// Dynamic uniform stride; covers the minimum alignment every backend
/// guarantees.
const DRAW_UNIFORM_STRIDE: u64 = 256;

const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.0588, g: 0.0902, b: 0.1647, a: 1.0 };

const GROUND_HALF_EXTENT: f32 = 15.0;
const GROUND_COLOR: [f32; 4] = [0.008, 0.024, 0.09, 1.0];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    sun_direction: [f32; 4],
    sun_color: [f32; 4],
    ambient: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DrawUniform {
    model: [[f32; 4]; 4],
    base_color: [f32; 4],
    emissive: [f32; 4],
}

struct DrawRecord {
    node: NodeId,
    first_index: u32,
    index_count: u32,
    base_vertex: i32,
}

struct FragmentMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    records: Vec<DrawRecord>,
}

struct GroundMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Forward pass over the active room plus the static ground plane. All
/// meshes share one pipeline; per-draw data rides a dynamic-offset uniform.
pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: u32,
    ground: GroundMesh,
    fragment_mesh: Option<FragmentMesh>,
    synced_revision: Option<u64>,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Result<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../assets/shaders/scene_mesh.wgsl").into(),
            ),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniform>() as u64
                    ),
                },
                count: None,
            }],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DrawUniform>() as u64
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });

        let vertex_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Room interiors are viewed from inside; backface culling
                // would hollow out the walls.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Uniform Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        let draw_capacity = 64;
        let (draw_buffer, draw_bind_group) =
            create_draw_buffer(device, &draw_layout, draw_capacity);

        let ground = build_ground(device);

        Ok(Self {
            pipeline,
            frame_buffer,
            frame_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            ground,
            fragment_mesh: None,
            synced_revision: None,
        })
    }

    /// Rebuilds the fragment's GPU buffers when the registry's revision has
    /// moved past what is resident.
    pub fn sync_fragment(&mut self, device: &wgpu::Device, registry: &SceneRegistry) {
        if self.synced_revision == Some(registry.revision()) {
            return;
        }
        self.synced_revision = Some(registry.revision());
        let Some(fragment) = registry.fragment() else {
            self.fragment_mesh = None;
            return;
        };

        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut records = Vec::new();
        for id in fragment.mesh_nodes() {
            let Some(geometry) = fragment.node(id).geometry.as_ref() else {
                continue;
            };
            let base_vertex = vertices.len() as i32;
            let first_index = indices.len() as u32;
            for (position, normal) in geometry.positions.iter().zip(&geometry.normals) {
                vertices.push(Vertex { position: position.to_array(), normal: normal.to_array() });
            }
            indices.extend_from_slice(&geometry.indices);
            records.push(DrawRecord {
                node: id,
                first_index,
                index_count: geometry.indices.len() as u32,
                base_vertex,
            });
        }
        if records.is_empty() {
            self.fragment_mesh = None;
            return;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fragment Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fragment Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.fragment_mesh = Some(FragmentMesh { vertex_buffer, index_buffer, records });
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        registry: &SceneRegistry,
        camera: &Camera3D,
        viewport: winit::dpi::PhysicalSize<u32>,
    ) {
        let instances = registry.mesh_instances();
        let draw_count = instances.len() as u32 + 1;
        self.ensure_draw_capacity(device, draw_count);

        let lighting = registry.lighting();
        let frame = FrameUniform {
            view_proj: camera.view_projection(viewport).to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            sun_direction: lighting.sun_direction.extend(0.0).to_array(),
            sun_color: lighting.sun_color.extend(1.0).to_array(),
            ambient: lighting.ambient.extend(1.0).to_array(),
        };
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let ground_uniform = DrawUniform {
            model: Mat4::from_translation(Vec3::new(0.0, -0.01, 0.0)).to_cols_array_2d(),
            base_color: GROUND_COLOR,
            emissive: [0.0; 4],
        };
        queue.write_buffer(&self.draw_buffer, 0, bytemuck::bytes_of(&ground_uniform));
        for (slot, instance) in instances.iter().enumerate() {
            let uniform = DrawUniform {
                model: instance.model.to_cols_array_2d(),
                base_color: instance.base_color,
                emissive: [
                    instance.emissive[0],
                    instance.emissive[1],
                    instance.emissive[2],
                    0.0,
                ],
            };
            queue.write_buffer(
                &self.draw_buffer,
                (slot as u64 + 1) * DRAW_UNIFORM_STRIDE,
                bytemuck::bytes_of(&uniform),
            );
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        pass.set_vertex_buffer(0, self.ground.vertex_buffer.slice(..));
        pass.set_index_buffer(self.ground.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.set_bind_group(1, &self.draw_bind_group, &[0]);
        pass.draw_indexed(0..self.ground.index_count, 0, 0..1);

        if let Some(mesh) = self.fragment_mesh.as_ref() {
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            for (slot, instance) in instances.iter().enumerate() {
                // Records and instances both come from the fragment's mesh
                // node iteration, so they stay in lockstep per revision.
                let Some(record) = mesh.records.get(slot) else {
                    break;
                };
                if record.node != instance.node {
                    continue;
                }
                let offset = (slot as u32 + 1) * DRAW_UNIFORM_STRIDE as u32;
                pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
                pass.draw_indexed(
                    record.first_index..record.first_index + record.index_count,
                    record.base_vertex,
                    0..1,
                );
            }
        }
    }

    fn ensure_draw_capacity(&mut self, device: &wgpu::Device, needed: u32) {
        if needed <= self.draw_capacity {
            return;
        }
        let mut capacity = self.draw_capacity.max(1);
        while capacity < needed {
            capacity *= 2;
        }
        let (buffer, bind_group) = create_draw_buffer(device, &self.draw_layout, capacity);
        self.draw_buffer = buffer;
        self.draw_bind_group = bind_group;
        self.draw_capacity = capacity;
    }
}

fn create_draw_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: u32,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size: capacity as u64 * DRAW_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Draw Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn build_ground(device: &wgpu::Device) -> GroundMesh {
    let e = GROUND_HALF_EXTENT;
    let up = [0.0, 1.0, 0.0];
    let vertices = [
        Vertex { position: [-e, 0.0, -e], normal: up },
        Vertex { position: [-e, 0.0, e], normal: up },
        Vertex { position: [e, 0.0, e], normal: up },
        Vertex { position: [e, 0.0, -e], normal: up },
    ];
    let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Ground Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Ground Index Buffer"),
        contents: bytemuck::cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GroundMesh { vertex_buffer, index_buffer, index_count: indices.len() as u32 }
}
