// Regatta: two vessels on an enclosed stretch of water.
// The user vessel is steered from the keyboard, the AI vessel by a script;
// both stop short of anything the ray-fan probe sees within range.
// Everything is drawn as instanced, lit boxes in a single draw call.

mod engine;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Quat, Vec3};
use log::{error, info, warn};
use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::camera::ChaseCamera;
use engine::config::SimConfig;
use engine::debug_overlay::{DebugOverlay, DebugStats, ProbeRosette};
use engine::input::InputState;
use engine::mesh::{triangulate_flat, unit_cube, GpuVertex};
use engine::obstacle::Obstacle;
use engine::scene::{FrameReport, Scene, VesselPose};
use engine::VesselRole;

const CONFIG_ENV: &str = "REGATTA_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "regatta.toml";
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Hull box drawn for each vessel, in world units (beam, freeboard, length).
const VESSEL_SIZE: Vec3 = Vec3::new(12.0, 8.0, 30.0);

#[derive(Debug, Error)]
enum InitError {
    #[error("could not create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("could not open window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("could not create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("could not open graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

// ============================================================================
// INSTANCE DATA (per-box)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl InstanceData {
    fn new(model: Mat4, color: [f32; 4]) -> Self {
        Self { model: model.to_cols_array_2d(), color }
    }

    /// Unit cube stretched over the axis-aligned box `min..max`.
    fn from_bounds(min: Vec3, max: Vec3, color: [f32; 4]) -> Self {
        let size = (max - min).max(Vec3::splat(4.0));
        Self::new(Mat4::from_scale_rotation_translation(size, Quat::IDENTITY, (min + max) / 2.0), color)
    }

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const VEC4: wgpu::BufferAddress = std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress;
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Model matrix columns (locations 2-5)
                wgpu::VertexAttribute { offset: 0, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
                wgpu::VertexAttribute { offset: VEC4, shader_location: 3, format: wgpu::VertexFormat::Float32x4 },
                wgpu::VertexAttribute { offset: VEC4 * 2, shader_location: 4, format: wgpu::VertexFormat::Float32x4 },
                wgpu::VertexAttribute { offset: VEC4 * 3, shader_location: 5, format: wgpu::VertexFormat::Float32x4 },
                // Color (location 6)
                wgpu::VertexAttribute { offset: VEC4 * 4, shader_location: 6, format: wgpu::VertexFormat::Float32x4 },
            ],
        }
    }
}

const WATER_COLOR: [f32; 4] = [0.08, 0.25, 0.42, 1.0];
const WALL_COLOR: [f32; 4] = [0.55, 0.52, 0.48, 1.0];
const ROCK_COLOR: [f32; 4] = [0.35, 0.32, 0.30, 1.0];
const USER_COLOR: [f32; 4] = [0.95, 0.85, 0.30, 1.0];
const AI_COLOR: [f32; 4] = [0.85, 0.25, 0.25, 1.0];

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            light_dir: Vec3::new(0.4, 1.0, -0.3).normalize().extend(0.0).to_array(),
        }
    }
}

// ============================================================================
// FRAME TIMING
// ============================================================================

/// Frame times gathered over one FPS window.
struct FrameTimes {
    count: u32,
    total_ms: f32,
    min_ms: f32,
    max_ms: f32,
}

impl FrameTimes {
    fn new() -> Self {
        Self { count: 0, total_ms: 0.0, min_ms: f32::INFINITY, max_ms: 0.0 }
    }

    fn record(&mut self, ms: f32) {
        self.count += 1;
        self.total_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    fn average_ms(&self) -> f32 {
        if self.count == 0 { 0.0 } else { self.total_ms / self.count as f32 }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    depth_view: wgpu::TextureView,
    num_indices: u32,
    max_instances: usize,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    // Simulation
    scene: Scene,
    report: FrameReport,
    static_instances: Vec<InstanceData>,
    last_update: Instant,

    // Camera + input
    camera: ChaseCamera,
    input: InputState,

    // Overlay
    overlay: DebugOverlay,
    stats: DebugStats,
    frame_times: FrameTimes,
}

impl State {
    async fn new(window: Arc<Window>, sim: SimConfig) -> Result<Self, InitError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(InitError::NoAdapter)?;
        info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

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

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_instanced.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
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
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc(), InstanceData::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
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
            cache: None,
        });

        let cube = triangulate_flat(&unit_cube());

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: cube.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: cube.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        let scene = Scene::new(&sim);
        let static_instances = static_instances(&sim, scene.obstacles());

        // Static scenery plus the two vessels
        let max_instances = static_instances.len() + 2;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (max_instances * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&instance_buffer, 0, bytemuck::cast_slice(&static_instances));

        let overlay = DebugOverlay::new(&window, &device, config.format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            depth_view,
            num_indices: cube.index_count() as u32,
            max_instances,
            uniform_buffer,
            uniform_bind_group,
            scene,
            report: FrameReport::default(),
            static_instances,
            last_update: Instant::now(),
            camera: ChaseCamera::new(),
            input: InputState::new(),
            overlay,
            stats: DebugStats {
                fps: 0,
                frame_time_avg_ms: 0.0,
                frame_time_min_ms: 0.0,
                frame_time_max_ms: 0.0,
                ticks_last_frame: 0,
                obstacle_count: 0,
                resolution: (size.width, size.height),
                camera_distance: 0.0,
                vessels: Vec::new(),
            },
            frame_times: FrameTimes::new(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now - self.last_update;
        self.last_update = now;
        self.frame_times.record(elapsed.as_secs_f32() * 1000.0);

        self.report = self.scene.frame(elapsed);

        let target = self
            .report
            .pose(VesselRole::User)
            .map(|pose| pose.position)
            .unwrap_or(Vec3::ZERO);
        self.camera.update(&self.input, target);

        self.stats.ticks_last_frame = self.report.ticks;
        self.stats.obstacle_count = self.scene.obstacles().len();
        self.stats.resolution = (self.size.width, self.size.height);
        self.stats.camera_distance = self.camera.distance();
        self.stats.vessels = self.report.vessels.clone();
    }

    /// Fold the last FPS window into the overlay stats and start a new one.
    fn roll_frame_window(&mut self, frames: u32) {
        self.stats.fps = frames;
        self.stats.frame_time_avg_ms = self.frame_times.average_ms();
        self.stats.frame_time_min_ms = self.frame_times.min_ms;
        self.stats.frame_time_max_ms = self.frame_times.max_ms;
        self.frame_times = FrameTimes::new();
    }

    fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Vessel instances go after the static scenery
        let vessel_instances: Vec<InstanceData> =
            self.report.vessels.iter().map(vessel_instance).collect();
        let instance_count = (self.static_instances.len() + vessel_instances.len())
            .min(self.max_instances);
        self.queue.write_buffer(
            &self.instance_buffer,
            (self.static_instances.len() * std::mem::size_of::<InstanceData>()) as u64,
            bytemuck::cast_slice(&vessel_instances),
        );

        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        let view_proj = self.camera.view_projection(aspect);
        let uniforms = Uniforms {
            view_proj: view_proj.to_cols_array_2d(),
            ..Uniforms::new()
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.55,
                            g: 0.70,
                            b: 0.85,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.num_indices, 0, 0..instance_count as u32);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };
        let rosettes = if self.overlay.visible {
            self.probe_rosettes(view_proj, window.scale_factor() as f32)
        } else {
            Vec::new()
        };
        let stats = self.overlay.visible.then_some(&self.stats);
        self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            window,
            &view,
            &screen_descriptor,
            stats,
            &rosettes,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// One probe rose floating above each vessel that is in front of the camera.
    fn probe_rosettes(&self, view_proj: Mat4, scale_factor: f32) -> Vec<ProbeRosette> {
        let width = self.size.width as f32 / scale_factor;
        let height = self.size.height as f32 / scale_factor;
        self.report
            .vessels
            .iter()
            .filter_map(|pose| {
                let clip = view_proj * (pose.position + Vec3::Y * 40.0).extend(1.0);
                if clip.w <= 0.0 {
                    return None;
                }
                let ndc = clip.truncate() / clip.w;
                Some(ProbeRosette {
                    center: egui::pos2((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height),
                    radius: 18.0,
                    blocked: pose.blocked,
                    label: format!("{:?}", pose.role),
                })
            })
            .collect()
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// SCENE INSTANCES
// ============================================================================

/// Water plane plus one box per obstacle. These never move.
fn static_instances(sim: &SimConfig, obstacles: &[Obstacle]) -> Vec<InstanceData> {
    let half = sim.arena_size / 2.0;
    let mut instances = vec![InstanceData::from_bounds(
        Vec3::new(-half, -4.0, -half),
        Vec3::new(half, 0.0, half),
        WATER_COLOR,
    )];
    instances.extend(obstacles.iter().map(|obstacle| {
        let (min, max) = obstacle.bounds();
        let color = match obstacle {
            Obstacle::Wall { .. } => WALL_COLOR,
            _ => ROCK_COLOR,
        };
        InstanceData::from_bounds(min, max, color)
    }));
    instances
}

fn vessel_instance(pose: &VesselPose) -> InstanceData {
    let color = match pose.role {
        VesselRole::User => USER_COLOR,
        VesselRole::Ai => AI_COLOR,
    };
    let model = Mat4::from_scale_rotation_translation(
        VESSEL_SIZE,
        Quat::from_rotation_y(pose.facing),
        pose.position + Vec3::Y * (VESSEL_SIZE.y / 2.0),
    );
    InstanceData::new(model, color)
}

// ============================================================================
// CONFIG
// ============================================================================

/// Config from `$REGATTA_CONFIG`, else `regatta.toml` if present, else defaults.
fn load_config() -> SimConfig {
    let (path, explicit) = match std::env::var_os(CONFIG_ENV) {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    if !explicit && !path.exists() {
        info!("no {} found, using default settings", DEFAULT_CONFIG_PATH);
        return SimConfig::default();
    }
    match SimConfig::load(&path) {
        Ok(config) => {
            info!("loaded settings from {}", path.display());
            config
        }
        Err(e) => {
            error!("{}: {}; using default settings", path.display(), e);
            SimConfig::default()
        }
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<(), InitError> {
    env_logger::init();

    let sim = load_config();
    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Regatta")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), sim))?;
    let mut frame_count = 0;
    let mut last_fps_update = Instant::now();

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let _ = state.overlay.handle_window_event(&window, event);
                if let Some(controls) = state.input.process_event(event) {
                    state.scene.set_controls(controls);
                }

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::F3),
                                repeat: false,
                                ..
                            },
                        ..
                    } => state.overlay.toggle(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                state.resize(state.size)
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                error!("out of GPU memory");
                                control_flow.exit();
                            }
                            Err(e) => warn!("{:?}", e),
                        }
                        state.input.end_frame();

                        frame_count += 1;
                        let now = Instant::now();
                        if (now - last_fps_update).as_secs_f32() >= 1.0 {
                            state.roll_frame_window(frame_count);
                            info!(
                                "FPS: {} | Obstacles: {} | Draw calls: 1",
                                frame_count,
                                state.scene.obstacles().len()
                            );
                            frame_count = 0;
                            last_fps_update = now;
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
