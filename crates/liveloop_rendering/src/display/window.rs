//! # Window Display
//!
//! A winit window driven from the render thread, presenting the surface
//! with a single wgpu draw.
//!
//! ```text
//! Surface (0x00RRGGBB u32)
//!   │  queue.write_texture          (bytes land as B,G,R,X = Bgra8Unorm)
//!   ▼
//! frame texture ──► full-screen triangle, nearest sampler ──► swapchain
//! ```
//!
//! ## Threading
//!
//! winit normally insists on the main thread. X11 and Windows allow an
//! event loop on any thread; other platforms report
//! [`DisplayError::Init`]. Events are pumped without blocking from
//! `poll_events()`, once per frame.
//!
//! Only one window may be open per process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use liveloop_core::Surface;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{EventLoop, EventLoopBuilder};
use winit::keyboard::{Key as WinitKey, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

use super::{Display, DisplayEvent, DisplayFactory, DisplaySpec, Key};
use crate::error::DisplayError;

/// Set while a window is open anywhere in the process.
static WINDOW_OPEN: AtomicBool = AtomicBool::new(false);

const BLIT_SHADER: &str = r"
@group(0) @binding(0) var frame: texture_2d<f32>;
@group(0) @binding(1) var frame_sampler: sampler;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> VsOut {
    let uv = vec2<f32>(f32((i << 1u) & 2u), f32(i & 2u));
    var out: VsOut;
    out.pos = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(frame, frame_sampler, in.uv).rgb, 1.0);
}
";

/// Holds the process-wide window slot; released on drop.
#[derive(Debug)]
struct WindowClaim;

impl WindowClaim {
    fn acquire() -> Result<Self, DisplayError> {
        if WINDOW_OPEN
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DisplayError::Init(
                "a window is already open in this process".to_owned(),
            ));
        }
        Ok(Self)
    }
}

impl Drop for WindowClaim {
    fn drop(&mut self) {
        WINDOW_OPEN.store(false, Ordering::Release);
    }
}

/// GPU objects for the blit.
struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    texture: wgpu::Texture,
}

/// A real window. Created by [`WindowFactory`] on the render thread.
pub struct WindowDisplay {
    gpu: Gpu,
    window: Arc<Window>,
    event_loop: EventLoop<()>,
    frame_size: (u32, u32),
    scale: f64,
    cursor: (f64, f64),
    closed: bool,
    _claim: WindowClaim,
}

impl WindowDisplay {
    /// Opens a window of `spec.width * spec.scale` by `spec.height * spec.scale`.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Init`] if a window is already open, the
    /// platform cannot host an event loop off the main thread, or no GPU
    /// adapter is usable.
    pub fn open(spec: &DisplaySpec) -> Result<Self, DisplayError> {
        let claim = WindowClaim::acquire()?;
        let event_loop = build_event_loop()?;

        let window = WindowBuilder::new()
            .with_title(spec.title.as_str())
            .with_inner_size(PhysicalSize::new(
                spec.width.saturating_mul(spec.scale),
                spec.height.saturating_mul(spec.scale),
            ))
            .with_resizable(true)
            .build(&event_loop)
            .map_err(|e| DisplayError::Init(e.to_string()))?;
        let window = Arc::new(window);

        let gpu = Gpu::new(Arc::clone(&window), spec.width, spec.height)?;
        tracing::debug!(
            width = spec.width,
            height = spec.height,
            scale = spec.scale,
            "window opened"
        );

        Ok(Self {
            gpu,
            window,
            event_loop,
            frame_size: (spec.width, spec.height),
            scale: f64::from(spec.scale.max(1)),
            cursor: (0.0, 0.0),
            closed: false,
            _claim: claim,
        })
    }
}

impl Display for WindowDisplay {
    fn poll_events(&mut self) -> Vec<DisplayEvent> {
        let mut events = Vec::new();
        let mut resized = None;
        let window_id = self.window.id();
        let scale = self.scale;
        let cursor = &mut self.cursor;
        let mut destroyed = false;

        let status = self.event_loop.pump_events(Some(Duration::ZERO), |event, _elwt| {
            let Event::WindowEvent { event, window_id: id } = event else {
                return;
            };
            if id != window_id {
                return;
            }
            match event {
                WindowEvent::CloseRequested => events.push(DisplayEvent::CloseRequested),
                WindowEvent::Destroyed => destroyed = true,
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            repeat: false,
                            ..
                        },
                    ..
                } => events.push(DisplayEvent::KeyPressed(map_key(&logical_key))),
                WindowEvent::CursorMoved { position, .. } => {
                    *cursor = (position.x / scale, position.y / scale);
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    ..
                } => events.push(DisplayEvent::MouseDown {
                    x: cursor.0,
                    y: cursor.1,
                }),
                WindowEvent::Resized(size) => {
                    resized = Some(size);
                    events.push(DisplayEvent::Resized {
                        width: size.width,
                        height: size.height,
                    });
                }
                _ => {}
            }
        });

        if destroyed || matches!(status, PumpStatus::Exit(_)) {
            self.closed = true;
        }
        if let Some(size) = resized {
            self.gpu.resize(size.width, size.height);
        }
        events
    }

    fn present(&mut self, surface: &Surface) -> Result<(), DisplayError> {
        if self.closed {
            return Err(DisplayError::Closed);
        }
        if (surface.width(), surface.height()) != self.frame_size {
            return Err(DisplayError::Present(format!(
                "surface is {}x{}, window frame is {}x{}",
                surface.width(),
                surface.height(),
                self.frame_size.0,
                self.frame_size.1
            )));
        }
        self.gpu.present(surface)
    }
}

impl std::fmt::Debug for WindowDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowDisplay")
            .field("frame_size", &self.frame_size)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// Opens [`WindowDisplay`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowFactory;

impl DisplayFactory for WindowFactory {
    fn open(&self, spec: &DisplaySpec) -> Result<Box<dyn Display>, DisplayError> {
        Ok(Box::new(WindowDisplay::open(spec)?))
    }
}

#[cfg(target_os = "linux")]
fn build_event_loop() -> Result<EventLoop<()>, DisplayError> {
    use winit::platform::x11::EventLoopBuilderExtX11;

    let mut builder = EventLoopBuilder::new();
    builder.with_any_thread(true);
    builder.build().map_err(|e| DisplayError::Init(e.to_string()))
}

#[cfg(target_os = "windows")]
fn build_event_loop() -> Result<EventLoop<()>, DisplayError> {
    use winit::platform::windows::EventLoopBuilderExtWindows;

    let mut builder = EventLoopBuilder::new();
    builder.with_any_thread(true);
    builder.build().map_err(|e| DisplayError::Init(e.to_string()))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn build_event_loop() -> Result<EventLoop<()>, DisplayError> {
    Err(DisplayError::Init(
        "this platform cannot run a window event loop off the main thread".to_owned(),
    ))
}

fn map_key(key: &WinitKey) -> Key {
    match key {
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        WinitKey::Named(NamedKey::Space) => Key::Space,
        WinitKey::Named(NamedKey::Enter) => Key::Enter,
        WinitKey::Named(NamedKey::ArrowUp) => Key::Up,
        WinitKey::Named(NamedKey::ArrowDown) => Key::Down,
        WinitKey::Named(NamedKey::ArrowLeft) => Key::Left,
        WinitKey::Named(NamedKey::ArrowRight) => Key::Right,
        WinitKey::Character(text) => text.chars().next().map_or(Key::Other, Key::Char),
        _ => Key::Other,
    }
}

impl Gpu {
    fn new(window: Arc<Window>, width: u32, height: u32) -> Result<Self, DisplayError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| DisplayError::Init(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| DisplayError::Init("no GPU adapter found".to_owned()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("liveloop"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
            },
            None,
        ))
        .map_err(|e| DisplayError::Init(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        // Surface pixels are already display-encoded; avoid a second sRGB pass.
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| DisplayError::Init("surface reports no formats".to_owned()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("liveloop frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Bgra8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("liveloop nearest"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("liveloop blit layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("liveloop blit bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("liveloop blit shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("liveloop blit pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("liveloop blit pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            bind_group,
            texture,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    fn present(&mut self, frame: &Surface) -> Result<(), DisplayError> {
        self.queue.write_texture(
            self.texture.as_image_copy(),
            frame.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * frame.width()),
                rows_per_image: Some(frame.height()),
            },
            wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
        );

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Skip this frame; the next one draws into the new swapchain.
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(e) => return Err(DisplayError::Present(e.to_string())),
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("liveloop blit") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("liveloop blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
