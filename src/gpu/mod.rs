//! GPU driver: headless compute dispatch of the particle kernels.
//!
//! [`GpuContext`] acquires a device and queue without any surface; the crate
//! renders nothing. [`GpuSimulation`] owns one set of storage buffers,
//! builds its pipelines from the generated WGSL in [`crate::shader`], runs
//! the init pass to completion at construction, and enqueues the step
//! pass(es) per frame.
//!
//! Ordering: within one `step` submission, pass 1 is encoded before pass 2,
//! and WebGPU makes pass 1's storage writes visible to pass 2. Across
//! frames, queue order makes step N visible to step N+1. `step` only
//! enqueues; hosts may pipeline CPU work for the next frame while the GPU
//! drains, but must not call `step` on the same driver concurrently.
//!
//! Buffers are exclusively owned by one driver and are never aliased
//! between drivers sharing a context.

use std::sync::{mpsc, Arc};

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::error::{GpuError, SimulationError};
use crate::noise::NoiseField;
use crate::params::{NBodyParams, TurbulenceParams};
use crate::shader;

const WORKGROUP_SIZE: u32 = 256;

/// A wgpu device/queue pair with no surface attached.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Acquire an adapter and device.
    pub async fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("swirl device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        log::info!("gpu context ready: {}", adapter.get_info().name);
        Ok(Self { device, queue })
    }

    /// Blocking convenience wrapper around [`GpuContext::new`].
    pub fn create() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    /// The wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct TurbulenceUniforms {
    time_delta: f32,
    noise_time: f32,
    noise_coord_scale: f32,
    noise_intensity: f32,
    attraction_radius1: f32,
    attraction_radius2: f32,
    max_velocity: f32,
    _pad: f32,
}

impl TurbulenceUniforms {
    fn new(params: &TurbulenceParams, time_delta: f32, noise_time: f32) -> Self {
        Self {
            time_delta,
            noise_time,
            noise_coord_scale: params.noise_coord_scale,
            noise_intensity: params.noise_intensity,
            attraction_radius1: params.attraction_radius1,
            attraction_radius2: params.attraction_radius2,
            max_velocity: params.max_velocity,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct NBodyUniforms {
    center: [f32; 3],
    time_delta: f32,
    size0: f32,
    size: f32,
    max_velocity: f32,
    attraction_strength: f32,
    damping: f32,
    intensity_floor: f32,
    correction_factor: f32,
    impulse_floor: f32,
    squared_intensity: u32,
    _pad: [f32; 3],
}

impl NBodyUniforms {
    fn new(params: &NBodyParams, time_delta: f32) -> Self {
        Self {
            center: params.center.to_array(),
            time_delta,
            size0: params.size0,
            size: params.size,
            max_velocity: params.max_velocity,
            attraction_strength: params.attraction_strength,
            damping: params.damping,
            intensity_floor: params.intensity_floor,
            correction_factor: params.correction_factor,
            impulse_floor: params.impulse_floor,
            squared_intensity: params.squared_intensity as u32,
            _pad: [0.0; 3],
        }
    }
}

enum GpuPhysics {
    Turbulence {
        params: TurbulenceParams,
        noise_time: f32,
    },
    NBody {
        params: NBodyParams,
        elapsed: f32,
    },
}

/// A particle simulation with GPU-resident buffers.
pub struct GpuSimulation {
    context: Arc<GpuContext>,
    physics: GpuPhysics,
    count: u32,
    position_buffer: wgpu::Buffer,
    velocity_buffer: wgpu::Buffer,
    rotation_buffer: wgpu::Buffer,
    rotation_delta_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pass1_pipeline: wgpu::ComputePipeline,
    pass2_pipeline: Option<wgpu::ComputePipeline>,
    frame: u64,
    disposed: bool,
}

impl GpuSimulation {
    /// Build the turbulence + attraction variant on the GPU.
    pub fn turbulence(
        context: Arc<GpuContext>,
        params: TurbulenceParams,
        noise: &dyn NoiseField,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        let uniforms = TurbulenceUniforms::new(&params, 0.0, 0.0);
        Self::build(
            context,
            params.count,
            bytemuck::bytes_of(&uniforms),
            &shader::turbulence_init(),
            &shader::turbulence_step(&noise.wgsl()),
            None,
            GpuPhysics::Turbulence {
                params,
                noise_time: 0.0,
            },
        )
    }

    /// Build the N-body collision variant on the GPU.
    pub fn nbody(context: Arc<GpuContext>, params: NBodyParams) -> Result<Self, SimulationError> {
        params.validate()?;
        let uniforms = NBodyUniforms::new(&params, 0.0);
        Self::build(
            context,
            params.count,
            bytemuck::bytes_of(&uniforms),
            &shader::nbody_init(),
            &shader::nbody_attract(),
            Some(&shader::nbody_collide()),
            GpuPhysics::NBody {
                params,
                elapsed: 0.0,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        context: Arc<GpuContext>,
        count: u32,
        uniform_bytes: &[u8],
        init_src: &str,
        pass1_src: &str,
        pass2_src: Option<&str>,
        physics: GpuPhysics,
    ) -> Result<Self, SimulationError> {
        let device = &context.device;

        let storage_usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::VERTEX
            | wgpu::BufferUsages::COPY_SRC;
        let vec4_size = count as u64 * 16;
        let vec3_size = count as u64 * 12;

        let make_storage = |label: &str, size: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: storage_usage,
                mapped_at_creation: false,
            })
        };

        let position_buffer = make_storage("Position Buffer", vec4_size);
        let velocity_buffer = make_storage("Velocity Buffer", vec4_size);
        let rotation_buffer = make_storage("Rotation Buffer", vec3_size);
        let rotation_delta_buffer = make_storage("Rotation Delta Buffer", vec3_size);
        let color_buffer = make_storage("Color Buffer", vec3_size);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: uniform_bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let storage_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Bind Group Layout"),
            entries: &[
                storage_entry(0),
                storage_entry(1),
                storage_entry(2),
                storage_entry(3),
                storage_entry(4),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: position_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: velocity_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: rotation_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: rotation_delta_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: color_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, src: &str| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(src.into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let init_pipeline = make_pipeline("Init Pipeline", init_src);
        let pass1_pipeline = make_pipeline("Pass 1 Pipeline", pass1_src);
        let pass2_pipeline = pass2_src.map(|src| make_pipeline("Pass 2 Pipeline", src));

        // Run the initializer to completion before the first step; frame 0
        // must not race it.
        let workgroups = count.div_ceil(WORKGROUP_SIZE);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Init Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Init Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&init_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        context.queue.submit(std::iter::once(encoder.finish()));
        device.poll(wgpu::Maintain::Wait);

        log::info!("gpu simulation initialized: {} instances", count);

        Ok(Self {
            context,
            physics,
            count,
            position_buffer,
            velocity_buffer,
            rotation_buffer,
            rotation_delta_buffer,
            color_buffer,
            uniform_buffer,
            bind_group,
            pass1_pipeline,
            pass2_pipeline,
            frame: 0,
            disposed: false,
        })
    }

    /// Advance the simulation by `time_delta` seconds. Enqueues GPU work and
    /// returns once it is submitted, not completed.
    pub fn step(&mut self, time_delta: f32) -> Result<(), SimulationError> {
        if self.disposed {
            return Err(SimulationError::Disposed);
        }
        if time_delta < 0.0 {
            return Err(SimulationError::NegativeTimeDelta(time_delta));
        }

        match &mut self.physics {
            GpuPhysics::Turbulence { params, noise_time } => {
                *noise_time += time_delta * params.noise_time_coefficient;
                let uniforms = TurbulenceUniforms::new(params, time_delta, *noise_time);
                self.context
                    .queue
                    .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            }
            GpuPhysics::NBody { params, elapsed } => {
                *elapsed += time_delta;
                let uniforms = NBodyUniforms::new(params, time_delta);
                self.context
                    .queue
                    .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            }
        }

        let workgroups = self.count.div_ceil(WORKGROUP_SIZE);
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Step Encoder"),
                });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Pass 1"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pass1_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        if let Some(pass2) = &self.pass2_pipeline {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Pass 2"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pass2);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));

        self.frame += 1;
        log::trace!("gpu step {} enqueued", self.frame);
        Ok(())
    }

    /// Move the N-body attraction point.
    pub fn set_center(&mut self, center: Vec3) {
        if let GpuPhysics::NBody { params, .. } = &mut self.physics {
            params.center = center;
        }
    }

    /// Turbulence parameters, if this is the turbulence variant. Changes
    /// take effect at the next `step`.
    pub fn turbulence_params_mut(&mut self) -> Option<&mut TurbulenceParams> {
        match &mut self.physics {
            GpuPhysics::Turbulence { params, .. } => Some(params),
            GpuPhysics::NBody { .. } => None,
        }
    }

    /// N-body parameters, if this is the N-body variant. Changes take effect
    /// at the next `step`.
    pub fn nbody_params_mut(&mut self) -> Option<&mut NBodyParams> {
        match &mut self.physics {
            GpuPhysics::NBody { params, .. } => Some(params),
            GpuPhysics::Turbulence { .. } => None,
        }
    }

    /// Number of instances.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Position buffer, usable as an instanced vertex source (vec4 stride).
    pub fn position_buffer(&self) -> &wgpu::Buffer {
        &self.position_buffer
    }

    /// Velocity buffer (vec4 stride).
    pub fn velocity_buffer(&self) -> &wgpu::Buffer {
        &self.velocity_buffer
    }

    /// Rotation buffer (tightly packed vec3 stride).
    pub fn rotation_buffer(&self) -> &wgpu::Buffer {
        &self.rotation_buffer
    }

    /// Rotation-delta buffer (tightly packed vec3 stride).
    pub fn rotation_delta_buffer(&self) -> &wgpu::Buffer {
        &self.rotation_delta_buffer
    }

    /// Color buffer (tightly packed vec3 stride).
    pub fn color_buffer(&self) -> &wgpu::Buffer {
        &self.color_buffer
    }

    /// Read positions back to the CPU. Blocks until in-flight GPU work
    /// completes.
    pub fn read_positions(&self) -> Result<Vec<Vec4>, SimulationError> {
        let bytes = self.read_bytes(&self.position_buffer, self.count as u64 * 16)?;
        let floats = bytes_to_f32(&bytes);
        Ok(floats
            .chunks_exact(4)
            .map(|c| Vec4::new(c[0], c[1], c[2], c[3]))
            .collect())
    }

    /// Read velocities back to the CPU.
    pub fn read_velocities(&self) -> Result<Vec<Vec4>, SimulationError> {
        let bytes = self.read_bytes(&self.velocity_buffer, self.count as u64 * 16)?;
        let floats = bytes_to_f32(&bytes);
        Ok(floats
            .chunks_exact(4)
            .map(|c| Vec4::new(c[0], c[1], c[2], c[3]))
            .collect())
    }

    /// Read rotations back to the CPU.
    pub fn read_rotations(&self) -> Result<Vec<Vec3>, SimulationError> {
        let bytes = self.read_bytes(&self.rotation_buffer, self.count as u64 * 12)?;
        let floats = bytes_to_f32(&bytes);
        Ok(floats
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect())
    }

    /// Read colors back to the CPU.
    pub fn read_colors(&self) -> Result<Vec<Vec3>, SimulationError> {
        let bytes = self.read_bytes(&self.color_buffer, self.count as u64 * 12)?;
        let floats = bytes_to_f32(&bytes);
        Ok(floats
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect())
    }

    fn read_bytes(&self, src: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, SimulationError> {
        if self.disposed {
            return Err(SimulationError::Disposed);
        }
        let device = &self.context.device;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GpuError::BufferMapping(e.to_string()).into()),
            Err(_) => {
                return Err(GpuError::BufferMapping("map callback dropped".into()).into());
            }
        }

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(data)
    }

    /// Destroy the GPU buffers. Subsequent `step` calls error; calling this
    /// again is a no-op. Other simulations sharing the context are
    /// unaffected.
    pub fn dispose(&mut self) {
        if !self.disposed {
            log::debug!("disposing gpu simulation after {} frames", self.frame);
            self.position_buffer.destroy();
            self.velocity_buffer.destroy();
            self.rotation_buffer.destroy();
            self.rotation_delta_buffer.destroy();
            self.color_buffer.destroy();
            self.uniform_buffer.destroy();
            self.disposed = true;
        }
    }

    /// Whether the driver was disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for GpuSimulation {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Decode little-endian f32 data from a readback buffer. The staging bytes
/// come back with byte alignment, so a bytemuck cast is not safe here.
fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
