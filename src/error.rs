//! Error types.
//!
//! Construction-time precondition violations and disposed-driver misuse are
//! surfaced as [`SimulationError`]; GPU device acquisition and buffer
//! readback failures as [`GpuError`]. Numeric degeneracies (zero-length
//! normalize, coincident particles) are not errors: the kernels recover them
//! locally to zero vectors.

use std::fmt;

/// Errors from driver construction and stepping.
#[derive(Debug)]
pub enum SimulationError {
    /// Particle count must be positive.
    InvalidCount,
    /// The inner attraction radius must be smaller than the outer one.
    InvalidRadii { radius1: f32, radius2: f32 },
    /// The velocity limit must be positive.
    InvalidMaxVelocity(f32),
    /// Time delta passed to `step` was negative.
    NegativeTimeDelta(f32),
    /// The driver was disposed; its buffers are gone.
    Disposed,
    /// GPU-side failure.
    Gpu(GpuError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidCount => write!(f, "Particle count must be positive"),
            SimulationError::InvalidRadii { radius1, radius2 } => write!(
                f,
                "attraction_radius1 ({}) must be smaller than attraction_radius2 ({})",
                radius1, radius2
            ),
            SimulationError::InvalidMaxVelocity(v) => {
                write!(f, "max_velocity must be positive, got {}", v)
            }
            SimulationError::NegativeTimeDelta(dt) => {
                write!(f, "Time delta must be non-negative, got {}", dt)
            }
            SimulationError::Disposed => {
                write!(f, "Simulation was disposed; create a new one to keep stepping")
            }
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

/// Errors from GPU setup and readback.
#[derive(Debug)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map a buffer for reading.
    BufferMapping(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter => write!(
                f,
                "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."
            ),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}
