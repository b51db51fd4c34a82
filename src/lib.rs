//! # Swirl
//!
//! Instanced particle simulations on compute kernels: hundreds of thousands
//! of particles seeded deterministically, stepped each frame by field-based
//! physics, and exposed as per-instance attribute buffers for whatever
//! renderer you attach.
//!
//! Swirl is the simulation core only. It owns the buffers, the initializer
//! and the update kernels; meshes, materials and cameras live on your side
//! of the buffer boundary.
//!
//! ## Quick Start
//!
//! ```no_run
//! use swirl::{Simulation, Time, TurbulenceParams};
//!
//! let mut sim = Simulation::turbulence(TurbulenceParams {
//!     count: 100_000,
//!     ..Default::default()
//! })?;
//!
//! let mut time = Time::new();
//! for _frame in 0..600 {
//!     time.update();
//!     sim.update(&time)?;
//!     // upload sim.positions() / sim.rotations() / sim.colors()
//!     // as instanced vertex attributes
//! }
//! # Ok::<(), swirl::SimulationError>(())
//! ```
//!
//! ## Physics Variants
//!
//! - **Turbulence** ([`TurbulenceParams`]): a noise field perturbs each
//!   particle's velocity in proportion to its displacement-intensity
//!   payload, while a smoothstep band between two radii pulls strays back
//!   toward the origin. Fully parallel, no inter-instance reads; counts in
//!   the hundreds of thousands are the normal regime.
//! - **N-body** ([`NBodyParams`]): every particle is attracted toward a
//!   moving center occupied by an immovable anchor (instance 0), and
//!   overlapping pairs are pushed apart by an O(n²) collision pass. The
//!   pairwise pass bounds scalability; counts in the low thousands are the
//!   normal regime.
//!
//! ## Payload Lanes
//!
//! Buffers pack an auxiliary scalar into the `w` lane: `position.w` is the
//! displacement intensity (turbulence) or collision radius (N-body);
//! `velocity.w` is the render scale (turbulence) or the movable flag
//! (N-body, 0 marks the anchor). Payloads are written at initialization and
//! left alone by the steppers, except the anchor's radius which is re-pinned
//! each step.
//!
//! ## Determinism
//!
//! Initialization derives every value from the instance index through a
//! stateless hash ([`hash`]); the same parameters always produce the same
//! buffers, on any thread count, and the CPU and GPU initializers agree.
//!
//! ## Drivers
//!
//! [`Simulation`] keeps buffers in host memory and steps them with rayon;
//! it is the reference implementation and what the tests exercise.
//! [`gpu::GpuSimulation`] runs the same kernels as generated WGSL
//! ([`shader`]) on a headless wgpu device and exposes its storage buffers
//! for instanced rendering.

pub mod error;
pub mod gpu;
pub mod hash;
mod init;
mod kernels;
pub mod noise;
pub mod params;
pub mod shader;
mod simulation;
mod state;
pub mod time;

pub use bytemuck;
pub use error::{GpuError, SimulationError};
pub use glam::{Vec2, Vec3, Vec4};
pub use noise::{HarmonicField, NoiseField, NoiseSample};
pub use params::{MaterialParams, MaterialValue, NBodyParams, TurbulenceParams};
pub use simulation::Simulation;
pub use state::ParticleState;
pub use time::Time;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use swirl::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{GpuError, SimulationError};
    pub use crate::gpu::{GpuContext, GpuSimulation};
    pub use crate::noise::{HarmonicField, NoiseField, NoiseSample};
    pub use crate::params::{MaterialParams, MaterialValue, NBodyParams, TurbulenceParams};
    pub use crate::simulation::Simulation;
    pub use crate::state::ParticleState;
    pub use crate::time::Time;
    pub use crate::{Vec2, Vec3, Vec4};
}
