//! Simulation driver for the CPU backend.
//!
//! Owns the particle buffers and the live-adjustable uniforms, runs the
//! initializer to completion at construction, and advances the physics one
//! time delta per [`Simulation::step`]. The race-free passes run data-
//! parallel over instances with rayon; the pairwise collision pass runs
//! sequentially (see [`crate::kernels`] for the consistency model).
//!
//! Driver lifecycle is `Initialized -> {Stepping}* -> Disposed`. Stepping a
//! disposed driver is a precondition violation and returns an error; calling
//! `dispose` twice is fine.

use crate::error::SimulationError;
use crate::init;
use crate::kernels;
use crate::noise::{HarmonicField, NoiseField};
use crate::params::{MaterialParams, NBodyParams, TurbulenceParams};
use crate::state::ParticleState;
use crate::time::Time;
use glam::{Vec3, Vec4};
use rayon::prelude::*;

enum Physics {
    Turbulence {
        params: TurbulenceParams,
        noise: Box<dyn NoiseField>,
        noise_time: f32,
    },
    NBody {
        params: NBodyParams,
        elapsed: f32,
    },
}

/// A particle simulation with CPU-resident buffers.
///
/// ```no_run
/// use swirl::{Simulation, TurbulenceParams};
///
/// let mut sim = Simulation::turbulence(TurbulenceParams {
///     count: 10_000,
///     ..Default::default()
/// })?;
/// sim.step(1.0 / 60.0)?;
/// let positions = sim.positions(); // attach as instanced vertex data
/// # Ok::<(), swirl::SimulationError>(())
/// ```
pub struct Simulation {
    state: ParticleState,
    physics: Physics,
    frame: u64,
    disposed: bool,
}

impl Simulation {
    /// Build the turbulence + attraction variant with the default noise
    /// field.
    pub fn turbulence(params: TurbulenceParams) -> Result<Self, SimulationError> {
        Self::turbulence_with_noise(params, Box::new(HarmonicField::default()))
    }

    /// Build the turbulence + attraction variant with a caller-supplied
    /// noise field.
    pub fn turbulence_with_noise(
        params: TurbulenceParams,
        noise: Box<dyn NoiseField>,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        log::info!(
            "creating turbulence simulation: {} instances, radii {}..{}",
            params.count,
            params.attraction_radius1,
            params.attraction_radius2
        );
        let mut state = ParticleState::new(params.count);
        init::init_turbulence(&mut state, &params);
        Ok(Self {
            state,
            physics: Physics::Turbulence {
                params,
                noise,
                noise_time: 0.0,
            },
            frame: 0,
            disposed: false,
        })
    }

    /// Build the N-body collision variant.
    pub fn nbody(params: NBodyParams) -> Result<Self, SimulationError> {
        params.validate()?;
        log::info!("creating n-body simulation: {} instances", params.count);
        let mut state = ParticleState::new(params.count);
        init::init_nbody(&mut state, &params);
        Ok(Self {
            state,
            physics: Physics::NBody {
                params,
                elapsed: 0.0,
            },
            frame: 0,
            disposed: false,
        })
    }

    /// Advance the simulation by `time_delta` seconds.
    pub fn step(&mut self, time_delta: f32) -> Result<(), SimulationError> {
        if self.disposed {
            return Err(SimulationError::Disposed);
        }
        if time_delta < 0.0 {
            return Err(SimulationError::NegativeTimeDelta(time_delta));
        }

        match &mut self.physics {
            Physics::Turbulence {
                params,
                noise,
                noise_time,
            } => {
                *noise_time += time_delta * params.noise_time_coefficient;
                let noise_time = *noise_time;
                let noise = noise.as_ref();
                let params = &*params;
                self.state
                    .position
                    .par_iter_mut()
                    .zip(self.state.velocity.par_iter_mut())
                    .zip(self.state.rotation.par_iter_mut())
                    .zip(self.state.rotation_delta.par_iter())
                    .for_each(|(((position, velocity), rotation), rotation_delta)| {
                        kernels::step_turbulence(
                            position,
                            velocity,
                            rotation,
                            *rotation_delta,
                            params,
                            noise,
                            noise_time,
                            time_delta,
                        );
                    });
            }
            Physics::NBody { params, elapsed } => {
                *elapsed += time_delta;
                let params = &*params;
                // Pass 1 before pass 2: the collision pass reads integrated
                // positions.
                self.state
                    .position
                    .par_iter_mut()
                    .zip(self.state.velocity.par_iter_mut())
                    .enumerate()
                    .for_each(|(i, (position, velocity))| {
                        kernels::nbody_attract(i, position, velocity, params);
                    });
                kernels::nbody_collide(&mut self.state.position, &mut self.state.velocity, params);
            }
        }

        self.frame += 1;
        Ok(())
    }

    /// Advance using a [`Time`] tracker's current delta. Does nothing while
    /// the tracker is paused.
    pub fn update(&mut self, time: &Time) -> Result<(), SimulationError> {
        if time.is_paused() {
            return Ok(());
        }
        self.step(time.delta())
    }

    /// Move the N-body attraction point. No effect on the turbulence
    /// variant, which always attracts toward the origin.
    pub fn set_center(&mut self, center: Vec3) {
        if let Physics::NBody { params, .. } = &mut self.physics {
            params.center = center;
        }
    }

    /// Turbulence parameters, if this is the turbulence variant. All
    /// scalars take effect at the next `step`; `count` is fixed at
    /// construction.
    pub fn turbulence_params_mut(&mut self) -> Option<&mut TurbulenceParams> {
        match &mut self.physics {
            Physics::Turbulence { params, .. } => Some(params),
            Physics::NBody { .. } => None,
        }
    }

    /// N-body parameters, if this is the N-body variant. All scalars take
    /// effect at the next `step`; `count` is fixed at construction.
    pub fn nbody_params_mut(&mut self) -> Option<&mut NBodyParams> {
        match &mut self.physics {
            Physics::NBody { params, .. } => Some(params),
            Physics::Turbulence { .. } => None,
        }
    }

    /// Material passthrough values for the renderer.
    pub fn material(&self) -> &MaterialParams {
        match &self.physics {
            Physics::Turbulence { params, .. } => &params.material,
            Physics::NBody { params, .. } => &params.material,
        }
    }

    /// Mutable material passthrough values.
    pub fn material_mut(&mut self) -> &mut MaterialParams {
        match &mut self.physics {
            Physics::Turbulence { params, .. } => &mut params.material,
            Physics::NBody { params, .. } => &mut params.material,
        }
    }

    /// Number of instances.
    pub fn count(&self) -> u32 {
        self.state.count()
    }

    /// Frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The particle buffers, read-only.
    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    /// Positions, `xyz` + payload.
    pub fn positions(&self) -> &[Vec4] {
        self.state.positions()
    }

    /// Velocities, `xyz` + payload.
    pub fn velocities(&self) -> &[Vec4] {
        self.state.velocities()
    }

    /// Rotation accumulators.
    pub fn rotations(&self) -> &[Vec3] {
        self.state.rotations()
    }

    /// Static colors.
    pub fn colors(&self) -> &[Vec3] {
        self.state.colors()
    }

    /// Release the buffers. Subsequent `step` calls error; calling this
    /// again is a no-op.
    pub fn dispose(&mut self) {
        if !self.disposed {
            log::debug!("disposing simulation after {} frames", self.frame);
            self.state.release();
            self.disposed = true;
        }
    }

    /// Whether the driver was disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_after_dispose_errors() {
        let mut sim = Simulation::nbody(NBodyParams {
            count: 8,
            ..Default::default()
        })
        .unwrap();
        sim.dispose();
        sim.dispose(); // idempotent
        assert!(sim.is_disposed());
        assert!(matches!(
            sim.step(1.0 / 60.0),
            Err(SimulationError::Disposed)
        ));
    }

    #[test]
    fn test_negative_delta_rejected() {
        let mut sim = Simulation::turbulence(TurbulenceParams {
            count: 8,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            sim.step(-0.1),
            Err(SimulationError::NegativeTimeDelta(_))
        ));
    }

    #[test]
    fn test_invalid_params_rejected_at_construction() {
        assert!(Simulation::turbulence(TurbulenceParams {
            count: 0,
            ..Default::default()
        })
        .is_err());
        assert!(Simulation::nbody(NBodyParams {
            count: 100,
            max_velocity: -1.0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_turbulence_velocity_bound_after_steps() {
        let params = TurbulenceParams {
            count: 500,
            ..Default::default()
        };
        let max = params.max_velocity;
        let mut sim = Simulation::turbulence(params).unwrap();
        for _ in 0..50 {
            sim.step(1.0 / 60.0).unwrap();
        }
        for v in sim.velocities() {
            for c in [v.x, v.y, v.z] {
                assert!(c.abs() <= max + 1e-6);
            }
        }
    }

    #[test]
    fn test_nbody_anchor_tracks_center() {
        let mut sim = Simulation::nbody(NBodyParams {
            count: 50,
            ..Default::default()
        })
        .unwrap();
        for i in 0..20 {
            let center = Vec3::new(i as f32 * 0.1, 0.0, i as f32 * -0.05);
            sim.set_center(center);
            sim.step(1.0 / 60.0).unwrap();
            assert_eq!(sim.positions()[0].truncate(), center);
            assert_eq!(sim.velocities()[0].w, 0.0);
        }
    }

    #[test]
    fn test_nbody_no_nan_after_steps() {
        let mut sim = Simulation::nbody(NBodyParams {
            count: 80,
            ..Default::default()
        })
        .unwrap();
        for _ in 0..30 {
            sim.step(1.0 / 60.0).unwrap();
        }
        for p in sim.positions() {
            assert!(p.is_finite());
        }
        for v in sim.velocities() {
            assert!(v.is_finite());
            assert!(v.truncate().length() <= 0.03 + 1e-4);
        }
    }

    #[test]
    fn test_turbulence_positions_stay_bounded() {
        // Smaller stand-in for the full-scale run below.
        let params = TurbulenceParams {
            count: 2000,
            ..Default::default()
        };
        let bound = params.attraction_radius2 * 2.0;
        let mut sim = Simulation::turbulence(params).unwrap();
        for _ in 0..200 {
            sim.step(1.0 / 60.0).unwrap();
        }
        let outliers = sim
            .positions()
            .iter()
            .filter(|p| p.truncate().length() > bound)
            .count();
        assert_eq!(outliers, 0);
        for p in sim.positions() {
            assert!(p.is_finite());
        }
    }

    #[test]
    #[ignore = "full-scale soak, run explicitly"]
    fn test_turbulence_scale_soak() {
        let params = TurbulenceParams {
            count: 100_000,
            ..Default::default()
        };
        let bound = params.attraction_radius2 * 2.0;
        let mut sim = Simulation::turbulence(params).unwrap();
        for _ in 0..1000 {
            sim.step(1.0 / 60.0).unwrap();
        }
        let outliers = sim
            .positions()
            .iter()
            .filter(|p| p.truncate().length() > bound)
            .count();
        // Statistical bound: the attraction band pulls strays back, allow a
        // vanishing fraction in transit.
        assert!(outliers < 10, "{} outliers", outliers);
    }

    #[test]
    fn test_update_uses_time_delta() {
        let mut time = Time::new();
        time.set_fixed_delta(Some(1.0 / 120.0));
        time.update();
        let mut sim = Simulation::nbody(NBodyParams {
            count: 10,
            ..Default::default()
        })
        .unwrap();
        sim.update(&time).unwrap();
        assert_eq!(sim.frame(), 1);
    }

    #[test]
    fn test_update_skips_while_paused() {
        let mut time = Time::new();
        time.update();
        time.pause();
        time.update();
        let mut sim = Simulation::nbody(NBodyParams {
            count: 10,
            ..Default::default()
        })
        .unwrap();
        sim.update(&time).unwrap();
        assert_eq!(sim.frame(), 0);
    }

    #[test]
    fn test_material_live_adjustable() {
        let mut sim = Simulation::turbulence(TurbulenceParams {
            count: 4,
            ..Default::default()
        })
        .unwrap();
        sim.material_mut().set("metalness", 0.75f32);
        assert_eq!(sim.material().len(), 1);
        let p = sim.turbulence_params_mut().unwrap();
        p.noise_intensity = 0.01;
        assert!(sim.nbody_params_mut().is_none());
    }
}
