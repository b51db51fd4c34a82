//! Per-instance physics kernels.
//!
//! Each kernel is a pure function of one instance's state plus uniforms, so
//! the drivers can apply them in any order (or in parallel) without changing
//! the result. The one exception is [`nbody_collide`], which by design reads
//! and writes the whole buffers: on the GPU every invocation walks all other
//! instances and corrections race benignly (small, symmetric in expectation,
//! last-write-wins); the CPU driver runs the same double loop sequentially,
//! which is one admissible schedule of that relaxed model.
//!
//! Degenerate directions (coincident particles, a particle exactly at the
//! origin) normalize to zero instead of NaN. `glam`'s `normalize_or_zero`
//! and `clamp_length_max` carry those guards.

use crate::noise::NoiseField;
use crate::params::{NBodyParams, TurbulenceParams};
use glam::{Vec3, Vec4};

/// Hermite smoothstep between two edges.
#[inline]
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// One turbulence-variant step for a single instance.
///
/// Noise gradient forcing scaled by the particle's displacement-intensity
/// payload, smoothstep-banded pull toward the origin, componentwise velocity
/// clamp, then position and rotation integration. No inter-instance reads.
#[inline]
pub(crate) fn step_turbulence(
    position: &mut Vec4,
    velocity: &mut Vec4,
    rotation: &mut Vec3,
    rotation_delta: Vec3,
    params: &TurbulenceParams,
    noise: &dyn NoiseField,
    noise_time: f32,
    time_delta: f32,
) {
    let sample = noise.sample(
        position.truncate() * params.noise_coord_scale,
        Vec3::ZERO,
        noise_time,
    );
    let mut v = velocity.truncate() + sample.gradient * (params.noise_intensity * position.w);

    let dv = -position.truncate();
    let coef = smoothstep(
        params.attraction_radius1,
        params.attraction_radius2,
        dv.length(),
    );
    v += dv.normalize_or_zero() * (coef * 0.25);

    v = v.clamp(
        Vec3::splat(-params.max_velocity),
        Vec3::splat(params.max_velocity),
    );

    *velocity = v.extend(velocity.w);
    *position = (position.truncate() + v).extend(position.w);
    *rotation += rotation_delta * time_delta;
}

/// N-body pass 1 for a single instance: attraction toward `center`, damping,
/// length clamp, position integration. The anchor (index 0) is re-pinned to
/// `center` with its payload reset and its velocity untouched.
#[inline]
pub(crate) fn nbody_attract(
    index: usize,
    position: &mut Vec4,
    velocity: &mut Vec4,
    params: &NBodyParams,
) {
    if index == 0 {
        *position = params.center.extend(params.size0);
        return;
    }
    let dv = params.center - position.truncate();
    let scaled = position.w * params.size;
    let curve = if params.squared_intensity {
        scaled * scaled
    } else {
        scaled
    };
    let intensity = curve.max(params.intensity_floor);

    let mut v =
        velocity.truncate() + dv.normalize_or_zero() * (params.attraction_strength * intensity);
    v *= params.damping;
    v = v.clamp_length_max(params.max_velocity);

    *velocity = v.extend(velocity.w);
    *position = (position.truncate() + v).extend(position.w);
}

/// N-body pass 2: pairwise overlap resolution over all ordered pairs.
///
/// Every instance walks every other instance, mirroring the GPU kernel.
/// Overlapping pairs receive a positional correction proportional to the
/// penetration depth and an antisymmetric velocity impulse scaled by each
/// side's own speed. A particle overlapping a dormant body (velocity
/// payload < 1) takes double positional correction, since the other side
/// will not move; the anchor itself never receives corrections. A final
/// sweep restores the velocity length bound.
pub(crate) fn nbody_collide(position: &mut [Vec4], velocity: &mut [Vec4], params: &NBodyParams) {
    let n = position.len();
    for i in 0..n {
        for j in 0..n {
            if j == i {
                continue;
            }
            let dv = position[j].truncate() - position[i].truncate();
            let distance = dv.length();
            let min_distance = (position[i].w + position[j].w) * params.size;
            if distance >= min_distance {
                continue;
            }
            let correction =
                dv.normalize_or_zero() * ((min_distance - distance) * params.correction_factor);
            let impulse_i = correction * velocity[i].truncate().length().max(params.impulse_floor);
            let impulse_j = correction * velocity[j].truncate().length().max(params.impulse_floor);

            if i > 0 {
                let factor = if velocity[j].w < 1.0 { 2.0 } else { 1.0 };
                let p = position[i].truncate() - correction * factor;
                position[i] = p.extend(position[i].w);
                let v = velocity[i].truncate() - impulse_i;
                velocity[i] = v.extend(velocity[i].w);
            }
            if j > 0 {
                let factor = if velocity[i].w < 1.0 { 2.0 } else { 1.0 };
                let p = position[j].truncate() + correction * factor;
                position[j] = p.extend(position[j].w);
                let v = velocity[j].truncate() + impulse_j;
                velocity[j] = v.extend(velocity[j].w);
            }
        }
    }

    for v in velocity.iter_mut() {
        let clamped = v.truncate().clamp_length_max(params.max_velocity);
        *v = clamped.extend(v.w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::HarmonicField;

    fn turbulence_params() -> TurbulenceParams {
        TurbulenceParams {
            count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(1.0, 2.0, 0.5), 0.0);
        assert_eq!(smoothstep(1.0, 2.0, 2.5), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        assert!(smoothstep(0.0, 1.0, 0.25) < 0.25);
        assert!(smoothstep(0.0, 1.0, 0.75) > 0.75);
    }

    #[test]
    fn test_turbulence_velocity_componentwise_bound() {
        let params = turbulence_params();
        let noise = HarmonicField::default();
        let mut position = Vec4::new(10.0, -5.0, 3.0, 1.0);
        let mut velocity = Vec4::new(0.0, 0.0, 0.0, 0.5);
        let mut rotation = Vec3::ZERO;
        for _ in 0..200 {
            step_turbulence(
                &mut position,
                &mut velocity,
                &mut rotation,
                Vec3::splat(0.3),
                &params,
                &noise,
                1.0,
                1.0 / 60.0,
            );
            for c in [velocity.x, velocity.y, velocity.z] {
                assert!(c.abs() <= params.max_velocity + 1e-6);
            }
        }
    }

    #[test]
    fn test_turbulence_origin_particle_no_nan() {
        // normalize(-position) is degenerate at the origin.
        let params = turbulence_params();
        let noise = HarmonicField::default();
        let mut position = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let mut velocity = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let mut rotation = Vec3::ZERO;
        step_turbulence(
            &mut position,
            &mut velocity,
            &mut rotation,
            Vec3::splat(0.3),
            &params,
            &noise,
            0.0,
            1.0 / 60.0,
        );
        assert!(position.is_finite());
        assert!(velocity.is_finite());
    }

    #[test]
    fn test_turbulence_rotation_integration() {
        let params = turbulence_params();
        let noise = HarmonicField::default();
        let mut position = Vec4::new(1.0, 0.0, 0.0, 0.0);
        let mut velocity = Vec4::ZERO;
        let mut rotation = Vec3::ZERO;
        step_turbulence(
            &mut position,
            &mut velocity,
            &mut rotation,
            Vec3::new(0.5, 1.0, 2.0),
            &params,
            &noise,
            0.0,
            0.1,
        );
        assert!((rotation - Vec3::new(0.05, 0.1, 0.2)).length() < 1e-6);
    }

    #[test]
    fn test_nbody_attract_pins_anchor() {
        let params = NBodyParams {
            center: Vec3::new(3.0, -1.0, 2.0),
            size0: 1.25,
            ..Default::default()
        };
        let mut position = Vec4::new(9.0, 9.0, 9.0, 0.5);
        let mut velocity = Vec4::new(0.1, 0.2, 0.3, 0.0);
        nbody_attract(0, &mut position, &mut velocity, &params);
        assert_eq!(position, Vec4::new(3.0, -1.0, 2.0, 1.25));
        // Anchor velocity is left alone.
        assert_eq!(velocity, Vec4::new(0.1, 0.2, 0.3, 0.0));
    }

    #[test]
    fn test_nbody_attract_moves_toward_center() {
        let params = NBodyParams::default();
        let mut position = Vec4::new(4.0, 0.0, 0.0, 0.05);
        let mut velocity = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let before = position.truncate().distance(params.center);
        nbody_attract(1, &mut position, &mut velocity, &params);
        let after = position.truncate().distance(params.center);
        assert!(after < before);
        assert!(velocity.truncate().length() <= params.max_velocity + 1e-6);
    }

    #[test]
    fn test_collision_separates_overlap() {
        // The worked example: anchor at origin with radius 0.1, a movable
        // particle overlapping it at x = 0.05.
        let params = NBodyParams {
            count: 2,
            size0: 0.1,
            ..Default::default()
        };
        let mut position = vec![
            Vec4::new(0.0, 0.0, 0.0, 0.1),
            Vec4::new(0.05, 0.0, 0.0, 0.1),
        ];
        let mut velocity = vec![Vec4::new(0.0, 0.0, 0.0, 0.0), Vec4::new(0.0, 0.0, 0.0, 1.0)];
        nbody_collide(&mut position, &mut velocity, &params);

        let separation = (position[1].truncate() - position[0].truncate()).length();
        assert!(separation > 0.05, "separation {}", separation);
        // Anchor did not move.
        assert_eq!(position[0].truncate(), Vec3::ZERO);
        for p in &position {
            assert!(p.is_finite());
        }
        for v in &velocity {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_collision_coincident_particles_no_nan() {
        let params = NBodyParams {
            count: 2,
            ..Default::default()
        };
        let mut position = vec![Vec4::new(1.0, 1.0, 1.0, 0.05), Vec4::new(1.0, 1.0, 1.0, 0.05)];
        let mut velocity = vec![Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 0.0, 1.0)];
        nbody_collide(&mut position, &mut velocity, &params);
        for p in &position {
            assert!(p.is_finite());
        }
        for v in &velocity {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_collision_separation_trends_to_min_distance() {
        let params = NBodyParams {
            count: 2,
            ..Default::default()
        };
        let min_distance = (0.06 + 0.06) * params.size;
        let mut position = vec![
            Vec4::new(5.0, 0.0, 0.0, 0.06),
            Vec4::new(5.01, 0.0, 0.0, 0.06),
        ];
        let mut velocity = vec![Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 0.0, 1.0)];

        let mut last = (position[1].truncate() - position[0].truncate()).length();
        for _ in 0..32 {
            nbody_collide(&mut position, &mut velocity, &params);
            let separation = (position[1].truncate() - position[0].truncate()).length();
            assert!(separation >= last - 1e-6, "{} < {}", separation, last);
            last = separation;
        }
        assert!(last >= min_distance - 1e-3, "final separation {}", last);
    }

    #[test]
    fn test_collision_velocity_bound_restored() {
        let params = NBodyParams {
            count: 3,
            ..Default::default()
        };
        let mut position = vec![
            Vec4::new(0.0, 0.0, 0.0, 0.1),
            Vec4::new(0.02, 0.0, 0.0, 0.1),
            Vec4::new(-0.02, 0.0, 0.0, 0.1),
        ];
        let mut velocity = vec![
            Vec4::new(0.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 0.0, 1.0),
        ];
        nbody_collide(&mut position, &mut velocity, &params);
        for v in &velocity {
            assert!(v.truncate().length() <= params.max_velocity + 1e-6);
        }
    }
}
