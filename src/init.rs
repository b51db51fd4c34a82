//! Deterministic particle initialization.
//!
//! Every buffer entry is a pure function of the instance index: the seeding
//! hash is [`crate::hash::hash01`] applied to the index plus small fixed
//! offsets. Re-running initialization with the same parameters reproduces
//! the buffers bit for bit, in any execution order.
//!
//! The offset sequence skips `i + 1`; the first three scalars double as the
//! color basis, which ties each particle's color to its spawn direction.

use crate::hash::hash01;
use crate::params::{NBodyParams, TurbulenceParams};
use crate::state::ParticleState;
use glam::{Vec3, Vec4};
use rayon::prelude::*;
use std::f32::consts::TAU;

/// Random unit direction for instance `i`, zero if the hashed vector is
/// degenerate.
#[inline]
fn seed_direction(i: u32) -> Vec3 {
    let v = Vec3::new(hash01(i), hash01(i + 2), hash01(i + 3)) - 0.5;
    v.normalize_or_zero()
}

/// Random Euler angles in [-pi, pi] for instance `i`.
#[inline]
fn seed_rotation(i: u32) -> Vec3 {
    (Vec3::new(hash01(i + 6), hash01(i + 7), hash01(i + 8)) - 0.5) * TAU
}

/// Random positive angular velocity coefficients for instance `i`.
#[inline]
fn seed_rotation_delta(i: u32) -> Vec3 {
    Vec3::new(hash01(i + 9), hash01(i + 10), hash01(i + 11)) * 0.5 + 0.25
}

/// Seed all buffers for the turbulence variant.
///
/// Positions fill a ball of radius `attraction_radius1`; the position
/// payload is the particle's displacement intensity, the velocity payload
/// its render scale. Both payloads are write-once.
pub(crate) fn init_turbulence(state: &mut ParticleState, params: &TurbulenceParams) {
    let radius = params.attraction_radius1;
    state
        .position
        .par_iter_mut()
        .zip(state.velocity.par_iter_mut())
        .zip(state.rotation.par_iter_mut())
        .zip(state.rotation_delta.par_iter_mut())
        .zip(state.color.par_iter_mut())
        .enumerate()
        .for_each(
            |(i, ((((position, velocity), rotation), rotation_delta), color))| {
                let i = i as u32;
                let p = seed_direction(i) * (hash01(i + 4) * radius);
                *position = p.extend(hash01(i + 5) * 0.9 + 0.1);
                *velocity = Vec4::new(0.0, 0.0, 0.0, hash01(i + 12) * 0.75 + 0.25);
                *rotation = seed_rotation(i);
                *rotation_delta = seed_rotation_delta(i);
                *color = Vec3::new(hash01(i), hash01(i + 2), hash01(i + 3)) * 0.75 + 0.25;
            },
        );
}

/// Seed all buffers for the N-body variant.
///
/// Positions fill a shell around the origin; the position payload is the
/// particle's physical radius and the velocity payload the movable flag.
/// Instance 0 is overridden to the anchor: pinned at `center`, radius
/// `size0`, immovable, neutral gray.
pub(crate) fn init_nbody(state: &mut ParticleState, params: &NBodyParams) {
    state
        .position
        .par_iter_mut()
        .zip(state.velocity.par_iter_mut())
        .zip(state.rotation.par_iter_mut())
        .zip(state.rotation_delta.par_iter_mut())
        .zip(state.color.par_iter_mut())
        .enumerate()
        .for_each(
            |(i, ((((position, velocity), rotation), rotation_delta), color))| {
                let i = i as u32;
                let p = seed_direction(i) * ((hash01(i + 4) * 0.3 + 0.2) * 10.0);
                *position = p.extend(hash01(i + 5) * 0.08 + 0.02);
                *velocity = Vec4::new(0.0, 0.0, 0.0, 1.0);
                *rotation = seed_rotation(i);
                *rotation_delta = seed_rotation_delta(i);
                *color = Vec3::new(hash01(i), hash01(i + 2), hash01(i + 3)) * 0.9 + 0.1;
            },
        );

    // Anchor override
    if !state.position.is_empty() {
        state.position[0] = params.center.extend(params.size0);
        state.velocity[0] = Vec4::new(0.0, 0.0, 0.0, 0.0);
        state.color[0] = Vec3::splat(0.5);
    }
}
