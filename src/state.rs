//! Per-instance particle state.
//!
//! Structure-of-arrays layout, one entry per instance, indexed by the stable
//! instance index. The `w` lanes of position and velocity carry a packed
//! per-particle scalar whose meaning depends on the physics variant:
//! displacement intensity / render scale for turbulence, radius / anchor
//! flag for N-body.
//!
//! All arrays are allocated once for the lifetime of the simulation and are
//! exposed read-only to renderers, both as typed slices and as byte views
//! suitable for instanced vertex attribute upload.

use glam::{Vec3, Vec4};

/// Structure-of-arrays particle buffers.
#[derive(Clone, Debug)]
pub struct ParticleState {
    pub(crate) position: Vec<Vec4>,
    pub(crate) velocity: Vec<Vec4>,
    pub(crate) rotation: Vec<Vec3>,
    pub(crate) rotation_delta: Vec<Vec3>,
    pub(crate) color: Vec<Vec3>,
}

impl ParticleState {
    /// Allocate zeroed buffers for `count` instances.
    pub fn new(count: u32) -> Self {
        let n = count as usize;
        Self {
            position: vec![Vec4::ZERO; n],
            velocity: vec![Vec4::ZERO; n],
            rotation: vec![Vec3::ZERO; n],
            rotation_delta: vec![Vec3::ZERO; n],
            color: vec![Vec3::ZERO; n],
        }
    }

    /// Number of instances.
    pub fn count(&self) -> u32 {
        self.position.len() as u32
    }

    /// Positions, `xyz` + payload scalar in `w`.
    pub fn positions(&self) -> &[Vec4] {
        &self.position
    }

    /// Velocities, `xyz` + payload scalar in `w`.
    pub fn velocities(&self) -> &[Vec4] {
        &self.velocity
    }

    /// Euler rotation accumulators, radians, unbounded.
    pub fn rotations(&self) -> &[Vec3] {
        &self.rotation
    }

    /// Per-instance constant angular velocities.
    pub fn rotation_deltas(&self) -> &[Vec3] {
        &self.rotation_delta
    }

    /// Static per-instance colors in [0,1]^3.
    pub fn colors(&self) -> &[Vec3] {
        &self.color
    }

    /// Position buffer bytes (16 bytes per instance).
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.position)
    }

    /// Velocity buffer bytes (16 bytes per instance).
    pub fn velocity_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.velocity)
    }

    /// Rotation buffer bytes (12 bytes per instance, tightly packed).
    pub fn rotation_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rotation)
    }

    /// Rotation-delta buffer bytes (12 bytes per instance, tightly packed).
    pub fn rotation_delta_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rotation_delta)
    }

    /// Color buffer bytes (12 bytes per instance, tightly packed).
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color)
    }

    /// Drop all buffer storage. Used by `dispose`.
    pub(crate) fn release(&mut self) {
        self.position = Vec::new();
        self.velocity = Vec::new();
        self.rotation = Vec::new();
        self.rotation_delta = Vec::new();
        self.color = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_sizes() {
        let state = ParticleState::new(128);
        assert_eq!(state.count(), 128);
        assert_eq!(state.positions().len(), 128);
        assert_eq!(state.velocities().len(), 128);
        assert_eq!(state.rotations().len(), 128);
        assert_eq!(state.rotation_deltas().len(), 128);
        assert_eq!(state.colors().len(), 128);
    }

    #[test]
    fn test_byte_view_strides() {
        let state = ParticleState::new(10);
        assert_eq!(state.position_bytes().len(), 10 * 16);
        assert_eq!(state.velocity_bytes().len(), 10 * 16);
        assert_eq!(state.rotation_bytes().len(), 10 * 12);
        assert_eq!(state.color_bytes().len(), 10 * 12);
    }

    #[test]
    fn test_release_empties_buffers() {
        let mut state = ParticleState::new(16);
        state.release();
        assert_eq!(state.count(), 0);
        assert!(state.position_bytes().is_empty());
    }
}
