//! Simulation parameters.
//!
//! Each physics variant has a plain config struct with defaults taken from
//! the reference tuning. All values stay live-adjustable after construction
//! through [`crate::Simulation`]'s accessors; the GPU driver re-uploads them
//! into its uniform buffer every step.
//!
//! `material` is an opaque bag of named values handed through to whatever
//! renderer consumes the simulation buffers. The engine never interprets it.

use crate::error::SimulationError;
use glam::{Vec2, Vec3, Vec4};
use std::collections::HashMap;

/// Parameters for the turbulence + attraction variant.
#[derive(Clone, Debug)]
pub struct TurbulenceParams {
    /// Number of particle instances.
    pub count: u32,
    /// Scale applied to particle position before sampling the noise field.
    pub noise_coord_scale: f32,
    /// Strength of the noise gradient forcing term.
    pub noise_intensity: f32,
    /// Rate at which the field's rotation argument advances per second.
    pub noise_time_coefficient: f32,
    /// Inner attraction radius: no pull toward the origin inside it.
    pub attraction_radius1: f32,
    /// Outer attraction radius: full pull beyond it.
    pub attraction_radius2: f32,
    /// Componentwise velocity clamp.
    pub max_velocity: f32,
    /// Opaque renderer material values.
    pub material: MaterialParams,
}

impl Default for TurbulenceParams {
    fn default() -> Self {
        Self {
            count: 100_000,
            noise_coord_scale: 0.01,
            noise_intensity: 0.0025,
            noise_time_coefficient: 1.5,
            attraction_radius1: 150.0,
            attraction_radius2: 250.0,
            max_velocity: 0.1,
            material: MaterialParams::new(),
        }
    }
}

impl TurbulenceParams {
    /// Check construction preconditions.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.count == 0 {
            return Err(SimulationError::InvalidCount);
        }
        if self.attraction_radius1 >= self.attraction_radius2 {
            return Err(SimulationError::InvalidRadii {
                radius1: self.attraction_radius1,
                radius2: self.attraction_radius2,
            });
        }
        if self.max_velocity <= 0.0 {
            return Err(SimulationError::InvalidMaxVelocity(self.max_velocity));
        }
        Ok(())
    }
}

/// Parameters for the N-body collision variant.
///
/// The tuning fields consolidate the slightly divergent constants of the
/// reference sub-variants; defaults reproduce the most complete one.
#[derive(Clone, Debug)]
pub struct NBodyParams {
    /// Number of particle instances (index 0 is the anchor).
    pub count: u32,
    /// Radius payload assigned to the anchor particle.
    pub size0: f32,
    /// Global scale applied to every radius payload.
    pub size: f32,
    /// Length clamp on velocity.
    pub max_velocity: f32,
    /// Moving attraction point; the anchor is pinned to it each step.
    pub center: Vec3,
    /// Per-step attraction acceleration toward `center`.
    pub attraction_strength: f32,
    /// Multiplicative velocity damping per step.
    pub damping: f32,
    /// Lower bound on the attraction intensity factor.
    pub intensity_floor: f32,
    /// Fraction of penetration depth resolved per collision pass.
    pub correction_factor: f32,
    /// Lower bound on the speed factor of collision impulses.
    pub impulse_floor: f32,
    /// Square the radius term of the attraction intensity.
    pub squared_intensity: bool,
    /// Opaque renderer material values.
    pub material: MaterialParams,
}

impl Default for NBodyParams {
    fn default() -> Self {
        Self {
            count: 1000,
            size0: 1.0,
            size: 1.0,
            max_velocity: 0.03,
            center: Vec3::ZERO,
            attraction_strength: 0.0025,
            damping: 0.999,
            intensity_floor: 0.1,
            correction_factor: 0.5,
            impulse_floor: 2.0,
            squared_intensity: true,
            material: MaterialParams::new(),
        }
    }
}

impl NBodyParams {
    /// Check construction preconditions.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.count == 0 {
            return Err(SimulationError::InvalidCount);
        }
        if self.max_velocity <= 0.0 {
            return Err(SimulationError::InvalidMaxVelocity(self.max_velocity));
        }
        Ok(())
    }
}

/// Value types a material parameter can hold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaterialValue {
    F32(f32),
    U32(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl MaterialValue {
    /// WGSL type name, for renderers that splice these into shaders.
    pub fn wgsl_type(&self) -> &'static str {
        match self {
            MaterialValue::F32(_) => "f32",
            MaterialValue::U32(_) => "u32",
            MaterialValue::Vec2(_) => "vec2<f32>",
            MaterialValue::Vec3(_) => "vec3<f32>",
            MaterialValue::Vec4(_) => "vec4<f32>",
        }
    }

    /// Append this value's bytes to a buffer.
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        match self {
            MaterialValue::F32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            MaterialValue::U32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            MaterialValue::Vec2(v) => {
                buf.extend_from_slice(&v.x.to_le_bytes());
                buf.extend_from_slice(&v.y.to_le_bytes());
            }
            MaterialValue::Vec3(v) => {
                buf.extend_from_slice(&v.x.to_le_bytes());
                buf.extend_from_slice(&v.y.to_le_bytes());
                buf.extend_from_slice(&v.z.to_le_bytes());
            }
            MaterialValue::Vec4(v) => {
                buf.extend_from_slice(&v.x.to_le_bytes());
                buf.extend_from_slice(&v.y.to_le_bytes());
                buf.extend_from_slice(&v.z.to_le_bytes());
                buf.extend_from_slice(&v.w.to_le_bytes());
            }
        }
    }
}

impl From<f32> for MaterialValue {
    fn from(v: f32) -> Self {
        MaterialValue::F32(v)
    }
}

impl From<u32> for MaterialValue {
    fn from(v: u32) -> Self {
        MaterialValue::U32(v)
    }
}

impl From<Vec2> for MaterialValue {
    fn from(v: Vec2) -> Self {
        MaterialValue::Vec2(v)
    }
}

impl From<Vec3> for MaterialValue {
    fn from(v: Vec3) -> Self {
        MaterialValue::Vec3(v)
    }
}

impl From<Vec4> for MaterialValue {
    fn from(v: Vec4) -> Self {
        MaterialValue::Vec4(v)
    }
}

/// Ordered collection of named material values.
///
/// Order is insertion order and is stable, so a renderer can lay the values
/// out in a uniform block once and keep writing updated bytes to it.
#[derive(Clone, Debug, Default)]
pub struct MaterialParams {
    values: Vec<(String, MaterialValue)>,
    indices: HashMap<String, usize>,
}

impl MaterialParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a named value.
    pub fn set<V: Into<MaterialValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        if let Some(&idx) = self.indices.get(name) {
            self.values[idx].1 = value;
        } else {
            self.indices.insert(name.to_string(), self.values.len());
            self.values.push((name.to_string(), value));
        }
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<MaterialValue> {
        self.indices.get(name).map(|&idx| self.values[idx].1)
    }

    /// Iterate values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, MaterialValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialize all values into a tightly packed byte buffer, in order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (_, v) in &self.values {
            v.write_bytes(&mut buf);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turbulence_defaults_valid() {
        TurbulenceParams::default().validate().unwrap();
    }

    #[test]
    fn test_nbody_defaults_valid() {
        NBodyParams::default().validate().unwrap();
    }

    #[test]
    fn test_zero_count_rejected() {
        let params = TurbulenceParams {
            count: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SimulationError::InvalidCount)
        ));
    }

    #[test]
    fn test_inverted_radii_rejected() {
        let params = TurbulenceParams {
            attraction_radius1: 250.0,
            attraction_radius2: 150.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SimulationError::InvalidRadii { .. })
        ));
    }

    #[test]
    fn test_nonpositive_max_velocity_rejected() {
        let params = NBodyParams {
            max_velocity: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SimulationError::InvalidMaxVelocity(_))
        ));
    }

    #[test]
    fn test_material_set_get_update() {
        let mut mat = MaterialParams::new();
        mat.set("metalness", 0.75f32);
        mat.set("tint", Vec3::new(1.0, 0.5, 0.25));
        assert_eq!(mat.get("metalness"), Some(MaterialValue::F32(0.75)));
        mat.set("metalness", 1.0f32);
        assert_eq!(mat.get("metalness"), Some(MaterialValue::F32(1.0)));
        assert_eq!(mat.len(), 2);
    }

    #[test]
    fn test_material_bytes_ordered() {
        let mut mat = MaterialParams::new();
        mat.set("a", 1.0f32);
        mat.set("b", Vec2::new(2.0, 3.0));
        let bytes = mat.to_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
    }
}
