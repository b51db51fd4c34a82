//! Noise field seam for the turbulence variant.
//!
//! The turbulence stepper perturbs particle velocity with the gradient of a
//! continuous 3D noise field. The field itself is a collaborator, not part
//! of this crate's core: anything deterministic and side-effect-free that
//! maps `(position, period, alpha)` to a gradient and a value can drive the
//! simulation.
//!
//! Because the engine also runs on the GPU, an implementation supplies the
//! equivalent WGSL function alongside the CPU sample. The two must compute
//! the same formula; the shader tests validate the WGSL, and the CPU driver
//! is the reference for numeric assertions.
//!
//! [`HarmonicField`] is the built-in default: a small sum of rotated sine
//! waves with an analytic gradient. It is cheap, tileable-agnostic and easy
//! to mirror in WGSL. Swap in a simplex/psrdnoise port for production
//! visuals.

use glam::Vec3;

/// One field evaluation: the spatial gradient and the scalar value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseSample {
    /// Spatial gradient of the field at the sample point.
    pub gradient: Vec3,
    /// Field value at the sample point.
    pub value: f32,
}

/// A continuous, deterministic 3D noise field.
///
/// `alpha` is a free rotation parameter: advancing it slowly over time
/// animates the field without translating it. `period` is a tiling hint;
/// implementations that do not tile may ignore it (the engine always passes
/// zero, meaning "no tiling").
pub trait NoiseField: Send + Sync {
    /// Evaluate the field.
    fn sample(&self, position: Vec3, period: Vec3, alpha: f32) -> NoiseSample;

    /// WGSL definition of the same field, as a function with the signature
    /// `fn noise_field(p: vec3<f32>, period: vec3<f32>, alpha: f32) -> vec4<f32>`
    /// returning `vec4(gradient, value)`.
    fn wgsl(&self) -> String;
}

/// Wave basis shared by the CPU sample and the generated WGSL.
///
/// Directions are deliberately skewed off the axes; amplitudes sum to 1 so
/// the value stays in roughly [-1, 1]. The per-wave spin coefficient couples
/// `alpha` to phase at different rates, which keeps the animated field from
/// breathing in lockstep.
const WAVES: [([f32; 3], f32, f32); 5] = [
    ([1.0, 0.7, -0.4], 0.50, 0.37),
    ([-0.8, 1.1, 0.5], 0.25, 0.71),
    ([0.3, -0.9, 1.2], 0.15, 0.53),
    ([1.4, 0.2, 0.8], 0.07, 0.91),
    ([-0.5, -1.3, -0.7], 0.03, 0.29),
];

/// Default noise field: a sum of five skewed sine waves.
///
/// `frequency` scales the whole basis; 1.0 reproduces the raw wave set.
#[derive(Clone, Copy, Debug)]
pub struct HarmonicField {
    /// Uniform scale applied to every wave vector.
    pub frequency: f32,
}

impl Default for HarmonicField {
    fn default() -> Self {
        Self { frequency: 1.0 }
    }
}

impl NoiseField for HarmonicField {
    fn sample(&self, position: Vec3, _period: Vec3, alpha: f32) -> NoiseSample {
        let mut value = 0.0;
        let mut gradient = Vec3::ZERO;
        for (dir, amplitude, spin) in WAVES {
            let d = Vec3::from(dir) * self.frequency;
            let phase = position.dot(d) + alpha * spin;
            value += amplitude * phase.sin();
            gradient += d * (amplitude * phase.cos());
        }
        NoiseSample { gradient, value }
    }

    fn wgsl(&self) -> String {
        let mut terms = String::new();
        for (dir, amplitude, spin) in WAVES {
            terms.push_str(&format!(
                "    d = vec3<f32>({:?}, {:?}, {:?}) * {:?};\n",
                dir[0], dir[1], dir[2], self.frequency
            ));
            terms.push_str(&format!("    phase = dot(p, d) + alpha * {:?};\n", spin));
            terms.push_str(&format!("    value = value + {:?} * sin(phase);\n", amplitude));
            terms.push_str(&format!(
                "    gradient = gradient + d * ({:?} * cos(phase));\n",
                amplitude
            ));
        }
        format!(
            r#"fn noise_field(p: vec3<f32>, period: vec3<f32>, alpha: f32) -> vec4<f32> {{
    var value = 0.0;
    var gradient = vec3<f32>(0.0);
    var d = vec3<f32>(0.0);
    var phase = 0.0;
{terms}    return vec4<f32>(gradient, value);
}}
"#
        )
    }
}
