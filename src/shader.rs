//! WGSL generation for the GPU driver.
//!
//! Each kernel in [`crate::kernels`] has a compute-shader twin assembled
//! here. The shaders are static except for the noise field, which is
//! injected as a WGSL function supplied by the active
//! [`crate::noise::NoiseField`]. All tuning values arrive through the
//! uniform buffer so they stay live-adjustable without rebuilding pipelines.
//!
//! Buffer bindings are fixed across all passes of a variant:
//! 0 position (vec4), 1 velocity (vec4), 2 rotation, 3 rotation delta,
//! 4 color, 5 uniforms. The three vec3 buffers are declared as `array<f32>`
//! and indexed in triples, because tightly packed host data (12 bytes per
//! instance, usable as instanced vertex attributes) does not match the
//! 16-byte stride WGSL gives `array<vec3<f32>>`.
//!
//! The hash mixer matches [`crate::hash`] constant for constant, so GPU and
//! CPU initialization produce the same integer stream.

/// Integer hash and random helpers shared by the init shaders.
pub const HASH_WGSL: &str = r#"
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

// Random float in [0, 1]
fn rand(seed: u32) -> f32 {
    return f32(hash(seed)) / 4294967295.0;
}
"#;

/// Degeneracy-safe vector helpers shared by all passes.
pub const MATH_WGSL: &str = r#"
const TAU: f32 = 6.28318530718;

// Zero-length vectors normalize to zero, never NaN
fn safe_normalize(v: vec3<f32>) -> vec3<f32> {
    let len = length(v);
    if len > 1e-6 {
        return v / len;
    }
    return vec3<f32>(0.0);
}

fn clamp_length(v: vec3<f32>, max_len: f32) -> vec3<f32> {
    let len = length(v);
    if len > max_len {
        return v * (max_len / len);
    }
    return v;
}
"#;

const TURBULENCE_UNIFORMS_WGSL: &str = r#"
struct Uniforms {
    time_delta: f32,
    noise_time: f32,
    noise_coord_scale: f32,
    noise_intensity: f32,
    attraction_radius1: f32,
    attraction_radius2: f32,
    max_velocity: f32,
    _pad: f32,
}
"#;

const NBODY_UNIFORMS_WGSL: &str = r#"
struct Uniforms {
    center: vec3<f32>,
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
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}
"#;

const VEC4_BUFFERS_WGSL: &str = r#"
@group(0) @binding(0) var<storage, read_write> position: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read_write> velocity: array<vec4<f32>>;
"#;

const VEC3_BUFFERS_WGSL: &str = r#"
@group(0) @binding(2) var<storage, read_write> rotation: array<f32>;
@group(0) @binding(3) var<storage, read_write> rotation_delta: array<f32>;
@group(0) @binding(4) var<storage, read_write> color: array<f32>;

fn rotation_at(i: u32) -> vec3<f32> {
    let b = i * 3u;
    return vec3<f32>(rotation[b], rotation[b + 1u], rotation[b + 2u]);
}

fn set_rotation(i: u32, v: vec3<f32>) {
    let b = i * 3u;
    rotation[b] = v.x;
    rotation[b + 1u] = v.y;
    rotation[b + 2u] = v.z;
}

fn rotation_delta_at(i: u32) -> vec3<f32> {
    let b = i * 3u;
    return vec3<f32>(rotation_delta[b], rotation_delta[b + 1u], rotation_delta[b + 2u]);
}

fn set_rotation_delta(i: u32, v: vec3<f32>) {
    let b = i * 3u;
    rotation_delta[b] = v.x;
    rotation_delta[b + 1u] = v.y;
    rotation_delta[b + 2u] = v.z;
}

fn set_color(i: u32, v: vec3<f32>) {
    let b = i * 3u;
    color[b] = v.x;
    color[b + 1u] = v.y;
    color[b + 2u] = v.z;
}
"#;

const UNIFORM_BINDING_WGSL: &str = r#"
@group(0) @binding(5) var<uniform> uniforms: Uniforms;
"#;

/// Initialization pass for the turbulence variant.
pub fn turbulence_init() -> String {
    format!(
        r#"{TURBULENCE_UNIFORMS_WGSL}{VEC4_BUFFERS_WGSL}{VEC3_BUFFERS_WGSL}{UNIFORM_BINDING_WGSL}{HASH_WGSL}{MATH_WGSL}
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= arrayLength(&position) {{
        return;
    }}

    let r1 = rand(index);
    let r2 = rand(index + 2u);
    let r3 = rand(index + 3u);

    let dir = safe_normalize(vec3<f32>(r1, r2, r3) - 0.5);
    position[index] = vec4<f32>(
        dir * (rand(index + 4u) * uniforms.attraction_radius1),
        rand(index + 5u) * 0.9 + 0.1,
    );

    set_rotation(index, (vec3<f32>(rand(index + 6u), rand(index + 7u), rand(index + 8u)) - 0.5) * TAU);
    set_rotation_delta(index, vec3<f32>(rand(index + 9u), rand(index + 10u), rand(index + 11u)) * 0.5 + 0.25);

    velocity[index] = vec4<f32>(0.0, 0.0, 0.0, rand(index + 12u) * 0.75 + 0.25);

    set_color(index, vec3<f32>(r1, r2, r3) * 0.75 + 0.25);
}}
"#
    )
}

/// Update pass for the turbulence variant. `noise_wgsl` must define
/// `fn noise_field(p: vec3<f32>, period: vec3<f32>, alpha: f32) -> vec4<f32>`.
pub fn turbulence_step(noise_wgsl: &str) -> String {
    format!(
        r#"{TURBULENCE_UNIFORMS_WGSL}{VEC4_BUFFERS_WGSL}{VEC3_BUFFERS_WGSL}{UNIFORM_BINDING_WGSL}{MATH_WGSL}
{noise_wgsl}
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= arrayLength(&position) {{
        return;
    }}

    var p = position[index];
    var v = velocity[index];

    // Turbulence forcing, scaled by the displacement-intensity payload
    let psrd = noise_field(p.xyz * uniforms.noise_coord_scale, vec3<f32>(0.0), uniforms.noise_time);
    v = vec4<f32>(v.xyz + psrd.xyz * uniforms.noise_intensity * p.w, v.w);

    // Smoothstep attraction band toward the origin
    let dv = -p.xyz;
    let coef = smoothstep(uniforms.attraction_radius1, uniforms.attraction_radius2, length(dv));
    v = vec4<f32>(v.xyz + safe_normalize(dv) * coef * 0.25, v.w);

    v = vec4<f32>(
        clamp(v.xyz, vec3<f32>(-uniforms.max_velocity), vec3<f32>(uniforms.max_velocity)),
        v.w,
    );

    p = vec4<f32>(p.xyz + v.xyz, p.w);

    position[index] = p;
    velocity[index] = v;
    set_rotation(index, rotation_at(index) + rotation_delta_at(index) * uniforms.time_delta);
}}
"#
    )
}

/// Initialization pass for the N-body variant.
pub fn nbody_init() -> String {
    format!(
        r#"{NBODY_UNIFORMS_WGSL}{VEC4_BUFFERS_WGSL}{VEC3_BUFFERS_WGSL}{UNIFORM_BINDING_WGSL}{HASH_WGSL}{MATH_WGSL}
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= arrayLength(&position) {{
        return;
    }}

    let r1 = rand(index);
    let r2 = rand(index + 2u);
    let r3 = rand(index + 3u);

    let dir = safe_normalize(vec3<f32>(r1, r2, r3) - 0.5);
    position[index] = vec4<f32>(
        dir * ((rand(index + 4u) * 0.3 + 0.2) * 10.0),
        rand(index + 5u) * 0.08 + 0.02,
    );

    set_rotation(index, (vec3<f32>(rand(index + 6u), rand(index + 7u), rand(index + 8u)) - 0.5) * TAU);
    set_rotation_delta(index, vec3<f32>(rand(index + 9u), rand(index + 10u), rand(index + 11u)) * 0.5 + 0.25);

    velocity[index] = vec4<f32>(0.0, 0.0, 0.0, 1.0);
    set_color(index, vec3<f32>(r1, r2, r3) * 0.9 + 0.1);

    // Anchor override
    if index == 0u {{
        position[0] = vec4<f32>(uniforms.center, uniforms.size0);
        velocity[0] = vec4<f32>(0.0);
        set_color(0u, vec3<f32>(0.5));
    }}
}}
"#
    )
}

/// N-body pass 1: attraction toward the center, damping, integration.
pub fn nbody_attract() -> String {
    format!(
        r#"{NBODY_UNIFORMS_WGSL}{VEC4_BUFFERS_WGSL}{UNIFORM_BINDING_WGSL}{MATH_WGSL}
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= arrayLength(&position) {{
        return;
    }}

    if index == 0u {{
        // The anchor is pinned to the moving center; velocity untouched
        position[0] = vec4<f32>(uniforms.center, uniforms.size0);
        return;
    }}

    var p = position[index];
    var v = velocity[index];

    let dv = uniforms.center - p.xyz;
    let scaled = p.w * uniforms.size;
    var curve = scaled;
    if uniforms.squared_intensity != 0u {{
        curve = scaled * scaled;
    }}
    let intensity = max(curve, uniforms.intensity_floor);

    v = vec4<f32>(v.xyz + safe_normalize(dv) * uniforms.attraction_strength * intensity, v.w);
    v = vec4<f32>(v.xyz * uniforms.damping, v.w);
    v = vec4<f32>(clamp_length(v.xyz, uniforms.max_velocity), v.w);
    p = vec4<f32>(p.xyz + v.xyz, p.w);

    position[index] = p;
    velocity[index] = v;
}}
"#
    )
}

/// N-body pass 2: pairwise overlap resolution.
///
/// Every invocation walks all other instances and applies corrections to
/// both sides of an overlapping pair. Concurrent invocations race on those
/// shared writes; the corrections are small and symmetric in expectation,
/// and the last write wins. This is the accepted consistency relaxation of
/// the collision model, not something to synchronize away.
pub fn nbody_collide() -> String {
    format!(
        r#"{NBODY_UNIFORMS_WGSL}{VEC4_BUFFERS_WGSL}{UNIFORM_BINDING_WGSL}{MATH_WGSL}
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    let count = arrayLength(&position);
    if index >= count {{
        return;
    }}

    var p1 = position[index];
    var v1 = velocity[index];

    for (var j = 0u; j < count; j = j + 1u) {{
        if j == index {{
            continue;
        }}
        let p2 = position[j];
        let dv = p2.xyz - p1.xyz;
        let dist = length(dv);
        let min_dist = (p1.w + p2.w) * uniforms.size;
        if dist < min_dist {{
            let correction = safe_normalize(dv) * (min_dist - dist) * uniforms.correction_factor;
            let v2 = velocity[j];
            let impulse1 = correction * max(length(v1.xyz), uniforms.impulse_floor);
            let impulse2 = correction * max(length(v2.xyz), uniforms.impulse_floor);
            if index > 0u {{
                var factor = 1.0;
                if v2.w < 1.0 {{
                    factor = 2.0;
                }}
                p1 = vec4<f32>(p1.xyz - correction * factor, p1.w);
                v1 = vec4<f32>(v1.xyz - impulse1, v1.w);
            }}
            if j > 0u {{
                var factor = 1.0;
                if v1.w < 1.0 {{
                    factor = 2.0;
                }}
                position[j] = vec4<f32>(p2.xyz + correction * factor, p2.w);
                velocity[j] = vec4<f32>(v2.xyz + impulse2, v2.w);
            }}
        }}
    }}

    if index > 0u {{
        v1 = vec4<f32>(clamp_length(v1.xyz, uniforms.max_velocity), v1.w);
        position[index] = p1;
        velocity[index] = v1;
    }}
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{HarmonicField, NoiseField};

    /// Validates WGSL code using naga.
    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_turbulence_init_wgsl() {
        let shader = turbulence_init();
        assert!(shader.contains("attraction_radius1"));
        assert!(shader.contains("rand(index + 12u)"));
        validate_wgsl(&shader).expect("turbulence init WGSL should be valid");
    }

    #[test]
    fn test_turbulence_step_wgsl() {
        let noise = HarmonicField::default();
        let shader = turbulence_step(&noise.wgsl());
        assert!(shader.contains("noise_field"));
        assert!(shader.contains("smoothstep"));
        validate_wgsl(&shader).expect("turbulence step WGSL should be valid");
    }

    #[test]
    fn test_nbody_init_wgsl() {
        let shader = nbody_init();
        assert!(shader.contains("uniforms.size0"));
        assert!(shader.contains("index == 0u"));
        validate_wgsl(&shader).expect("n-body init WGSL should be valid");
    }

    #[test]
    fn test_nbody_attract_wgsl() {
        let shader = nbody_attract();
        assert!(shader.contains("uniforms.damping"));
        assert!(shader.contains("clamp_length"));
        validate_wgsl(&shader).expect("n-body attract WGSL should be valid");
    }

    #[test]
    fn test_nbody_collide_wgsl() {
        let shader = nbody_collide();
        assert!(shader.contains("min_dist"));
        assert!(shader.contains("safe_normalize"));
        validate_wgsl(&shader).expect("n-body collide WGSL should be valid");
    }

    #[test]
    fn test_hash_wgsl_matches_cpu_constants() {
        // The WGSL mixer must stay in lockstep with crate::hash.
        for c in ["0xed5ad4bbu", "0xac4c1b51u", "0x31848babu"] {
            assert!(HASH_WGSL.contains(c), "missing constant {}", c);
        }
    }
}
