//! WGSL sources for the point-light program.
//!
//! Both stages declare the same `Uniforms` block; the program's uniform
//! layout is reflected from it, so field names here are the uniform names the
//! renderer looks up.

pub const VERTEX_SHADER: &str = r#"
struct Uniforms {
    world_view_projection: mat4x4<f32>,
    world: mat4x4<f32>,
    world_inverse_transpose: mat4x4<f32>,
    color: vec4<f32>,
    light_world_position: vec3<f32>,
    view_world_position: vec3<f32>,
    light_color: vec3<f32>,
    specular_color: vec3<f32>,
    shininess: f32,
}

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) surface_to_light: vec3<f32>,
    @location(2) surface_to_view: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let position = vec4<f32>(input.position, 1.0);
    var clip = uniforms.world_view_projection * position;
    // Projection matrices target GL depth [-w, w]; remap to [0, w].
    clip.z = (clip.z + clip.w) * 0.5;

    let surface_world_position = (uniforms.world * position).xyz;

    var out: VertexOutput;
    out.clip_position = clip;
    out.normal = (uniforms.world_inverse_transpose * vec4<f32>(input.normal, 0.0)).xyz;
    out.surface_to_light = uniforms.light_world_position - surface_world_position;
    out.surface_to_view = uniforms.view_world_position - surface_world_position;
    return out;
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
struct Uniforms {
    world_view_projection: mat4x4<f32>,
    world: mat4x4<f32>,
    world_inverse_transpose: mat4x4<f32>,
    color: vec4<f32>,
    light_world_position: vec3<f32>,
    view_world_position: vec3<f32>,
    light_color: vec3<f32>,
    specular_color: vec3<f32>,
    shininess: f32,
}

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct FragmentInput {
    @location(0) normal: vec3<f32>,
    @location(1) surface_to_light: vec3<f32>,
    @location(2) surface_to_view: vec3<f32>,
}

@fragment
fn fs_main(input: FragmentInput) -> @location(0) vec4<f32> {
    // Interpolation denormalizes; renormalize per fragment.
    let normal = normalize(input.normal);
    let surface_to_light = normalize(input.surface_to_light);
    let surface_to_view = normalize(input.surface_to_view);
    let half_vector = normalize(surface_to_light + surface_to_view);

    let light = max(dot(normal, surface_to_light), 0.0);
    var specular = 0.0;
    if light > 0.0 {
        specular = pow(max(dot(normal, half_vector), 0.0), uniforms.shininess);
    }

    let rgb = uniforms.color.rgb * light * uniforms.light_color
        + specular * uniforms.specular_color;
    return vec4<f32>(rgb, uniforms.color.a);
}
"#;
