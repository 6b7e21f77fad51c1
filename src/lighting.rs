//! CPU evaluation of the point-light model the fragment shader implements.
//!
//! Diffuse is clamped at zero, so surfaces facing away from the light come
//! out black rather than negatively lit, and the specular term only appears
//! where the diffuse term is positive.

use crate::math::Vector3;
use crate::render_state::RenderState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: [f32; 4],
    pub light_color: Vector3,
    pub specular_color: Vector3,
    pub shininess: f32,
}

impl From<&RenderState> for Material {
    fn from(state: &RenderState) -> Self {
        Self {
            color: state.base_color(),
            light_color: state.light_color().rgb(),
            specular_color: state.specular_color().rgb(),
            shininess: state.shininess(),
        }
    }
}

pub fn diffuse(normal: Vector3, surface_to_light: Vector3) -> f32 {
    normal
        .normalize()
        .dot(surface_to_light.normalize())
        .max(0.0)
}

pub fn specular(
    normal: Vector3,
    surface_to_light: Vector3,
    surface_to_view: Vector3,
    shininess: f32,
) -> f32 {
    if diffuse(normal, surface_to_light) <= 0.0 {
        return 0.0;
    }
    let half_vector = (surface_to_light.normalize() + surface_to_view.normalize()).normalize();
    normal.normalize().dot(half_vector).max(0.0).powf(shininess)
}

/// Color of a fragment given the interpolated vectors the vertex stage
/// produces.
pub fn shade(
    material: &Material,
    normal: Vector3,
    surface_to_light: Vector3,
    surface_to_view: Vector3,
) -> [f32; 4] {
    let light = diffuse(normal, surface_to_light);
    let highlight = specular(normal, surface_to_light, surface_to_view, material.shininess);
    let [r, g, b, a] = material.color;
    let rgb = Vector3::new(
        r * light * material.light_color.x,
        g * light * material.light_color.y,
        b * light * material.light_color.z,
    ) + material.specular_color * highlight;
    [rgb.x, rgb.y, rgb.z, a]
}

/// Shades a world-space point with the light and camera of `state`.
pub fn shade_point(state: &RenderState, position: Vector3, normal: Vector3) -> [f32; 4] {
    shade(
        &Material::from(state),
        normal,
        state.light_position() - position,
        state.camera().eye - position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh;
    use crate::render_state::PaletteColor;

    fn material() -> Material {
        Material::from(&RenderState::default())
    }

    #[test]
    fn head_on_light_gives_full_diffuse_and_specular() {
        let color = shade(&material(), Vector3::Z, Vector3::Z * 10.0, Vector3::Z * 3.0);
        assert!((color[0] - 1.2).abs() < 1e-6);
        assert!((color[1] - 2.0).abs() < 1e-6);
        assert!((color[2] - 1.2).abs() < 1e-6);
        assert_eq!(color[3], 1.0);
    }

    #[test]
    fn back_lit_surfaces_are_black() {
        let normal = Vector3::Z;
        let behind = -Vector3::Z + Vector3::X * 0.2;
        assert_eq!(diffuse(normal, behind), 0.0);
        // The viewer sits in front, but the highlight needs the light in front too.
        assert_eq!(specular(normal, behind, Vector3::Z, 150.0), 0.0);
        assert_eq!(shade(&material(), normal, behind, Vector3::Z), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn grazing_light_has_no_diffuse() {
        assert_eq!(diffuse(Vector3::Z, Vector3::X), 0.0);
    }

    #[test]
    fn higher_shininess_tightens_the_highlight() {
        let normal = Vector3::Z;
        let light = Vector3::new(0.3, 0.0, 1.0);
        let view = Vector3::new(-0.1, 0.0, 1.0);
        let broad = specular(normal, light, view, 5.0);
        let tight = specular(normal, light, view, 150.0);
        assert!(broad > tight && tight > 0.0);
    }

    #[test]
    fn light_color_tints_diffuse_only() {
        let mut state = RenderState::default();
        state.set_light_color(PaletteColor::Red);
        state.set_shininess(1e6).unwrap();
        let lit = shade(
            &Material::from(&state),
            Vector3::Z,
            Vector3::new(0.0, 1.0, 1.0),
            Vector3::Z,
        );
        let light = diffuse(Vector3::Z, Vector3::new(0.0, 1.0, 1.0));
        assert!((lit[0] - 0.2 * light).abs() < 1e-5);
        assert!((lit[1] - 0.6 * light).abs() < 1e-5);
    }

    #[test]
    fn default_scene_lights_the_front_face() {
        let state = RenderState::default();
        let mesh = mesh();
        let front = shade_point(&state, mesh.position(0), mesh.normal(0));
        assert!(front[1] > 0.0);

        let back_vertex = (0..mesh.vertex_count())
            .find(|&v| mesh.normal(v).z < -0.5)
            .unwrap();
        let back = shade_point(&state, mesh.position(back_vertex), mesh.normal(back_vertex));
        assert_eq!(&back[..3], &[0.0, 0.0, 0.0]);
    }
}
