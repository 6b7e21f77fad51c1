use std::fmt;
use std::str::FromStr;

use crate::config::{Camera, Projection, ViewerConfig};
use crate::error::{RenderError, Result, UnknownColor};
use crate::math::Vector3;

/// The colors offered for the light and the specular highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteColor {
    Red,
    Green,
    Blue,
    White,
}

impl PaletteColor {
    pub const ALL: [Self; 4] = [Self::Red, Self::Green, Self::Blue, Self::White];

    pub fn rgb(self) -> Vector3 {
        match self {
            Self::Red => Vector3::new(1.0, 0.6, 0.6),
            Self::Green => Vector3::new(0.6, 1.0, 0.6),
            Self::Blue => Vector3::new(0.6, 0.6, 1.0),
            Self::White => Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::White => "white",
        }
    }
}

impl fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaletteColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownColor(wanted.to_string()))
    }
}

/// Parameters read by every frame. Setters are the only way to change them,
/// and each one validates its input before touching the state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    rotation: f32,
    shininess: f32,
    light_color: PaletteColor,
    specular_color: PaletteColor,
    light_position: Vector3,
    camera: Camera,
    projection: Projection,
    base_color: [f32; 4],
    clear_color: [f32; 4],
}

impl RenderState {
    pub fn from_config(config: &ViewerConfig) -> Result<Self> {
        let mut state = Self {
            rotation: 0.0,
            shininess: 1.0,
            light_color: config.light_color,
            specular_color: config.specular_color,
            light_position: config.light_position,
            camera: config.camera,
            projection: config.projection,
            base_color: config.base_color,
            clear_color: config.clear_color,
        };
        state.set_rotation_degrees(config.rotation_degrees)?;
        state.set_shininess(config.shininess)?;
        Ok(state)
    }

    /// Rotation about the world Y axis, in radians.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation.to_degrees()
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn light_color(&self) -> PaletteColor {
        self.light_color
    }

    pub fn specular_color(&self) -> PaletteColor {
        self.specular_color
    }

    pub fn light_position(&self) -> Vector3 {
        self.light_position
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn base_color(&self) -> [f32; 4] {
        self.base_color
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Any finite angle is accepted; it is not wrapped.
    pub fn set_rotation_degrees(&mut self, degrees: f32) -> Result<()> {
        if !degrees.is_finite() {
            return Err(RenderError::InvalidParameter {
                name: "rotation",
                value: degrees,
            });
        }
        self.rotation = degrees.to_radians();
        Ok(())
    }

    pub fn set_rotation_radians(&mut self, radians: f32) -> Result<()> {
        if !radians.is_finite() {
            return Err(RenderError::InvalidParameter {
                name: "rotation",
                value: radians,
            });
        }
        self.rotation = radians;
        Ok(())
    }

    pub fn set_shininess(&mut self, shininess: f32) -> Result<()> {
        if !shininess.is_finite() || shininess <= 0.0 {
            return Err(RenderError::InvalidParameter {
                name: "shininess",
                value: shininess,
            });
        }
        self.shininess = shininess;
        Ok(())
    }

    pub fn set_light_color(&mut self, color: PaletteColor) {
        self.light_color = color;
    }

    pub fn set_specular_color(&mut self, color: PaletteColor) {
        self.specular_color = color;
    }
}

impl Default for RenderState {
    fn default() -> Self {
        let config = ViewerConfig::default();
        Self {
            rotation: config.rotation_degrees.to_radians(),
            shininess: config.shininess,
            light_color: config.light_color,
            specular_color: config.specular_color,
            light_position: config.light_position,
            camera: config.camera,
            projection: config.projection,
            base_color: config.base_color,
            clear_color: config.clear_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_names_parse_case_insensitively() {
        assert_eq!("red".parse::<PaletteColor>(), Ok(PaletteColor::Red));
        assert_eq!(" Blue ".parse::<PaletteColor>(), Ok(PaletteColor::Blue));
        assert_eq!(
            "purple".parse::<PaletteColor>(),
            Err(UnknownColor("purple".into()))
        );
        for color in PaletteColor::ALL {
            assert_eq!(color.to_string().parse::<PaletteColor>(), Ok(color));
        }
    }

    #[test]
    fn palette_values() {
        assert_eq!(PaletteColor::Red.rgb(), Vector3::new(1.0, 0.6, 0.6));
        assert_eq!(PaletteColor::Green.rgb(), Vector3::new(0.6, 1.0, 0.6));
        assert_eq!(PaletteColor::Blue.rgb(), Vector3::new(0.6, 0.6, 1.0));
        assert_eq!(PaletteColor::White.rgb(), Vector3::ONE);
    }

    #[test]
    fn defaults_follow_config() {
        let state = RenderState::default();
        assert_eq!(state, RenderState::from_config(&ViewerConfig::default()).unwrap());
        assert_eq!(state.shininess(), 150.0);
        assert_eq!(state.base_color(), [0.2, 1.0, 0.2, 1.0]);
        assert_eq!(state.rotation(), 0.0);
    }

    #[test]
    fn rotation_accepts_any_finite_angle() {
        let mut state = RenderState::default();
        state.set_rotation_degrees(720.0).unwrap();
        assert!((state.rotation() - 4.0 * std::f32::consts::PI).abs() < 1e-5);
        state.set_rotation_degrees(-90.0).unwrap();
        assert!((state.rotation_degrees() + 90.0).abs() < 1e-4);
        assert!(state.set_rotation_degrees(f32::NAN).is_err());
        assert!((state.rotation_degrees() + 90.0).abs() < 1e-4);
    }

    #[test]
    fn shininess_must_be_positive() {
        let mut state = RenderState::default();
        for bad in [0.0, -3.0, f32::INFINITY, f32::NAN] {
            assert!(matches!(
                state.set_shininess(bad),
                Err(RenderError::InvalidParameter {
                    name: "shininess",
                    ..
                })
            ));
        }
        assert_eq!(state.shininess(), 150.0);
        state.set_shininess(0.5).unwrap();
        assert_eq!(state.shininess(), 0.5);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ViewerConfig {
            shininess: 0.0,
            ..ViewerConfig::default()
        };
        assert!(RenderState::from_config(&config).is_err());
    }
}
