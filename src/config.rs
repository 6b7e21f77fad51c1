use crate::math::Vector3;
use crate::render_state::PaletteColor;

/// Fixed camera placement, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vector3,
    pub target: Vector3,
    pub up: Vector3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vector3::new(100.0, 150.0, 200.0),
            target: Vector3::new(0.0, 35.0, 0.0),
            up: Vector3::Y,
        }
    }
}

/// Perspective parameters; the aspect ratio comes from the display each
/// frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Projection {
    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_degrees.to_radians()
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            z_near: 1.0,
            z_far: 2000.0,
        }
    }
}

/// Everything the viewer starts from. Only rotation, shininess and the two
/// colors can change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub camera: Camera,
    pub projection: Projection,
    pub light_position: Vector3,
    pub base_color: [f32; 4],
    pub clear_color: [f32; 4],
    pub rotation_degrees: f32,
    pub shininess: f32,
    pub light_color: PaletteColor,
    pub specular_color: PaletteColor,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "letterlight".into(),
            width: 800,
            height: 600,
            camera: Camera::default(),
            projection: Projection::default(),
            light_position: Vector3::new(20.0, 30.0, 60.0),
            base_color: [0.2, 1.0, 0.2, 1.0],
            clear_color: [0.0, 0.0, 0.0, 1.0],
            rotation_degrees: 0.0,
            shininess: 150.0,
            light_color: PaletteColor::White,
            specular_color: PaletteColor::White,
        }
    }
}
