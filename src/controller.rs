//! Maps user input onto [`RenderState`] changes.
//!
//! Input arrives either as an explicit [`Interaction`] (from the CLI or a
//! caller driving the viewer directly) or as a [`ControlKey`] press that
//! [`KeyBindings`] turns into one.

use log::debug;

use crate::error::Result;
use crate::render_state::{PaletteColor, RenderState};

/// The lowest shininess reachable by stepping down with the keyboard.
pub const MIN_STEPPED_SHININESS: f32 = 1.0;

/// A single change to the render parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    /// Absolute rotation about the world Y axis, in degrees.
    RotateTo(f32),
    /// Relative rotation, in degrees.
    RotateBy(f32),
    SetShininess(f32),
    /// Adds to the current shininess, stopping at [`MIN_STEPPED_SHININESS`].
    AdjustShininess(f32),
    LightColor(PaletteColor),
    SpecularColor(PaletteColor),
}

impl Interaction {
    /// Applies the change. A rejected value leaves `state` untouched.
    pub fn apply(self, state: &mut RenderState) -> Result<()> {
        match self {
            Self::RotateTo(degrees) => state.set_rotation_degrees(degrees),
            Self::RotateBy(delta) => {
                state.set_rotation_degrees(state.rotation_degrees() + delta)
            }
            Self::SetShininess(shininess) => state.set_shininess(shininess),
            Self::AdjustShininess(delta) => {
                let stepped = (state.shininess() + delta).max(MIN_STEPPED_SHININESS);
                state.set_shininess(stepped)
            }
            Self::LightColor(color) => {
                state.set_light_color(color);
                Ok(())
            }
            Self::SpecularColor(color) => {
                state.set_specular_color(color);
                Ok(())
            }
        }
    }
}

/// Keys the interactive viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Left,
    Right,
    Up,
    Down,
    Digit(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyBindings {
    pub rotation_step_degrees: f32,
    pub shininess_step: f32,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            rotation_step_degrees: 5.0,
            shininess_step: 10.0,
        }
    }
}

impl KeyBindings {
    /// Left/Right rotate, Up/Down change shininess, 1-4 pick the light
    /// color and Shift+1-4 the specular color. Other keys map to nothing.
    pub fn interaction(&self, key: ControlKey, shift: bool) -> Option<Interaction> {
        let interaction = match key {
            ControlKey::Left => Interaction::RotateBy(-self.rotation_step_degrees),
            ControlKey::Right => Interaction::RotateBy(self.rotation_step_degrees),
            ControlKey::Up => Interaction::AdjustShininess(self.shininess_step),
            ControlKey::Down => Interaction::AdjustShininess(-self.shininess_step),
            ControlKey::Digit(digit) => {
                let color = palette_for_digit(digit)?;
                if shift {
                    Interaction::SpecularColor(color)
                } else {
                    Interaction::LightColor(color)
                }
            }
        };
        debug!("{key:?} (shift: {shift}) -> {interaction:?}");
        Some(interaction)
    }
}

fn palette_for_digit(digit: u8) -> Option<PaletteColor> {
    let index = usize::from(digit).checked_sub(1)?;
    PaletteColor::ALL.get(index).copied()
}
