use log::{error, info};

use crate::config::ViewerConfig;
use crate::controller::Interaction;
use crate::error::Result;
use crate::gpu::GpuCommands;
use crate::render_state::{PaletteColor, RenderState};
use crate::renderer::{FrameOutcome, FrameRenderer};
use crate::surface::DisplaySurface;

/// Owns the render parameters and redraws after every change.
#[derive(Debug)]
pub struct Viewer<G: GpuCommands, S: DisplaySurface> {
    renderer: FrameRenderer<G>,
    surface: S,
    state: RenderState,
}

impl<G: GpuCommands, S: DisplaySurface> Viewer<G, S> {
    /// Validates `config` and prepares the renderer. Shader or link failures
    /// are returned here and the viewer is not created.
    pub fn new(gpu: G, surface: S, config: &ViewerConfig) -> Result<Self> {
        let state = RenderState::from_config(config)?;
        let mut renderer = FrameRenderer::new(gpu);
        renderer.prepare()?;
        info!(
            "viewer ready: rotation {:.1} deg, shininess {}, light {}, specular {}",
            state.rotation_degrees(),
            state.shininess(),
            state.light_color(),
            state.specular_color()
        );
        Ok(Self {
            renderer,
            surface,
            state,
        })
    }

    /// Draws the current state. A failed frame is logged and returned; the
    /// next call starts a fresh frame.
    pub fn render(&mut self) -> Result<FrameOutcome> {
        self.renderer
            .render_frame(&self.surface, &self.state)
            .inspect_err(|err| error!("frame abandoned: {err}"))
    }

    /// Applies `interaction` and redraws. Nothing is drawn when the value is
    /// rejected.
    pub fn apply(&mut self, interaction: Interaction) -> Result<FrameOutcome> {
        interaction.apply(&mut self.state)?;
        self.render()
    }

    pub fn set_rotation_degrees(&mut self, degrees: f32) -> Result<FrameOutcome> {
        self.apply(Interaction::RotateTo(degrees))
    }

    pub fn set_shininess(&mut self, shininess: f32) -> Result<FrameOutcome> {
        self.apply(Interaction::SetShininess(shininess))
    }

    pub fn set_light_color(&mut self, color: PaletteColor) -> Result<FrameOutcome> {
        self.apply(Interaction::LightColor(color))
    }

    pub fn set_specular_color(&mut self, color: PaletteColor) -> Result<FrameOutcome> {
        self.apply(Interaction::SpecularColor(color))
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn renderer(&self) -> &FrameRenderer<G> {
        &self.renderer
    }

    pub fn gpu(&self) -> &G {
        self.renderer.gpu()
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        self.renderer.gpu_mut()
    }

    /// Releases every GPU object and hands the backend back.
    pub fn shutdown(mut self) -> G {
        self.renderer.release();
        self.renderer.into_gpu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::gpu::{RecordingGpu, UniformValue};
    use crate::surface::StaticSurface;

    fn viewer() -> Viewer<RecordingGpu, StaticSurface> {
        Viewer::new(
            RecordingGpu::new(800, 600),
            StaticSurface::new(800, 600),
            &ViewerConfig::default(),
        )
        .unwrap()
    }

    fn uploaded(viewer: &Viewer<RecordingGpu, StaticSurface>, name: &str) -> UniformValue {
        let program = viewer.renderer().program().unwrap().program();
        viewer.gpu().uniform_value(program, name).unwrap()
    }

    #[test]
    fn every_setter_redraws() {
        let mut viewer = viewer();
        viewer.render().unwrap();
        viewer.set_rotation_degrees(45.0).unwrap();
        viewer.set_shininess(20.0).unwrap();
        viewer.set_light_color(PaletteColor::Blue).unwrap();
        viewer.set_specular_color(PaletteColor::Green).unwrap();
        assert_eq!(viewer.gpu().frames_presented(), 5);
        assert_eq!(uploaded(&viewer, "shininess"), UniformValue::Float(20.0));
        assert_eq!(
            uploaded(&viewer, "light_color"),
            UniformValue::Vec3([0.6, 0.6, 1.0])
        );
        assert_eq!(
            uploaded(&viewer, "specular_color"),
            UniformValue::Vec3([0.6, 1.0, 0.6])
        );
    }

    #[test]
    fn rejected_setter_does_not_draw() {
        let mut viewer = viewer();
        let err = viewer.set_shininess(0.0).unwrap_err();
        assert!(matches!(err, RenderError::InvalidParameter { .. }));
        assert_eq!(viewer.gpu().frames_presented(), 0);
        assert_eq!(viewer.state().shininess(), 150.0);
    }

    #[test]
    fn invalid_config_fails_before_touching_the_gpu() {
        let config = ViewerConfig {
            rotation_degrees: f32::NAN,
            ..ViewerConfig::default()
        };
        let err = Viewer::new(
            RecordingGpu::default(),
            StaticSurface::new(10, 10),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidParameter { name: "rotation", .. }));
    }

    #[test]
    fn shutdown_releases_gpu_objects() {
        let gpu = viewer().shutdown();
        assert_eq!(gpu.live_programs(), 0);
        assert_eq!(gpu.live_buffers(), 0);
        assert_eq!(gpu.live_vertex_arrays(), 0);
    }
}
