use letterlight::gpu::recording::FaultPoint;
use letterlight::gpu::{GpuCommand, Primitive, ShaderKind, UniformValue};
use letterlight::{
    FrameOutcome, FrameRenderer, Matrix4, PaletteColor, RecordingGpu, RenderError, RenderState,
    StaticSurface, Viewer, ViewerConfig,
};

fn reference_viewer() -> Viewer<RecordingGpu, StaticSurface> {
    Viewer::new(
        RecordingGpu::new(800, 600),
        StaticSurface::new(800, 600),
        &ViewerConfig::default(),
    )
    .expect("reference scene prepares")
}

fn uploaded(viewer: &Viewer<RecordingGpu, StaticSurface>, name: &str) -> Option<UniformValue> {
    let program = viewer.renderer().program()?.program();
    viewer.gpu().uniform_value(program, name)
}

fn uploaded_matrix(viewer: &Viewer<RecordingGpu, StaticSurface>, name: &str) -> Matrix4 {
    match uploaded(viewer, name) {
        Some(UniformValue::Mat4(values)) => Matrix4::from_cols_array(values),
        other => panic!("{name} uploaded as {other:?}"),
    }
}

#[test]
fn reference_scene_draws_the_whole_letter_once() {
    let mut viewer = reference_viewer();
    let outcome = viewer.render().unwrap();
    assert_eq!(
        outcome,
        FrameOutcome::Drawn {
            vertex_count: 96,
            resized: false
        }
    );
    assert_eq!(
        viewer.gpu().draw_calls(),
        vec![(Primitive::Triangles, 0, 96)]
    );
    assert_eq!(viewer.gpu().frames_presented(), 1);
}

#[test]
fn square_display_draws_the_same_letter() {
    let mut viewer = Viewer::new(
        RecordingGpu::new(600, 600),
        StaticSurface::new(600, 600),
        &ViewerConfig::default(),
    )
    .expect("square scene prepares");
    let outcome = viewer.render().unwrap();
    assert_eq!(
        outcome,
        FrameOutcome::Drawn {
            vertex_count: 96,
            resized: false
        }
    );
    assert_eq!(
        viewer.gpu().draw_calls(),
        vec![(Primitive::Triangles, 0, 96)]
    );
    assert_eq!(viewer.gpu().frames_presented(), 1);
    assert_eq!(viewer.gpu().current_viewport(), (0, 0, 600, 600));
}

#[test]
fn full_turn_matches_no_turn() {
    let mut viewer = reference_viewer();
    viewer.set_rotation_degrees(0.0).unwrap();
    let unturned = uploaded_matrix(&viewer, "world_view_projection");
    viewer.set_rotation_degrees(360.0).unwrap();
    let turned = uploaded_matrix(&viewer, "world_view_projection");
    assert!(
        turned.abs_diff_eq(&unturned, 1e-4),
        "{turned:?} vs {unturned:?}"
    );
}

#[test]
fn red_light_uploads_the_exact_palette_value() {
    let mut viewer = reference_viewer();
    viewer.set_light_color(PaletteColor::Red).unwrap();
    assert_eq!(
        uploaded(&viewer, "light_color"),
        Some(UniformValue::Vec3([1.0, 0.6, 0.6]))
    );
    assert_eq!(
        uploaded(&viewer, "specular_color"),
        Some(UniformValue::Vec3([1.0, 1.0, 1.0]))
    );
}

#[test]
fn failed_uniform_upload_skips_the_draw_and_the_next_frame_recovers() {
    let mut viewer = reference_viewer();
    viewer.gpu_mut().fail_next(FaultPoint::Uniform);
    let err = viewer.render().unwrap_err();
    assert!(matches!(err, RenderError::Gpu(_)), "{err}");
    assert!(viewer.gpu().draw_calls().is_empty());
    assert_eq!(viewer.state(), &RenderState::default());

    viewer.render().unwrap();
    assert_eq!(viewer.gpu().draw_calls().len(), 1);
    assert_eq!(viewer.gpu().frames_presented(), 1);
}

#[test]
fn shader_compile_failure_is_fatal_at_startup() {
    let mut gpu = RecordingGpu::default();
    gpu.fail_next(FaultPoint::CompileShader);
    let err = Viewer::new(gpu, StaticSurface::new(800, 600), &ViewerConfig::default())
        .unwrap_err();
    match err {
        RenderError::ShaderCompile { kind, log } => {
            assert_eq!(kind, ShaderKind::Vertex);
            assert!(log.contains("compile failure"), "{log}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn inactive_uniform_is_skipped_not_fatal() {
    let mut gpu = RecordingGpu::new(800, 600);
    gpu.deactivate_uniform("shininess");
    let mut renderer = FrameRenderer::new(gpu);
    renderer.prepare().unwrap();

    let program = renderer.program().unwrap();
    assert_eq!(program.missing().len(), 1);
    assert_eq!(program.missing()[0].name, "shininess");

    renderer
        .render_frame(&StaticSurface::new(800, 600), &RenderState::default())
        .unwrap();
    let uniforms = renderer
        .gpu()
        .commands()
        .iter()
        .filter(|command| matches!(command, GpuCommand::Uniform { .. }))
        .count();
    assert_eq!(uniforms, 8);
    assert_eq!(renderer.gpu().draw_calls().len(), 1);
}

#[test]
fn resize_between_frames_follows_the_display() {
    let mut renderer = FrameRenderer::new(RecordingGpu::new(800, 600));
    renderer.prepare().unwrap();
    let state = RenderState::default();
    renderer
        .render_frame(&StaticSurface::new(800, 600), &state)
        .unwrap();
    let outcome = renderer
        .render_frame(&StaticSurface::new(1280, 720), &state)
        .unwrap();
    assert_eq!(
        outcome,
        FrameOutcome::Drawn {
            vertex_count: 96,
            resized: true
        }
    );
    assert_eq!(renderer.gpu().current_viewport(), (0, 0, 1280, 720));
}
