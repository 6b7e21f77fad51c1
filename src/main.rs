use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{info, warn, LevelFilter};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{WindowAttributes, WindowId};

use letterlight::gpu::{UniformValue, WgpuBackend};
use letterlight::{
    ControlKey, FrameOutcome, KeyBindings, PaletteColor, RecordingGpu, RenderError, RenderState,
    SharedSurface, StaticSurface, Viewer, ViewerConfig,
};

const USAGE: &str = "Usage: letterlight [--rotation <degrees>] [--shininess <value>] \
[--light-color <red|green|blue|white>] [--specular-color <red|green|blue|white>] \
[--size <WIDTHxHEIGHT>] [--headless]";

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let mut builder = env_logger::Builder::new();
    if let Ok(filter) = env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder
            .filter_level(LevelFilter::Info)
            .filter_module("wgpu_core", LevelFilter::Warn)
            .filter_module("wgpu_hal", LevelFilter::Warn)
            .filter_module("naga", LevelFilter::Warn);
    }
    builder.init();
}

fn run() -> Result<()> {
    let Some(options) = CliOptions::parse(env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };
    let config = options.to_config();

    if options.headless {
        return run_headless(&config);
    }
    match run_interactive(&config) {
        Ok(()) => Ok(()),
        Err(err) if is_unavailable_display(&err) => {
            eprintln!("{err}. Falling back to --headless mode.");
            run_headless(&config)
        }
        Err(err) => Err(err),
    }
}

fn is_unavailable_display(err: &anyhow::Error) -> bool {
    err.downcast_ref::<WindowInitError>().is_some()
        || matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::SurfaceUnavailable(_))
        )
}

fn run_headless(config: &ViewerConfig) -> Result<()> {
    let gpu = RecordingGpu::new(config.width, config.height);
    let surface = StaticSurface::new(config.width, config.height);
    let mut viewer =
        Viewer::new(gpu, surface, config).context("failed to prepare the renderer")?;
    let outcome = viewer.render().context("failed to render the frame")?;

    let vertices = match outcome {
        FrameOutcome::Drawn { vertex_count, .. } => vertex_count,
        FrameOutcome::Skipped => 0,
    };
    println!(
        "Rendered frame {}x{}: {} draw call(s), {vertices} vertices",
        config.width,
        config.height,
        viewer.gpu().draw_calls().len()
    );
    print_uploaded_uniforms(&viewer);
    viewer.shutdown();
    Ok(())
}

fn print_uploaded_uniforms(viewer: &Viewer<RecordingGpu, StaticSurface>) {
    let Some(program) = viewer.renderer().program().map(|compiled| compiled.program()) else {
        return;
    };
    for name in ["light_color", "specular_color", "shininess"] {
        match viewer.gpu().uniform_value(program, name) {
            Some(UniformValue::Vec3([r, g, b])) => {
                println!(" - {name}=({r:.2}, {g:.2}, {b:.2})");
            }
            Some(UniformValue::Float(value)) => println!(" - {name}={value:.2}"),
            Some(other) => println!(" - {name}={other:?}"),
            None => println!(" - {name} not uploaded"),
        }
    }
}

fn print_final_state(state: &RenderState) {
    println!("Final state:");
    println!(" - rotation={:.2} deg", state.rotation_degrees());
    println!(" - shininess={:.2}", state.shininess());
    println!(" - light_color={}", state.light_color());
    println!(" - specular_color={}", state.specular_color());
}

fn run_interactive(config: &ViewerConfig) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = InteractiveApp::new(config.clone());
    event_loop
        .run_app(&mut app)
        .context("event loop terminated with an error")?;

    if let Some(viewer) = app.viewer.take() {
        print_final_state(viewer.state());
        viewer.shutdown();
    }
    match app.failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

type WindowViewer = Viewer<WgpuBackend, Arc<SharedSurface>>;

struct InteractiveApp {
    config: ViewerConfig,
    bindings: KeyBindings,
    surface: Arc<SharedSurface>,
    viewer: Option<WindowViewer>,
    shift: bool,
    failure: Option<anyhow::Error>,
}

impl InteractiveApp {
    fn new(config: ViewerConfig) -> Self {
        let surface = Arc::new(SharedSurface::new(config.width, config.height));
        Self {
            config,
            bindings: KeyBindings::default(),
            surface,
            viewer: None,
            shift: false,
            failure: None,
        }
    }

    fn open_window(&self, event_loop: &ActiveEventLoop) -> Result<WindowViewer> {
        let attributes = WindowAttributes::default()
            .with_title(self.config.title.as_str())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        let size = window.inner_size();
        self.surface.update(size.width, size.height);

        let gpu = block_on(WgpuBackend::new(Arc::clone(&window)))
            .map_err(|err| RenderError::SurfaceUnavailable(format!("{err:#}")))?;
        let viewer = Viewer::new(gpu, Arc::clone(&self.surface), &self.config)
            .context("failed to prepare the renderer")?;
        info!("opened {}x{} window", size.width, size.height);
        window.request_redraw();
        Ok(viewer)
    }

    fn handle_key(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        if event.state != ElementState::Pressed {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        if code == KeyCode::Escape {
            event_loop.exit();
            return;
        }
        let Some(key) = map_keycode(code) else {
            return;
        };
        let Some(interaction) = self.bindings.interaction(key, self.shift) else {
            return;
        };
        if let Some(viewer) = self.viewer.as_mut() {
            if let Err(err) = viewer.apply(interaction) {
                warn!("{interaction:?} not applied: {err}");
            }
        }
    }
}

impl ApplicationHandler for InteractiveApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() || self.failure.is_some() {
            return;
        }
        match self.open_window(event_loop) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(err) => {
                self.failure = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window_id) = self.viewer.as_ref().map(|viewer| viewer.gpu().window_id()) else {
            return;
        };
        if id != window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.surface.update(size.width, size.height);
                if let Some(viewer) = self.viewer.as_ref() {
                    viewer.gpu().window().request_redraw();
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift = modifiers.state().shift_key();
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event, event_loop),
            WindowEvent::RedrawRequested => {
                // Failed frames are logged by the viewer; the next redraw retries.
                if let Some(viewer) = self.viewer.as_mut() {
                    let _ = viewer.render();
                }
            }
            _ => {}
        }
    }
}

fn map_keycode(code: KeyCode) -> Option<ControlKey> {
    Some(match code {
        KeyCode::ArrowLeft => ControlKey::Left,
        KeyCode::ArrowRight => ControlKey::Right,
        KeyCode::ArrowUp => ControlKey::Up,
        KeyCode::ArrowDown => ControlKey::Down,
        KeyCode::Digit1 | KeyCode::Numpad1 => ControlKey::Digit(1),
        KeyCode::Digit2 | KeyCode::Numpad2 => ControlKey::Digit(2),
        KeyCode::Digit3 | KeyCode::Numpad3 => ControlKey::Digit(3),
        KeyCode::Digit4 | KeyCode::Numpad4 => ControlKey::Digit(4),
        _ => return None,
    })
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    rotation: Option<f32>,
    shininess: Option<f32>,
    light_color: Option<PaletteColor>,
    specular_color: Option<PaletteColor>,
    size: Option<(u32, u32)>,
    headless: bool,
}

impl CliOptions {
    /// `Ok(None)` when help was requested.
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--headless" => options.headless = true,
                "--rotation" => options.rotation = Some(parse_number(&arg, args.next())?),
                "--shininess" => options.shininess = Some(parse_number(&arg, args.next())?),
                "--light-color" => {
                    options.light_color = Some(parse_color(&arg, args.next())?);
                }
                "--specular-color" => {
                    options.specular_color = Some(parse_color(&arg, args.next())?);
                }
                "--size" => options.size = Some(parse_size(&arg, args.next())?),
                other => {
                    return Err(anyhow!("Unknown argument: {other}\n{USAGE}"));
                }
            }
        }
        Ok(Some(options))
    }

    fn to_config(&self) -> ViewerConfig {
        let mut config = ViewerConfig::default();
        if let Some(rotation) = self.rotation {
            config.rotation_degrees = rotation;
        }
        if let Some(shininess) = self.shininess {
            config.shininess = shininess;
        }
        if let Some(color) = self.light_color {
            config.light_color = color;
        }
        if let Some(color) = self.specular_color {
            config.specular_color = color;
        }
        if let Some((width, height)) = self.size {
            config.width = width;
            config.height = height;
        }
        config
    }
}

fn required(flag: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| anyhow!("{flag} expects a value\n{USAGE}"))
}

fn parse_number(flag: &str, value: Option<String>) -> Result<f32> {
    let value = required(flag, value)?;
    value
        .parse()
        .with_context(|| format!("{flag} expects a number, got {value:?}"))
}

fn parse_color(flag: &str, value: Option<String>) -> Result<PaletteColor> {
    let value = required(flag, value)?;
    value
        .parse()
        .with_context(|| format!("{flag} expects red, green, blue or white"))
}

fn parse_size(flag: &str, value: Option<String>) -> Result<(u32, u32)> {
    let value = required(flag, value)?;
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("{flag} expects WIDTHxHEIGHT, got {value:?}"))?;
    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("invalid width in {value:?}"))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("invalid height in {value:?}"))?;
    if width == 0 || height == 0 {
        return Err(anyhow!("{flag} must be at least 1x1, got {value:?}"));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<CliOptions>> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn flags_override_defaults() {
        let options = parse(&[
            "--rotation",
            "30",
            "--light-color",
            "Red",
            "--size",
            "640x480",
            "--headless",
        ])
        .unwrap()
        .unwrap();
        let config = options.to_config();
        assert_eq!(config.rotation_degrees, 30.0);
        assert_eq!(config.light_color, PaletteColor::Red);
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.shininess, ViewerConfig::default().shininess);
        assert!(options.headless);
    }

    #[test]
    fn bad_values_are_usage_errors() {
        assert!(parse(&["--shininess"]).is_err());
        assert!(parse(&["--shininess", "shiny"]).is_err());
        assert!(parse(&["--size", "640"]).is_err());
        assert!(parse(&["--size", "0x480"]).is_err());
        assert!(parse(&["--specular-color", "purple"]).is_err());
        assert!(parse(&["--fullscreen"]).is_err());
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse(&["--headless", "--help"]).unwrap(), None);
    }
}
