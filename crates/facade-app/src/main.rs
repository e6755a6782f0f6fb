//! Command-line entry point (native).
//!
//! Composes a background photo and any number of diagrams, then writes
//! the rendered frame as a PNG.

#[cfg(feature = "native")]
mod cli {
    use clap::Parser;
    use facade_app::{AppConfig, Scene, ShortcutRegistry, ThreadedLoader};
    use facade_core::image::ImageRef;
    use kurbo::Size;
    use std::path::PathBuf;
    use std::time::Duration;

    const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

    #[derive(Parser, Debug)]
    #[command(name = "facade-planner")]
    #[command(about = "Compose diagrams over a facade photo and export the view as PNG")]
    pub struct Args {
        /// Background photo
        #[arg(required_unless_present = "shortcuts")]
        background: Option<PathBuf>,

        /// Diagram images, placed in order
        diagrams: Vec<PathBuf>,

        /// Output directory (defaults to the config's output_dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print keyboard shortcuts and exit
        #[arg(long)]
        shortcuts: bool,
    }

    pub fn run(args: Args) -> Result<(), String> {
        if args.shortcuts {
            ShortcutRegistry::print_all();
            return Ok(());
        }
        let Some(background) = args.background else {
            return Err("A background image is required".to_string());
        };

        let config = match &args.config {
            Some(path) => AppConfig::load(path).map_err(|e| e.to_string())?,
            None => AppConfig::default(),
        };
        config.validate().map_err(|e| e.to_string())?;
        let clear_color = config.clear_color().map_err(|e| e.to_string())?;
        log::info!("Starting {}", config.title);

        let viewport = Size::new(config.width as f64, config.height as f64);
        let mut scene = Scene::new(config.scene.clone(), viewport, ThreadedLoader::new()).with_clear_color(clear_color);
        scene.on_load_error(|image, error| eprintln!("Could not load {}: {}", image.name(), error));

        scene.set_background_image(Some(ImageRef::from_path(background)));
        for diagram in args.diagrams {
            scene.add_diagram(ImageRef::from_path(diagram), None);
        }
        scene.wait_for_loads(LOAD_TIMEOUT);

        let out = args.out.unwrap_or(config.output_dir);
        let export = scene.export_frame_to_file(&out);
        // First frame hides the gizmo; later ticks resolve once the delay passes.
        while scene.is_exporting() {
            scene.tick().map_err(|e| e.to_string())?;
            if scene.is_exporting() {
                std::thread::sleep(Duration::from_millis(10));
            }
        }

        let path = pollster::block_on(export).map_err(|e| e.to_string())?;
        println!("{}", path.display());
        Ok(())
    }

}

#[cfg(feature = "native")]
fn main() {
    use clap::Parser;

    env_logger::init();
    if let Err(message) = cli::run(cli::Args::parse()) {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    eprintln!("Native feature not enabled. Use `cargo run --features native`");
    std::process::exit(1);
}
