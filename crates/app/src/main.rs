mod shell;

use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use media_sections_core::{AppConfig, ImageExporter, ImageSource, TracingMediaIndex};
use shell::Shell;
use tracing_subscriber::EnvFilter;

fn main() -> media_sections_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { script } => run_shell(&config, script.as_deref()),
        Commands::Save { image, out } => run_save(config, image, out),
    }
}

fn load_config(path: Option<&Path>) -> media_sections_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn run_shell(config: &AppConfig, script: Option<&Path>) -> media_sections_core::Result<()> {
    let input: Box<dyn BufRead> = match script {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut shell = Shell::new(config);
    shell.run_lines(input, |notice| println!("[{:?}] {notice}", notice.duration))
}

fn run_save(
    mut config: AppConfig,
    image: Option<PathBuf>,
    out: Option<PathBuf>,
) -> media_sections_core::Result<()> {
    if let Some(out) = out {
        config.export.pictures_dir = out;
    }
    let image = image.unwrap_or_else(|| config.assets.image_path.clone());

    let exporter = ImageExporter::new(&config.export, Box::new(TracingMediaIndex));
    let path = exporter.export(&ImageSource::File(image))?;
    println!("{}", path.display());
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Four-section media demo shell", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the sections with commands read from a script or stdin.
    Run {
        /// File with one command per line. Reads stdin when omitted.
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Save the bundled image once and print the resulting path.
    Save {
        /// Image to save instead of the configured bundled one.
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Directory to save into instead of the configured pictures folder.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}
