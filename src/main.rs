//! vcmount - Interactive VeraCrypt mount helper
//!
//! Usage:
//!   vcmount                        - Mount a volume, wait, then unmount it
//!   vcmount unmount --letter <X>   - Unmount a volume left mounted
//!   vcmount config show            - Show the configured executable
//!   vcmount config set <path>      - Set the executable
//!   vcmount config detect          - Find the executable automatically

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vcmount::{
    config::{self, clean_path_input, Config},
    console::Terminal,
    drive::{DriveLetter, SystemDrives},
    locate,
    opener::{FileManager, NoOpen, Opener},
    session::{Session, SessionOptions},
    veracrypt::VeraCrypt,
    Error, Result,
};

#[derive(Parser)]
#[command(name = "vcmount")]
#[command(author = "vcmount Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mount and unmount VeraCrypt volumes interactively")]
struct Cli {
    /// Configuration file path (defaults to the application-data directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// VeraCrypt executable to use and remember
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Volume to mount instead of prompting
    #[arg(long)]
    volume: Option<PathBuf>,

    /// Drive letter to mount on instead of the first free one
    #[arg(long)]
    letter: Option<DriveLetter>,

    /// Read the volume password from file
    #[arg(long)]
    password_file: Option<PathBuf>,

    /// Don't open the mounted drive in the file manager
    #[arg(long)]
    no_open: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Unmount a volume
    Unmount {
        /// Drive letter the volume is mounted on
        #[arg(long)]
        letter: DriveLetter,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the configured executable
    Show,

    /// Set the executable
    Set {
        /// Path to the VeraCrypt executable
        path: PathBuf,
    },

    /// Find the executable in the Program Files directories
    Detect,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging; prompts own stdout, so logs go to stderr
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set up logging: {}", e);
    }

    if let Err(e) = run_command(cli) {
        if e.is_input_error() {
            eprintln!("{}", e);
        } else {
            error!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    match cli.command {
        None => cmd_mount(
            config_path,
            cli.executable,
            cli.volume,
            cli.letter,
            cli.password_file,
            cli.no_open,
        ),

        Some(Commands::Unmount { letter }) => cmd_unmount(&config_path, cli.executable, letter),

        Some(Commands::Config(config_cmd)) => run_config_command(config_cmd, &config_path),
    }
}

fn run_config_command(command: ConfigCommands, config_path: &Path) -> Result<()> {
    match command {
        ConfigCommands::Show => cmd_config_show(config_path),
        ConfigCommands::Set { path } => cmd_config_set(config_path, &path),
        ConfigCommands::Detect => cmd_config_detect(config_path),
    }
}

fn cmd_mount(
    config_path: PathBuf,
    executable: Option<PathBuf>,
    volume: Option<PathBuf>,
    letter: Option<DriveLetter>,
    password_file: Option<PathBuf>,
    no_open: bool,
) -> Result<()> {
    let mut options = SessionOptions::new(config_path);
    options.executable = executable;
    options.executable_override = config::env_executable();
    options.volume = volume;
    options.letter = letter;
    options.password = password_file
        .as_deref()
        .map(config::read_password_file)
        .transpose()?;

    if no_open {
        run_session(NoOpen, options)
    } else {
        run_session(FileManager, options)
    }
}

fn run_session<O: Opener>(opener: O, options: SessionOptions) -> Result<()> {
    let mut session = Session::new(Terminal::new(), SystemDrives, opener, options);
    session.run()
}

fn cmd_unmount(config_path: &Path, executable: Option<PathBuf>, letter: DriveLetter) -> Result<()> {
    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();
    if let Some(executable) = executable {
        config.executable = Some(executable);
    }

    let veracrypt = VeraCrypt::new(config.validate()?);
    info!("Using VeraCrypt at {:?}", veracrypt.executable());
    veracrypt.unmount(letter)?;

    println!("Volume unmounted successfully from drive {}", letter.root().display());
    Ok(())
}

fn cmd_config_show(config_path: &Path) -> Result<()> {
    println!("vcmount Configuration");
    println!("=====================");
    println!();
    for line in config_summary(config_path, config::env_executable())? {
        println!("{}", line);
    }
    Ok(())
}

/// Lines shown by `config show`; an override applies even without a saved file
fn config_summary(config_path: &Path, env_override: Option<PathBuf>) -> Result<Vec<String>> {
    let mut lines = vec![format!("Configuration file: {}", config_path.display())];

    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    if let Some(executable) = env_override {
        lines.push(format!("Executable (saved): {}", display_executable(&config)));
        lines.push(format!("Overridden by {}", config::EXECUTABLE_ENV_VAR));
        config.executable = Some(executable);
    }

    lines.push(format!("Executable: {}", display_executable(&config)));
    if config.executable.is_some() {
        let status = if config.validate().is_ok() { "found" } else { "missing" };
        lines.push(format!("Status: {}", status));
    }
    Ok(lines)
}

fn cmd_config_set(config_path: &Path, path: &Path) -> Result<()> {
    let config = Config::new(clean_path_input(&path.to_string_lossy()));
    config.validate()?;
    config.save(config_path)?;

    info!("Saved configuration to {:?}", config_path);
    println!("VeraCrypt executable file is set to \"{}\".", display_executable(&config));
    Ok(())
}

fn cmd_config_detect(config_path: &Path) -> Result<()> {
    let found = locate::detect().ok_or_else(|| {
        Error::Config("Could not find VeraCrypt executable file automatically.".to_string())
    })?;

    Config::new(&found).save(config_path)?;
    println!(
        "VeraCrypt executable file is automatically set to \"{}\".",
        found.display()
    );
    Ok(())
}

fn display_executable(config: &Config) -> String {
    config
        .executable
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not configured)".to_string())
}
