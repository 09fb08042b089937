//! foldterm - replay recorded terminal output
//!
//! Reads raw pty output, such as a `script` typescript, from a file or
//! stdin, runs it through the terminal engine and prints the resulting
//! buffer.
//!
//! # Quick Start
//!
//! ```text
//! foldterm session.log              # Styled replay at 80x24
//! foldterm -w 40 session.log        # Refold to 40 columns
//! foldterm --plain < session.log    # Plain text dump with cursor marker
//! ```

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use foldterm::config::Config;
use foldterm::core::session::{SessionManager, SessionOptions};
use foldterm::ui::{DebugRenderer, StyledRenderer};

/// Command line options
#[derive(Debug, Default)]
struct Args {
    width: Option<usize>,
    height: Option<usize>,
    /// Feed input in reads of this many bytes
    chunk: Option<usize>,
    /// Print the debug dump instead of styled output
    plain: bool,
    config: Option<PathBuf>,
    input: Option<PathBuf>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("foldterm {}", VERSION);
}

fn print_help() {
    eprintln!("foldterm {} - Replay terminal output through a folding VT engine", VERSION);
    eprintln!();
    eprintln!("Usage: foldterm [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Reads FILE, or stdin when FILE is omitted or '-'.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -w, --width <N>       Terminal width (default: from config or 80)");
    eprintln!("  -H, --height <N>      Terminal height (default: from config or 24)");
    eprintln!("      --chunk <N>       Feed input N bytes at a time");
    eprintln!("      --plain           Print a plain text dump with a cursor marker");
    eprintln!("  -c, --config <FILE>   Load configuration from FILE");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.foldterm/config.toml");
    eprintln!("Logging: RUST_LOG overrides the configured level");
}

fn parse_number(args: &[String], i: usize, name: &str) -> Result<usize, String> {
    let value = args
        .get(i)
        .ok_or_else(|| format!("Missing value for {}", name))?;
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Invalid value for {}: {}", name, value)),
    }
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-w" | "--width" => {
                i += 1;
                parsed.width = Some(parse_number(&args, i, "--width")?);
            }
            "-H" | "--height" => {
                i += 1;
                parsed.height = Some(parse_number(&args, i, "--height")?);
            }
            "--chunk" => {
                i += 1;
                parsed.chunk = Some(parse_number(&args, i, "--chunk")?);
            }
            "--plain" => {
                parsed.plain = true;
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing config file argument")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "-" => {
                parsed.input = None;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            arg => {
                if parsed.input.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                parsed.input = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Initialize logging to the configured file, or stderr
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_file = config.logging.file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        fs::OpenOptions::new().create(true).append(true).open(path).ok()
    });

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match path {
        Some(path) => {
            bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
        }
    }
    Ok(bytes)
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let (config, load_error) = match &args.config {
        Some(path) => (Config::load_from(path)?, None),
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };
    init_logging(&config);
    if let Some(e) = load_error {
        warn!("{}, using defaults", e);
    }

    let mut options = SessionOptions::from(&config.terminal);
    if let Some(width) = args.width {
        options.width = width;
    }
    if let Some(height) = args.height {
        options.height = height;
    }
    if options.width == 0 || options.height == 0 {
        bail!("Terminal size must be non-zero, got {}x{}", options.width, options.height);
    }

    let input = read_input(args.input.as_ref())?;
    info!(
        "Replaying {} bytes at {}x{}",
        input.len(),
        options.width,
        options.height
    );

    let mut manager = SessionManager::new(options);
    manager.create_session();

    let chunk = args.chunk.unwrap_or(input.len().max(1));
    for piece in input.chunks(chunk) {
        manager.feed_bytes(piece);
    }
    manager.finish();

    if manager.count() > 1 {
        info!("{} sessions finalized during replay", manager.count() - 1);
    }
    // A session opened by the final OSC 2025 has nothing to show yet
    let session = manager
        .sessions()
        .iter()
        .rev()
        .find(|s| !s.state.rows().is_empty())
        .or_else(|| manager.active());
    let Some(session) = session else {
        bail!("No active session");
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.plain {
        write!(out, "{}", DebugRenderer::render(&session.state))?;
    } else {
        StyledRenderer::new().render(&mut out, &session.state)?;
    }
    out.flush()?;

    Ok(())
}
