use anyhow::Result;
use std::path::PathBuf;

use gallery_ingest::config::Config;
use gallery_ingest::db::Database;
use gallery_ingest::ingest::ImportRunner;
use gallery_ingest::logging;

struct Args {
    config_path: Option<PathBuf>,
    root: PathBuf,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut root = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("gallery-import {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            arg if !arg.starts_with('-') && root.is_none() => {
                root = Some(PathBuf::from(arg));
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(root) = root else {
        eprintln!("Error: an import root directory is required");
        print_help();
        std::process::exit(1);
    };

    Args { config_path, root }
}

fn print_help() {
    println!(
        r#"gallery-import - photo gallery ingestion pipeline

USAGE:
    gallery-import [OPTIONS] <ROOT>

ARGS:
    ROOT                Directory to import, laid out as
                        continent/country/province/city[/date]/photo

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    GALLERY_LOG         Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/gallery-ingest/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Logging uses journald on Linux, file fallback otherwise
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let db = Database::open(&config.db_path)?;
    db.initialize()?;
    db.ping()?;

    let runner = ImportRunner::new(config);
    let report = runner.run(&db, &args.root)?;

    println!(
        "Imported {} of {} photos ({} failed, {} skipped)",
        report.succeeded, report.discovered, report.failed, report.skipped
    );
    for failure in &report.failures {
        eprintln!("  {failure}");
    }

    // Per-photo failures are reported above but do not fail the run.
    Ok(())
}
