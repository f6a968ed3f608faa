use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use reaper::console::Console;
use reaper::{ConfigSource, PurgeConfig, PurgeService};
use reaper_blocks::MaterialCatalog;
use reaper_chunk::MemoryWorld;
use reaper_region::{CuboidRegions, RegionManager, StaticCompanions};
use reaper_store::DataDocument;

#[derive(Parser, Debug)]
#[command(name = "reaper", about = "Removes unwanted blocks from loaded chunks")]
struct Args {
    /// Configuration file; written with defaults if missing
    #[arg(long, default_value = "reaper.toml")]
    config: PathBuf,

    /// Exclusion data file
    #[arg(long, default_value = "data.toml")]
    data: PathBuf,

    /// Extra material names (`materials = [...]`) on top of the built-in set
    #[arg(long)]
    materials: Option<PathBuf>,

    /// Optional cuboid region definitions; enables region protection
    #[arg(long)]
    regions: Option<PathBuf>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Height of every chunk column in the demo world
    #[arg(long, default_value_t = 64)]
    height: usize,

    /// Chunks loaded around the origin at startup (radius)
    #[arg(long, default_value_t = 1)]
    chunks: i32,
}

fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    let cfg = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        args.log_level,
        cfg.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = &args.log_file {
        loggers.push(WriteLogger::new(args.log_level, cfg, File::create(path)?));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

fn companions(args: &Args) -> Result<StaticCompanions, Box<dyn Error>> {
    let Some(path) = &args.regions else {
        return Ok(StaticCompanions::default());
    };
    let regions = CuboidRegions::load_from_path(path)?;
    log::info!("{} region(s) loaded from {}", regions.len(), path.display());
    let manager: Arc<dyn RegionManager> = Arc::new(regions);
    Ok(StaticCompanions {
        manager: Some(manager),
        editor: true,
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    if PurgeConfig::save_default(&args.config)? {
        log::info!("wrote default configuration to {}", args.config.display());
    }

    let catalog = match &args.materials {
        Some(path) => MaterialCatalog::from_path(path)?,
        None => MaterialCatalog::builtin(),
    };
    log::debug!("{} materials known", catalog.len());
    let companions = companions(&args)?;
    let mut service = PurgeService::new(
        ConfigSource::File(args.config.clone()),
        catalog,
        DataDocument::open(args.data.clone()),
    );
    service.reload(&companions)?;

    let mut host = MemoryWorld::new();
    host.add_world("world", args.height);
    host.add_world("world_nether", args.height);
    let mut console = Console::new(service, host, companions);
    for cz in -args.chunks..=args.chunks {
        for cx in -args.chunks..=args.chunks {
            if let Err(e) = console.run_line(&format!("load world {} {}", cx, cz)) {
                log::warn!("{}", e);
            }
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim() == "quit" {
            break;
        }
        match console.run_line(&line) {
            Ok(replies) => {
                for reply in replies {
                    writeln!(stdout, "{}", reply)?;
                }
            }
            Err(e) => writeln!(stdout, "error: {}", e)?,
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    Ok(())
}
