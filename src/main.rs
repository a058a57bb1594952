use clap::Parser;
use std::{error::Error, fs::File, path::PathBuf};
use tuibars::config::{default_log_file, Config};

#[derive(Debug, Parser)]
#[clap(about = "Bar graph spectrum visualizer for mp3 files")]
struct Args {
  /// File (or directory) to play on startup. May be repeated.
  #[clap(short, long)]
  path: Vec<PathBuf>,
  /// Device pixels per terminal column (1 to 64).
  #[clap(long, default_value_t = 8)]
  cell_px: u32,
  /// Most frames drawn per second.
  #[clap(long, default_value_t = 60)]
  fps: u32,
  /// Where logs are written; the terminal belongs to the UI.
  #[clap(long)]
  log_file: Option<PathBuf>,
}

impl From<Args> for Config {
  fn from(args: Args) -> Self {
    Config {
      paths: args.path,
      cell_px: args.cell_px,
      fps: args.fps,
      log_file: args.log_file.unwrap_or_else(default_log_file),
    }
  }
}

fn main() -> Result<(), Box<dyn Error>> {
  let config = Config::from(Args::parse()).validate()?;

  let log_file = File::create(&config.log_file)?;
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    .format_timestamp_millis()
    .target(env_logger::Target::Pipe(Box::new(log_file)))
    .init();
  log::info!("tuibars starting up, logging to {}", config.log_file.display());

  let res = tuibars::app::run(config);
  if let Err(e) = res {
    log::error!("{:?}", e);
    println!("{:?}", e);
  }

  Ok(())
}
