use std::io;
use std::path::PathBuf;
use structopt::StructOpt;

use authlog::config::Config;
use authlog::filter::{FilterConfig, FilterOutcome, FilterPipeline};
use authlog::geolocation;
use authlog::input::AuthLogReader;
use authlog::output::{OutputFormat, OutputHandler};

/// Summarize SSH login attempts from an auth log
#[derive(StructOpt, Debug)]
#[structopt(name = "authlog", about = "SSH authentication log analyzer")]
struct Cli {
    /// Enables debug output
    #[structopt(short = "b", long)]
    debug: bool,

    /// Outputs results in JSON format
    #[structopt(short, long)]
    json: bool,

    /// Auth log file to parse [default: /var/log/auth.log]
    #[structopt(short, long)]
    file: Option<PathBuf>,

    /// Limits output to entries that have at least n login attempts
    #[structopt(short = "n", long, default_value = "0")]
    threshold: usize,

    /// Limits output to entries that originate from the specified IP address
    #[structopt(short, long)]
    ip: Option<String>,

    /// Limits output to entries that are logging in as the specified user
    #[structopt(short, long)]
    user: Option<String>,

    /// Limits output to entries whose location matches the specified regex
    #[structopt(short, long)]
    location: Option<String>,

    /// Limits output to entries from the specified date (ex. "Jan 1")
    #[structopt(short, long)]
    date: Option<String>,

    /// Configuration file, read if it exists
    #[structopt(short, long, default_value = "authlog.toml")]
    config: PathBuf,

    /// Write the default configuration to this path and exit
    #[structopt(long)]
    write_config: Option<PathBuf>,
}

impl Cli {
    fn filters(&self) -> FilterConfig {
        let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
        FilterConfig {
            threshold: self.threshold,
            address: non_empty(&self.ip),
            user: non_empty(&self.user),
            location: non_empty(&self.location),
            date: non_empty(&self.date),
        }
    }
}

fn main() {
    let cli = Cli::from_args();

    let level = if cli.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref output) = cli.write_config {
        Config::default().to_file(output)?;
        println!("Default configuration written to: {:?}", output);
        return Ok(());
    }

    let config = if cli.config.exists() {
        log::debug!("loading configuration from {:?}", cli.config);
        Config::from_file(&cli.config)?
    } else {
        Config::default()
    };

    let locator = geolocation::from_config(&config.geolocation)?;
    let pipeline = FilterPipeline::new(cli.filters(), locator.as_ref())?;

    let log_file = cli.file.clone().unwrap_or_else(|| config.log_file.clone());
    let mut attempts = AuthLogReader::new(&log_file).read()?;
    log::debug!("raw file data: {:?}", attempts);

    if pipeline.apply(&mut attempts) == FilterOutcome::NoDateMatch {
        log::info!("found no date matching supplied filter; exiting");
        return Ok(());
    }
    log::debug!("filtered data: {:?}", attempts);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        config.output.format
    };
    log::debug!("outputting {:?}", format);

    let handler = OutputHandler::new(format, cli.threshold);
    let stdout = io::stdout();
    handler.write_log(&attempts, &mut stdout.lock())?;

    log::debug!("operation complete");
    Ok(())
}
