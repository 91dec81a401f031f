use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pcsensor_core::{Reporter, Sensor, SensorConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "TEMPer1 USB temperature sensor reader", long_about = None)]
struct Args {
    /// USB bus to search for sensors
    #[arg(short, long)]
    bus: Option<u8>,

    /// USB device address to search for sensors (needs --bus)
    #[arg(short, long)]
    device: Option<u8>,

    /// Print the bare value only
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Read bus/device/quiet defaults from a TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List matching sensors and exit
    #[arg(long)]
    list: bool,
}

impl Args {
    /// Flags given on the command line win over the config file.
    fn merge(&self, mut config: SensorConfig) -> SensorConfig {
        if self.bus.is_some() {
            config.bus = self.bus;
        }
        if self.device.is_some() {
            config.device = self.device;
        }
        config.quiet |= self.quiet;
        config
    }
}

fn run(args: &Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => SensorConfig::load_from_file(path)?,
        None => SensorConfig::default(),
    };
    let config = args.merge(file_config);
    let sensor = Sensor::new(config.selector());

    if args.list {
        for device in sensor.list()? {
            println!("{device}");
        }
        return Ok(());
    }

    info!(
        vid = %format!("{:04x}", pcsensor_core::protocol::SENSOR_VENDOR_ID),
        pid = %format!("{:04x}", pcsensor_core::protocol::SENSOR_PRODUCT_ID),
        "Opening device"
    );
    let temperature = sensor.read()?;

    Reporter::new(config.output_mode()).report(&mut std::io::stdout().lock(), temperature)?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
