use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cube_rig::config;
use cube_rig::ev3::{Brick, Channel};
use cube_rig::motion::calib::{TimingTable, WAITDEG_FAST, WAITDEG_SAFE};
use cube_rig::motion::moves::format_sequence;
use cube_rig::motion::{optim, parse_sequence, Rig};

#[derive(Parser)]
#[command(name = "cube-rig", about = "Drive the cube rig over direct commands")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Link {
    Usb,
    Bluetooth,
    Wifi,
}

#[derive(Subcommand)]
enum Cmd {
    /// Execute a move sequence on the rig
    Exec {
        /// Sequence in solver notation, e.g. "U (R L') F2"
        sequence: String,
        /// Channel kind used for all three bricks
        #[arg(long, value_enum, default_value = "usb")]
        link: Link,
        /// Device node or serial number per brick, in binding order;
        /// wifi falls back to the configured brick serials
        #[arg(long = "device")]
        devices: Vec<String>,
        /// Use the conservative wait thresholds
        #[arg(long)]
        safe: bool,
        /// Optimize half-turn directions against this timing table
        #[arg(long)]
        times: Option<PathBuf>,
        /// Reply deadline in milliseconds (default: wait forever)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Estimate the execution time of a sequence
    Estimate {
        sequence: String,
        /// Timing table JSON
        #[arg(long, default_value = config::TIMING_TABLE_PATH)]
        times: PathBuf,
    },
}

fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Cmd::Exec {
            sequence,
            link,
            devices,
            safe,
            times,
            timeout_ms,
        } => {
            let mut steps = parse_sequence(&sequence)?;
            if let Some(path) = times {
                let table = TimingTable::load(&path)?;
                steps = optim::optimize_directions(&steps, &table)?;
                println!("tuned: {}", format_sequence(&steps));
            }

            let devices: Vec<&str> = if devices.is_empty() && matches!(link, Link::Wifi) {
                config::BRICK_HOSTS.to_vec()
            } else {
                devices.iter().map(String::as_str).collect()
            };
            if devices.len() != 3 {
                return Err("exactly three --device values are required".into());
            }

            let connect = |device: &str| -> Result<Brick, Box<dyn std::error::Error>> {
                let channel = match link {
                    Link::Usb => Channel::open_usb(device)?,
                    Link::Bluetooth => Channel::open_bluetooth(device)?,
                    Link::Wifi => Channel::connect_wifi(Some(device))?,
                };
                let mut brick = Brick::new(channel);
                if let Some(ms) = timeout_ms {
                    brick.set_reply_timeout(Some(Duration::from_millis(ms)));
                }
                Ok(brick)
            };
            let bricks = [
                connect(devices[0])?,
                connect(devices[1])?,
                connect(devices[2])?,
            ];

            let waitdeg = if safe { WAITDEG_SAFE } else { WAITDEG_FAST };
            let rig = Rig::new(bricks, waitdeg);
            let durations = rig.execute(&steps)?;

            let mut total = Duration::ZERO;
            for (step, duration) in steps.iter().zip(&durations) {
                println!("{:>8}  {:.3}s", step.to_string(), duration.as_secs_f64());
                total += *duration;
            }
            println!("total: {:.3}s", total.as_secs_f64());
        }
        Cmd::Estimate { sequence, times } => {
            let steps = parse_sequence(&sequence)?;
            let table = TimingTable::load(&times)?;
            let tuned = optim::optimize_directions(&steps, &table)?;
            println!("tuned: {}", format_sequence(&tuned));
            println!(
                "expected: {:.3}s",
                optim::expected_time(&tuned, &table)?
            );
        }
    }
    Ok(())
}
