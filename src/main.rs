//! locio command line.
//!
//! # Usage
//!
//! ```bash
//! # Run a coordinator that relays notices and echoes requests
//! locio master
//!
//! # Where does a strategy's publisher bind, and where do subscribers connect?
//! locio address --category strategy --group demo --name s1 --protocol pub
//! locio address --category strategy --group demo --name s1 --protocol sub --connect
//!
//! # Talk to the master
//! locio publish '{"msg_type":10001}'
//! locio request '{"msg_type":10002}'
//! locio watch --count 5
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use locio::{
    AddressResolver, IoConfig, IoDevice, IoDeviceClient, IpcResolver, Location, Master, SOCKET_DIR_ENV,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Location-addressed IPC tool
#[derive(Parser, Debug)]
#[command(name = "locio")]
#[command(version)]
struct Args {
    /// Root directory of the socket files
    #[arg(long, env = SOCKET_DIR_ENV)]
    socket_dir: Option<PathBuf>,

    /// Skip heartbeats and poll without waiting
    #[arg(long)]
    low_latency: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the address for a location and protocol
    Address {
        #[arg(long, default_value = "live")]
        mode: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        group: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        protocol: String,
        /// Resolve the connect-side address instead of the bind-side one
        #[arg(long)]
        connect: bool,
    },

    /// Run a coordinator: relay notices to observers, echo requests back
    Master {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "100")]
        interval_ms: u64,
    },

    /// Send a heartbeat to the master
    Notify,

    /// Send a notice to the master
    Publish { message: String },

    /// Send a request to the master and print the reply
    Request { message: String },

    /// Print notices broadcast by the master
    Watch {
        /// Stop after this many notices
        #[arg(long)]
        count: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let mut config = IoConfig::default().with_low_latency(args.low_latency);
    if let Some(dir) = args.socket_dir {
        config = config.with_socket_dir(dir);
    }

    match args.command {
        Command::Address { mode, category, group, name, protocol, connect } => {
            let location = Location::new(mode.parse()?, category.parse()?, group, name);
            let resolver = IpcResolver::new(config.socket_dir);
            let protocol = protocol.parse()?;
            let url = if connect {
                resolver.connect_address(&location, protocol)
            } else {
                resolver.bind_address(&location, protocol)
            };
            println!("{url}");
        }
        Command::Master { interval_ms } => {
            let device = IoDevice::new(config);
            let mut master = Master::bind(&device)?;
            let interval = Some(Duration::from_millis(interval_ms));
            tracing::info!("master running");
            loop {
                master.relay(interval)?;
                master.serve(Some(Duration::ZERO), str::to_owned)?;
            }
        }
        Command::Notify => {
            let mut client = IoDeviceClient::new("locio-cli", config)?;
            client.notify()?;
        }
        Command::Publish { message } => {
            let mut client = IoDeviceClient::new("locio-cli", config)?;
            client.publish(&message)?;
        }
        Command::Request { message } => {
            let mut client = IoDeviceClient::new("locio-cli", config)?;
            println!("{}", client.request(&message)?);
        }
        Command::Watch { count } => {
            let mut client = IoDeviceClient::new("locio-cli", config)?;
            let mut seen = 0;
            while count.is_none_or(|limit| seen < limit) {
                if client.observer().wait()? {
                    println!("{}", client.observer().notice());
                    seen += 1;
                }
            }
        }
    }

    Ok(())
}
