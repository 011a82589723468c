use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

/// Authoritative server for the survival game
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Simulation ticks per second
    #[clap(short, long, default_value = "15")]
    tick_rate: u32,
    /// Seconds between vitals and regeneration cycles
    #[clap(long, default_value = "5")]
    cycle_secs: u64,
    /// Maximum concurrent clients
    #[clap(short, long, default_value = "100")]
    max_clients: usize,
    /// Radius within which entities are visible to an avatar
    #[clap(long, default_value = "1000")]
    interest_radius: f32,
    /// Fixed seed for the game RNG
    #[clap(long)]
    seed: Option<u64>,
    /// Do not spawn creatures
    #[clap(long)]
    no_creatures: bool,
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            tick_rate: self.tick_rate,
            cycle_interval: Duration::from_secs(self.cycle_secs.max(1)),
            max_clients: self.max_clients,
            interest_radius: self.interest_radius,
            seed: self.seed,
            creatures_enabled: !self.no_creatures,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let config = args.config();

    info!(
        "Starting server on {} ({} Hz, max {} clients)",
        address, config.tick_rate, config.max_clients
    );

    let mut server = Server::new(&address, config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
