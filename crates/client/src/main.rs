mod app;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use app::App;
use frostgate::net::resolve;
use frostgate::{ClientConfig, PacketLossSimulation, Team};

#[derive(Parser)]
#[command(name = "frostgate")]
#[command(about = "Frostgate headless client")]
struct Args {
    #[arg(short, long, default_value = "player")]
    name: String,

    #[arg(short, long, value_enum, help = "Preferred team (host balances if omitted)")]
    team: Option<TeamArg>,

    #[arg(long, help = "Directory server host, overrides FROSTGATE_METASERVER")]
    metaserver: Option<String>,

    #[arg(long, help = "Enable packet loss simulation on inbound traffic")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the LAN and the directory server for match hosts.
    Scan {
        #[arg(short, long, default_value_t = 3)]
        seconds: u64,
    },
    /// Measure round-trip time to one host.
    Ping {
        server: String,
        #[arg(short, long, default_value_t = 3)]
        seconds: u64,
    },
    /// Join a match and log what happens.
    Connect {
        server: String,
        #[arg(short, long, help = "Leave after this many seconds")]
        seconds: Option<u64>,
        #[arg(short, long, help = "Chat message to send once welcomed")]
        message: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TeamArg {
    Blue,
    Red,
}

impl From<TeamArg> for Team {
    fn from(team: TeamArg) -> Self {
        match team {
            TeamArg::Blue => Team::Blue,
            TeamArg::Red => Team::Red,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env();
    config.player_name = args.name.clone();
    config.team = args.team.map(Team::from);
    if let Some(host) = &args.metaserver {
        config.metaserver_host = host.clone();
    }

    let simulation = PacketLossSimulation {
        enabled: args.simulate_packet_loss,
        loss_percent: args.loss_percent,
        min_latency_ms: args.min_latency,
        max_latency_ms: args.max_latency,
        jitter_ms: args.jitter,
    };

    let server_port = config.server_port;
    let mut app = App::new(config, simulation)?;
    log::info!("Client bound to {}", app.local_addr());

    match args.command {
        Command::Scan { seconds } => app.scan(Duration::from_secs(seconds)),
        Command::Ping { server, seconds } => {
            let addr = resolve(&server, server_port)
                .with_context(|| format!("cannot resolve {server}"))?;
            app.ping(addr, Duration::from_secs(seconds))?;
        }
        Command::Connect {
            server,
            seconds,
            message,
        } => {
            let addr = resolve(&server, server_port)
                .with_context(|| format!("cannot resolve {server}"))?;
            app.play(addr, seconds.map(Duration::from_secs), message.as_deref())?;
        }
    }

    Ok(())
}
