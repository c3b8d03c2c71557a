use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;

use gnss_relay::{
    config::BridgeConfig, ingest::Ingestor, state::SharedState, sweeper::Sweeper,
};

/// Replays a captured NMEA log through the parser and prints the final state
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// NMEA capture, one sentence per line
    log: PathBuf,
    /// Simulated time between lines, in milliseconds
    #[arg(short, long, default_value = "100")]
    interval: u64,
    /// Optional JSON configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BridgeConfig::from_reader(File::open(path).unwrap()).unwrap(),
        None => BridgeConfig::default(),
    };

    let state = SharedState::new();
    let mut ingestor = Ingestor::new(state.clone(), config.line_buffer_size);
    let mut sweeper = Sweeper::new(state.clone(), config.staleness);

    let reader = BufReader::new(File::open(&args.log).unwrap());
    let mut now = 0;
    for line in reader.split(b'\n') {
        let mut line = line.unwrap();
        line.push(b'\n');
        ingestor.feed(&line, now);
        sweeper.tick(now);
        now += args.interval;
    }

    let snapshot = state.snapshot();
    println!("Sentences applied: {}, skipped: {}", ingestor.sentences(), ingestor.skipped());
    println!("Fix: {}", snapshot.fix);
    if let Some(local) = snapshot.local_time(config.timezone_offset_minutes) {
        println!("Local time: {}", local.format("%H:%M:%S"));
    }
    println!("Active constellations: {:?}", snapshot.satellites.active());
    println!("{}", snapshot.to_json().unwrap());
}
