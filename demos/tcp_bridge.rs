use std::net::IpAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpStream;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};

use gnss_relay::{
    clock::MonotonicClock,
    config::BridgeConfig,
    ingest::{self, Ingestor},
    relay::{self, Relay, tcp::TcpRelayServer},
    ring_buffer::RingBuffer,
    state::SharedState,
    sweeper::Sweeper,
};

/// Relays a receiver reachable over TCP (e.g. through ser2net) to TCP clients
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Receiver address
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: IpAddr,
    /// Receiver port
    #[arg(short, long, default_value = "2000")]
    port: u16,
    /// Port clients connect to
    #[arg(short, long, default_value = "2323")]
    listen: u16,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = BridgeConfig::default().with_tcp_port(args.listen);
    config.validate().unwrap();

    let clock = MonotonicClock::new();
    let state = SharedState::new();
    let relay_buffer = Arc::new(RingBuffer::new(config.relay_buffer_size));
    let uplink = Arc::new(RingBuffer::new(config.uplink_buffer_size));

    let server = TcpRelayServer::bind(("0.0.0.0", config.tcp_port), &config)
        .await
        .unwrap()
        .with_uplink(uplink.clone());
    let relay = Relay::new(relay_buffer.clone(), config.flush).with_transport(server.sink());

    tokio::spawn(server.serve());
    tokio::spawn(relay::run(relay, clock));
    tokio::spawn(Sweeper::new(state.clone(), config.staleness).run(clock));

    let receiver = TcpStream::connect((args.addr, args.port)).await.unwrap();
    let (read_half, write_half) = receiver.into_split();

    // Corrections from clients go back to the receiver
    let mut writer = write_half.compat_write();
    let tick = config.flush.tick;
    tokio::spawn(async move {
        loop {
            if let Err(e) = ingest::forward_uplink(&uplink, &mut writer).await {
                eprintln!("Uplink failed: {e}");
                return;
            }
            tokio::time::sleep(tick).await;
        }
    });

    let mut ingestor =
        Ingestor::new(state.clone(), config.line_buffer_size).with_relay_buffer(relay_buffer);
    match ingest::run(read_half.compat(), &mut ingestor, &clock).await {
        Ok(total) => println!("Receiver closed after {total} bytes"),
        Err(e) => eprintln!("Receiver failed: {e}"),
    }
    println!("Last fix: {}", state.snapshot().fix);
}
