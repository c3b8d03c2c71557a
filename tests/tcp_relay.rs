//! TCP broadcast relay over loopback.
#![cfg(feature = "tokio")]

use std::sync::Arc;
use std::time::Duration;

use gnss_relay::{
    config::BridgeConfig,
    relay::{Relay, Transport, tcp::TcpRelayServer},
    ring_buffer::RingBuffer,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within one second");
}

#[tokio::test]
async fn relayed_bytes_reach_every_client() {
    let config = BridgeConfig::default();
    let server = TcpRelayServer::bind("127.0.0.1:0", &config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let sink = server.sink();
    tokio::spawn(server.serve());

    let buffer = Arc::new(RingBuffer::new(config.relay_buffer_size));
    let mut relay = Relay::new(buffer.clone(), config.flush).with_transport(sink.clone());

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();
    wait_for(|| sink.subscribers() == 2).await;

    let data: Vec<u8> = (0..1200u32).map(|i| (i % 256) as u8).collect();
    buffer.write(&data);
    let flush = relay.tick(0).unwrap();
    assert_eq!(flush.bytes, 1200);
    assert_eq!(flush.chunks, 3);

    for client in [&mut first, &mut second] {
        let mut received = vec![0u8; data.len()];
        tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, data);
    }
}

#[tokio::test]
async fn client_bytes_land_in_uplink() {
    let config = BridgeConfig::default();
    let uplink = Arc::new(RingBuffer::new(config.uplink_buffer_size));
    let server = TcpRelayServer::bind("127.0.0.1:0", &config)
        .await
        .unwrap()
        .with_uplink(uplink.clone());
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());

    // RTCM3 frame preamble and a few payload bytes
    let correction = [0xd3, 0x00, 0x13, 0x3e, 0xd0, 0x00, 0x03];
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&correction).await.unwrap();

    wait_for(|| uplink.available() == correction.len()).await;
    assert_eq!(uplink.read(64), correction.to_vec());
}

#[tokio::test]
async fn clients_beyond_the_limit_are_refused() {
    let config = BridgeConfig {
        max_tcp_clients: 1,
        ..BridgeConfig::default()
    };
    let server = TcpRelayServer::bind("127.0.0.1:0", &config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let sink = server.sink();
    tokio::spawn(server.serve());

    let _kept = TcpStream::connect(addr).await.unwrap();
    wait_for(|| sink.is_ready()).await;

    let mut refused = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(2), refused.read(&mut buf))
        .await
        .unwrap();
    // Closed by the server without data
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn sink_is_idle_without_clients() {
    let config = BridgeConfig::default();
    let server = TcpRelayServer::bind("127.0.0.1:0", &config).await.unwrap();
    let mut sink = server.sink();

    assert!(!sink.is_ready());
    assert_eq!(sink.max_payload(), config.tcp_chunk_size);
    assert!(sink.send(b"$GNGGA*00\r\n").is_err());
    assert_eq!(server.client_count(), 0);
}
