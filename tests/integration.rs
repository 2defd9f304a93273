//! Integration tests for spate
//!
//! Everything runs over loopback with OS-assigned ports; the broadcaster is
//! pointed at 127.0.0.1 where discovery is under test.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::time::timeout;

use spate::client::{Client, ClientConfig};
use spate::discover::{self, Broadcaster};
use spate::net;
use spate::protocol::{MAX_SEGMENT_SIZE, Offer, PayloadHeader, Protocol, Request, segment_len};
use spate::serve::{Server, ServerConfig};
use spate::{tcp, udp};

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

/// Bind a server and return its discovered-server view plus the running task.
async fn start_test_server() -> (spate::DiscoveredServer, tokio::task::JoinHandle<()>) {
    let server = Server::bind(ServerConfig::default()).await.unwrap();
    let view = spate::DiscoveredServer {
        ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        udp_port: server.udp_port(),
        tcp_port: server.tcp_port(),
    };
    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (view, handle)
}

#[tokio::test]
async fn test_tcp_transfer_exact_bytes() {
    let (server, _handle) = start_test_server().await;

    let result = timeout(
        Duration::from_secs(10),
        tcp::measure(server.tcp_addr(), 10_000, 1),
    )
    .await
    .expect("transfer should complete")
    .unwrap();

    assert_eq!(result.protocol, Protocol::Tcp);
    assert_eq!(result.bytes, 10_000);
    assert_eq!(result.success_percent, 100.0);
}

#[tokio::test]
async fn test_udp_transfer_no_loss() {
    let (server, _handle) = start_test_server().await;

    let result = timeout(
        Duration::from_secs(10),
        udp::measure(server.udp_addr(), 10_000, 1),
    )
    .await
    .expect("transfer should complete")
    .unwrap();

    assert_eq!(result.protocol, Protocol::Udp);
    // ceil(10000/1024) = 10 full-ish segments, none dropped on loopback
    assert_eq!(result.bytes, 10_000);
    assert_eq!(result.success_percent, 100.0);
    assert!(result.duration_ms >= 1_000, "includes inactivity wait");
}

#[tokio::test]
async fn test_udp_loss_accounting() {
    // Hand-rolled server that drops segments 2 and 5
    let socket = net::create_udp_socket(0).await.unwrap();
    let port = socket.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
        let request = Request::decode(&buf[..len]).unwrap();

        let total = spate::protocol::total_segments(request.file_size);
        let mut datagram = vec![0u8; PayloadHeader::LEN + MAX_SEGMENT_SIZE];
        for index in 0..total {
            if index == 2 || index == 5 {
                continue;
            }
            PayloadHeader {
                total_segments: total,
                segment_index: index,
            }
            .encode(&mut datagram);
            let len = PayloadHeader::LEN + segment_len(request.file_size, index);
            socket.send_to(&datagram[..len], peer).await.unwrap();
        }
    });

    let result = timeout(
        Duration::from_secs(10),
        udp::measure(loopback(port), 10_000, 1),
    )
    .await
    .expect("transfer should complete")
    .unwrap();

    // 8 of 10 segments delivered
    assert_eq!(result.success_percent, 80.0);
    assert_eq!(result.bytes, 10_000 - 1024 - 1024);
}

#[tokio::test]
async fn test_udp_silent_server_times_out() {
    // Nothing answers: bind a socket and never reply
    let socket = net::create_udp_socket(0).await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let _keep = socket;

    let result = timeout(
        Duration::from_secs(10),
        udp::measure(loopback(port), 10_000, 1),
    )
    .await
    .expect("startup timeout must fire")
    .unwrap();

    assert_eq!(result.bytes, 0);
    assert_eq!(result.success_percent, 0.0);
}

#[tokio::test]
async fn test_orchestration_cycle() {
    let (server, _handle) = start_test_server().await;

    let client = Client::new(ClientConfig {
        file_size: 10_000,
        tcp_connections: 2,
        udp_connections: 1,
        ..Default::default()
    });

    let mut results = timeout(Duration::from_secs(15), client.run_transfers(&server))
        .await
        .expect("cycle should complete")
        .unwrap();

    assert_eq!(results.len(), 3);
    results.sort_by_key(|r| (r.protocol != Protocol::Tcp, r.id));

    assert_eq!(results[0].protocol, Protocol::Tcp);
    assert_eq!(results[0].bytes, 10_000);
    assert_eq!(results[1].protocol, Protocol::Tcp);
    assert_eq!(results[1].bytes, 10_000);
    assert_eq!(results[2].protocol, Protocol::Udp);
    assert_eq!(results[2].success_percent, 100.0);
}

#[tokio::test]
async fn test_worker_failure_does_not_abort_cycle() {
    let (server, _handle) = start_test_server().await;

    // Point UDP at a dead port; TCP still succeeds and UDP resolves to an
    // empty result rather than an error
    let broken = spate::DiscoveredServer {
        udp_port: 1,
        ..server
    };

    let client = Client::new(ClientConfig {
        file_size: 10_000,
        tcp_connections: 1,
        udp_connections: 1,
        ..Default::default()
    });

    let results = timeout(Duration::from_secs(15), client.run_transfers(&broken))
        .await
        .expect("cycle should complete")
        .unwrap();

    let tcp_result = results
        .iter()
        .find(|r| r.protocol == Protocol::Tcp)
        .expect("TCP sibling unaffected");
    assert_eq!(tcp_result.bytes, 10_000);
}

#[tokio::test]
async fn test_discovery_returns_first_offer() {
    let listener = net::create_udp_socket(0).await.unwrap();
    let listen_port = listener.local_addr().unwrap().port();

    let offer = Offer {
        udp_port: 40000,
        tcp_port: 40001,
    };
    let broadcaster = Broadcaster::new(offer, loopback(listen_port), Duration::from_millis(100));
    let broadcast_task = tokio::spawn(async move {
        let _ = broadcaster.run().await;
    });

    // Repeated identical offers are each valid; the first one wins
    let server = timeout(Duration::from_secs(5), discover::wait_for_offer(&listener))
        .await
        .expect("offer should arrive")
        .unwrap();

    assert_eq!(server.udp_port, 40000);
    assert_eq!(server.tcp_port, 40001);
    broadcast_task.abort();
}

#[tokio::test]
async fn test_server_broadcasts_its_bound_ports() {
    let listener = net::create_udp_socket(0).await.unwrap();
    let listen_port = listener.local_addr().unwrap().port();

    let server = Server::bind(ServerConfig {
        broadcast_dest: Some(loopback(listen_port)),
        broadcast_interval: Duration::from_millis(100),
        ..Default::default()
    })
    .await
    .unwrap();
    let expected = server.offer();
    let _handle = tokio::spawn(async move {
        let _ = server.run().await;
    });

    let discovered = timeout(Duration::from_secs(5), discover::wait_for_offer(&listener))
        .await
        .expect("offer should arrive")
        .unwrap();

    assert_eq!(discovered.udp_port, expected.udp_port);
    assert_eq!(discovered.tcp_port, expected.tcp_port);
}

#[tokio::test]
async fn test_end_to_end_discovery_and_transfer() {
    let listener = net::create_udp_socket(0).await.unwrap();
    let listen_port = listener.local_addr().unwrap().port();

    let server = Server::bind(ServerConfig {
        broadcast_dest: Some(loopback(listen_port)),
        broadcast_interval: Duration::from_millis(100),
        ..Default::default()
    })
    .await
    .unwrap();
    let _handle = tokio::spawn(async move {
        let _ = server.run().await;
    });

    let discovered = timeout(Duration::from_secs(5), discover::wait_for_offer(&listener))
        .await
        .expect("offer should arrive")
        .unwrap();

    let client = Client::new(ClientConfig {
        file_size: 10_000,
        tcp_connections: 1,
        udp_connections: 1,
        ..Default::default()
    });
    let results = timeout(
        Duration::from_secs(15),
        client.run_transfers(&discovered),
    )
    .await
    .expect("cycle should complete")
    .unwrap();

    assert_eq!(results.len(), 2);
    for result in &results {
        match result.protocol {
            Protocol::Tcp => assert_eq!(result.bytes, 10_000),
            Protocol::Udp => assert_eq!(result.success_percent, 100.0),
        }
    }
}
