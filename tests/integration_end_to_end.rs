use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UdpSocket};
use transport_stress::{HarnessConfig, LoadTestRunner, Verdict};

/// Line echo server that answers every request after `delay`.
async fn spawn_delayed_tcp_echo(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tokio::time::sleep(delay).await;
                    if write_half
                        .write_all(format!("{}\n", line).as_bytes())
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
    });

    addr
}

/// Datagram echo server that silently drops every third request.
async fn spawn_lossy_udp_echo() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        let mut received = 0u64;
        while let Ok((n, from)) = socket.recv_from(&mut buf).await {
            received += 1;
            if received % 3 == 0 {
                continue;
            }
            let _ = socket.send_to(&buf[..n], from).await;
        }
    });

    addr
}

/// Both protocols against well-behaved local servers: the delay shows up in
/// TCP latency and dropped datagrams show up as UDP failures.
#[tokio::test]
async fn delayed_tcp_and_lossy_udp_end_to_end() {
    let tcp_addr = spawn_delayed_tcp_echo(Duration::from_millis(10)).await;
    let udp_addr = spawn_lossy_udp_echo().await;

    let config = HarnessConfig {
        stream_workers: 1,
        datagram_workers: 1,
        stream_addr: tcp_addr.to_string(),
        datagram_addr: udp_addr.to_string(),
        duration: Duration::from_secs(2),
        receive_timeout: Duration::from_millis(200),
        seed: Some(7),
        ..Default::default()
    };
    config.validate().unwrap();

    let report = LoadTestRunner::new(config).run().await;
    let summary = &report.summary;

    assert!(summary.stream.exchanges > 0);
    assert_eq!(summary.stream.failures, 0);
    assert!(summary.stream.average_latency() >= Duration::from_millis(10));
    assert!(summary.stream.average_latency() < Duration::from_millis(500));
    assert!(summary.stream.min_latency().unwrap() >= Duration::from_millis(10));

    assert!(summary.datagram.failures > 0);
    assert!(summary.datagram.successes() > 0);
    assert_eq!(summary.comparison.errors, Verdict::Winner(transport_stress::Protocol::Stream));

    assert!(report.metadata.elapsed >= Duration::from_secs(2));
    let text = report.to_string();
    assert!(text.contains("✅ TCP experienced fewer errors."));
}

/// With nothing listening every TCP worker records exactly one failure and
/// the run still produces a report.
#[tokio::test]
async fn unreachable_stream_server_still_reports() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tcp_addr = listener.local_addr().unwrap();
    drop(listener);
    let udp_addr = spawn_lossy_udp_echo().await;

    let config = HarnessConfig {
        stream_workers: 4,
        datagram_workers: 1,
        stream_addr: tcp_addr.to_string(),
        datagram_addr: udp_addr.to_string(),
        duration: Duration::from_millis(500),
        receive_timeout: Duration::from_millis(100),
        ..Default::default()
    };

    let report = LoadTestRunner::new(config).run().await;

    assert_eq!(report.summary.stream.exchanges, 4);
    assert_eq!(report.summary.stream.failures, 4);
    assert_eq!(report.summary.stream.min_latency_ns, None);
    assert_eq!(
        report.summary.comparison.latency,
        Verdict::Winner(transport_stress::Protocol::Datagram)
    );
    let text = report.to_string();
    assert!(text.contains("Min Latency:  n/a"));
    assert!(text.contains("(TCP had no successful exchanges, so it has no latency to compare.)"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["summary"]["stream"]["failures"], 4);
    assert_eq!(json["test_config"]["stream_workers"], 4);
}
