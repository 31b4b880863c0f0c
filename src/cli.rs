use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Transport Stress - concurrent TCP vs UDP echo load generator
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Number of concurrent TCP clients
    #[clap(short = 't', long, default_value_t = crate::defaults::STREAM_WORKERS, help_heading = "Core Options")]
    pub tcp_clients: usize,

    /// Number of concurrent UDP clients
    #[clap(short = 'u', long, default_value_t = crate::defaults::DATAGRAM_WORKERS, help_heading = "Core Options")]
    pub udp_clients: usize,

    /// How long every client keeps sending (e.g. "20s", "500ms", "1m")
    #[clap(short = 'd', long, value_parser = parse_duration, default_value = "20s", help_heading = "Core Options")]
    pub duration: Duration,

    /// Address of the TCP echo server
    #[clap(long, default_value = crate::defaults::STREAM_ADDR, help_heading = "Endpoints")]
    pub tcp_addr: String,

    /// Address of the UDP echo server
    #[clap(long, default_value = crate::defaults::DATAGRAM_ADDR, help_heading = "Endpoints")]
    pub udp_addr: String,

    /// Sleep between two exchanges of the same client
    #[clap(long, value_parser = parse_duration, default_value = "100ms", help_heading = "Timing")]
    pub pacing: Duration,

    /// How long a UDP client waits for each reply
    #[clap(long, value_parser = parse_duration, default_value = "1s", help_heading = "Timing")]
    pub udp_timeout: Duration,

    /// Size of the buffer each response is read into
    #[clap(long, default_value_t = crate::defaults::BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Request payload to draw from (repeat to build a custom catalog)
    #[clap(short = 'm', long = "message")]
    pub messages: Vec<String>,

    /// Seed for the payload generators, for reproducible request sequences
    #[clap(long)]
    pub seed: Option<u64>,

    /// Print the report as JSON instead of text
    #[clap(long, default_value_t = false, help_heading = "Output")]
    pub json: bool,

    /// Write logs to this file instead of stderr
    #[clap(long, help_heading = "Output")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[clap(short = 'v', long, action = ArgAction::Count, help_heading = "Output")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[clap(short = 'q', long, default_value_t = false, help_heading = "Output")]
    pub quiet: bool,
}

/// The two transport families under comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Connection-oriented stream protocol (TCP)
    Stream,

    /// Connectionless datagram protocol (UDP)
    Datagram,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Stream => write!(f, "TCP"),
            Protocol::Datagram => write!(f, "UDP"),
        }
    }
}

impl Protocol {
    /// Both protocols, in report order
    pub const ALL: [Protocol; 2] = [Protocol::Stream, Protocol::Datagram];
}

/// Parse duration from string (e.g., "10s", "5m", "1h")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    let seconds = match unit {
        "ms" => num / 1000.0,
        "s" => num,
        "m" => num * 60.0,
        "h" => num * 3600.0,
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("Invalid duration {}: {}", s, e))?;

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("invalid").is_err());
        assert!(parse_duration("-3s").is_err());
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Stream.to_string(), "TCP");
        assert_eq!(Protocol::Datagram.to_string(), "UDP");
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["transport-stress"]);

        assert_eq!(args.tcp_clients, crate::defaults::STREAM_WORKERS);
        assert_eq!(args.udp_clients, crate::defaults::DATAGRAM_WORKERS);
        assert_eq!(args.duration, crate::defaults::DURATION);
        assert_eq!(args.pacing, crate::defaults::PACING_INTERVAL);
        assert_eq!(args.udp_timeout, crate::defaults::RECEIVE_TIMEOUT);
        assert_eq!(args.tcp_addr, "localhost:3000");
        assert_eq!(args.udp_addr, "localhost:3001");
        assert!(args.messages.is_empty());
        assert!(args.seed.is_none());
        assert!(!args.json);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "transport-stress",
            "-t",
            "3",
            "-u",
            "0",
            "-d",
            "2s",
            "--udp-timeout",
            "250ms",
            "-m",
            "ping",
            "-m",
            "bye",
            "--seed",
            "7",
            "-vv",
        ]);

        assert_eq!(args.tcp_clients, 3);
        assert_eq!(args.udp_clients, 0);
        assert_eq!(args.duration, Duration::from_secs(2));
        assert_eq!(args.udp_timeout, Duration::from_millis(250));
        assert_eq!(args.messages, vec!["ping".to_string(), "bye".to_string()]);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.verbose, 2);
    }
}
