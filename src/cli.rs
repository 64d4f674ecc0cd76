//! Command line interface for the `wsdriver` demo binary.
//!
//! The binary fragments a message into frames and feeds them through an
//! event driver, printing what the application receives.

use std::num::NonZeroUsize;

use clap::{Parser, ValueEnum};

/// How the demo application receives messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Complete messages after the final fragment.
    Buffered,
    /// A stream opened on the first fragment.
    Streaming,
}

/// Message family of the generated frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// TEXT frames.
    Text,
    /// BINARY frames.
    Binary,
}

/// Role the endpoint plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Accepted connection.
    Server,
    /// Initiated connection.
    Client,
}

/// Command line arguments for the `wsdriver` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wsdriver",
    version,
    about = "Fragment a message and dispatch it through a WebSocket event driver"
)]
pub struct Cli {
    /// Message to send.
    #[arg(default_value = "Hello, WebSocket!")]
    pub message: String,

    /// Maximum payload bytes per frame.
    #[arg(short, long, default_value = "4")]
    pub fragment_size: NonZeroUsize,

    /// Delivery discipline registered by the demo application.
    #[arg(short, long, value_enum, default_value_t = Mode::Buffered)]
    pub mode: Mode,

    /// Frame family.
    #[arg(short, long, value_enum, default_value_t = Kind::Text)]
    pub kind: Kind,

    /// Endpoint role; decides the close status used for failures.
    #[arg(short, long, value_enum, default_value_t = Role::Server)]
    pub role: Role,

    /// Reassembly buffer size in bytes.
    #[arg(short, long, default_value_t = 64 * 1024)]
    pub buffer_size: usize,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_are_buffered_text_server() {
        let cli = Cli::parse_from(["wsdriver"]);
        assert_eq!(cli.message, "Hello, WebSocket!");
        assert_eq!(cli.fragment_size.get(), 4);
        assert_eq!(cli.mode, Mode::Buffered);
        assert_eq!(cli.kind, Kind::Text);
        assert_eq!(cli.role, Role::Server);
    }

    #[test]
    fn parses_all_options() {
        let cli = Cli::parse_from([
            "wsdriver",
            "payload",
            "--fragment-size",
            "2",
            "--mode",
            "streaming",
            "--kind",
            "binary",
            "--role",
            "client",
            "--buffer-size",
            "16",
        ]);
        assert_eq!(cli.message, "payload");
        assert_eq!(cli.fragment_size.get(), 2);
        assert_eq!(cli.mode, Mode::Streaming);
        assert_eq!(cli.kind, Kind::Binary);
        assert_eq!(cli.role, Role::Client);
        assert_eq!(cli.buffer_size, 16);
    }

    #[test]
    fn rejects_zero_fragment_size() {
        assert!(Cli::try_parse_from(["wsdriver", "--fragment-size", "0"]).is_err());
    }
}
