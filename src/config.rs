use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use clap::Parser;

use crate::logging::Verbosity;

/// Command line settings. Nothing is read from the environment or from files.
#[derive(Debug, Clone, Parser)]
#[command(name = "dodge-proxy")]
#[command(about = "HTTP proxy that sends a dummy request ahead of every real one", long_about = None)]
pub struct Config {
    /// Log every step of every relay cycle
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log failures
    #[arg(short, long)]
    pub quiet: bool,

    /// Port to listen on, on all local addresses
    pub port: u16,
}

impl Config {
    /// Parse the process arguments, printing usage and exiting on bad input.
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> Verbosity {
        if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    /// Addresses tried in order when binding: dual-stack `[::]` first, then
    /// `0.0.0.0` for hosts without IPv6.
    pub fn listen_addrs(&self) -> [SocketAddr; 2] {
        [
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, self.port)),
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)),
        ]
    }
}
