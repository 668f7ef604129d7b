//! `ferry send` and `ferry recv`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ferry::{Config, NoProgress, Progress, Receiver, Report};

use crate::Format;
use crate::bar::Bar;

/// Options shared by both directions.
#[derive(clap::Args)]
pub struct CommonArgs {
    /// Header encoding; must match the peer.
    #[arg(long, value_enum, default_value_t = Format::Binary)]
    pub format: Format,

    /// Maximum bytes moved per read/write (1 to 16 MiB).
    #[arg(long, default_value_t = ferry::CHUNK_SIZE, value_parser = parse_chunk_size)]
    pub chunk_size: usize,

    /// Abort if the peer stalls for this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the transfer report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Do not draw a progress bar.
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommonArgs {
    fn config(&self) -> Config {
        Config::default()
            .with_format(self.format.into())
            .with_chunk_size(self.chunk_size)
            .with_io_timeout(self.timeout.map(Duration::from_secs))
    }
}

/// Arguments for `ferry send`.
///
/// Usage: `ferry send [OPTIONS] FILE IP PORT`
#[derive(clap::Args)]
pub struct SendArgs {
    /// File to send.
    pub file: PathBuf,

    /// Receiver host or IP address.
    pub ip: String,

    /// Receiver port.
    pub port: u16,

    /// Give up connecting after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for `ferry recv`.
///
/// Usage: `ferry recv [OPTIONS] IP PORT`
#[derive(clap::Args)]
pub struct RecvArgs {
    /// Address to listen on.
    pub ip: String,

    /// Port to listen on.
    pub port: u16,

    /// Directory to save the received file in.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn send(args: SendArgs) -> Result<()> {
    let config = args
        .common
        .config()
        .with_connect_timeout(args.connect_timeout.map(Duration::from_secs));
    let target = (args.ip.as_str(), args.port);

    let mut progress = observer(args.common.quiet, "Sending");
    let report = ferry::send(&args.file, target, &config, progress.as_mut())
        .with_context(|| format!("failed to send {}", args.file.display()))?;
    finish(&report, args.common.json)
}

pub fn recv(args: RecvArgs) -> Result<()> {
    let config = args.common.config().with_dest_dir(&args.dir);
    let receiver = Receiver::bind((args.ip.as_str(), args.port), config)
        .with_context(|| format!("failed to listen on {}:{}", args.ip, args.port))?;
    let local = receiver.local_addr()?;
    if !args.common.json {
        eprintln!("Listening on {local}...");
    }

    let mut progress = observer(args.common.quiet, "Receiving");
    let report = receiver
        .accept(progress.as_mut())
        .context("failed to receive file")?;
    finish(&report, args.common.json)
}

fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if (1..=ferry::MAX_CHUNK_SIZE).contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be between 1 and {}", ferry::MAX_CHUNK_SIZE))
    }
}

fn observer(quiet: bool, verb: &'static str) -> Box<dyn Progress> {
    if quiet {
        Box::new(NoProgress)
    } else {
        Box::new(Bar::new(verb))
    }
}

fn finish(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    let verb = match report.direction {
        ferry::Direction::Send => "Sent",
        _ => "Saved",
    };
    println!(
        "{verb} {} ({}, {} ms)",
        report.path.display(),
        human_size(report.bytes),
        report.elapsed.as_millis()
    );
    println!("sha256: {}", report.sha256);
    Ok(())
}

/// Formats bytes into a human-readable size string.
#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        cmd: Sub,
    }

    #[derive(clap::Subcommand)]
    enum Sub {
        Send(SendArgs),
        Recv(RecvArgs),
    }

    #[test]
    fn send_positional_arguments() {
        let Harness { cmd: Sub::Send(args) } =
            Harness::parse_from(["t", "send", "a.txt", "127.0.0.1", "9000"])
        else {
            panic!("expected send");
        };
        assert_eq!(args.file, PathBuf::from("a.txt"));
        assert_eq!(args.ip, "127.0.0.1");
        assert_eq!(args.port, 9000);

        let config = args.common.config();
        assert_eq!(config.chunk_size, ferry::CHUNK_SIZE);
        assert!(config.read_timeout.is_none());
    }

    #[test]
    fn recv_options_map_onto_config() {
        let Harness { cmd: Sub::Recv(args) } = Harness::parse_from([
            "t", "recv", "0.0.0.0", "9000", "--dir", "/tmp/in", "--format", "text",
            "--timeout", "5",
        ]) else {
            panic!("expected recv");
        };
        let config = args.common.config().with_dest_dir(&args.dir);
        assert_eq!(config.format, ferry::HeaderFormat::Text);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.dest_dir, PathBuf::from("/tmp/in"));
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(Harness::try_parse_from(["t", "recv", "0.0.0.0", "70000"]).is_err());
    }

    #[test]
    fn chunk_size_must_be_in_range() {
        let parse = |size: &str| {
            Harness::try_parse_from(["t", "send", "a", "127.0.0.1", "9000", "--chunk-size", size])
        };
        assert!(parse("0").is_err());
        assert!(parse("16777217").is_err());
        assert!(parse("18446744073709551615").is_err());

        let Ok(Harness { cmd: Sub::Send(args) }) = parse("16777216") else {
            panic!("expected send");
        };
        assert_eq!(args.common.chunk_size, ferry::MAX_CHUNK_SIZE);
    }

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(0), "0.0 B");
        assert_eq!(human_size(8193), "8.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }
}
