mod record;
mod store;

use std::{
    io::{ErrorKind, Read},
    net::{TcpListener, TcpStream},
    path::PathBuf,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;

use record::{parse_record, ReadError, RecordReader, DEFAULT_MAX_LINE};
use store::FrameStore;

const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug, Parser)]
#[command(
    name = "frame_sink",
    about = "Receive classified frames streamed by an edgecam device"
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8234")]
    bind: String,
    /// Directory for payload files and detections.jsonl.
    #[arg(long, default_value = "frames")]
    out: PathBuf,
    /// Longest accepted record in bytes, terminator excluded.
    #[arg(long, default_value_t = DEFAULT_MAX_LINE)]
    max_line: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ConnectionStats {
    saved: u64,
    skipped: u64,
}

fn run(cli: Cli) -> Result<()> {
    let mut store = FrameStore::open(&cli.out)?;
    let listener =
        TcpListener::bind(&cli.bind).with_context(|| format!("failed to bind {}", cli.bind))?;
    println!(
        "frame_sink: listening on {} out={}",
        cli.bind,
        cli.out.display()
    );

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                eprintln!("frame_sink: accept failed: {err}");
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        println!("frame_sink: connected peer={peer}");
        match serve_connection(stream, &peer, &mut store, cli.max_line) {
            Ok(stats) => println!(
                "frame_sink: closed peer={peer} saved={} skipped={}",
                stats.saved, stats.skipped
            ),
            Err(err) => eprintln!("frame_sink: connection error peer={peer}: {err:?}"),
        }
    }
    Ok(())
}

fn serve_connection(
    mut stream: TcpStream,
    peer: &str,
    store: &mut FrameStore,
    max_line: usize,
) -> Result<ConnectionStats> {
    let mut reader = RecordReader::new(max_line);
    let mut stats = ConnectionStats::default();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("read failed"),
        };
        reader.push(&chunk[..n]);
        drain_records(&mut reader, peer, store, &mut stats)?;
    }

    if reader.pending_len() > 0 {
        eprintln!(
            "frame_sink: dropped unterminated record peer={peer} bytes={}",
            reader.pending_len()
        );
        stats.skipped += 1;
    }
    Ok(stats)
}

fn drain_records(
    reader: &mut RecordReader,
    peer: &str,
    store: &mut FrameStore,
    stats: &mut ConnectionStats,
) -> Result<()> {
    while let Some(line) = reader.next_line() {
        let line = match line {
            Ok(line) if line.is_empty() => continue,
            Ok(line) => line,
            Err(ReadError::Overlong { len }) => {
                eprintln!("frame_sink: skipped overlong record peer={peer} bytes={len}");
                stats.skipped += 1;
                continue;
            }
        };
        let record = match parse_record(&line) {
            Ok(record) => record,
            Err(err) => {
                eprintln!("frame_sink: skipped malformed record peer={peer}: {err:#}");
                stats.skipped += 1;
                continue;
            }
        };
        let path = store.save(&record, peer, Local::now())?;
        println!(
            "frame_sink: saved {} label={} bytes={}",
            path.display(),
            record.top_label().unwrap_or("-"),
            record.payload.len()
        );
        stats.saved += 1;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
