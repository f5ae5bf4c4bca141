use std::net::UdpSocket;
use std::path::{Path, PathBuf};

use clap::Parser;
use qr_fountain::router::DEFAULT_MAX_SESSIONS;
use qr_fountain::{transport, Container, EncoderConfig, Ingested, SessionRouter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Receive fountain-coded frames and write each completed file to disk.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "127.0.0.1:50051")]
    listen: String,

    /// Directory for recovered files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Must match the sender.
    #[arg(long, default_value_t = EncoderConfig::default().slice_size)]
    slice_size: usize,

    #[arg(long, default_value = "")]
    prefix: String,

    /// Keep listening after the first file completes.
    #[arg(long)]
    keep_listening: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let sock = UdpSocket::bind(&args.listen)?;
    info!(listen = %args.listen, "waiting for frames");

    let mut buf = vec![0u8; 65536];
    let mut router = SessionRouter::new(DEFAULT_MAX_SESSIONS);
    let mut frames = 0u64;

    loop {
        let (size, _) = sock.recv_from(&mut buf)?;
        frames += 1;

        let Ok(text) = std::str::from_utf8(&buf[..size]) else {
            warn!(size, "frame is not text, skipping");
            continue;
        };
        let block = match transport::decode_block(text, &args.prefix, args.slice_size) {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "unreadable frame");
                continue;
            }
        };

        let routed = match router.ingest(&block) {
            Ok(routed) => routed,
            Err(e) => {
                warn!(error = %e, "rejected block");
                continue;
            }
        };
        if let Ingested::Resolved { .. } = routed.outcome {
            if let Some(p) = router.progress(&routed.session) {
                info!(frames, resolved = p.resolved, total = p.total, pending = p.pending, "progress");
            }
        }
        if !routed.complete {
            continue;
        }

        for (session, result) in router.take_complete() {
            match result.and_then(|frame| Container::decode(&frame)) {
                Ok(container) => {
                    let path = write_output(&args.out_dir, &container)?;
                    info!(
                        frames,
                        k = session.k,
                        path = %path.display(),
                        content_type = %container.meta.content_type,
                        "file recovered"
                    );
                }
                Err(e) => warn!(k = session.k, error = %e, "transfer failed verification"),
            }
        }

        if !args.keep_listening && router.is_empty() {
            return Ok(());
        }
    }
}

fn write_output(dir: &Path, container: &Container) -> anyhow::Result<PathBuf> {
    // Never trust a path from the channel; keep the last component only.
    let name = Path::new(&container.meta.filename)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("decoded_output"));
    let path = dir.join(name);
    std::fs::write(&path, container.content()?)?;
    Ok(path)
}
