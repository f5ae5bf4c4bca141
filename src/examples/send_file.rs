use std::net::UdpSocket;
use std::path::PathBuf;
use std::thread;

use clap::Parser;
use qr_fountain::{compress, transport, Container, EncoderConfig, FountainEncoder};
use rand::Rng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Stream a file as fountain-coded blocks, one UDP datagram per frame.
///
/// Stands in for the display loop: each datagram carries exactly the text a
/// QR frame would. `--loss` drops frames to mimic a camera missing them.
#[derive(Parser, Debug)]
struct Args {
    /// File to send.
    file: PathBuf,

    /// Receiver address.
    #[arg(long, default_value = "127.0.0.1:50051")]
    to: String,

    /// JSON encoder config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    slice_size: Option<usize>,

    /// Blocks per second.
    #[arg(long)]
    rate: Option<u32>,

    #[arg(long)]
    prefix: Option<String>,

    /// zstd-compress the content before framing.
    #[arg(long)]
    compress: bool,

    /// Probability that a frame is lost on the way.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    /// Send every source symbol once before the fountain blocks.
    #[arg(long)]
    systematic: bool,

    /// Stop after this many frames (default: run forever).
    #[arg(long)]
    count: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EncoderConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => EncoderConfig::default(),
    };
    if let Some(slice_size) = args.slice_size {
        config.slice_size = slice_size;
    }
    if let Some(rate) = args.rate {
        config.emission_rate = rate;
    }
    if let Some(prefix) = &args.prefix {
        config.scheme_prefix = prefix.clone();
    }
    config.validate()?;
    anyhow::ensure!((0.0..=1.0).contains(&args.loss), "--loss must be within 0..=1");

    let content = std::fs::read(&args.file)?;
    let level = args.compress.then_some(compress::DEFAULT_LEVEL);
    let container = Container::for_file(&args.file, &content, level)?;
    let frame = container.encode()?;

    let mut encoder = FountainEncoder::from_config(frame, &config)?;
    let session = encoder.session();
    info!(
        file = %container.meta.filename,
        content_type = %container.meta.content_type,
        content_bytes = content.len(),
        framed_bytes = session.total_bytes,
        k = session.k,
        checksum = session.checksum,
        "encoding file"
    );

    let sock = UdpSocket::bind("0.0.0.0:0")?;
    sock.connect(&args.to)?;
    info!(to = %args.to, rate = config.emission_rate, "streaming blocks");

    let mut rng = rand::thread_rng();
    let interval = config.frame_interval();
    let mut systematic = args.systematic.then_some(0u32);
    let mut sent = 0u64;
    let mut dropped = 0u64;

    loop {
        if args.count.is_some_and(|n| sent + dropped >= n) {
            break;
        }

        let block = match systematic {
            Some(i) if i < encoder.symbol_count() => {
                systematic = Some(i + 1);
                encoder.source_block(i).unwrap_or_else(|| encoder.next_block())
            }
            _ => encoder.next_block(),
        };

        if rng.gen_bool(args.loss) {
            dropped += 1;
            debug!(degree = block.degree(), "frame lost");
        } else {
            let text = transport::encode_block(&block, &config.scheme_prefix)?;
            sock.send(text.as_bytes())?;
            sent += 1;
            debug!(degree = block.degree(), len = text.len(), "frame sent");
        }

        if (sent + dropped) % 100 == 0 {
            info!(sent, dropped, "progress");
        }
        thread::sleep(interval);
    }

    info!(sent, dropped, "done");
    Ok(())
}
