//! aqua-probe - talk to a serial line or TCP endpoint from the shell
//!
//! Opens the endpoint, optionally sends a payload, then reads reply lines
//! with a timeout and prints them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aqua_core::{ResultBuffer, Timeout};
use aqua_transport::{
    functional, BoundedReader, LineTimeout, Parity, ReaderConfig, SerialConfig, SerialTransport,
    StopBits, TcpConfig, TcpTransport, Transport,
};

/// aqua probe - send a line, print the reply
#[derive(Parser, Debug)]
#[command(name = "aqua-probe")]
#[command(about = "Send a payload over a serial line or TCP socket and print reply lines")]
struct Args {
    #[command(subcommand)]
    endpoint: Endpoint,

    /// Payload to send before reading (C-style escapes allowed)
    #[arg(long, global = true)]
    send: Option<String>,

    /// Line terminator (C-style escapes allowed)
    #[arg(long, default_value = "\\r\\n", global = true)]
    end_marker: String,

    /// Seconds to wait per line; 0 waits forever, negative polls once
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true, global = true)]
    timeout: f64,

    /// Apply the timeout to each byte instead of the whole line
    #[arg(long, global = true)]
    per_byte: bool,

    /// Longest accepted line, terminator included
    #[arg(long, default_value_t = 1024, global = true)]
    max_line: usize,

    /// Number of lines to read
    #[arg(long, default_value_t = 1, global = true)]
    lines: usize,

    /// Discard anything already received before sending
    #[arg(long, global = true)]
    flush: bool,
}

#[derive(Subcommand, Debug)]
enum Endpoint {
    /// Serial port
    Serial {
        /// Port path (e.g. /dev/ttyUSB0, COM3)
        #[arg(long)]
        path: String,

        #[arg(long, default_value_t = 115_200)]
        baud: u32,

        #[arg(long, value_enum, default_value_t = ParityArg::None)]
        parity: ParityArg,

        #[arg(long, value_enum, default_value_t = StopBitsArg::One)]
        stop_bits: StopBitsArg,
    },
    /// TCP socket
    Tcp {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long)]
        port: u16,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ParityArg {
    None,
    Odd,
    Even,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StopBitsArg {
    One,
    Two,
}

impl From<ParityArg> for Parity {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::None => Parity::None,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Even => Parity::Even,
        }
    }
}

impl From<StopBitsArg> for StopBits {
    fn from(stop_bits: StopBitsArg) -> Self {
        match stop_bits {
            StopBitsArg::One => StopBits::One,
            StopBitsArg::Two => StopBits::Two,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aqua=info".parse()?))
        .init();

    let args = Args::parse();

    let end_marker = parse_escapes(&args.end_marker).context("Invalid end marker")?;
    let payload = args
        .send
        .as_deref()
        .map(parse_escapes)
        .transpose()
        .context("Invalid payload")?;

    let mut transport = build_transport(&args.endpoint);
    transport.open().context("Failed to open endpoint")?;

    let result = run_probe(&mut transport, &args, &end_marker, payload.as_deref());
    functional::down(&mut transport);
    result
}

fn build_transport(endpoint: &Endpoint) -> Box<dyn Transport> {
    match endpoint {
        Endpoint::Serial {
            path,
            baud,
            parity,
            stop_bits,
        } => {
            let config = SerialConfig {
                parity: (*parity).into(),
                stop_bits: (*stop_bits).into(),
                ..SerialConfig::new(path.as_str(), *baud)
            };
            Box::new(SerialTransport::unopened(config))
        }
        Endpoint::Tcp { host, port } => {
            Box::new(TcpTransport::unopened(TcpConfig::new(host.as_str(), *port)))
        }
    }
}

fn run_probe(
    transport: &mut Box<dyn Transport>,
    args: &Args,
    end_marker: &[u8],
    payload: Option<&[u8]>,
) -> Result<()> {
    if args.flush {
        functional::flush_rx(transport);
    }

    if let Some(payload) = payload {
        functional::write(transport, &ResultBuffer::from_slice(payload));
        info!("Sent {} bytes", payload.len());
    }

    let config = ReaderConfig {
        line_timeout: if args.per_byte {
            LineTimeout::PerByte
        } else {
            LineTimeout::WholeLine
        },
        ..Default::default()
    };
    let timeout = Timeout::from_secs_f64(args.timeout);
    let mut reader = BoundedReader::with_config(transport, config);

    for index in 0..args.lines {
        match reader.read_line(args.max_line, end_marker, timeout) {
            Ok(line) => print!("{}", String::from_utf8_lossy(&line)),
            Err(e) if e.is_timeout() && index > 0 => {
                warn!("Stopped after {} lines: {}", index, e);
                break;
            }
            Err(e) => return Err(e).context("Failed to read line"),
        }
    }

    Ok(())
}

/// Decode `\r`, `\n`, `\t`, `\0`, `\\` and `\xNN` escapes
fn parse_escapes(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.bytes();

    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some(b'r') => out.push(b'\r'),
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'0') => out.push(0),
            Some(b'\\') => out.push(b'\\'),
            Some(b'x') => {
                let digits = [bytes.next(), bytes.next()];
                let [Some(hi), Some(lo)] = digits else {
                    bail!("truncated \\x escape");
                };
                let hex = std::str::from_utf8(&[hi, lo])?.to_owned();
                let value = u8::from_str_radix(&hex, 16)
                    .with_context(|| format!("bad hex escape \\x{}", hex))?;
                out.push(value);
            }
            Some(other) => bail!("unknown escape \\{}", other as char),
            None => bail!("dangling backslash"),
        }
    }

    Ok(out)
}
