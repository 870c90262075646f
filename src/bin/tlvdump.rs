//! tlvdump - print the TLV structure of a file
//!
//! File di-mmap read-only lalu di-walk langsung dari page cache,
//! tanpa copy. Value yang seluruhnya terdiri dari TLV valid di-expand
//! sebagai child, kecuali Name yang dicetak dalam bentuk URI.
//!
//! # Usage
//!
//! ```text
//! tlvdump packet.bin
//! tlvdump --offset 128 --max-depth 2 capture.bin
//! RUST_LOG=trace tlvdump packet.bin
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use memmap2::Mmap;
use tracing::debug;

use ndn_tlv::protocol::name::TYPE_NAME;
use ndn_tlv::{is_critical, Name, Reader};

/// Bytes of a leaf value shown as hex
const HEX_PREVIEW: usize = 16;

#[derive(Parser)]
#[command(name = "tlvdump")]
#[command(about = "Print the TLV structure of a file")]
#[command(version)]
struct Cli {
    /// File containing one or more TLV elements
    file: PathBuf,

    /// Byte offset of the first element
    #[arg(short, long, default_value_t = 0)]
    offset: usize,

    /// Deepest nesting level to expand
    #[arg(short = 'd', long, default_value_t = 8)]
    max_depth: usize,

    /// Print top-level elements only
    #[arg(long)]
    flat: bool,
}

#[derive(Debug, thiserror::Error)]
enum DumpError {
    #[error("cannot map {}: {source}", path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("offset {offset} is past the end of the file ({len} bytes)")]
    Offset { offset: usize, len: usize },

    #[error("truncated TLV at byte {pos}: {source}")]
    Truncated {
        pos: usize,
        #[source]
        source: ndn_tlv::Error,
    },

    #[error(transparent)]
    Output(#[from] io::Error),
}

/// True when `value` is a non-empty run of complete TLV elements
fn is_nested(value: &[u8]) -> bool {
    if value.is_empty() {
        return false;
    }
    let mut reader = Reader::from_slice(value);
    while !reader.is_empty() {
        let ok = reader
            .read_varnum()
            .and_then(|_| reader.read_length())
            .and_then(|len| reader.skip(len));
        if ok.is_err() {
            return false;
        }
    }
    true
}

fn preview(typ: u64, value: &[u8]) -> String {
    if typ == TYPE_NAME {
        if let Ok(name) = Name::parse_components(&mut Reader::from_slice(value)) {
            return format!("name={}", name);
        }
    }
    let hex: String = value
        .iter()
        .take(HEX_PREVIEW)
        .map(|b| format!("{:02x}", b))
        .collect();
    if value.len() > HEX_PREVIEW {
        format!("hex={}..", hex)
    } else {
        format!("hex={}", hex)
    }
}

struct Walker<W> {
    out: W,
    max_depth: usize,
}

impl<W: Write> Walker<W> {
    /// Walk every element of `buf`; `base` is its offset in the file
    fn walk(&mut self, buf: &[u8], base: usize, depth: usize) -> Result<(), DumpError> {
        let mut reader = Reader::from_slice(buf);
        while !reader.is_empty() {
            let start = reader.pos();
            let element = reader
                .read_varnum()
                .and_then(|typ| Ok((typ, reader.read_length()?)))
                .and_then(|(typ, len)| Ok((typ, reader.read_buf(len)?)));
            let (typ, value) = element.map_err(|source| DumpError::Truncated {
                pos: base + start,
                source,
            })?;

            let indent = depth * 2;
            let flag = if is_critical(typ) { " critical" } else { "" };
            let nested = typ != TYPE_NAME && depth < self.max_depth && is_nested(&value);
            if nested {
                writeln!(
                    self.out,
                    "{:indent$}@{} T={:#x} L={}{}",
                    "",
                    base + start,
                    typ,
                    value.len(),
                    flag
                )?;
                let value_base = base + reader.pos() - value.len();
                self.walk(&value, value_base, depth + 1)?;
            } else {
                writeln!(
                    self.out,
                    "{:indent$}@{} T={:#x} L={}{} {}",
                    "",
                    base + start,
                    typ,
                    value.len(),
                    flag,
                    preview(typ, &value)
                )?;
            }
        }
        Ok(())
    }
}

fn run(cli: &Cli) -> Result<(), DumpError> {
    let map_err = |source| DumpError::Map {
        path: cli.file.clone(),
        source,
    };
    let file = File::open(&cli.file).map_err(map_err)?;

    // SAFETY: file dibuka read-only; isi yang berubah saat di-walk hanya
    // menghasilkan output yang salah, bukan UB di sisi reader
    let mmap = unsafe { Mmap::map(&file) }.map_err(map_err)?;
    debug!(path = %cli.file.display(), len = mmap.len(), "file mapped");

    if cli.offset > mmap.len() {
        return Err(DumpError::Offset {
            offset: cli.offset,
            len: mmap.len(),
        });
    }

    let stdout = io::stdout();
    let mut walker = Walker {
        out: BufWriter::new(stdout.lock()),
        max_depth: if cli.flat { 0 } else { cli.max_depth },
    };
    let result = walker.walk(&mmap[cli.offset..], cli.offset, 0);
    walker.out.flush()?;
    result
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("tlvdump: {}", e);
        process::exit(1);
    }
}
