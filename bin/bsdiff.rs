use std::{fs, path::PathBuf};

use anyhow::Context;
use bsdiff_core::diff::DiffOptions;
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Legacy BSDIFF40: 32-byte header, three separately bzip2-compressed streams.
    Legacy,
    /// Streaming ENDSLEY/BSDIFF43: 24-byte header, one interleaved compressed stream.
    Streaming,
    /// Streaming ENDSLEY/BSDIFF44: adds oldsize and CRC-16 checksums of old/new.
    Streaming44,
}

/// Compute a binary delta between two files.
#[derive(Parser)]
struct Args {
    /// The original file.
    old: PathBuf,
    /// The updated file.
    new: PathBuf,
    /// Where to write the patch.
    patch: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Legacy)]
    format: Format,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let old = fs::read(&args.old)
        .with_context(|| format!("failed to read old file '{}'", args.old.display()))?;
    let new = fs::read(&args.new)
        .with_context(|| format!("failed to read new file '{}'", args.new.display()))?;
    let mut patch_file = fs::File::create(&args.patch)
        .with_context(|| format!("failed to create patch file '{}'", args.patch.display()))?;

    let options = DiffOptions::default();
    match args.format {
        Format::Legacy => bsdiff_core::write_legacy_patch(&old, &new, &mut patch_file, &options),
        Format::Streaming => {
            bsdiff_core::write_streaming_patch(&old, &new, &mut patch_file, &options)
        }
        Format::Streaming44 => {
            bsdiff_core::write_patch_v44(&old, &new, &mut patch_file, &options)
        }
    }
    .context("failed to generate patch")?;

    Ok(())
}
