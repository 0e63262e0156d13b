use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

const BSDIFF_MAGIC: &[u8] = b"BSDIFF40";
const BSDF2_MAGIC: &[u8] = b"BSDF2";
const STREAMING_MAGIC: &[u8] = b"ENDSLEY/BSDIFF43";
const STREAMING44_MAGIC: &[u8] = b"ENDSLEY/BSDIFF44";

/// Apply a binary delta produced by `bsdiff` to reconstruct the new file.
#[derive(Parser)]
struct Args {
    /// The original file the patch was generated against.
    old: PathBuf,
    /// Where to write the reconstructed file.
    new: PathBuf,
    /// The patch file.
    patch: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let old = fs::read(&args.old)
        .with_context(|| format!("failed to read old file '{}'", args.old.display()))?;
    let patch = fs::read(&args.patch)
        .with_context(|| format!("failed to read patch file '{}'", args.patch.display()))?;

    let new = if patch.starts_with(STREAMING44_MAGIC) {
        bsdiff_core::apply_patch_v44(&old, &patch).map(|(new, _)| new)
    } else if patch.starts_with(STREAMING_MAGIC) {
        bsdiff_core::apply_streaming_patch(&old, &patch)
    } else if patch.starts_with(BSDIFF_MAGIC) || patch.starts_with(BSDF2_MAGIC) {
        bsdiff_core::apply_bsdf2_patch(&old, &patch)
    } else {
        bail!("corrupt patch: unrecognized magic header");
    }
    .context("failed to apply patch")?;

    fs::write(&args.new, &new)
        .with_context(|| format!("failed to write new file '{}'", args.new.display()))?;

    Ok(())
}
