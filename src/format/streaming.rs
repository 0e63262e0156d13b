//! Streaming `ENDSLEY/BSDIFF43` wire format (spec §6): a 24-byte header
//! followed by a single compressed stream holding all control triples and
//! their diff/extra bytes, interleaved in scan order. Also implements the
//! `BSDIFF44` variant, which extends the header with `oldsize` and 16-bit
//! checksums of `old`/`new` that the core computes but never verifies.
//!
//! Grounded on `original_source/bsdiff.c`'s `ENDSLEY/BSDIFF43` writer path
//! (not present in the teacher, which only speaks `BSDIFF40`/`BSDF2`).

use super::{bz2_compress, bz2_decompress};
use crate::codec::{offtin, offtout};
use crate::diff::{diff_with_suffix_array, DiffOptions, EmitSink};
use crate::error::{BsdiffError, Result};
use crate::patch::apply_interleaved;
use crate::suffix::SuffixArray;
use crc::{Crc, CRC_16_IBM_3740};
use std::io::{Cursor, Write};

const MAGIC: &[u8; 16] = b"ENDSLEY/BSDIFF43";
const MAGIC44: &[u8; 16] = b"ENDSLEY/BSDIFF44";
const HEADER_LEN: usize = 24;
const HEADER44_LEN: usize = 36;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

struct InterleavedCollector {
    buf: Vec<u8>,
}

impl EmitSink for InterleavedCollector {
    fn control(&mut self, x: i64, y: i64, z: i64) -> Result<()> {
        let mut ctrl = [0u8; 24];
        offtout(x, &mut ctrl[0..8]);
        offtout(y, &mut ctrl[8..16]);
        offtout(z, &mut ctrl[16..24]);
        self.buf.extend_from_slice(&ctrl);
        Ok(())
    }
    fn diff(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
    fn extra(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

fn build_interleaved(
    old: &[u8],
    new: &[u8],
    sa: &SuffixArray,
    options: &DiffOptions,
) -> Result<Vec<u8>> {
    let mut collector = InterleavedCollector { buf: Vec::new() };
    diff_with_suffix_array(old, new, sa, &mut collector, options)?;
    Ok(collector.buf)
}

/// Writes an `ENDSLEY/BSDIFF43` patch.
pub fn write_patch(old: &[u8], new: &[u8], writer: &mut impl Write, options: &DiffOptions) -> Result<()> {
    let sa = SuffixArray::build(old)?;
    let interleaved = build_interleaved(old, new, &sa, options)?;
    let compressed = bz2_compress(&interleaved)?;

    let mut header = [0u8; HEADER_LEN];
    header[0..16].copy_from_slice(MAGIC);
    offtout(new.len() as i64, &mut header[16..24]);

    writer.write_all(&header).map_err(BsdiffError::Io)?;
    writer.write_all(&compressed).map_err(BsdiffError::Io)?;
    Ok(())
}

/// Parses and applies an `ENDSLEY/BSDIFF43` patch against `old`.
pub fn apply_patch(old: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    if patch.len() < HEADER_LEN {
        return Err(BsdiffError::CorruptPatch("patch shorter than header".into()));
    }
    if &patch[0..16] != MAGIC {
        return Err(BsdiffError::CorruptPatch("bad ENDSLEY/BSDIFF43 magic".into()));
    }
    let newsize = offtin(patch[16..24].try_into().unwrap());
    if newsize < 0 {
        return Err(BsdiffError::CorruptPatch("negative newsize in header".into()));
    }

    let decompressed = bz2_decompress(&patch[HEADER_LEN..])?;
    let mut new = vec![0u8; newsize as usize];
    let mut cursor = Cursor::new(decompressed);
    apply_interleaved(old, &mut new, &mut cursor)?;
    Ok(new)
}

/// Checksums and sizes carried by a `BSDIFF44` header. The core surfaces
/// these to the caller; it never verifies them (that is the envelope's
/// job, per spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bsdiff44Info {
    pub oldsize: i64,
    pub newsize: i64,
    pub checksum_old: u16,
    pub checksum_new: u16,
}

/// Writes a `BSDIFF44` patch: the `ENDSLEY/BSDIFF43` body extended with
/// `oldsize` and CRC-16 checksums of `old` and `new`.
pub fn write_patch_v44(old: &[u8], new: &[u8], writer: &mut impl Write, options: &DiffOptions) -> Result<()> {
    let sa = SuffixArray::build(old)?;
    let interleaved = build_interleaved(old, new, &sa, options)?;
    let compressed = bz2_compress(&interleaved)?;

    let checksum_old = CRC16.checksum(old);
    let checksum_new = CRC16.checksum(new);

    let mut header = [0u8; HEADER44_LEN];
    header[0..16].copy_from_slice(MAGIC44);
    offtout(old.len() as i64, &mut header[16..24]);
    offtout(new.len() as i64, &mut header[24..32]);
    header[32..34].copy_from_slice(&checksum_old.to_le_bytes());
    header[34..36].copy_from_slice(&checksum_new.to_le_bytes());

    writer.write_all(&header).map_err(BsdiffError::Io)?;
    writer.write_all(&compressed).map_err(BsdiffError::Io)?;
    Ok(())
}

/// Parses and applies a `BSDIFF44` patch, returning the reconstructed
/// buffer along with the header's (unverified) sizes and checksums.
pub fn apply_patch_v44(old: &[u8], patch: &[u8]) -> Result<(Vec<u8>, Bsdiff44Info)> {
    if patch.len() < HEADER44_LEN {
        return Err(BsdiffError::CorruptPatch("patch shorter than header".into()));
    }
    if &patch[0..16] != MAGIC44 {
        return Err(BsdiffError::CorruptPatch("bad ENDSLEY/BSDIFF44 magic".into()));
    }
    let oldsize = offtin(patch[16..24].try_into().unwrap());
    let newsize = offtin(patch[24..32].try_into().unwrap());
    if oldsize < 0 || newsize < 0 {
        return Err(BsdiffError::CorruptPatch("negative size in header".into()));
    }
    let checksum_old = u16::from_le_bytes(patch[32..34].try_into().unwrap());
    let checksum_new = u16::from_le_bytes(patch[34..36].try_into().unwrap());

    let decompressed = bz2_decompress(&patch[HEADER44_LEN..])?;
    let mut new = vec![0u8; newsize as usize];
    let mut cursor = Cursor::new(decompressed);
    apply_interleaved(old, &mut new, &mut cursor)?;

    Ok((
        new,
        Bsdiff44Info {
            oldsize,
            newsize,
            checksum_old,
            checksum_new,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(old: &[u8], new: &[u8]) {
        let mut patch = Vec::new();
        write_patch(old, new, &mut patch, &DiffOptions::default()).unwrap();
        let applied = apply_patch(old, &patch).unwrap();
        assert_eq!(applied, new);
    }

    #[test]
    fn scenarios_from_spec() {
        round_trip(b"abcabc", b"abcabc");
        round_trip(b"abcdefgh", b"abcXefgh");
        round_trip(b"", b"hello");
        round_trip(b"hello", b"");
    }

    #[test]
    fn v44_round_trip_and_checksums() {
        let old = b"the quick brown fox";
        let new = b"the slow brown fox!";
        let mut patch = Vec::new();
        write_patch_v44(old, new, &mut patch, &DiffOptions::default()).unwrap();
        let (applied, info) = apply_patch_v44(old, &patch).unwrap();
        assert_eq!(applied, new);
        assert_eq!(info.oldsize, old.len() as i64);
        assert_eq!(info.newsize, new.len() as i64);
        assert_eq!(info.checksum_old, CRC16.checksum(old));
        assert_eq!(info.checksum_new, CRC16.checksum(new));
    }

    #[test]
    fn rejects_bad_magic() {
        let patch = vec![0u8; 24];
        assert!(apply_patch(b"old", &patch).is_err());
    }
}
