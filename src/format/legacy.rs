//! Legacy `BSDIFF40` wire format (spec §6): a 32-byte header followed by
//! three independently bzip2-compressed streams (control, diff, extra).
//! Grounded directly on `original_source/bsdiff.c`/`bspatch.c` and the
//! teacher's `BSDF2`-with-`BSDIFF40`-compatibility path.

use super::{bz2_compress, bz2_decompress};
use crate::codec::{offtin, offtout};
use crate::diff::{diff_with_suffix_array, DiffOptions, EmitSink};
use crate::error::{BsdiffError, Result};
use crate::patch::{apply_triples, decode_control_stream};
use crate::suffix::SuffixArray;
use std::io::{Cursor, Write};

const MAGIC: &[u8; 8] = b"BSDIFF40";
const HEADER_LEN: usize = 32;

struct LegacyCollector {
    control: Vec<u8>,
    diff: Vec<u8>,
    extra: Vec<u8>,
}

impl EmitSink for LegacyCollector {
    fn control(&mut self, x: i64, y: i64, z: i64) -> Result<()> {
        let mut buf = [0u8; 24];
        offtout(x, &mut buf[0..8]);
        offtout(y, &mut buf[8..16]);
        offtout(z, &mut buf[16..24]);
        self.control.extend_from_slice(&buf);
        Ok(())
    }
    fn diff(&mut self, bytes: &[u8]) -> Result<()> {
        self.diff.extend_from_slice(bytes);
        Ok(())
    }
    fn extra(&mut self, bytes: &[u8]) -> Result<()> {
        self.extra.extend_from_slice(bytes);
        Ok(())
    }
}

/// Computes the diff between `old` and `new` and writes a complete
/// `BSDIFF40` patch to `writer`.
pub fn write_patch(old: &[u8], new: &[u8], writer: &mut impl Write, options: &DiffOptions) -> Result<()> {
    let sa = SuffixArray::build(old)?;
    write_patch_with_suffix_array(old, new, &sa, writer, options)
}

pub fn write_patch_with_suffix_array(
    old: &[u8],
    new: &[u8],
    sa: &SuffixArray,
    writer: &mut impl Write,
    options: &DiffOptions,
) -> Result<()> {
    let mut collector = LegacyCollector {
        control: Vec::new(),
        diff: Vec::new(),
        extra: Vec::new(),
    };
    diff_with_suffix_array(old, new, sa, &mut collector, options)?;

    let control_compressed = bz2_compress(&collector.control)?;
    let diff_compressed = bz2_compress(&collector.diff)?;
    let extra_compressed = bz2_compress(&collector.extra)?;

    let mut header = [0u8; HEADER_LEN];
    header[0..8].copy_from_slice(MAGIC);
    offtout(control_compressed.len() as i64, &mut header[8..16]);
    offtout(diff_compressed.len() as i64, &mut header[16..24]);
    offtout(new.len() as i64, &mut header[24..32]);

    writer.write_all(&header).map_err(BsdiffError::Io)?;
    writer.write_all(&control_compressed).map_err(BsdiffError::Io)?;
    writer.write_all(&diff_compressed).map_err(BsdiffError::Io)?;
    writer.write_all(&extra_compressed).map_err(BsdiffError::Io)?;
    Ok(())
}

/// Parses and applies a `BSDIFF40` patch against `old`, returning the
/// reconstructed `new` buffer.
pub fn apply_patch(old: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    if patch.len() < HEADER_LEN {
        return Err(BsdiffError::CorruptPatch("patch shorter than header".into()));
    }
    if &patch[0..8] != MAGIC {
        return Err(BsdiffError::CorruptPatch("bad BSDIFF40 magic".into()));
    }

    let len_control = offtin(patch[8..16].try_into().unwrap());
    let len_diff = offtin(patch[16..24].try_into().unwrap());
    let newsize = offtin(patch[24..32].try_into().unwrap());

    if len_control < 0 || len_diff < 0 || newsize < 0 {
        return Err(BsdiffError::CorruptPatch("negative length in header".into()));
    }
    let (len_control, len_diff, newsize) = (len_control as usize, len_diff as usize, newsize as usize);

    let control_start = HEADER_LEN;
    let control_end = control_start
        .checked_add(len_control)
        .ok_or_else(|| BsdiffError::SizeOverflow("control stream length overflow".into()))?;
    let diff_end = control_end
        .checked_add(len_diff)
        .ok_or_else(|| BsdiffError::SizeOverflow("diff stream length overflow".into()))?;
    if diff_end > patch.len() {
        return Err(BsdiffError::CorruptPatch("streams exceed patch size".into()));
    }

    let control = bz2_decompress(&patch[control_start..control_end])?;
    let diff_bytes = bz2_decompress(&patch[control_end..diff_end])?;
    let extra_bytes = bz2_decompress(&patch[diff_end..])?;

    let triples = decode_control_stream(&control)?;

    let mut new = vec![0u8; newsize];
    let mut diff_cursor = Cursor::new(diff_bytes);
    let mut extra_cursor = Cursor::new(extra_bytes);
    apply_triples(old, &mut new, triples.into_iter(), &mut diff_cursor, &mut extra_cursor)?;
    Ok(new)
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
    fn rejects_bad_magic() {
        let patch = vec![0u8; 32];
        assert!(apply_patch(b"old", &patch).is_err());
    }

    #[test]
    fn one_kib_identity_patch_is_small() {
        let old = vec![7u8; 1024];
        let mut patch = Vec::new();
        write_patch(&old, &old, &mut patch, &DiffOptions::default()).unwrap();
        assert!(patch.len() < old.len());
    }
}
