//! Android `BSDF2` wire format: kept from the teacher almost verbatim,
//! since it is an existing real format the teacher speaks (Android OTA's
//! extension of legacy `BSDIFF40` with a selectable compression algorithm
//! per stream), generalized to share the new core's control-triple
//! emission (`EmitSink`) instead of the teacher's bespoke inline loop.

use crate::codec::{offtin, offtout};
use crate::diff::{diff_with_suffix_array, DiffOptions, EmitSink};
use crate::error::{BsdiffError, Result};
use crate::patch::apply_triples;
use crate::suffix::SuffixArray;
use std::io::{Cursor, Read, Write};

const BSDIFF_MAGIC: &[u8; 8] = b"BSDIFF40";
const BSDF2_MAGIC: &[u8; 5] = b"BSDF2";
const HEADER_LEN: usize = 32;

/// Safety limit on the declared `newsize`, to avoid an attacker-controlled
/// header forcing a huge allocation before any stream is validated.
const MAX_NEW_SIZE: usize = 2 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    None = 0,
    Bz2 = 1,
    Brotli = 2,
}

impl CompressionAlgorithm {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Bz2),
            2 => Ok(Self::Brotli),
            other => Err(BsdiffError::CorruptPatch(format!(
                "unknown BSDF2 compression algorithm: {other}"
            ))),
        }
    }
}

fn compress(alg: CompressionAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
    match alg {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Bz2 => super::bz2_compress(data),
        CompressionAlgorithm::Brotli => {
            let mut out = Vec::new();
            {
                let mut encoder = brotli::CompressorWriter::new(&mut out, 4096, 11, 20);
                encoder.write_all(data).map_err(BsdiffError::Io)?;
                encoder.flush().map_err(BsdiffError::Io)?;
            }
            Ok(out)
        }
    }
}

fn decompress(alg: CompressionAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
    match alg {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Bz2 => super::bz2_decompress(data),
        CompressionAlgorithm::Brotli => {
            let mut out = Vec::new();
            let mut decoder = brotli::Decompressor::new(data, 4096);
            decoder.read_to_end(&mut out).map_err(BsdiffError::Io)?;
            Ok(out)
        }
    }
}

struct BsdfCollector {
    control: Vec<u8>,
    diff: Vec<u8>,
    extra: Vec<u8>,
}

impl EmitSink for BsdfCollector {
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

/// Streaming writer for `BSDF2` patches: one compression algorithm per
/// stream, matching the Android payload generator's layout.
pub struct Bsdf2Writer {
    ctrl_alg: CompressionAlgorithm,
    diff_alg: CompressionAlgorithm,
    extra_alg: CompressionAlgorithm,
}

impl Bsdf2Writer {
    pub fn new(
        ctrl_alg: CompressionAlgorithm,
        diff_alg: CompressionAlgorithm,
        extra_alg: CompressionAlgorithm,
    ) -> Self {
        Self {
            ctrl_alg,
            diff_alg,
            extra_alg,
        }
    }

    /// A `BSDF2` writer that is byte-compatible with legacy `BSDIFF40`
    /// (all three streams bzip2-compressed).
    pub fn new_legacy() -> Self {
        Self::new(
            CompressionAlgorithm::Bz2,
            CompressionAlgorithm::Bz2,
            CompressionAlgorithm::Bz2,
        )
    }

    /// Computes the diff between `old` and `new` and writes a complete
    /// patch to `writer`.
    pub fn write_patch(
        &self,
        old: &[u8],
        new: &[u8],
        writer: &mut impl Write,
        options: &DiffOptions,
    ) -> Result<()> {
        let sa = SuffixArray::build(old)?;
        let mut collector = BsdfCollector {
            control: Vec::new(),
            diff: Vec::new(),
            extra: Vec::new(),
        };
        diff_with_suffix_array(old, new, &sa, &mut collector, options)?;

        let control_compressed = compress(self.ctrl_alg, &collector.control)?;
        let diff_compressed = compress(self.diff_alg, &collector.diff)?;
        let extra_compressed = compress(self.extra_alg, &collector.extra)?;

        let is_legacy = self.ctrl_alg == CompressionAlgorithm::Bz2
            && self.diff_alg == CompressionAlgorithm::Bz2
            && self.extra_alg == CompressionAlgorithm::Bz2;

        let mut header = [0u8; HEADER_LEN];
        if is_legacy {
            header[0..8].copy_from_slice(BSDIFF_MAGIC);
        } else {
            header[0..5].copy_from_slice(BSDF2_MAGIC);
            header[5] = self.ctrl_alg as u8;
            header[6] = self.diff_alg as u8;
            header[7] = self.extra_alg as u8;
        }
        offtout(control_compressed.len() as i64, &mut header[8..16]);
        offtout(diff_compressed.len() as i64, &mut header[16..24]);
        offtout(new.len() as i64, &mut header[24..32]);

        writer.write_all(&header).map_err(BsdiffError::Io)?;
        writer.write_all(&control_compressed).map_err(BsdiffError::Io)?;
        writer.write_all(&diff_compressed).map_err(BsdiffError::Io)?;
        writer.write_all(&extra_compressed).map_err(BsdiffError::Io)?;
        Ok(())
    }
}

/// Parses a `BSDF2` or classic `BSDIFF40` header, returning
/// `(newsize, control_stream, diff_stream, extra_stream)` fully
/// decompressed.
pub fn parse_header(patch: &[u8]) -> Result<(i64, Vec<u8>, Vec<u8>, Vec<u8>)> {
    if patch.len() < HEADER_LEN {
        return Err(BsdiffError::CorruptPatch("patch data too short".into()));
    }

    let magic = &patch[0..8];
    let (alg_control, alg_diff, alg_extra) = if magic == BSDIFF_MAGIC {
        (
            CompressionAlgorithm::Bz2,
            CompressionAlgorithm::Bz2,
            CompressionAlgorithm::Bz2,
        )
    } else if &magic[0..5] == BSDF2_MAGIC {
        (
            CompressionAlgorithm::from_u8(magic[5])?,
            CompressionAlgorithm::from_u8(magic[6])?,
            CompressionAlgorithm::from_u8(magic[7])?,
        )
    } else {
        return Err(BsdiffError::CorruptPatch(
            "invalid BSDIFF/BSDF2 magic header".into(),
        ));
    };

    let len_control = offtin(patch[8..16].try_into().unwrap());
    let len_diff = offtin(patch[16..24].try_into().unwrap());
    let new_size = offtin(patch[24..32].try_into().unwrap());

    if len_control < 0 || len_diff < 0 || new_size < 0 {
        return Err(BsdiffError::CorruptPatch("negative length in patch header".into()));
    }
    let len_control = len_control as usize;
    let len_diff = len_diff as usize;
    let new_size_usize = new_size as usize;

    if new_size_usize > MAX_NEW_SIZE {
        return Err(BsdiffError::CorruptPatch(format!(
            "new size {new_size_usize} exceeds limit"
        )));
    }

    let pos = HEADER_LEN;
    let control_end = pos
        .checked_add(len_control)
        .ok_or_else(|| BsdiffError::SizeOverflow("control length overflow".into()))?;
    let diff_end = control_end
        .checked_add(len_diff)
        .ok_or_else(|| BsdiffError::SizeOverflow("diff length overflow".into()))?;
    if diff_end > patch.len() {
        return Err(BsdiffError::CorruptPatch("stream lengths exceed patch size".into()));
    }

    let control_data = decompress(alg_control, &patch[pos..control_end])?;
    if control_data.len() % 24 != 0 {
        return Err(BsdiffError::CorruptPatch(
            "control data length is not a multiple of 24".into(),
        ));
    }
    let diff_data = decompress(alg_diff, &patch[control_end..diff_end])?;
    let extra_data = decompress(alg_extra, &patch[diff_end..])?;

    Ok((new_size, control_data, diff_data, extra_data))
}

/// Applies a `BSDF2`/`BSDIFF40` patch against `old`.
pub fn apply_patch(old: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    let (new_size, control_data, diff_data, extra_data) = parse_header(patch)?;
    let mut new = vec![0u8; new_size as usize];

    let triples = crate::patch::decode_control_stream(&control_data)?;
    let mut diff_cursor = Cursor::new(diff_data);
    let mut extra_cursor = Cursor::new(extra_data);
    apply_triples(old, &mut new, triples.into_iter(), &mut diff_cursor, &mut extra_cursor)?;
    Ok(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_writer_round_trips_as_bsdiff40() {
        let old = b"the quick brown fox jumps over the lazy dog";
        let new = b"the quick brown fox leaps over one lazy dog";
        let writer = Bsdf2Writer::new_legacy();
        let mut patch = Vec::new();
        writer
            .write_patch(old, new, &mut patch, &DiffOptions::default())
            .unwrap();
        assert_eq!(&patch[0..8], BSDIFF_MAGIC);
        let applied = apply_patch(old, &patch).unwrap();
        assert_eq!(applied, new);
    }

    #[test]
    fn per_stream_compression_round_trips() {
        let old = b"abcdefghijklmnopqrstuvwxyz";
        let new = b"abcdefgXijklmnopqrstuvwxyY";
        let writer = Bsdf2Writer::new(
            CompressionAlgorithm::None,
            CompressionAlgorithm::Brotli,
            CompressionAlgorithm::Bz2,
        );
        let mut patch = Vec::new();
        writer
            .write_patch(old, new, &mut patch, &DiffOptions::default())
            .unwrap();
        assert_eq!(&patch[0..5], BSDF2_MAGIC);
        let applied = apply_patch(old, &patch).unwrap();
        assert_eq!(applied, new);
    }

    #[test]
    fn rejects_unknown_algorithm() {
        assert!(CompressionAlgorithm::from_u8(3).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let patch = vec![0u8; 32];
        assert!(parse_header(&patch).is_err());
    }
}
