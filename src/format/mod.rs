//! Wire formats that wrap the core's three byte streams (spec §6). The
//! core itself is format-agnostic; these modules are the "envelope"
//! callers that compress each stream (bzip2, matching the reference
//! implementation) and frame them with a magic/length header.

pub mod bsdf2;
pub mod legacy;
pub mod streaming;

use crate::error::{BsdiffError, Result};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use std::io::{Read, Write};

pub(crate) fn bz2_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).map_err(BsdiffError::Io)?;
    encoder.finish().map_err(BsdiffError::Io)
}

pub(crate) fn bz2_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = BzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(BsdiffError::Io)?;
    Ok(out)
}
