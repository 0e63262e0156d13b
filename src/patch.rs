//! Patch applier (spec §4.5): replays control triples against `old`,
//! adding byte-wise diffs and splicing verbatim extra bytes, to
//! reconstruct `new` exactly.
//!
//! Two entry points share the same mixing core: [`apply_triples`] takes
//! control triples already decoded into memory plus separate diff/extra
//! readers (the legacy `BSDIFF40`/`BSDF2` shape, each stream independently
//! compressed), and [`apply_interleaved`] reads all three, interleaved,
//! from one stream (the streaming `ENDSLEY/BSDIFF43` shape).

use crate::codec::offtin;
use crate::error::{BsdiffError, Result};
use crate::stream::read_exact;
use log::debug;
use std::io::Read;

/// Mixes a just-read diff region into `new[new_cursor..new_cursor+x]` by
/// adding the corresponding bytes of `old` (bytes outside `[0, oldsize)`
/// contribute zero), then appends the extra region verbatim. Returns the
/// advanced `(old_cursor, new_cursor)` after the diff region only; the
/// caller advances `new_cursor` past the extra region and `old_cursor` by
/// `z` itself.
fn mix_region(
    old: &[u8],
    new: &mut [u8],
    old_cursor: isize,
    new_cursor: usize,
    diff_bytes: &[u8],
    extra_bytes: &[u8],
) -> Result<(isize, usize)> {
    let x = diff_bytes.len();
    let y = extra_bytes.len();

    if new_cursor + x > new.len() {
        return Err(BsdiffError::CorruptPatch(
            "diff region would overrun newsize".into(),
        ));
    }
    new[new_cursor..new_cursor + x].copy_from_slice(diff_bytes);
    for i in 0..x {
        let oi = old_cursor + i as isize;
        if oi >= 0 && (oi as usize) < old.len() {
            new[new_cursor + i] = new[new_cursor + i].wrapping_add(old[oi as usize]);
        }
    }
    let new_cursor = new_cursor + x;
    let old_cursor = old_cursor + x as isize;

    if new_cursor + y > new.len() {
        return Err(BsdiffError::CorruptPatch(
            "extra region would overrun newsize".into(),
        ));
    }
    new[new_cursor..new_cursor + y].copy_from_slice(extra_bytes);
    let new_cursor = new_cursor + y;

    Ok((old_cursor, new_cursor))
}

/// Applies already-decoded control triples, reading diff bytes from
/// `diff_source` and extra bytes from `extra_source` in order.
pub fn apply_triples(
    old: &[u8],
    new: &mut [u8],
    triples: impl Iterator<Item = (i64, i64, i64)>,
    diff_source: &mut impl Read,
    extra_source: &mut impl Read,
) -> Result<()> {
    let mut old_cursor: isize = 0;
    let mut new_cursor: usize = 0;
    let mut diff_buf = Vec::new();
    let mut extra_buf = Vec::new();

    for (x, y, z) in triples {
        if x < 0 || y < 0 {
            return Err(BsdiffError::CorruptPatch(format!(
                "negative control length: x={x}, y={y}"
            )));
        }
        let (x, y) = (x as usize, y as usize);

        diff_buf.resize(x, 0);
        read_exact(diff_source, &mut diff_buf)?;
        extra_buf.resize(y, 0);
        read_exact(extra_source, &mut extra_buf)?;

        let (oc, nc) = mix_region(old, new, old_cursor, new_cursor, &diff_buf, &extra_buf)?;
        old_cursor = oc + z as isize;
        new_cursor = nc;

        if new_cursor == new.len() {
            break;
        }
    }

    if new_cursor != new.len() {
        return Err(BsdiffError::CorruptPatch(format!(
            "control stream exhausted at {new_cursor} of {} bytes",
            new.len()
        )));
    }
    debug!("patch applied: {} bytes", new.len());
    Ok(())
}

/// Decodes a control stream (a whole number of 24-byte sign-magnitude
/// triples) into `(x, y, z)` triples.
pub fn decode_control_stream(control: &[u8]) -> Result<Vec<(i64, i64, i64)>> {
    if control.len() % 24 != 0 {
        return Err(BsdiffError::CorruptPatch(
            "control stream length is not a multiple of 24".into(),
        ));
    }
    let mut out = Vec::with_capacity(control.len() / 24);
    for chunk in control.chunks_exact(24) {
        let x = offtin(chunk[0..8].try_into().unwrap());
        let y = offtin(chunk[8..16].try_into().unwrap());
        let z = offtin(chunk[16..24].try_into().unwrap());
        out.push((x, y, z));
    }
    Ok(out)
}

/// Applies a patch whose control triples and diff/extra bytes are all
/// interleaved in a single stream (the streaming `ENDSLEY/BSDIFF43`
/// shape): read 24 bytes of control, `x` diff bytes, `y` extra bytes,
/// repeat until `new` is full.
pub fn apply_interleaved(old: &[u8], new: &mut [u8], stream: &mut impl Read) -> Result<()> {
    let mut old_cursor: isize = 0;
    let mut new_cursor: usize = 0;
    let mut ctrl_buf = [0u8; 24];
    let mut diff_buf = Vec::new();
    let mut extra_buf = Vec::new();

    while new_cursor < new.len() {
        read_exact(stream, &mut ctrl_buf)?;
        let x = offtin(ctrl_buf[0..8].try_into().unwrap());
        let y = offtin(ctrl_buf[8..16].try_into().unwrap());
        let z = offtin(ctrl_buf[16..24].try_into().unwrap());

        if x < 0 || y < 0 {
            return Err(BsdiffError::CorruptPatch(format!(
                "negative control length: x={x}, y={y}"
            )));
        }

        diff_buf.resize(x as usize, 0);
        read_exact(stream, &mut diff_buf)?;
        extra_buf.resize(y as usize, 0);
        read_exact(stream, &mut extra_buf)?;

        let (oc, nc) = mix_region(old, new, old_cursor, new_cursor, &diff_buf, &extra_buf)?;
        old_cursor = oc + z;
        new_cursor = nc;
    }

    debug!("patch applied: {} bytes", new.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_x() {
        let old = b"hello";
        let mut new = [0u8; 5];
        let triples = vec![(-1i64, 0i64, 0i64)];
        let mut diff = std::io::Cursor::new(Vec::<u8>::new());
        let mut extra = std::io::Cursor::new(Vec::<u8>::new());
        let err = apply_triples(old, &mut new, triples.into_iter(), &mut diff, &mut extra);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_overrun() {
        let old = b"hello";
        let mut new = [0u8; 2];
        let triples = vec![(5i64, 0i64, 0i64)];
        let mut diff = std::io::Cursor::new(vec![0u8; 5]);
        let mut extra = std::io::Cursor::new(Vec::<u8>::new());
        let err = apply_triples(old, &mut new, triples.into_iter(), &mut diff, &mut extra);
        assert!(err.is_err());
    }

    #[test]
    fn control_stream_must_be_aligned() {
        assert!(decode_control_stream(&[0u8; 23]).is_err());
        assert!(decode_control_stream(&[0u8; 24]).is_ok());
    }
}
