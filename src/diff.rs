//! Match-and-emit engine (spec §4.3): scans `new` left to right, finds the
//! longest suffix-array match at each position, decides when it is
//! good enough relative to simply continuing the previous match's
//! offset, fuzzily extends the match boundary forward and backward, and
//! resolves overlap with the previously committed region.

use crate::error::Result;
use crate::search::search;
use crate::suffix::SuffixArray;
use log::trace;

/// The three logical output streams the emit engine writes to, in scan
/// order. Wire-format writers (legacy, streaming, BSDF2) each implement
/// this differently: some buffer each stream separately for independent
/// compression, some interleave all three into one stream.
pub trait EmitSink {
    /// A committed control triple `(x, y, z)` (spec §3).
    fn control(&mut self, x: i64, y: i64, z: i64) -> Result<()>;
    /// `x` bytes of `new[i] - old[j]` (mod 256) for the just-committed
    /// diff region.
    fn diff(&mut self, bytes: &[u8]) -> Result<()>;
    /// `y` bytes of verbatim `new` for the just-committed extra region.
    fn extra(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Tunable knobs for the match-and-emit engine (spec §4.3 step 2 and
/// §9's "materially better" threshold). The suffix sort and fuzzy
/// extension algorithms themselves are not parameterized.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    dismatch_threshold: i64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            dismatch_threshold: 8,
        }
    }
}

impl DiffOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the margin by which a new match must beat the plain
    /// offset-continuation score to be preferred (default 8, `dis > 0`).
    pub fn dismatch_threshold(mut self, threshold: i64) -> Self {
        self.dismatch_threshold = threshold.max(1);
        self
    }
}

/// Compute the diff of `old` against `new`, emitting control triples and
/// diff/extra bytes to `sink` in scan order.
pub fn diff(old: &[u8], new: &[u8], sink: &mut impl EmitSink, options: &DiffOptions) -> Result<()> {
    let sa = SuffixArray::build(old)?;
    diff_with_suffix_array(old, new, &sa, sink, options)
}

/// Same as [`diff`] but reuses an already-built suffix array, so repeated
/// diffs against the same `old` need not rebuild it.
pub fn diff_with_suffix_array(
    old: &[u8],
    new: &[u8],
    sa: &SuffixArray,
    sink: &mut impl EmitSink,
    options: &DiffOptions,
) -> Result<()> {
    if old.is_empty() {
        // Every byte of `new` is extra; one control triple suffices.
        if !new.is_empty() {
            sink.control(0, new.len() as i64, 0)?;
            sink.diff(&[])?;
            sink.extra(new)?;
        }
        return Ok(());
    }
    if new.is_empty() {
        return Ok(());
    }

    let en = sa.len() - 1;

    let mut scan = 0usize;
    let mut len = 0usize;
    let mut pos = 0usize;
    let mut lastscan = 0usize;
    let mut lastpos = 0usize;
    let mut lastoffset = 0isize;

    let mut diff_buf = Vec::with_capacity(1024);

    while scan < new.len() {
        let mut oldscore = 0i64;
        scan += len;
        let mut scsc = scan;

        while scan < new.len() {
            let (p, l) = search(sa, old, &new[scan..], 0, en);
            pos = p;
            len = l;

            while scsc < scan + len {
                let old_i = scsc as isize + lastoffset;
                if old_i >= 0 && (old_i as usize) < old.len() && old[old_i as usize] == new[scsc] {
                    oldscore += 1;
                }
                scsc += 1;
            }

            if (len as i64 == oldscore && len != 0) || len as i64 > oldscore + options.dismatch_threshold {
                break;
            }

            let old_i = scan as isize + lastoffset;
            if old_i >= 0 && (old_i as usize) < old.len() && old[old_i as usize] == new[scan] {
                oldscore -= 1;
            }
            scan += 1;
        }

        if len as i64 == oldscore && scan != new.len() {
            continue;
        }

        // Forward fuzzy extension over [lastscan, scan) x [lastpos, ...).
        let mut s = 0i64;
        let mut sf = 0i64;
        let mut lenf = 0usize;
        let mut i = 0usize;
        while lastscan + i < scan && lastpos + i < old.len() {
            if old[lastpos + i] == new[lastscan + i] {
                s += 1;
            }
            i += 1;
            if 2 * s - i as i64 > 2 * sf - lenf as i64 {
                sf = s;
                lenf = i;
            }
        }

        // Backward fuzzy extension over the new match's leading edge.
        let mut lenb = 0usize;
        if scan < new.len() {
            let mut s = 0i64;
            let mut sb = 0i64;
            let mut i = 1usize;
            while scan >= lastscan + i && pos >= i {
                if old[pos - i] == new[scan - i] {
                    s += 1;
                }
                if 2 * s - i as i64 > 2 * sb - lenb as i64 {
                    sb = s;
                    lenb = i;
                }
                i += 1;
            }
        }

        // Overlap resolution.
        if lastscan + lenf > scan - lenb {
            let overlap = (lastscan + lenf) - (scan - lenb);
            let mut s = 0i64;
            let mut ss = 0i64;
            let mut lens = 0usize;
            for i in 0..overlap {
                if new[lastscan + lenf - overlap + i] == old[lastpos + lenf - overlap + i] {
                    s += 1;
                }
                if new[scan - lenb + i] == old[pos - lenb + i] {
                    s -= 1;
                }
                if s > ss {
                    ss = s;
                    lens = i + 1;
                }
            }
            lenf = lenf + lens - overlap;
            lenb -= lens;
        }

        diff_buf.clear();
        diff_buf.extend(
            new[lastscan..lastscan + lenf]
                .iter()
                .zip(&old[lastpos..lastpos + lenf])
                .map(|(n, o)| n.wrapping_sub(*o)),
        );

        let extra_start = lastscan + lenf;
        let extra_len = (scan - lenb) - extra_start;

        let x = lenf as i64;
        let y = extra_len as i64;
        let z = (pos as i64 - lenb as i64) - (lastpos as i64 + lenf as i64);
        trace!("control triple ({x}, {y}, {z})");
        sink.control(x, y, z)?;
        sink.diff(&diff_buf)?;
        sink.extra(&new[extra_start..extra_start + extra_len])?;

        lastscan = scan - lenb;
        lastpos = pos - lenb;
        lastoffset = pos as isize - scan as isize;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch;

    #[derive(Default)]
    struct Collected {
        triples: Vec<(i64, i64, i64)>,
        diff: Vec<u8>,
        extra: Vec<u8>,
    }

    impl EmitSink for Collected {
        fn control(&mut self, x: i64, y: i64, z: i64) -> Result<()> {
            self.triples.push((x, y, z));
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

    fn round_trip(old: &[u8], new: &[u8]) {
        let mut sink = Collected::default();
        diff(old, new, &mut sink, &DiffOptions::default()).unwrap();

        let total_x: i64 = sink.triples.iter().map(|t| t.0).sum();
        let total_y: i64 = sink.triples.iter().map(|t| t.1).sum();
        assert_eq!(total_x, sink.diff.len() as i64);
        assert_eq!(total_y, sink.extra.len() as i64);
        assert_eq!(total_x + total_y, new.len() as i64);

        let mut out = vec![0u8; new.len()];
        let mut diff_cursor = std::io::Cursor::new(sink.diff);
        let mut extra_cursor = std::io::Cursor::new(sink.extra);
        patch::apply_triples(
            old,
            &mut out,
            sink.triples.into_iter(),
            &mut diff_cursor,
            &mut extra_cursor,
        )
        .unwrap();
        assert_eq!(out, new);
    }

    #[test]
    fn identity_diff() {
        round_trip(b"abcabc", b"abcabc");
    }

    #[test]
    fn single_byte_flip() {
        round_trip(b"abcdefgh", b"abcXefgh");
    }

    #[test]
    fn empty_old() {
        round_trip(b"", b"hello");
    }

    #[test]
    fn empty_new() {
        round_trip(b"hello", b"");
    }

    #[test]
    fn reversed() {
        let old: Vec<u8> = (0u8..=255).collect();
        let new: Vec<u8> = old.iter().rev().copied().collect();
        round_trip(&old, &new);
    }

    #[test]
    fn both_empty() {
        round_trip(b"", b"");
    }
}
