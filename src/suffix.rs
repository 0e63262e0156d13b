//! Suffix array construction over `old` (spec §4.1): Larsson-Sadakane
//! doubling suffix sort (`qsufsort`) with a three-way (Bentley-McIlroy)
//! partition for the `split` step.
//!
//! `I` and `V` are kept as flat `Vec<i64>` rather than a separate
//! run-length bit-vector: during construction a negative entry in `I`
//! encodes the length of a run of already-sorted suffixes starting at
//! that slot, per spec.md's Design Notes. This mirrors the reference
//! implementation directly and avoids a second allocation.

use crate::error::{BsdiffError, Result};
use std::cmp::Ordering;

/// `old[0..oldsize]`'s suffix array: `index[k]` is the starting offset in
/// `old` of the `k`-th suffix in lexicographic order. Length is always
/// `oldsize + 1` (the empty suffix sorts first).
pub struct SuffixArray {
    index: Vec<i64>,
}

impl SuffixArray {
    /// Build the suffix array of `old` in `O(n log n)`.
    pub fn build(old: &[u8]) -> Result<Self> {
        let n = old.len();
        let mut index = vec![0i64; n + 1];
        let mut rank = vec![0i64; n + 1];

        qsufsort(&mut index, &mut rank, old)?;

        Ok(SuffixArray { index })
    }

    /// The underlying permutation, `oldsize + 1` entries long.
    pub fn as_slice(&self) -> &[i64] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[inline(always)]
fn idx(i: i64) -> usize {
    debug_assert!(i >= 0, "negative index used as array offset: {i}");
    i as usize
}

fn qsufsort(index: &mut [i64], rank: &mut [i64], old: &[u8]) -> Result<()> {
    let n = old.len();

    let mut buckets = [0i64; 256];
    for &b in old {
        buckets[b as usize] += 1;
    }
    for i in 1..256 {
        buckets[i] += buckets[i - 1];
    }
    for i in (1..256).rev() {
        buckets[i] = buckets[i - 1];
    }
    buckets[0] = 0;

    for (i, &b) in old.iter().enumerate() {
        buckets[b as usize] += 1;
        index[idx(buckets[b as usize])] = i as i64;
    }

    index[0] = n as i64;
    for (i, &b) in old.iter().enumerate() {
        rank[i] = buckets[b as usize];
    }
    rank[n] = 0;

    for i in 1..256 {
        if buckets[i] == buckets[i - 1] + 1 {
            index[idx(buckets[i])] = -1;
        }
    }
    index[0] = -1;

    let mut h = 1usize;
    while index[0] != -(n as i64 + 1) {
        let mut len = 0i64;
        let mut i = 0i64;
        while i < n as i64 + 1 {
            if index[idx(i)] < 0 {
                len -= index[idx(i)];
                i -= index[idx(i)];
            } else {
                if len != 0 {
                    index[idx(i - len)] = -len;
                }
                len = rank[idx(index[idx(i)])] + 1 - i;
                split(index, rank, idx(i), idx(len), h);
                i += len;
                len = 0;
            }
        }
        if len != 0 {
            index[idx(i - len)] = -len;
        }

        h = h
            .checked_mul(2)
            .ok_or_else(|| BsdiffError::SizeOverflow("qsufsort doubling step h overflowed".into()))?;
    }

    for i in 0..=n {
        index[idx(rank[i])] = i as i64;
    }

    Ok(())
}

struct SplitTail {
    start: usize,
    len: usize,
}

/// Three-way partition of `index[start..start+len]` keyed on
/// `rank[index[k] + h]`, sorting the `< x` and `> x` partitions
/// recursively and assigning a shared rank to the `== x` partition.
fn split(index: &mut [i64], rank: &mut [i64], start: usize, len: usize, h: usize) {
    let mut tail = Some(SplitTail { start, len });
    while let Some(SplitTail { start, len }) = tail {
        tail = split_once(index, rank, start, len, h);
    }
}

fn split_once(
    index: &mut [i64],
    rank: &mut [i64],
    start: usize,
    len: usize,
    h: usize,
) -> Option<SplitTail> {
    if len < 16 {
        let mut k = start;
        while k < start + len {
            let mut j = 1;
            let mut x = rank[idx(index[k] + h as i64)];
            let mut i = 1;
            while k + i < start + len {
                let v = rank[idx(index[k + i] + h as i64)];
                if v < x {
                    x = v;
                    j = 0;
                }
                if v == x {
                    index.swap(k + j, k + i);
                    j += 1;
                }
                i += 1;
            }
            let kj = (k + j) as i64;
            for &ii in &index[k..k + j] {
                rank[idx(ii)] = kj - 1;
            }
            if j == 1 {
                index[k] = -1;
            }
            k += j;
        }
        None
    } else {
        let pivot = rank[idx(index[start + len / 2] + h as i64)];

        let mut less = 0usize;
        let mut equal = 0usize;
        for &ii in &index[start..start + len] {
            let v = rank[idx(ii + h as i64)];
            match v.cmp(&pivot) {
                Ordering::Less => less += 1,
                Ordering::Equal => equal += 1,
                Ordering::Greater => {}
            }
        }
        let less_end = less + start;
        let equal_end = equal + less_end;

        let mut j = 0;
        let mut k = 0;
        let mut i = start;
        while i < less_end {
            match rank[idx(index[i] + h as i64)].cmp(&pivot) {
                Ordering::Less => i += 1,
                Ordering::Equal => {
                    index.swap(i, less_end + j);
                    j += 1;
                }
                Ordering::Greater => {
                    index.swap(i, equal_end + k);
                    k += 1;
                }
            }
        }

        while less_end + j < equal_end {
            if rank[idx(index[less_end + j] + h as i64)] == pivot {
                j += 1;
            } else {
                index.swap(less_end + j, equal_end + k);
                k += 1;
            }
        }

        if less_end > start {
            split(index, rank, start, less_end - start, h);
        }

        let equal_last = (equal_end - 1) as i64;
        for &ii in &index[less_end..equal_end] {
            rank[idx(ii)] = equal_last;
        }
        if less_end == equal_end - 1 {
            index[less_end] = -1;
        }

        if start + len > equal_end {
            Some(SplitTail {
                start: equal_end,
                len: start + len - equal_end,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation_and_sorted(old: &[u8], sa: &SuffixArray) {
        let n = old.len();
        let i = sa.as_slice();
        assert_eq!(i.len(), n + 1);

        let mut seen = vec![false; n + 1];
        for &v in i {
            let v = v as usize;
            assert!(v <= n);
            assert!(!seen[v], "index {v} appears twice in suffix array");
            seen[v] = true;
        }

        for k in 0..n {
            let a = &old[i[k] as usize..];
            let b = &old[i[k + 1] as usize..];
            assert!(a <= b, "suffix array not sorted at rank {k}");
        }
    }

    #[test]
    fn permutation_on_simple_input() {
        let old = b"abracadabra";
        let sa = SuffixArray::build(old).unwrap();
        is_permutation_and_sorted(old, &sa);
    }

    #[test]
    fn permutation_on_repetitive_input() {
        let old = vec![b'a'; 300];
        let sa = SuffixArray::build(&old).unwrap();
        is_permutation_and_sorted(&old, &sa);
    }

    #[test]
    fn permutation_on_all_byte_values() {
        let old: Vec<u8> = (0..=255u8).collect();
        let sa = SuffixArray::build(&old).unwrap();
        is_permutation_and_sorted(&old, &sa);
    }

    #[test]
    fn empty_input() {
        let sa = SuffixArray::build(&[]).unwrap();
        assert_eq!(sa.as_slice(), &[0]);
    }

    proptest::proptest! {
        #[test]
        fn permutation_on_random_input(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512)) {
            let sa = SuffixArray::build(&data).unwrap();
            is_permutation_and_sorted(&data, &sa);
        }
    }
}
