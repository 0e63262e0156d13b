//! End-to-end round-trip coverage across all three wire formats, plus the
//! concrete scenarios enumerated in the core's testable-properties list.

use bsdiff_core::diff::DiffOptions;
use proptest::prelude::*;

fn assert_round_trips(old: &[u8], new: &[u8]) {
    let mut legacy = Vec::new();
    bsdiff_core::write_legacy_patch(old, new, &mut legacy, &DiffOptions::default()).unwrap();
    assert_eq!(bsdiff_core::apply_legacy_patch(old, &legacy).unwrap(), new);

    let mut streaming = Vec::new();
    bsdiff_core::write_streaming_patch(old, new, &mut streaming, &DiffOptions::default()).unwrap();
    assert_eq!(
        bsdiff_core::apply_streaming_patch(old, &streaming).unwrap(),
        new
    );

    let mut streaming44 = Vec::new();
    bsdiff_core::write_patch_v44(old, new, &mut streaming44, &DiffOptions::default()).unwrap();
    let (applied44, info) = bsdiff_core::apply_patch_v44(old, &streaming44).unwrap();
    assert_eq!(applied44, new);
    assert_eq!(info.oldsize, old.len() as i64);
    assert_eq!(info.newsize, new.len() as i64);
}

#[test]
fn identical_inputs() {
    assert_round_trips(b"abcabc", b"abcabc");
}

#[test]
fn single_byte_changed() {
    assert_round_trips(b"abcdefgh", b"abcXefgh");
}

#[test]
fn empty_old_file() {
    assert_round_trips(b"", b"hello");
}

#[test]
fn empty_new_file() {
    assert_round_trips(b"hello", b"");
}

#[test]
fn both_empty() {
    assert_round_trips(b"", b"");
}

#[test]
fn full_byte_range_reversed() {
    let old: Vec<u8> = (0u8..=255).collect();
    let new: Vec<u8> = old.iter().rev().copied().collect();
    assert_round_trips(&old, &new);
}

#[test]
fn identity_diff_is_small_for_large_identical_input() {
    let old = vec![0x42u8; 64 * 1024];
    let mut patch = Vec::new();
    bsdiff_core::write_legacy_patch(&old, &old, &mut patch, &DiffOptions::default()).unwrap();
    assert!(patch.len() < old.len());
}

#[test]
fn single_flipped_byte_in_one_mib_stays_small() {
    let mut old = vec![0u8; 1024 * 1024];
    for (i, b) in old.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    let mut new = old.clone();
    new[512 * 1024] ^= 0xff;

    let mut patch = Vec::new();
    bsdiff_core::write_legacy_patch(&old, &new, &mut patch, &DiffOptions::default()).unwrap();
    assert!(patch.len() < 1024);
    assert_eq!(bsdiff_core::apply_legacy_patch(&old, &patch).unwrap(), new);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_round_trip(
        old in proptest::collection::vec(any::<u8>(), 0..2048),
        new in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        assert_round_trips(&old, &new);
    }

    #[test]
    fn sparse_edits_round_trip(
        base in proptest::collection::vec(any::<u8>(), 256..4096),
        edits in proptest::collection::vec((any::<usize>(), any::<u8>()), 0..32),
    ) {
        let mut new = base.clone();
        for (offset, byte) in edits {
            if !new.is_empty() {
                let i = offset % new.len();
                new[i] = byte;
            }
        }
        assert_round_trips(&base, &new);
    }
}
