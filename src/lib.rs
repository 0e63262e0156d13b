#![allow(clippy::needless_doctest_main)]
#![doc = include_str!("../README.md")]

pub mod codec;
pub mod diff;
pub mod error;
pub mod format;
mod search;
pub mod patch;
pub mod stream;
pub mod suffix;

pub use diff::{diff, diff_with_suffix_array, DiffOptions, EmitSink};
pub use error::{BsdiffError, Result};
pub use suffix::SuffixArray;

pub use format::bsdf2::{
    apply_patch as apply_bsdf2_patch, Bsdf2Writer, CompressionAlgorithm,
};
pub use format::legacy::{apply_patch as apply_legacy_patch, write_patch as write_legacy_patch};
pub use format::streaming::{
    apply_patch as apply_streaming_patch, apply_patch_v44, write_patch as write_streaming_patch,
    write_patch_v44, Bsdiff44Info,
};
