//! Completion classifier.
//!
//! A memory image is "fully erased" when every bit reads as 1. Parts whose blank state
//! is not all-ones (e.g. padded PIC images) are not handled here.

use sha2::{Digest, Sha256};

/// Result of classifying one memory image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Every bit of the image is set
    pub erased: bool,
    /// Percentage of set bits, in [0, 100]
    pub erase_percent: f64,
}

/// Classify a raw memory image.
///
/// `erase_percent = 100 * set_bits / (8 * len)`. An empty image has no bits to erase and
/// is reported as erased at 100%.
pub fn classify(image: &[u8]) -> Classification {
    let possible_bits = image.len() as u64 * 8;
    let set_bits: u64 = image.iter().map(|b| u64::from(b.count_ones())).sum();
    if possible_bits == 0 {
        return Classification {
            erased: true,
            erase_percent: 100.0,
        };
    }
    Classification {
        erased: set_bits == possible_bits,
        erase_percent: 100.0 * set_bits as f64 / possible_bits as f64,
    }
}

/// Short content signature so an operator can see whether the image is still changing.
pub fn signature(image: &[u8]) -> String {
    let digest = Sha256::digest(image);
    hex::encode(&digest[..4])
}
