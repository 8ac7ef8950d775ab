//! Snapshot codec: zlib-compress a memory image, then hex-encode it for the JSON log.

use crate::error::{AppResult, EetimeError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Encode a memory image for storage in a `read` or `header` record.
pub fn encode(image: &[u8]) -> AppResult<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(image)?;
    let compressed = encoder.finish()?;
    Ok(hex::encode(compressed))
}

/// Decode a snapshot produced by [`encode`].
pub fn decode(encoded: &str) -> AppResult<Vec<u8>> {
    let compressed =
        hex::decode(encoded.trim()).map_err(|e| EetimeError::Snapshot(format!("bad hex: {e}")))?;
    let mut image = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut image)
        .map_err(|e| EetimeError::Snapshot(format!("bad zlib stream: {e}")))?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_exactly() {
        let image: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
        let encoded = encode(&image).unwrap();
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(decode(&encoded).unwrap(), image);
    }

    #[test]
    fn blank_images_compress_well() {
        let encoded = encode(&[0xFF; 32 * 1024]).unwrap();
        assert!(encoded.len() < 1024);
    }

    #[test]
    fn decodes_stream_from_other_zlib_writers() {
        // Python: zlib.compress(b"\x00\x01")
        assert_eq!(decode("789c6360040000030002").unwrap(), vec![0, 1]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(decode("zz"), Err(EetimeError::Snapshot(_))));
        assert!(matches!(decode("0011"), Err(EetimeError::Snapshot(_))));
    }
}
