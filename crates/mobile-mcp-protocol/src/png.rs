//! PNG header inspection
//!
//! Screenshots arrive as raw bytes from adb or the automation daemon. Before
//! anything else touches them we read the IHDR dimensions straight from the
//! header, without decoding the image.

use thiserror::Error;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Width and height read from a PNG header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PngError {
    #[error("Not a valid PNG file")]
    InvalidSignature,
    #[error("PNG header truncated: {0} bytes")]
    Truncated(usize),
}

/// Read the dimensions of a PNG image from its IHDR chunk
pub fn png_dimensions(buffer: &[u8]) -> Result<PngDimensions, PngError> {
    if buffer.len() < PNG_SIGNATURE.len() || buffer[..8] != PNG_SIGNATURE {
        return Err(PngError::InvalidSignature);
    }
    if buffer.len() < 24 {
        return Err(PngError::Truncated(buffer.len()));
    }

    let width = u32::from_be_bytes([buffer[16], buffer[17], buffer[18], buffer[19]]);
    let height = u32::from_be_bytes([buffer[20], buffer[21], buffer[22], buffer[23]]);
    Ok(PngDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 RGB PNG
    const ONE_BY_ONE: [u8; 68] = [
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xde, 0x00, 0x00, 0x00, 0x0c, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x60,
        0x60, 0x00, 0x00, 0x00, 0x03, 0x00, 0x01, 0x68, 0x26, 0x59, 0x0d, 0x00, 0x00, 0x00, 0x00,
        0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn test_parse_one_by_one_png() {
        let dims = png_dimensions(&ONE_BY_ONE).unwrap();
        assert_eq!(dims.width, 1);
        assert_eq!(dims.height, 1);
    }

    #[test]
    fn test_reject_non_png() {
        assert_eq!(
            png_dimensions(b"IAMADUCKIAMADUCKIAMADUCKIAMADUCKIAMADUCK"),
            Err(PngError::InvalidSignature)
        );
    }

    #[test]
    fn test_reject_short_buffers() {
        assert_eq!(png_dimensions(&[]), Err(PngError::InvalidSignature));
        assert_eq!(png_dimensions(&ONE_BY_ONE[..4]), Err(PngError::InvalidSignature));
        assert_eq!(png_dimensions(&ONE_BY_ONE[..20]), Err(PngError::Truncated(20)));
    }

    #[test]
    fn test_any_corrupted_signature_fails() {
        for i in 0..8 {
            let mut bytes = ONE_BY_ONE;
            bytes[i] ^= 0xff;
            assert!(
                png_dimensions(&bytes).is_err(),
                "flipping signature byte {} should fail",
                i
            );
        }
    }

    #[test]
    fn test_reads_big_endian_dimensions() {
        let mut bytes = ONE_BY_ONE;
        bytes[16..20].copy_from_slice(&1080u32.to_be_bytes());
        bytes[20..24].copy_from_slice(&2400u32.to_be_bytes());
        let dims = png_dimensions(&bytes).unwrap();
        assert_eq!((dims.width, dims.height), (1080, 2400));
    }
}
