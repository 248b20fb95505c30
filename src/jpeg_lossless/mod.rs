//! JPEG Lossless (Process 14) implementation (ISO/IEC 10918-1 / ITU-T T.81 Annex H).
//!
//! First-order prediction over a single grayscale component with Huffman
//! entropy coding. The wire structure is
//! `SOI APP0 SOF3 DHT SOS <entropy> EOI`; the predictor selection travels in
//! the `Ss` field of the scan header and the point transform in `Al`.

pub mod decoder;
pub mod encoder;
pub mod huffman;

pub use decoder::LosslessDecoder;
pub use encoder::EncodeOptions;

use crate::error::CodecError;
use crate::image::GrayImage;

/// Predicts the current sample from its reconstructed neighbors.
/// `Ra` is the sample to the left, `Rb` the sample above, `Rc` the sample
/// above-left; `sv` is the selection value from the scan header.
pub fn predict(sv: u8, ra: i32, rb: i32, rc: i32) -> i32 {
    match sv {
        1 => ra,
        2 => rb,
        3 => rc,
        4 => ra + rb - rc,
        5 => ra + ((rb - rc) >> 1),
        6 => rb + ((ra - rc) >> 1),
        7 => (ra + rb) >> 1,
        _ => ra,
    }
}

/// Decodes a lossless frame positioned at SOI.
pub fn decode(source: &[u8]) -> Result<GrayImage, CodecError> {
    let mut decoder = LosslessDecoder::new(source);
    decoder.read_header()?;
    decoder.decode()
}

/// Encodes a grayscale image into a self-contained lossless frame.
pub fn encode(image: &GrayImage, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
    encoder::encode(image, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictor_formulas() {
        assert_eq!(predict(1, 100, 200, 50), 100); // Ra
        assert_eq!(predict(2, 100, 200, 50), 200); // Rb
        assert_eq!(predict(3, 100, 200, 50), 50); // Rc
        assert_eq!(predict(4, 100, 200, 50), 250); // Ra + Rb - Rc
        assert_eq!(predict(5, 100, 200, 50), 175); // Ra + (Rb - Rc) / 2
        assert_eq!(predict(6, 100, 200, 50), 225); // Rb + (Ra - Rc) / 2
        assert_eq!(predict(7, 100, 200, 50), 150); // (Ra + Rb) / 2
    }
}
