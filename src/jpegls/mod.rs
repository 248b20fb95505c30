//! JPEG-LS implementation (ISO/IEC 14495-1 / ITU-T T.87).
//!
//! JPEG-LS is the LOCO-I low-complexity lossless and near-lossless
//! compression standard, widely used for medical image transfer syntaxes.
//! This module covers single-component grayscale scans, 2 to 16 bits per
//! sample, in both lossless (`NEAR == 0`) and near-lossless modes.
//!
//! The coder works sample by sample over a causal neighborhood
//! (`Rc Rb Rd` above, `Ra` to the left):
//!
//! - **Regular mode**: the local gradients quantize into one of 365
//!   contexts; the sample is predicted by the median edge detector, the
//!   prediction is bias-corrected from the context statistics, and the
//!   prediction error is Golomb-Rice coded with an adaptive parameter.
//! - **Run mode**: when all gradients vanish the coder switches to run
//!   counting against `Ra`, with run lengths coded through the `J` table
//!   and the terminating sample coded in one of two dedicated
//!   interruption contexts.
//!
//! The wire structure is `SOI SOF55 [LSE] SOS <entropy> EOI`. An LSE
//! type-1 segment is honored on decode; the encoder always uses the
//! default preset thresholds and writes no LSE.

pub mod coding_parameters;
pub mod decoder;
pub mod encoder;
pub mod golomb_lut;
pub mod regular_mode_context;
pub mod run_mode_context;
pub mod scan_decoder;
pub mod scan_encoder;
pub mod traits;

pub use coding_parameters::PresetCodingParameters;
pub use decoder::JpeglsDecoder;
pub use encoder::EncodeOptions;

use crate::error::CodecError;
use crate::image::GrayImage;

/// Decodes a JPEG-LS frame positioned at SOI.
pub fn decode(source: &[u8]) -> Result<GrayImage, CodecError> {
    let mut decoder = JpeglsDecoder::new(source);
    decoder.read_header()?;
    decoder.decode()
}

/// Encodes a grayscale image into a self-contained JPEG-LS frame.
pub fn encode(image: &GrayImage, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
    encoder::encode(image, options)
}
