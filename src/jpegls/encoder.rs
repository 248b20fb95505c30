//! JPEG-LS frame encoding.

use crate::error::CodecError;
use crate::image::{GrayImage, SampleBuffer};
use crate::jpeg_stream_writer::JpegStreamWriter;
use crate::jpegls::coding_parameters::{
    compute_default, compute_maximum_near_lossless, ScanParameters,
};
use crate::jpegls::scan_encoder::ScanEncoder;
use crate::FrameInfo;

/// Options for the JPEG-LS encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Near-lossless bound; 0 encodes losslessly.
    pub near_lossless: i32,
}

pub fn encode(image: &GrayImage, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
    let maximum_sample_value = image.max_value();
    if options.near_lossless < 0
        || options.near_lossless > compute_maximum_near_lossless(maximum_sample_value)
    {
        return Err(CodecError::InvalidParameterNearLossless);
    }

    let frame_info = FrameInfo {
        width: image.width(),
        height: image.height(),
        bits_per_sample: image.bits_per_sample(),
        component_count: 1,
    };

    // Default preset thresholds apply; no LSE segment is written.
    let preset = compute_default(maximum_sample_value, options.near_lossless);
    let params = ScanParameters::new(&preset, options.near_lossless);

    let mut writer = JpegStreamWriter::new();
    writer.write_start_of_image();
    writer.write_start_of_frame_jpegls(&frame_info);
    writer.write_start_of_scan_jpegls(options.near_lossless);

    let mut bits = writer.bit_writer();
    let mut scan_encoder = ScanEncoder::new(frame_info, params, &mut bits);
    match image.samples() {
        SampleBuffer::U8(samples) => scan_encoder.encode_scan(samples)?,
        SampleBuffer::U16(samples) => scan_encoder.encode_scan(samples)?,
    }

    writer.write_end_of_image();
    Ok(writer.into_bytes())
}
