//! Lossless scan encoding.
//!
//! Two passes over the image: the first collects SSSS category frequencies
//! to derive the Huffman table, the second emits the entropy-coded data.
//! Both passes predict from reconstructed samples so the emitted differences
//! match what the decoder will see, also when a point transform is active.

use crate::constants::{MAXIMUM_POINT_TRANSFORM, MAXIMUM_PREDICTOR, MINIMUM_PREDICTOR};
use crate::error::CodecError;
use crate::image::GrayImage;
use crate::jpeg_lossless::huffman::{category_of, diff_bits, HuffmanTable};
use crate::jpeg_lossless::predict;
use crate::jpeg_stream_writer::JpegStreamWriter;
use crate::FrameInfo;

/// Options for the lossless encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Predictor selection value, 1..=7.
    pub predictor: u8,
    /// Point transform (`Al`), 0 for lossless output.
    pub point_transform: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            predictor: 1,
            point_transform: 0,
        }
    }
}

pub fn encode(image: &GrayImage, options: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
    if !(MINIMUM_PREDICTOR..=MAXIMUM_PREDICTOR).contains(&options.predictor) {
        return Err(CodecError::InvalidParameterPredictor);
    }
    if options.point_transform > MAXIMUM_POINT_TRANSFORM
        || i32::from(options.point_transform) >= image.bits_per_sample()
    {
        return Err(CodecError::InvalidParameterPointTransform);
    }

    let frame_info = FrameInfo {
        width: image.width(),
        height: image.height(),
        bits_per_sample: image.bits_per_sample(),
        component_count: 1,
    };

    let mut frequencies = [0u32; 17];
    for_each_difference(image, options, |category, _| {
        frequencies[category as usize] += 1;
    });
    let table = HuffmanTable::build_from_frequencies(&frequencies)?;

    let mut writer = JpegStreamWriter::new();
    writer.write_start_of_image();
    writer.write_jfif_app0();
    writer.write_start_of_frame_lossless(&frame_info);
    writer.write_dht(0, 0, &table.lengths, &table.values);
    writer.write_start_of_scan_lossless(options.predictor, options.point_transform);

    let mut bits = writer.bit_writer();
    for_each_difference(image, options, |category, diff| {
        table.encode(&mut bits, category as u8);
        if category > 0 && category < 16 {
            // SSSS 16 carries no additional bits (T.81 H.2).
            bits.write_bits(diff_bits(diff, category), category);
        }
    });
    bits.flush();

    writer.write_end_of_image();
    Ok(writer.into_bytes())
}

/// Runs the prediction loop, handing each sample's category and shifted
/// difference to `emit`.
fn for_each_difference(
    image: &GrayImage,
    options: &EncodeOptions,
    mut emit: impl FnMut(u32, i32),
) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let precision = image.bits_per_sample();
    let max_value = image.max_value();
    let half_range = 1i32 << (precision - 1);
    let default_prediction = half_range;
    let al = u32::from(options.point_transform);

    let mut prev = vec![0i32; width];
    let mut curr = vec![0i32; width];

    for y in 0..height {
        for x in 0..width {
            let ra = if x > 0 {
                curr[x - 1]
            } else if y > 0 {
                prev[x]
            } else {
                default_prediction
            };
            let rb = if y > 0 { prev[x] } else { ra };
            let rc = if x > 0 && y > 0 { prev[x - 1] } else { rb };

            let predicted = if x == 0 && y == 0 {
                default_prediction
            } else if y == 0 {
                ra
            } else if x == 0 {
                rb
            } else {
                predict(options.predictor, ra, rb, rc)
            };

            let sample = image.get(x as u32, y as u32);
            // Difference modulo 2^P, reduced to [-2^(P-1), 2^(P-1)).
            let wrapped = ((sample - predicted + half_range) & max_value) - half_range;
            let diff = wrapped >> al;

            emit(category_of(diff), diff);

            // Track what the decoder will reconstruct.
            curr[x] = (predicted + (diff << al)) & max_value;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
}
