//! JPEG-LS frame decoding.

use log::warn;

use crate::error::CodecError;
use crate::image::GrayImage;
use crate::jpeg_marker_code::JpegMarkerCode;
use crate::jpeg_stream_reader::JpegStreamReader;
use crate::jpegls::coding_parameters::{validate, ScanParameters};
use crate::jpegls::scan_decoder::ScanDecoder;
use crate::FrameInfo;
use crate::TruncationInfo;

pub struct JpeglsDecoder<'a> {
    reader: JpegStreamReader<'a>,
    header_read: bool,
    truncation: Option<TruncationInfo>,
}

impl<'a> JpeglsDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            reader: JpegStreamReader::new(source),
            header_read: false,
            truncation: None,
        }
    }

    pub fn read_header(&mut self) -> Result<(), CodecError> {
        if self.header_read {
            return Ok(());
        }
        self.reader.read_header()?;
        if self.reader.frame_marker() != Some(JpegMarkerCode::StartOfFrameJpegls) {
            return Err(CodecError::EncodingNotSupported);
        }
        self.header_read = true;
        Ok(())
    }

    pub fn frame_info(&self) -> Result<FrameInfo, CodecError> {
        self.reader.frame_info()
    }

    /// Set when the last decode finished through the truncation policy.
    pub fn truncation(&self) -> Option<TruncationInfo> {
        self.truncation
    }

    pub fn decode(&mut self) -> Result<GrayImage, CodecError> {
        self.read_header()?;
        let frame_info = self.reader.frame_info()?;
        let scan = self.reader.read_start_of_scan_jpegls()?;

        let maximum_component_value = (1 << frame_info.bits_per_sample) - 1;
        if scan.near_lossless > maximum_component_value / 2 {
            return Err(CodecError::InvalidParameterNearLossless);
        }
        let preset = validate(
            &self.reader.preset_coding_parameters(),
            maximum_component_value,
            scan.near_lossless,
        )?;
        let params = ScanParameters::new(&preset, scan.near_lossless);

        let FrameInfo {
            width,
            height,
            bits_per_sample,
            ..
        } = frame_info;
        let sample_count = width as usize * height as usize;

        let mut scan_decoder = ScanDecoder::new(frame_info, params, self.reader.remaining_data());
        let (consumed, image) = if bits_per_sample <= 8 {
            let mut samples = vec![0u8; sample_count];
            let consumed = scan_decoder.decode_scan(&mut samples)?;
            (
                consumed,
                GrayImage::from_samples_u8(width, height, bits_per_sample, samples)?,
            )
        } else {
            let mut samples = vec![0u16; sample_count];
            let consumed = scan_decoder.decode_scan(&mut samples)?;
            (
                consumed,
                GrayImage::from_samples_u16(width, height, bits_per_sample, samples)?,
            )
        };
        self.truncation = scan_decoder.truncation();
        self.reader.advance(consumed);

        if self.truncation.is_none() && self.reader.read_marker() != Ok(JpegMarkerCode::EndOfImage)
        {
            warn!("end of image marker not found after scan");
        }
        Ok(image)
    }
}
