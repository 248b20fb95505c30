//! JPEG codestream reader.
//!
//! Handles the sequential marker/segment structure shared by the two
//! lossless processes: SOI, frame headers (SOF3 / SOF55), Huffman tables,
//! restart-interval and JPEG-LS preset-parameter segments, and the two SOS
//! flavors. Entropy-coded data itself is read by [`crate::bit_io::BitReader`]
//! starting at [`JpegStreamReader::remaining_data`].

use log::{debug, warn};

use crate::constants::{
    MAXIMUM_BITS_PER_SAMPLE, MAXIMUM_PREDICTOR, MINIMUM_BITS_PER_SAMPLE, MINIMUM_PREDICTOR,
    SEGMENT_LENGTH_SIZE,
};
use crate::error::CodecError;
use crate::jpeg_lossless::huffman::HuffmanTable;
use crate::jpeg_marker_code::{JpegMarkerCode, JPEG_MARKER_START_BYTE};
use crate::jpegls::coding_parameters::PresetCodingParameters;
use crate::FrameInfo;

/// Parameters of a lossless (SOF3) scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LosslessScanInfo {
    pub predictor: u8,
    pub point_transform: u8,
    pub dc_table_selector: usize,
}

/// Parameters of a JPEG-LS (SOF55) scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpeglsScanInfo {
    pub near_lossless: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    BeforeStartOfImage,
    HeaderSection,
    ScanSection,
}

pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    state: ReaderState,
    frame_info: Option<FrameInfo>,
    frame_marker: Option<JpegMarkerCode>,
    preset_coding_parameters: PresetCodingParameters,
    pub dc_tables: [Option<HuffmanTable>; 4],
    pub restart_interval: u16,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            state: ReaderState::BeforeStartOfImage,
            frame_info: None,
            frame_marker: None,
            preset_coding_parameters: PresetCodingParameters::default(),
            dc_tables: [const { None }; 4],
            restart_interval: 0,
        }
    }

    pub fn frame_info(&self) -> Result<FrameInfo, CodecError> {
        self.frame_info.ok_or(CodecError::StartOfFrameMarkerNotFound)
    }

    pub fn frame_marker(&self) -> Option<JpegMarkerCode> {
        self.frame_marker
    }

    pub fn preset_coding_parameters(&self) -> PresetCodingParameters {
        self.preset_coding_parameters
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.source.len());
    }

    /// Reads markers up to (not including) the first SOS.
    pub fn read_header(&mut self) -> Result<(), CodecError> {
        self.read_start_of_image()?;

        loop {
            let marker = self.read_marker()?;
            match marker {
                JpegMarkerCode::StartOfFrameLossless | JpegMarkerCode::StartOfFrameJpegls => {
                    self.read_start_of_frame_segment(marker)?;
                }
                JpegMarkerCode::StartOfFrameBaseline
                | JpegMarkerCode::StartOfFrameExtended
                | JpegMarkerCode::StartOfFrameProgressive => {
                    return Err(CodecError::EncodingNotSupported);
                }
                JpegMarkerCode::DefineHuffmanTable => {
                    self.read_dht_segment()?;
                }
                JpegMarkerCode::DefineRestartInterval => {
                    self.read_dri_segment()?;
                }
                JpegMarkerCode::JpeglsPresetParameters => {
                    self.read_preset_parameters_segment()?;
                }
                JpegMarkerCode::StartOfScan => {
                    if self.frame_info.is_none() {
                        return Err(CodecError::StartOfFrameMarkerNotFound);
                    }
                    self.position -= 2;
                    break;
                }
                JpegMarkerCode::EndOfImage => {
                    return Err(CodecError::UnexpectedEndOfData);
                }
                JpegMarkerCode::Comment | JpegMarkerCode::DefineNumberOfLines => {
                    self.skip_segment()?;
                }
                marker if marker.is_application_data() => {
                    self.skip_segment()?;
                }
                _ => {
                    return Err(CodecError::UnknownJpegMarkerFound);
                }
            }
        }
        Ok(())
    }

    /// Parses the SOS segment of a lossless scan. `Ss` selects the
    /// predictor and `Al` the point transform.
    pub fn read_start_of_scan_lossless(&mut self) -> Result<LosslessScanInfo, CodecError> {
        let end = self.begin_start_of_scan()?;

        let table_selector = self.read_u8()?;
        let dc_table_selector = (table_selector >> 4) as usize;

        let mut predictor = self.read_u8()?; // Ss
        let _se = self.read_u8()?;
        let ah_al = self.read_u8()?;
        self.finish_segment(end)?;

        if !(MINIMUM_PREDICTOR..=MAXIMUM_PREDICTOR).contains(&predictor) {
            // Historical producers write out-of-range selection values;
            // those scans decode as plain left prediction.
            warn!("out-of-range predictor {predictor}, falling back to predictor 1");
            predictor = 1;
        }

        self.state = ReaderState::ScanSection;
        Ok(LosslessScanInfo {
            predictor,
            point_transform: ah_al & 0x0F,
            dc_table_selector,
        })
    }

    /// Parses the SOS segment of a JPEG-LS scan.
    pub fn read_start_of_scan_jpegls(&mut self) -> Result<JpeglsScanInfo, CodecError> {
        let end = self.begin_start_of_scan()?;

        let _mapping_table_selector = self.read_u8()?;
        let near_lossless = self.read_u8()? as i32;
        let interleave_mode = self.read_u8()?;
        let _ah_al = self.read_u8()?;
        self.finish_segment(end)?;

        if interleave_mode != 0 {
            return Err(CodecError::ParameterValueNotSupported);
        }

        self.state = ReaderState::ScanSection;
        Ok(JpeglsScanInfo { near_lossless })
    }

    /// Common SOS prefix: marker, length, component count, selector.
    /// Returns the segment end offset.
    fn begin_start_of_scan(&mut self) -> Result<usize, CodecError> {
        if self.state != ReaderState::HeaderSection {
            return Err(CodecError::UnknownJpegMarkerFound);
        }
        if self.read_marker()? != JpegMarkerCode::StartOfScan {
            return Err(CodecError::UnknownJpegMarkerFound);
        }
        let end = self.read_segment_length()?;

        let components_in_scan = self.read_u8()?;
        if components_in_scan != 1 {
            return Err(CodecError::InvalidParameterComponentCount);
        }
        let _component_selector = self.read_u8()?;
        Ok(end)
    }

    fn read_start_of_image(&mut self) -> Result<(), CodecError> {
        if self.read_marker()? != JpegMarkerCode::StartOfImage {
            return Err(CodecError::StartOfImageMarkerNotFound);
        }
        self.state = ReaderState::HeaderSection;
        Ok(())
    }

    fn read_start_of_frame_segment(&mut self, marker: JpegMarkerCode) -> Result<(), CodecError> {
        if self.frame_info.is_some() {
            return Err(CodecError::DuplicateStartOfFrameMarker);
        }

        let end = self.read_segment_length()?;
        let bits_per_sample = self.read_u8()? as i32;
        let height = self.read_u16()? as u32;
        let width = self.read_u16()? as u32;
        let component_count = self.read_u8()? as i32;

        if !(MINIMUM_BITS_PER_SAMPLE..=MAXIMUM_BITS_PER_SAMPLE).contains(&bits_per_sample) {
            return Err(CodecError::InvalidParameterBitsPerSample);
        }
        if width == 0 {
            return Err(CodecError::InvalidParameterWidth);
        }
        if height == 0 {
            // DNL-deferred dimensions are not supported.
            return Err(CodecError::InvalidParameterHeight);
        }
        if component_count != 1 {
            return Err(CodecError::InvalidParameterComponentCount);
        }

        for _ in 0..component_count {
            let _id = self.read_u8()?;
            let sampling = self.read_u8()?;
            if sampling != 0x11 {
                return Err(CodecError::ParameterValueNotSupported);
            }
            let _tq = self.read_u8()?;
        }
        self.finish_segment(end)?;

        debug!("frame header: {width}x{height}, {bits_per_sample} bits, marker {marker:?}");
        self.frame_marker = Some(marker);
        self.frame_info = Some(FrameInfo {
            width,
            height,
            bits_per_sample,
            component_count,
        });
        Ok(())
    }

    fn read_dht_segment(&mut self) -> Result<(), CodecError> {
        let end = self.read_segment_length()?;
        while self.position + 17 <= end {
            let tc_th = self.read_u8()?;
            let class = tc_th >> 4;
            let id = (tc_th & 0x0F) as usize;
            if id >= 4 {
                return Err(CodecError::ParameterValueNotSupported);
            }

            let mut lengths = [0u8; 16];
            let mut total_values = 0usize;
            for item in &mut lengths {
                *item = self.read_u8()?;
                total_values += *item as usize;
            }

            if self.position + total_values > end {
                return Err(CodecError::InvalidMarkerSegmentSize);
            }
            let values = &self.source[self.position..self.position + total_values];
            let table = HuffmanTable::build_from_dht(&lengths, values)?;
            self.position += total_values;

            // Lossless prediction uses DC-class tables only; a redefinition
            // replaces the previous table for that destination.
            if class == 0 {
                self.dc_tables[id] = Some(table);
            }
        }
        self.finish_segment(end)
    }

    fn read_dri_segment(&mut self) -> Result<(), CodecError> {
        let end = self.read_segment_length()?;
        if end - self.position != 2 {
            return Err(CodecError::InvalidMarkerSegmentSize);
        }
        self.restart_interval = self.read_u16()?;
        self.finish_segment(end)
    }

    fn read_preset_parameters_segment(&mut self) -> Result<(), CodecError> {
        let end = self.read_segment_length()?;
        let parameter_type = self.read_u8()?;
        if parameter_type != 1 {
            // Mapping tables and extended types have no use in a
            // single-component grayscale scan.
            return Err(CodecError::ParameterValueNotSupported);
        }
        self.preset_coding_parameters = PresetCodingParameters {
            maximum_sample_value: self.read_u16()? as i32,
            threshold1: self.read_u16()? as i32,
            threshold2: self.read_u16()? as i32,
            threshold3: self.read_u16()? as i32,
            reset_value: self.read_u16()? as i32,
        };
        self.finish_segment(end)
    }

    /// Reads the 16-bit segment length and returns the segment end offset.
    fn read_segment_length(&mut self) -> Result<usize, CodecError> {
        let length = self.read_u16()? as usize;
        if length < SEGMENT_LENGTH_SIZE {
            return Err(CodecError::InvalidMarkerSegmentSize);
        }
        let end = self.position + length - SEGMENT_LENGTH_SIZE;
        if end > self.source.len() {
            return Err(CodecError::InvalidMarkerSegmentSize);
        }
        Ok(end)
    }

    /// Skips padding at the end of a segment, rejecting overruns.
    fn finish_segment(&mut self, end: usize) -> Result<(), CodecError> {
        if self.position > end {
            return Err(CodecError::InvalidMarkerSegmentSize);
        }
        self.position = end;
        Ok(())
    }

    fn skip_segment(&mut self) -> Result<(), CodecError> {
        let end = self.read_segment_length()?;
        self.position = end;
        Ok(())
    }

    pub fn read_marker(&mut self) -> Result<JpegMarkerCode, CodecError> {
        if self.read_u8()? != JPEG_MARKER_START_BYTE {
            return Err(CodecError::JpegMarkerStartByteNotFound);
        }
        let marker_byte = self.read_u8()?;
        JpegMarkerCode::from_byte(marker_byte)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        let byte = *self
            .source
            .get(self.position)
            .ok_or(CodecError::UnexpectedEndOfData)?;
        self.position += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let high = self.read_u8()? as u16;
        let low = self.read_u8()? as u16;
        Ok((high << 8) | low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg_stream_writer::JpegStreamWriter;

    fn lossless_header() -> Vec<u8> {
        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_image();
        writer.write_jfif_app0();
        writer.write_start_of_frame_lossless(&FrameInfo {
            width: 17,
            height: 9,
            bits_per_sample: 12,
            component_count: 1,
        });
        let mut lengths = [0u8; 16];
        lengths[0] = 1;
        lengths[1] = 2;
        writer.write_dht(0, 0, &lengths, &[0, 1, 2]);
        writer.write_start_of_scan_lossless(5, 3);
        writer.into_bytes()
    }

    #[test]
    fn header_parses_frame_and_tables() {
        let data = lossless_header();
        let mut reader = JpegStreamReader::new(&data);
        reader.read_header().unwrap();

        let frame_info = reader.frame_info().unwrap();
        assert_eq!(frame_info.width, 17);
        assert_eq!(frame_info.height, 9);
        assert_eq!(frame_info.bits_per_sample, 12);
        assert_eq!(
            reader.frame_marker(),
            Some(JpegMarkerCode::StartOfFrameLossless)
        );
        assert!(reader.dc_tables[0].is_some());

        let scan = reader.read_start_of_scan_lossless().unwrap();
        assert_eq!(scan.predictor, 5);
        assert_eq!(scan.point_transform, 3);
        assert_eq!(scan.dc_table_selector, 0);
    }

    #[test]
    fn missing_soi_is_rejected() {
        let data = [0x00, 0x01, 0x02];
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(
            reader.read_header(),
            Err(CodecError::StartOfImageMarkerNotFound)
        );
    }

    #[test]
    fn sos_before_sof_is_rejected() {
        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_image();
        writer.write_start_of_scan_lossless(1, 0);
        let data = writer.into_bytes();
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(
            reader.read_header(),
            Err(CodecError::StartOfFrameMarkerNotFound)
        );
    }

    #[test]
    fn baseline_frame_is_unsupported() {
        let mut data = lossless_header();
        // Rewrite the SOF3 marker (after SOI + APP0) into SOF0.
        let sof_index = 2 + 18 + 1;
        assert_eq!(data[sof_index], 0xC3);
        data[sof_index] = 0xC0;
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(reader.read_header(), Err(CodecError::EncodingNotSupported));
    }

    #[test]
    fn multi_component_frame_is_rejected() {
        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_image();
        writer.write_start_of_frame_lossless(&FrameInfo {
            width: 4,
            height: 4,
            bits_per_sample: 8,
            component_count: 3,
        });
        let data = writer.into_bytes();
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(
            reader.read_header(),
            Err(CodecError::InvalidParameterComponentCount)
        );
    }

    #[test]
    fn truncated_segment_is_rejected() {
        let mut data = lossless_header();
        data.truncate(8);
        let mut reader = JpegStreamReader::new(&data);
        assert!(reader.read_header().is_err());
    }

    #[test]
    fn jpegls_header_with_lse() {
        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_image();
        writer.write_start_of_frame_jpegls(&FrameInfo {
            width: 32,
            height: 16,
            bits_per_sample: 8,
            component_count: 1,
        });
        // LSE type 1 with explicit values.
        writer.write_marker(JpegMarkerCode::JpeglsPresetParameters);
        writer.write_u16(13);
        writer.write_byte(1);
        writer.write_u16(255);
        writer.write_u16(3);
        writer.write_u16(7);
        writer.write_u16(21);
        writer.write_u16(64);
        writer.write_start_of_scan_jpegls(2);
        let data = writer.into_bytes();

        let mut reader = JpegStreamReader::new(&data);
        reader.read_header().unwrap();
        assert_eq!(
            reader.frame_marker(),
            Some(JpegMarkerCode::StartOfFrameJpegls)
        );
        assert_eq!(reader.preset_coding_parameters().maximum_sample_value, 255);
        let scan = reader.read_start_of_scan_jpegls().unwrap();
        assert_eq!(scan.near_lossless, 2);
    }

    #[test]
    fn out_of_range_predictor_falls_back_to_one() {
        let mut data = lossless_header();
        // Ss byte is the third-from-last byte of the SOS segment.
        let ss_index = data.len() - 3;
        assert_eq!(data[ss_index], 5);
        data[ss_index] = 9;
        let mut reader = JpegStreamReader::new(&data);
        reader.read_header().unwrap();
        let scan = reader.read_start_of_scan_lossless().unwrap();
        assert_eq!(scan.predictor, 1);
    }
}
