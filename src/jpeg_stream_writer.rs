//! JPEG codestream writer.
//!
//! Emits the marker segments both codecs need (SOI, APP0, SOF3, DHT, SOS,
//! SOF55, EOI) into an owned byte vector. Entropy-coded data is appended
//! through a [`BitWriter`] borrowed from the same sink so the finished
//! stream is self-contained.

use crate::bit_io::BitWriter;
use crate::jpeg_marker_code::{JpegMarkerCode, JPEG_MARKER_START_BYTE};
use crate::FrameInfo;

pub struct JpegStreamWriter {
    destination: Vec<u8>,
}

impl JpegStreamWriter {
    pub fn new() -> Self {
        Self {
            destination: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.destination
    }

    /// Borrows the sink for entropy-coded output.
    pub fn bit_writer(&mut self) -> BitWriter<'_> {
        BitWriter::new(&mut self.destination)
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_marker(&mut self, marker: JpegMarkerCode) {
        self.write_byte(JPEG_MARKER_START_BYTE);
        self.write_byte(marker.into());
    }

    pub fn write_start_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::StartOfImage);
    }

    pub fn write_end_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::EndOfImage);
    }

    /// JFIF APP0 with aspect-ratio units and a 1x1 dummy density.
    pub fn write_jfif_app0(&mut self) {
        self.write_marker(JpegMarkerCode::ApplicationData0);
        self.write_u16(16);
        self.destination.extend_from_slice(b"JFIF\0");
        self.write_byte(1); // Version 1.1
        self.write_byte(1);
        self.write_byte(0); // Units: aspect ratio
        self.write_u16(1);
        self.write_u16(1);
        self.write_byte(0); // No thumbnail
        self.write_byte(0);
    }

    fn write_frame_segment(&mut self, marker: JpegMarkerCode, frame_info: &FrameInfo) {
        self.write_marker(marker);
        let length = 2 + 6 + frame_info.component_count as usize * 3;
        self.write_u16(length as u16);

        self.write_byte(frame_info.bits_per_sample as u8);
        self.write_u16(frame_info.height as u16);
        self.write_u16(frame_info.width as u16);
        self.write_byte(frame_info.component_count as u8);

        for i in 0..frame_info.component_count {
            self.write_byte((i + 1) as u8); // Component ID
            self.write_byte(0x11); // H=1, V=1
            self.write_byte(0); // Tq (unused for lossless processes)
        }
    }

    pub fn write_start_of_frame_lossless(&mut self, frame_info: &FrameInfo) {
        self.write_frame_segment(JpegMarkerCode::StartOfFrameLossless, frame_info);
    }

    pub fn write_start_of_frame_jpegls(&mut self, frame_info: &FrameInfo) {
        self.write_frame_segment(JpegMarkerCode::StartOfFrameJpegls, frame_info);
    }

    pub fn write_dht(&mut self, table_class: u8, table_id: u8, lengths: &[u8; 16], values: &[u8]) {
        self.write_marker(JpegMarkerCode::DefineHuffmanTable);
        let length = 2 + 1 + 16 + values.len();
        self.write_u16(length as u16);
        self.write_byte(((table_class & 1) << 4) | (table_id & 0x0F));
        for &len in lengths {
            self.write_byte(len);
        }
        for &val in values {
            self.write_byte(val);
        }
    }

    /// Lossless SOS: one component, `Ss` carries the predictor, `Al` the
    /// point transform.
    pub fn write_start_of_scan_lossless(&mut self, predictor: u8, point_transform: u8) {
        self.write_marker(JpegMarkerCode::StartOfScan);
        self.write_u16(2 + 1 + 2 + 3);
        self.write_byte(1); // One component in scan
        self.write_byte(1); // Component selector
        self.write_byte(0); // DC table 0, AC unused
        self.write_byte(predictor); // Ss
        self.write_byte(0); // Se
        self.write_byte(point_transform & 0x0F); // Ah=0, Al
    }

    /// JPEG-LS SOS: one component, near-lossless bound, no interleave.
    pub fn write_start_of_scan_jpegls(&mut self, near_lossless: i32) {
        self.write_marker(JpegMarkerCode::StartOfScan);
        self.write_u16(2 + 1 + 2 + 3);
        self.write_byte(1); // One component in scan
        self.write_byte(1); // Component selector
        self.write_byte(0); // Mapping table selector
        self.write_byte(near_lossless as u8);
        self.write_byte(0); // Interleave mode: none
        self.write_byte(0); // Ah=0, Al=0
    }
}

impl Default for JpegStreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soi_and_eoi_markers() {
        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_image();
        writer.write_end_of_image();
        assert_eq!(writer.into_bytes(), vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn sof3_segment_layout() {
        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_frame_lossless(&FrameInfo {
            width: 640,
            height: 480,
            bits_per_sample: 12,
            component_count: 1,
        });
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[..2], &[0xFF, 0xC3]);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 11);
        assert_eq!(bytes[4], 12); // Precision
        assert_eq!(u16::from_be_bytes([bytes[5], bytes[6]]), 480);
        assert_eq!(u16::from_be_bytes([bytes[7], bytes[8]]), 640);
        assert_eq!(bytes[9], 1); // Components
        assert_eq!(bytes[10], 1); // ID
        assert_eq!(bytes[11], 0x11); // 1x1 sampling
    }

    #[test]
    fn jfif_app0_is_16_bytes() {
        let mut writer = JpegStreamWriter::new();
        writer.write_jfif_app0();
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[..2], &[0xFF, 0xE0]);
        assert_eq!(bytes.len(), 2 + 16);
        assert_eq!(&bytes[4..9], b"JFIF\0");
    }

    #[test]
    fn lossless_sos_carries_predictor_and_point_transform() {
        let mut writer = JpegStreamWriter::new();
        writer.write_start_of_scan_lossless(4, 2);
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[..2], &[0xFF, 0xDA]);
        assert_eq!(bytes[7], 4); // Ss = predictor
        assert_eq!(bytes[8], 0); // Se
        assert_eq!(bytes[9], 2); // Al = point transform
    }
}
