//! Lossless scan decoding.

use log::warn;

use crate::bit_io::BitReader;
use crate::constants::TRUNCATION_TOLERANCE_PERCENT;
use crate::error::CodecError;
use crate::image::GrayImage;
use crate::jpeg_lossless::huffman::{extend_sign, HuffmanTable};
use crate::jpeg_lossless::predict;
use crate::jpeg_marker_code::{is_restart_marker_byte, JpegMarkerCode, JPEG_MARKER_START_BYTE};
use crate::jpeg_stream_reader::JpegStreamReader;
use crate::FrameInfo;
use crate::TruncationInfo;

pub struct LosslessDecoder<'a> {
    reader: JpegStreamReader<'a>,
    header_read: bool,
    truncation: Option<TruncationInfo>,
}

impl<'a> LosslessDecoder<'a> {
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
        if self.reader.frame_marker() != Some(JpegMarkerCode::StartOfFrameLossless) {
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
        let scan = self.reader.read_start_of_scan_lossless()?;

        if i32::from(scan.point_transform) >= frame_info.bits_per_sample {
            return Err(CodecError::InvalidParameterPointTransform);
        }
        let table = self.reader.dc_tables[scan.dc_table_selector]
            .clone()
            .ok_or(CodecError::MissingHuffmanTable)?;

        let mut image = GrayImage::zeroed(
            frame_info.width,
            frame_info.height,
            frame_info.bits_per_sample,
        )?;
        let consumed = self.decode_scan(&frame_info, scan.predictor, scan.point_transform, &table, &mut image)?;
        self.reader.advance(consumed);

        // A missing EOI after a complete scan is tolerated.
        if self.truncation.is_none() && self.reader.read_marker() != Ok(JpegMarkerCode::EndOfImage)
        {
            warn!("end of image marker not found after scan");
        }
        Ok(image)
    }

    fn decode_scan(
        &mut self,
        frame_info: &FrameInfo,
        predictor: u8,
        point_transform: u8,
        table: &HuffmanTable,
        image: &mut GrayImage,
    ) -> Result<usize, CodecError> {
        let width = frame_info.width as usize;
        let height = frame_info.height as usize;
        let precision = frame_info.bits_per_sample;
        let max_value = (1i32 << precision) - 1;
        let default_prediction = 1i32 << (precision - 1);
        let al = u32::from(point_transform);

        let restart_interval = self.reader.restart_interval as usize;
        let mut samples_until_restart = restart_interval;
        let mut next_restart_index = 0u8;

        let mut reader = BitReader::new(self.reader.remaining_data());
        let mut prev = vec![0i32; width];
        let mut curr = vec![0i32; width];

        self.truncation = None;

        for y in 0..height {
            for x in 0..width {
                if restart_interval > 0 && samples_until_restart == 0 {
                    Self::read_restart_marker(&mut reader, next_restart_index)?;
                    next_restart_index = (next_restart_index + 1) % 8;
                    samples_until_restart = restart_interval;
                    prev.iter_mut().for_each(|v| *v = 0);
                    curr.iter_mut().for_each(|v| *v = 0);
                }

                let category = table.decode(&mut reader)?;
                if category > 16 {
                    return Err(CodecError::InvalidHuffmanCode);
                }
                let diff = if category == 16 {
                    // SSSS 16 carries no additional bits (T.81 H.2).
                    32768
                } else {
                    let bits = reader.read_bits(u32::from(category));
                    extend_sign(bits, u32::from(category))
                };

                if reader.fabricated_bits() > 0 {
                    // The sample just decoded ran past the end of the data.
                    return self.finish_truncated(image, x as u32, y as u32, &prev, &curr, width, height);
                }

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
                    predict(predictor, ra, rb, rc)
                };

                let value = (predicted + (diff << al)) & max_value;
                curr[x] = value;
                image.set(x as u32, y as u32, value);

                if restart_interval > 0 {
                    samples_until_restart -= 1;
                }
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        Ok(reader.finish())
    }

    fn read_restart_marker(
        reader: &mut BitReader<'_>,
        next_restart_index: u8,
    ) -> Result<(), CodecError> {
        reader.align_to_byte();
        let high = reader.read_byte()?;
        let low = reader.read_byte()?;
        if high != JPEG_MARKER_START_BYTE || !is_restart_marker_byte(low) {
            return Err(CodecError::RestartMarkerNotFound);
        }
        if low != 0xD0 + next_restart_index {
            return Err(CodecError::RestartMarkerNotFound);
        }
        Ok(())
    }

    /// Completes a truncated scan by replication when enough of it decoded,
    /// per the tolerance policy.
    fn finish_truncated(
        &mut self,
        image: &mut GrayImage,
        x: u32,
        y: u32,
        prev: &[i32],
        curr: &[i32],
        width: usize,
        height: usize,
    ) -> Result<usize, CodecError> {
        let expected = width * height;
        let decoded = y as usize * width + x as usize;
        if decoded * 100 < expected * TRUNCATION_TOLERANCE_PERCENT {
            return Err(CodecError::TruncatedScan {
                decoded,
                expected,
                x,
                y,
            });
        }

        warn!(
            "scan truncated after {decoded} of {expected} samples, completing by replication"
        );

        // Replicate the last reconstructed sample along the current row.
        let last_value = if x > 0 {
            curr[x as usize - 1]
        } else if y > 0 {
            prev[width - 1]
        } else {
            0
        };
        for column in x..width as u32 {
            image.set(column, y, last_value);
        }
        // Repeat the completed row across the remaining rows.
        for row in y + 1..height as u32 {
            for column in 0..width as u32 {
                image.set(column, row, image.get(column, y));
            }
        }

        self.truncation = Some(TruncationInfo {
            decoded_samples: decoded,
            expected_samples: expected,
        });
        Ok(0)
    }
}
