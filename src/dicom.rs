//! DICOM encapsulated pixel-data extraction.
//!
//! Walks a DICOM (or DICOS) byte image far enough to find the Pixel Data
//! element `(7FE0,0010)` and iterate its fragment items. Both Explicit and
//! Implicit VR little-endian element encodings are accepted, detected per
//! element; dataset semantics beyond locating the pixel data are out of
//! scope. No decompression happens here: each fragment is handed out as a
//! borrowed byte slice, typically one compressed frame per item.

use log::debug;

use crate::error::CodecError;

const PREAMBLE_LENGTH: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// A DICOM data element tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub group: u16,
    pub element: u16,
}

impl Tag {
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }
}

pub const PIXEL_DATA: Tag = Tag::new(0x7FE0, 0x0010);
pub const ITEM: Tag = Tag::new(0xFFFE, 0xE000);
pub const ITEM_DELIMITER: Tag = Tag::new(0xFFFE, 0xE00D);
pub const SEQUENCE_DELIMITER: Tag = Tag::new(0xFFFE, 0xE0DD);

/// One compressed frame payload from the pixel-data sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Zero-based position among the fragment items.
    pub index: usize,
    /// The matching Basic Offset Table entry, when the table has one.
    pub offset: Option<u32>,
    pub data: &'a [u8],
}

/// The located Pixel Data element of an encapsulated transfer syntax.
pub struct EncapsulatedPixelData<'a> {
    basic_offset_table: Vec<u32>,
    fragment_data: &'a [u8],
}

impl<'a> EncapsulatedPixelData<'a> {
    /// Parses the stream far enough to position on the first fragment item.
    pub fn parse(source: &'a [u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(source);
        cursor.expect_file_head()?;

        loop {
            if cursor.at_end() {
                return Err(CodecError::PixelDataNotFound);
            }
            let (tag, length) = cursor.read_element_header()?;
            if tag == PIXEL_DATA {
                if length != UNDEFINED_LENGTH {
                    return Err(CodecError::PixelDataNotEncapsulated);
                }
                let basic_offset_table = cursor.read_basic_offset_table()?;
                debug!(
                    "pixel data at offset {}, {} offset table entries",
                    cursor.position,
                    basic_offset_table.len()
                );
                return Ok(Self {
                    basic_offset_table,
                    fragment_data: cursor.remaining(),
                });
            }
            cursor.skip_element_value(tag, length)?;
        }
    }

    /// The Basic Offset Table entries (may be empty).
    pub fn basic_offset_table(&self) -> &[u32] {
        &self.basic_offset_table
    }

    /// Lazily iterates the frame fragments.
    pub fn frames(&self) -> Frames<'a> {
        Frames {
            cursor: Cursor::new(self.fragment_data),
            offsets: self.basic_offset_table.clone(),
            index: 0,
            done: false,
        }
    }
}

/// Pull-based fragment iterator; ends at the sequence delimiter.
pub struct Frames<'a> {
    cursor: Cursor<'a>,
    offsets: Vec<u32>,
    index: usize,
    done: bool,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<Frame<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = self.advance();
        if !matches!(step, Some(Ok(_))) {
            self.done = true;
        }
        step
    }
}

impl<'a> Frames<'a> {
    fn advance(&mut self) -> Option<Result<Frame<'a>, CodecError>> {
        let (tag, length) = match self.cursor.read_item_header() {
            Ok(header) => header,
            Err(error) => return Some(Err(error)),
        };
        if tag == SEQUENCE_DELIMITER {
            return None;
        }
        if tag != ITEM || length == UNDEFINED_LENGTH {
            return Some(Err(CodecError::TruncatedDataElement));
        }
        let data = match self.cursor.take(length as usize) {
            Ok(data) => data,
            Err(error) => return Some(Err(error)),
        };

        let frame = Frame {
            index: self.index,
            offset: self.offsets.get(self.index).copied(),
            data,
        };
        self.index += 1;
        Some(Ok(frame))
    }
}

/// Byte cursor over the DICOM stream.
struct Cursor<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    fn remaining(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .position
            .checked_add(count)
            .ok_or(CodecError::TruncatedDataElement)?;
        if end > self.source.len() {
            return Err(CodecError::TruncatedDataElement);
        }
        let slice = &self.source[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_tag(&mut self) -> Result<Tag, CodecError> {
        let group = self.read_u16()?;
        let element = self.read_u16()?;
        Ok(Tag::new(group, element))
    }

    fn expect_file_head(&mut self) -> Result<(), CodecError> {
        let head = self.take(PREAMBLE_LENGTH + MAGIC.len())?;
        if &head[PREAMBLE_LENGTH..] != MAGIC {
            return Err(CodecError::DicomMagicNotFound);
        }
        Ok(())
    }

    /// Reads a tag and value length, detecting Explicit vs Implicit VR by
    /// whether the two bytes after the tag form a VR code.
    fn read_element_header(&mut self) -> Result<(Tag, u32), CodecError> {
        let tag = self.read_tag()?;

        // Delimitation tags carry a plain 4-byte length, never a VR.
        if tag.group == 0xFFFE {
            let length = self.read_u32()?;
            return Ok((tag, length));
        }

        let peek = self
            .source
            .get(self.position..self.position + 2)
            .ok_or(CodecError::TruncatedDataElement)?;
        if peek[0].is_ascii_uppercase() && peek[1].is_ascii_uppercase() {
            // Explicit VR.
            let vr = [peek[0], peek[1]];
            self.position += 2;
            if has_long_length(&vr) {
                let _reserved = self.read_u16()?;
                let length = self.read_u32()?;
                Ok((tag, length))
            } else {
                let length = self.read_u16()? as u32;
                Ok((tag, length))
            }
        } else {
            // Implicit VR.
            let length = self.read_u32()?;
            Ok((tag, length))
        }
    }

    /// Item and delimiter headers inside a sequence: tag plus 4-byte length.
    fn read_item_header(&mut self) -> Result<(Tag, u32), CodecError> {
        let tag = self.read_tag()?;
        let length = self.read_u32()?;
        Ok((tag, length))
    }

    fn read_basic_offset_table(&mut self) -> Result<Vec<u32>, CodecError> {
        let (tag, length) = self.read_item_header()?;
        if tag != ITEM || length == UNDEFINED_LENGTH || length % 4 != 0 {
            return Err(CodecError::TruncatedDataElement);
        }
        let entry_count = (length / 4) as usize;
        let mut offsets = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            offsets.push(self.read_u32()?);
        }
        Ok(offsets)
    }

    fn skip_element_value(&mut self, tag: Tag, length: u32) -> Result<(), CodecError> {
        if length != UNDEFINED_LENGTH {
            self.take(length as usize)?;
            return Ok(());
        }
        if tag.group == 0xFFFE {
            // A bare delimitation tag outside any sequence; nothing to skip.
            return Ok(());
        }
        // Undefined length: a sequence (or sequence-like UN) of items.
        self.skip_undefined_length_sequence()
    }

    fn skip_undefined_length_sequence(&mut self) -> Result<(), CodecError> {
        loop {
            let (tag, length) = self.read_item_header()?;
            if tag == SEQUENCE_DELIMITER {
                return Ok(());
            }
            if tag != ITEM {
                return Err(CodecError::TruncatedDataElement);
            }
            if length == UNDEFINED_LENGTH {
                self.skip_undefined_length_item()?;
            } else {
                self.take(length as usize)?;
            }
        }
    }

    /// An undefined-length item holds a nested dataset up to its delimiter.
    fn skip_undefined_length_item(&mut self) -> Result<(), CodecError> {
        loop {
            let (tag, length) = self.read_element_header()?;
            if tag == ITEM_DELIMITER {
                return Ok(());
            }
            self.skip_element_value(tag, length)?;
        }
    }
}

/// VRs whose explicit form carries a 4-byte length after two reserved
/// bytes (PS3.5, 7.1.2).
fn has_long_length(vr: &[u8; 2]) -> bool {
    matches!(
        vr,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OV" | b"OW" | b"SQ" | b"UC" | b"UN" | b"UR" | b"UT"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_explicit_short(buffer: &mut Vec<u8>, tag: Tag, vr: &[u8; 2], value: &[u8]) {
        buffer.extend_from_slice(&tag.group.to_le_bytes());
        buffer.extend_from_slice(&tag.element.to_le_bytes());
        buffer.extend_from_slice(vr);
        buffer.extend_from_slice(&(value.len() as u16).to_le_bytes());
        buffer.extend_from_slice(value);
    }

    fn push_item(buffer: &mut Vec<u8>, tag: Tag, length: u32) {
        buffer.extend_from_slice(&tag.group.to_le_bytes());
        buffer.extend_from_slice(&tag.element.to_le_bytes());
        buffer.extend_from_slice(&length.to_le_bytes());
    }

    fn encapsulated_file(fragments: &[&[u8]], offsets: &[u32]) -> Vec<u8> {
        let mut buffer = vec![0u8; PREAMBLE_LENGTH];
        buffer.extend_from_slice(MAGIC);
        push_explicit_short(&mut buffer, Tag::new(0x0008, 0x0060), b"CS", b"CT");

        // Pixel Data, OB, undefined length.
        buffer.extend_from_slice(&PIXEL_DATA.group.to_le_bytes());
        buffer.extend_from_slice(&PIXEL_DATA.element.to_le_bytes());
        buffer.extend_from_slice(b"OB");
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&UNDEFINED_LENGTH.to_le_bytes());

        // Basic Offset Table.
        push_item(&mut buffer, ITEM, (offsets.len() * 4) as u32);
        for &offset in offsets {
            buffer.extend_from_slice(&offset.to_le_bytes());
        }

        for fragment in fragments {
            push_item(&mut buffer, ITEM, fragment.len() as u32);
            buffer.extend_from_slice(fragment);
        }
        push_item(&mut buffer, SEQUENCE_DELIMITER, 0);
        buffer
    }

    #[test]
    fn single_fragment_with_empty_offset_table() {
        let payload: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
        let file = encapsulated_file(&[&payload], &[]);

        let pixel_data = EncapsulatedPixelData::parse(&file).unwrap();
        assert!(pixel_data.basic_offset_table().is_empty());

        let frames: Vec<_> = pixel_data.frames().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].index, 0);
        assert_eq!(frames[0].offset, None);
        assert_eq!(frames[0].data, payload.as_slice());
    }

    #[test]
    fn multiple_fragments_carry_offset_table_entries() {
        let first = [1u8; 64];
        let second = [2u8; 32];
        let file = encapsulated_file(&[&first, &second], &[0, 72]);

        let pixel_data = EncapsulatedPixelData::parse(&file).unwrap();
        assert_eq!(pixel_data.basic_offset_table(), &[0, 72]);

        let frames: Vec<_> = pixel_data.frames().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].offset, Some(0));
        assert_eq!(frames[0].data, &first);
        assert_eq!(frames[1].offset, Some(72));
        assert_eq!(frames[1].data, &second);
    }

    #[test]
    fn missing_magic_is_rejected() {
        let mut file = vec![0u8; PREAMBLE_LENGTH];
        file.extend_from_slice(b"DCIM");
        assert_eq!(
            EncapsulatedPixelData::parse(&file).err(),
            Some(CodecError::DicomMagicNotFound)
        );
    }

    #[test]
    fn missing_pixel_data_is_reported() {
        let mut file = vec![0u8; PREAMBLE_LENGTH];
        file.extend_from_slice(MAGIC);
        push_explicit_short(&mut file, Tag::new(0x0008, 0x0060), b"CS", b"MR");
        assert_eq!(
            EncapsulatedPixelData::parse(&file).err(),
            Some(CodecError::PixelDataNotFound)
        );
    }

    #[test]
    fn native_pixel_data_is_not_encapsulated() {
        let mut file = vec![0u8; PREAMBLE_LENGTH];
        file.extend_from_slice(MAGIC);
        // Pixel Data, OW, defined length.
        file.extend_from_slice(&PIXEL_DATA.group.to_le_bytes());
        file.extend_from_slice(&PIXEL_DATA.element.to_le_bytes());
        file.extend_from_slice(b"OW");
        file.extend_from_slice(&[0, 0]);
        file.extend_from_slice(&8u32.to_le_bytes());
        file.extend_from_slice(&[0u8; 8]);
        assert_eq!(
            EncapsulatedPixelData::parse(&file).err(),
            Some(CodecError::PixelDataNotEncapsulated)
        );
    }

    #[test]
    fn truncated_fragment_is_reported() {
        let payload = [7u8; 100];
        let mut file = encapsulated_file(&[&payload], &[]);
        file.truncate(file.len() - 60);

        let pixel_data = EncapsulatedPixelData::parse(&file).unwrap();
        let results: Vec<_> = pixel_data.frames().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0], Err(CodecError::TruncatedDataElement));
    }

    #[test]
    fn elements_before_pixel_data_are_skipped() {
        let payload = [9u8; 16];
        let mut file = vec![0u8; PREAMBLE_LENGTH];
        file.extend_from_slice(MAGIC);

        // Explicit short, explicit long, and implicit elements in a row.
        push_explicit_short(&mut file, Tag::new(0x0010, 0x0010), b"PN", b"DOE^JOHN");
        file.extend_from_slice(&0x0008u16.to_le_bytes());
        file.extend_from_slice(&0x0000u16.to_le_bytes());
        file.extend_from_slice(b"UN");
        file.extend_from_slice(&[0, 0]);
        file.extend_from_slice(&4u32.to_le_bytes());
        file.extend_from_slice(&[1, 2, 3, 4]);
        file.extend_from_slice(&0x0028u16.to_le_bytes());
        file.extend_from_slice(&0x0010u16.to_le_bytes());
        file.extend_from_slice(&2u32.to_le_bytes());
        file.extend_from_slice(&512u16.to_le_bytes());

        // An undefined-length sequence with one defined-length item.
        file.extend_from_slice(&0x0008u16.to_le_bytes());
        file.extend_from_slice(&0x1140u16.to_le_bytes());
        file.extend_from_slice(b"SQ");
        file.extend_from_slice(&[0, 0]);
        file.extend_from_slice(&UNDEFINED_LENGTH.to_le_bytes());
        push_item(&mut file, ITEM, 4);
        file.extend_from_slice(&[0xAA; 4]);
        push_item(&mut file, SEQUENCE_DELIMITER, 0);

        // Finally the encapsulated pixel data.
        file.extend_from_slice(&PIXEL_DATA.group.to_le_bytes());
        file.extend_from_slice(&PIXEL_DATA.element.to_le_bytes());
        file.extend_from_slice(b"OB");
        file.extend_from_slice(&[0, 0]);
        file.extend_from_slice(&UNDEFINED_LENGTH.to_le_bytes());
        push_item(&mut file, ITEM, 0);
        push_item(&mut file, ITEM, payload.len() as u32);
        file.extend_from_slice(&payload);
        push_item(&mut file, SEQUENCE_DELIMITER, 0);

        let pixel_data = EncapsulatedPixelData::parse(&file).unwrap();
        let frames: Vec<_> = pixel_data.frames().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, &payload);
    }
}
