use crate::buffer::DescriptorBuffer;
use crate::codec;
use crate::error::DescriptorError;
use crate::usb::{Category, Descriptor, UsbDescriptorType};
use failure::Error;
use log::debug;
use usb_device::descriptor::lang_id;

/// Number of bytes in the UTF-8 sequence introduced by `lead`, or `None` if `lead` can not
/// start a sequence.
fn sequence_len(lead: u8) -> Option<usize> {
    if lead & 0x80 == 0 {
        Some(1)
    } else if lead & 0xe0 == 0xc0 {
        Some(2)
    } else if lead & 0xf0 == 0xe0 {
        Some(3)
    } else if lead & 0xf8 == 0xf0 {
        Some(4)
    } else {
        None
    }
}

/// Length of the well-formed sequence starting at `pos`. Every continuation byte must be
/// `10xxxxxx`.
fn sequence_at(text: &[u8], pos: usize) -> Result<usize, Error> {
    let len = sequence_len(text[pos]).ok_or(DescriptorError::InvalidUtf8 { offset: pos })?;
    if pos + len > text.len() {
        return Err(DescriptorError::TruncatedUtf8 { offset: pos }.into());
    }
    if let Some(i) = (pos + 1..pos + len).find(|&i| text[i] & 0xc0 != 0x80) {
        return Err(DescriptorError::InvalidUtf8 { offset: i }.into());
    }
    Ok(len)
}

/// Counts the scalar values in `text`.
fn scalar_count(text: &[u8]) -> Result<usize, Error> {
    let mut pos = 0;
    let mut count = 0;
    while pos < text.len() {
        pos += sequence_at(text, pos)?;
        count += 1;
    }
    Ok(count)
}

/// Decodes the scalar starting at `pos`, whose sequence length is `len`.
fn decode(text: &[u8], pos: usize, len: usize) -> u32 {
    let lead = u32::from(text[pos]);
    let lead_bits = match len {
        1 => lead,
        2 => lead & 0x1f,
        3 => lead & 0x0f,
        _ => lead & 0x07,
    };
    text[pos + 1..pos + len]
        .iter()
        .fold(lead_bits, |code, &b| (code << 6) | u32::from(b & 0x3f))
}

/// A string descriptor: `[bLength, 3]` followed by UTF-16LE code units.
pub struct StringDescriptor {
    buf: DescriptorBuffer,
}

impl StringDescriptor {
    pub fn new(text: &str) -> Result<Self, Error> {
        Self::from_utf8(text.as_bytes())
    }

    /// Encodes raw UTF-8 bytes. Malformed input, encoded surrogates and scalars outside the
    /// Basic Multilingual Plane are rejected.
    pub fn from_utf8(text: &[u8]) -> Result<Self, Error> {
        let count = scalar_count(text)?;
        let len = 2 + 2 * count;
        if len > usize::from(u8::MAX) {
            return Err(DescriptorError::TooLong { kind: "string", len }.into());
        }

        let mut buf = DescriptorBuffer::zeroed(len);
        buf[0] = len as u8;
        buf[1] = UsbDescriptorType::String as u8;

        let mut pos = 0;
        let mut index = 0;
        while pos < text.len() {
            let seq = sequence_at(text, pos)?;
            let code_point = decode(text, pos, seq);
            if (0xd800..=0xdfff).contains(&code_point) {
                return Err(DescriptorError::InvalidUtf8 { offset: pos }.into());
            }
            if code_point > 0xffff {
                return Err(DescriptorError::OutsideBmp { code_point }.into());
            }
            codec::write_u16_le(buf.as_mut_slice(), 2 + 2 * index, code_point as u16);
            pos += seq;
            index += 1;
        }

        if index != count {
            return Err(DescriptorError::StructuralMismatch {
                expected: count,
                written: index,
            }
            .into());
        }

        debug!("encoded string descriptor: {} code units", count);
        Ok(Self { buf })
    }

    /// String descriptor 0: the list of supported language ids.
    pub fn languages(lang_ids: &[u16]) -> Result<Self, Error> {
        let len = 2 + 2 * lang_ids.len();
        if len > usize::from(u8::MAX) {
            return Err(DescriptorError::TooLong { kind: "language list", len }.into());
        }

        let mut buf = DescriptorBuffer::zeroed(len);
        buf[0] = len as u8;
        buf[1] = UsbDescriptorType::String as u8;
        for (i, &lang) in lang_ids.iter().enumerate() {
            codec::write_u16_le(buf.as_mut_slice(), 2 + 2 * i, lang);
        }
        Ok(Self { buf })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_vec()
    }
}

impl Descriptor for StringDescriptor {
    fn category(&self) -> Category {
        Category::Opaque
    }

    fn bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }
}

/// Hands out string indices. Index 0 is the language list; equal strings share an index.
pub struct StringTable {
    lang_ids: Vec<u16>,
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            lang_ids: vec![lang_id::ENGLISH_US],
            strings: Vec::new(),
        }
    }

    pub fn with_languages(lang_ids: &[u16]) -> Self {
        Self {
            lang_ids: lang_ids.to_vec(),
            strings: Vec::new(),
        }
    }

    pub fn alloc(&mut self, string: &str) -> Result<u8, Error> {
        if let Some(index) = self.get_index(string) {
            return Ok(index);
        }
        if self.strings.len() >= usize::from(u8::MAX) {
            return Err(DescriptorError::CounterOverflow("string index").into());
        }
        self.strings.push(string.to_owned());
        Ok(self.strings.len() as u8)
    }

    pub fn get_index(&self, string: &str) -> Option<u8> {
        self.strings
            .iter()
            .position(|s| s == string)
            .map(|i| (i + 1) as u8)
    }

    /// Renders every entry; position `i` of the result holds string descriptor `i`.
    pub fn descriptors(&self) -> Result<Vec<StringDescriptor>, Error> {
        let mut descriptors = Vec::with_capacity(self.strings.len() + 1);
        descriptors.push(StringDescriptor::languages(&self.lang_ids)?);
        for s in &self.strings {
            descriptors.push(StringDescriptor::new(s)?);
        }
        Ok(descriptors)
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}
