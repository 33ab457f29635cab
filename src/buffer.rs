use std::ops::{Index, IndexMut};

/// A fixed-length, zero-initialized byte sequence holding one serialized descriptor.
///
/// The length is chosen once at allocation and never changes. Indexing past the end is a
/// programming error and panics, the same as slice indexing.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescriptorBuffer {
    bytes: Box<[u8]>,
}

impl DescriptorBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0; len].into_boxed_slice(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Concatenates `left` and `right` into a new buffer of `left.len() + right.len()` bytes.
    pub fn merge(left: &DescriptorBuffer, right: &DescriptorBuffer) -> Self {
        let mut merged = Self::zeroed(left.len() + right.len());
        let offset = merged.copy_from(0, left.as_slice());
        merged.copy_from(offset, right.as_slice());
        merged
    }

    /// Copies `src` into the buffer starting at `offset` and returns the offset just past it.
    pub fn copy_from(&mut self, offset: usize, src: &[u8]) -> usize {
        let end = offset + src.len();
        self.bytes[offset..end].copy_from_slice(src);
        end
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes.into_vec()
    }
}

impl Index<usize> for DescriptorBuffer {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.bytes[index]
    }
}

impl IndexMut<usize> for DescriptorBuffer {
    fn index_mut(&mut self, index: usize) -> &mut u8 {
        &mut self.bytes[index]
    }
}

impl AsRef<[u8]> for DescriptorBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
