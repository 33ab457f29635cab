//! Little-endian field encoding at fixed offsets inside a descriptor.

pub fn write_u8(buf: &mut [u8], offset: usize, value: u8) {
    buf[offset] = value;
}

pub fn write_u16_le(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Writes the low 24 bits of `value`.
pub fn write_u24_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 3].copy_from_slice(&value.to_le_bytes()[..3]);
}

pub fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_little_endian() {
        let mut buf = [0u8; 10];
        write_u8(&mut buf, 0, 0x12);
        write_u16_le(&mut buf, 1, 0x3456);
        write_u24_le(&mut buf, 3, 0x00ab_cdef);
        write_u32_le(&mut buf, 6, 0x0102_0304);
        assert_eq!(buf, [0x12, 0x56, 0x34, 0xef, 0xcd, 0xab, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn u24_drops_high_byte() {
        let mut buf = [0u8; 4];
        write_u24_le(&mut buf, 0, 0xff12_3456);
        assert_eq!(buf, [0x56, 0x34, 0x12, 0x00]);
    }

    #[test]
    fn read_back_total_length() {
        let mut buf = [0u8; 4];
        write_u16_le(&mut buf, 2, 218);
        assert_eq!(read_u16_le(&buf, 2), 218);

        let grown = read_u16_le(&buf, 2) + 0x100;
        write_u16_le(&mut buf, 2, grown);
        assert_eq!(buf, [0, 0, 0xda, 0x01]);
    }
}
