use std::fmt;

/// The first position where two descriptor tables disagree. A side is `None` when that
/// table ended before `index`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Mismatch {
    pub index: usize,
    pub expected: Option<u8>,
    pub actual: Option<u8>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |byte: Option<u8>| match byte {
            Some(b) => format!("0x{:02x}", b),
            None => "end of table".to_owned(),
        };
        write!(
            f,
            "byte {}: expected {}, got {}",
            self.index,
            show(self.expected),
            show(self.actual)
        )
    }
}

/// Compares a composed table against a reference, byte by byte.
pub fn first_difference(expected: &[u8], actual: &[u8]) -> Option<Mismatch> {
    let len = expected.len().max(actual.len());
    (0..len)
        .map(|index| Mismatch {
            index,
            expected: expected.get(index).copied(),
            actual: actual.get(index).copied(),
        })
        .find(|m| m.expected != m.actual)
}
