use failure::Fail;

/// Reasons a descriptor could not be constructed.
///
/// Every constructor in this crate returns `Result<_, failure::Error>`; the
/// underlying kind can be recovered with `Error::downcast_ref::<DescriptorError>()`.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[fail(display = "configuration value can not be 0")]
    ZeroConfigurationValue,

    #[fail(display = "MIDI jack id can not be 0")]
    ZeroJackId,

    #[fail(display = "MIDI output jack source pin can not be 0")]
    ZeroSourcePin,

    #[fail(display = "custom descriptor declares {} bytes but {} were supplied", declared, actual)]
    CustomLengthMismatch { declared: usize, actual: usize },

    #[fail(display = "invalid UTF-8 lead byte at offset {}", offset)]
    InvalidUtf8 { offset: usize },

    #[fail(display = "UTF-8 sequence at offset {} runs past the end of input", offset)]
    TruncatedUtf8 { offset: usize },

    #[fail(display = "code point U+{:X} does not fit in one UTF-16 unit", code_point)]
    OutsideBmp { code_point: u32 },

    #[fail(display = "{} counter overflowed", _0)]
    CounterOverflow(&'static str),

    #[fail(display = "{} descriptor is too long ({} bytes)", kind, len)]
    TooLong { kind: &'static str, len: usize },

    #[fail(display = "descriptor expected {} bytes but {} were written", expected, written)]
    StructuralMismatch { expected: usize, written: usize },

    #[fail(display = "a configuration can not be nested inside another descriptor")]
    NestedConfiguration,

    #[fail(display = "all interfaces in a group must share one interface number")]
    MixedInterfaceNumbers,

    #[fail(display = "an interface group needs at least one interface")]
    EmptyInterfaceGroup,

    #[fail(display = "{} is not set", _0)]
    MissingField(&'static str),

    #[fail(display = "endpoint number {} is out of range", _0)]
    InvalidEndpointNumber(u8),

    #[fail(display = "invalid max_packet_size_0: {}", _0)]
    InvalidMaxPacketSize0(u8),

    #[fail(display = "max_power is too much: {} mA", _0)]
    InvalidMaxPower(usize),
}
