//! USB Audio Class 2.0 descriptors: the audio function that describes the control
//! interface topology, and the streaming interface with its two alternate settings.

use crate::buffer::DescriptorBuffer;
use crate::builder::InterfaceBuilder;
use crate::codec;
use crate::descriptor::{Interface, InterfaceAssociation, InterfaceGroup};
use crate::usb::{
    Category, Descriptor, UsbInterfaceAssociationDescriptor, CS_ENDPOINT, CS_INTERFACE,
};
use crate::writer::{self, DescriptorWriter};
use failure::Error;

pub const USB_CLASS_AUDIO: u8 = 0x01;
const AUDIO_SUBCLASS_UNDEFINED: u8 = 0x00;
const AUDIO_SUBCLASS_CONTROL: u8 = 0x01;
const AUDIO_SUBCLASS_STREAMING: u8 = 0x02;

/// `bInterfaceProtocol` / `bFunctionProtocol` of UAC 2.0.
pub const AF_VERSION_02_00: u8 = 0x20;

const AC_HEADER: u8 = 0x01;
const AC_INPUT_TERMINAL: u8 = 0x02;
const AC_OUTPUT_TERMINAL: u8 = 0x03;
const AC_FEATURE_UNIT: u8 = 0x06;
const AC_CLOCK_SOURCE: u8 = 0x0a;

const AS_GENERAL: u8 = 0x01;
const AS_FORMAT_TYPE: u8 = 0x02;
const EP_GENERAL: u8 = 0x01;

const AC_HEADER_TOTAL_LENGTH: usize = 6;

impl_descriptor! {
    AudioFunction => Category::Opaque,
    ClockSource => Category::Opaque,
    InputTerminal => Category::Opaque,
    FeatureUnit => Category::Opaque,
    OutputTerminal => Category::Opaque,
    TerminalLink => Category::Opaque,
    FormatType => Category::Opaque,
    IsoEndpointGeneral => Category::Opaque,
}

/// Logical channel cluster shared by terminals and the streaming terminal link.
#[derive(Clone, Copy, Debug)]
pub struct ChannelCluster {
    pub num_channels: u8,
    pub channel_config: u32,
    pub channel_names: u8,
}

impl ChannelCluster {
    fn write(&self, fields: &mut Vec<u8>) {
        fields.push(self.num_channels);
        fields.extend_from_slice(&self.channel_config.to_le_bytes());
    }
}

/// Class-specific AC interface header followed by the units and terminals of the function.
/// `wTotalLength` covers the header and every child.
pub struct AudioFunction {
    buf: DescriptorBuffer,
}

impl AudioFunction {
    pub fn new(
        bcd_adc: u16,
        category: u8,
        controls: u8,
        children: &[&dyn Descriptor],
    ) -> Result<Self, Error> {
        let bcd = bcd_adc.to_le_bytes();
        let mut w = DescriptorWriter::new(
            Category::Opaque,
            CS_INTERFACE,
            &[
                AC_HEADER,
                bcd[0],
                bcd[1],   // bcdADC
                category, // bCategory
                0,
                0,        // wTotalLength
                controls, // bmControls
            ],
            children,
        )?;
        let total_length = w.total_length_u16("audio control")?;
        codec::write_u16_le(w.header_mut(), AC_HEADER_TOTAL_LENGTH, total_length);
        Ok(Self { buf: w.finish()? })
    }
}

pub struct ClockSource {
    buf: DescriptorBuffer,
}

impl ClockSource {
    pub fn new(
        clock_id: u8,
        attributes: u8,
        controls: u8,
        associated_terminal: u8,
        clock_string: u8,
    ) -> Result<Self, Error> {
        Ok(Self {
            buf: writer::leaf(
                CS_INTERFACE,
                &[
                    AC_CLOCK_SOURCE,
                    clock_id,
                    attributes,
                    controls,
                    associated_terminal,
                    clock_string,
                ],
            )?,
        })
    }
}

pub struct InputTerminal {
    buf: DescriptorBuffer,
}

impl InputTerminal {
    pub fn new(
        terminal_id: u8,
        terminal_type: u16,
        associated_terminal: u8,
        clock_source_id: u8,
        channels: ChannelCluster,
        controls: u16,
        terminal_string: u8,
    ) -> Result<Self, Error> {
        let mut fields = vec![AC_INPUT_TERMINAL, terminal_id];
        fields.extend_from_slice(&terminal_type.to_le_bytes());
        fields.push(associated_terminal);
        fields.push(clock_source_id);
        channels.write(&mut fields);
        fields.extend_from_slice(&controls.to_le_bytes());
        fields.push(channels.channel_names);
        fields.push(terminal_string);
        Ok(Self {
            buf: writer::leaf(CS_INTERFACE, &fields)?,
        })
    }
}

/// Feature unit with one `bmaControls` entry for the master channel followed by one per
/// logical channel.
pub struct FeatureUnit {
    buf: DescriptorBuffer,
}

impl FeatureUnit {
    pub fn new(
        unit_id: u8,
        source_id: u8,
        controls: &[u32],
        feature_string: u8,
    ) -> Result<Self, Error> {
        let mut fields = vec![0u8; 3 + 4 * controls.len() + 1];
        fields[0] = AC_FEATURE_UNIT;
        fields[1] = unit_id;
        fields[2] = source_id;
        for (i, &control) in controls.iter().enumerate() {
            codec::write_u32_le(&mut fields, 3 + 4 * i, control);
        }
        let last = fields.len() - 1;
        fields[last] = feature_string;
        Ok(Self {
            buf: writer::leaf(CS_INTERFACE, &fields)?,
        })
    }
}

pub struct OutputTerminal {
    buf: DescriptorBuffer,
}

impl OutputTerminal {
    pub fn new(
        terminal_id: u8,
        terminal_type: u16,
        associated_terminal: u8,
        source_id: u8,
        clock_source_id: u8,
        controls: u16,
        terminal_string: u8,
    ) -> Result<Self, Error> {
        let mut fields = vec![AC_OUTPUT_TERMINAL, terminal_id];
        fields.extend_from_slice(&terminal_type.to_le_bytes());
        fields.extend_from_slice(&[associated_terminal, source_id, clock_source_id]);
        fields.extend_from_slice(&controls.to_le_bytes());
        fields.push(terminal_string);
        Ok(Self {
            buf: writer::leaf(CS_INTERFACE, &fields)?,
        })
    }
}

/// Class-specific AS interface descriptor (`AS_GENERAL`) linking the stream to a terminal.
pub struct TerminalLink {
    buf: DescriptorBuffer,
}

impl TerminalLink {
    pub fn new(
        terminal_link: u8,
        controls: u8,
        format_type: u8,
        formats: u32,
        channels: ChannelCluster,
    ) -> Result<Self, Error> {
        let mut fields = vec![AS_GENERAL, terminal_link, controls, format_type];
        fields.extend_from_slice(&formats.to_le_bytes());
        channels.write(&mut fields);
        fields.push(channels.channel_names);
        Ok(Self {
            buf: writer::leaf(CS_INTERFACE, &fields)?,
        })
    }
}

pub struct FormatType {
    buf: DescriptorBuffer,
}

impl FormatType {
    pub fn new(format_type: u8, subslot_size: u8, bit_resolution: u8) -> Result<Self, Error> {
        Ok(Self {
            buf: writer::leaf(
                CS_INTERFACE,
                &[AS_FORMAT_TYPE, format_type, subslot_size, bit_resolution],
            )?,
        })
    }
}

/// Class-specific isochronous audio data endpoint descriptor.
pub struct IsoEndpointGeneral {
    buf: DescriptorBuffer,
}

impl IsoEndpointGeneral {
    pub fn new(
        attributes: u8,
        controls: u8,
        lock_delay_units: u8,
        lock_delay: u16,
    ) -> Result<Self, Error> {
        let delay = lock_delay.to_le_bytes();
        Ok(Self {
            buf: writer::leaf(
                CS_ENDPOINT,
                &[
                    EP_GENERAL,
                    attributes,
                    controls,
                    lock_delay_units,
                    delay[0],
                    delay[1],
                ],
            )?,
        })
    }
}

/// The audio control interface carrying `function`.
pub fn audio_control_interface(
    interface_number: u8,
    alternate_setting: u8,
    protocol: u8,
    interface_string: u8,
    function: &AudioFunction,
) -> Result<Interface, Error> {
    let descriptor = InterfaceBuilder::new(interface_number)
        .alternate_setting(alternate_setting)
        .interface_class(USB_CLASS_AUDIO)
        .interface_sub_class(AUDIO_SUBCLASS_CONTROL)
        .interface_protocol(protocol)
        .interface_string(interface_string)
        .build();
    Interface::new(&descriptor, &[function])
}

/// An audio streaming interface: alternate setting 0 without endpoints (zero bandwidth),
/// then alternate setting 1 holding `link` followed by `children` (formats and endpoints).
pub fn audio_stream_interface(
    interface_number: u8,
    protocol: u8,
    interface_string: u8,
    link: &TerminalLink,
    children: &[&dyn Descriptor],
) -> Result<InterfaceGroup, Error> {
    let streaming = |alternate_setting| {
        InterfaceBuilder::new(interface_number)
            .alternate_setting(alternate_setting)
            .interface_class(USB_CLASS_AUDIO)
            .interface_sub_class(AUDIO_SUBCLASS_STREAMING)
            .interface_protocol(protocol)
            .interface_string(interface_string)
            .build()
    };

    let mut active_children: Vec<&dyn Descriptor> = Vec::with_capacity(children.len() + 1);
    active_children.push(link);
    active_children.extend_from_slice(children);

    let idle = Interface::new(&streaming(0), &[])?;
    let active = Interface::new(&streaming(1), &active_children)?;
    InterfaceGroup::new(&[&idle, &active])
}

/// Interface association of a UAC2 function: the control interface and its streaming
/// interfaces.
pub fn uac2_association(
    protocol: u8,
    function_string: u8,
    children: &[&dyn Descriptor],
) -> Result<InterfaceAssociation, Error> {
    InterfaceAssociation::new(
        &UsbInterfaceAssociationDescriptor {
            function_class: USB_CLASS_AUDIO,
            function_sub_class: AUDIO_SUBCLASS_UNDEFINED,
            function_protocol: protocol,
            function_string,
        },
        children,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO: ChannelCluster = ChannelCluster {
        num_channels: 2,
        channel_config: 0x3,
        channel_names: 0,
    };

    #[test]
    fn feature_unit_length_follows_controls() {
        let unit = FeatureUnit::new(4, 1, &[0xf, 0xf, 0xf], 0).unwrap();
        assert_eq!(unit.len(), 18);
        assert_eq!(unit.bytes()[0], 18);
        assert_eq!(&unit.bytes()[..9], &[18, 0x24, 0x06, 4, 1, 0x0f, 0, 0, 0]);

        let mono = FeatureUnit::new(4, 1, &[0x3, 0x3], 5).unwrap();
        assert_eq!(mono.len(), 14);
        assert_eq!(mono.bytes()[13], 5);
    }

    #[test]
    fn terminal_layouts() {
        let input = InputTerminal::new(1, 0x0101, 0, 3, STEREO, 0, 0).unwrap();
        assert_eq!(
            input.bytes(),
            &[17, 0x24, 0x02, 1, 0x01, 0x01, 0, 3, 2, 3, 0, 0, 0, 0, 0, 0, 0]
        );

        let output = OutputTerminal::new(2, 0x0301, 0, 4, 3, 0, 0).unwrap();
        assert_eq!(output.bytes(), &[12, 0x24, 0x03, 2, 0x01, 0x03, 0, 4, 3, 0, 0, 0]);

        let link = TerminalLink::new(1, 0, 1, 1, STEREO).unwrap();
        assert_eq!(
            link.bytes(),
            &[16, 0x24, 0x01, 1, 0, 1, 1, 0, 0, 0, 2, 3, 0, 0, 0, 0]
        );
    }

    #[test]
    fn audio_function_total_covers_children() {
        let clock = ClockSource::new(3, 2, 3, 0, 0).unwrap();
        let output = OutputTerminal::new(2, 0x0301, 0, 4, 3, 0, 0).unwrap();
        let function = AudioFunction::new(0x0200, 1, 0, &[&clock, &output]).unwrap();
        assert_eq!(function.len(), 9 + 8 + 12);
        assert_eq!(&function.bytes()[..9], &[9, 0x24, 0x01, 0x00, 0x02, 1, 29, 0, 0]);

        let iface = audio_control_interface(0, 0, AF_VERSION_02_00, 0, &function).unwrap();
        assert_eq!(iface.num_endpoints(), 0);
        assert_eq!(iface.len(), 9 + 29);
    }

    #[test]
    fn stream_interface_has_idle_and_active_settings() {
        let link = TerminalLink::new(1, 0, 1, 1, STEREO).unwrap();
        let format = FormatType::new(1, 4, 32).unwrap();
        let group = audio_stream_interface(1, AF_VERSION_02_00, 0, &link, &[&format]).unwrap();
        assert_eq!(group.len(), 9 + 9 + 16 + 6);
        assert_eq!(&group.bytes()[..9], &[9, 4, 1, 0, 0, 1, 2, 0x20, 0]);
        assert_eq!(&group.bytes()[9..18], &[9, 4, 1, 1, 0, 1, 2, 0x20, 0]);

        let assoc = uac2_association(AF_VERSION_02_00, 0, &[&group]).unwrap();
        assert_eq!(assoc.first_interface(), 1);
        assert_eq!(assoc.interface_count(), 1);
    }

    #[test]
    fn iso_endpoint_general_layout() {
        let general = IsoEndpointGeneral::new(0, 0, 0, 0).unwrap();
        assert_eq!(general.bytes(), &[8, 0x25, 0x01, 0, 0, 0, 0, 0]);
    }
}
