//! USB MIDI 1.0 streaming interface descriptors.

use crate::buffer::DescriptorBuffer;
use crate::builder::InterfaceBuilder;
use crate::descriptor::{Endpoint, Interface};
use crate::error::DescriptorError;
use crate::usb::{Category, Descriptor, UsbEndpointDescriptor, CS_ENDPOINT, CS_INTERFACE};
use crate::uac2::USB_CLASS_AUDIO;
use crate::writer;
use failure::Error;
use log::debug;

const AUDIO_SUBCLASS_MIDI_STREAMING: u8 = 0x03;

const MS_HEADER: u8 = 0x01;
const MIDI_IN_JACK: u8 = 0x02;
const MIDI_OUT_JACK: u8 = 0x03;
const MS_GENERAL: u8 = 0x01;

const BCD_MSC: u16 = 0x0100;

impl_descriptor! {
    MidiInJack => Category::Opaque,
    MidiOutJack => Category::Opaque,
    ExternalInJack => Category::Opaque,
    ExternalOutJack => Category::Opaque,
    JackAssociation => Category::Opaque,
    MsHeader => Category::Opaque,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JackType {
    Embedded = 1,
    External = 2,
}

/// An input pin of an OUT jack: the entity it is wired to and that entity's output pin.
#[derive(Clone, Copy, Debug)]
pub struct JackConnection {
    pub source_id: u8,
    pub source_pin: u8,
}

pub struct MidiInJack {
    buf: DescriptorBuffer,
}

impl MidiInJack {
    pub fn new(jack_type: JackType, jack_id: u8, jack_string: u8) -> Result<Self, Error> {
        if jack_id == 0 {
            return Err(DescriptorError::ZeroJackId.into());
        }
        Ok(Self {
            buf: writer::leaf(
                CS_INTERFACE,
                &[MIDI_IN_JACK, jack_type as u8, jack_id, jack_string],
            )?,
        })
    }
}

pub struct MidiOutJack {
    buf: DescriptorBuffer,
}

impl MidiOutJack {
    pub fn new(
        jack_type: JackType,
        jack_id: u8,
        jack_string: u8,
        connections: &[JackConnection],
    ) -> Result<Self, Error> {
        if jack_id == 0 {
            return Err(DescriptorError::ZeroJackId.into());
        }
        if connections.iter().any(|c| c.source_pin == 0) {
            return Err(DescriptorError::ZeroSourcePin.into());
        }

        let mut fields = vec![
            MIDI_OUT_JACK,
            jack_type as u8,
            jack_id,
            connections.len() as u8,
        ];
        for connection in connections {
            fields.push(connection.source_id);
            fields.push(connection.source_pin);
        }
        fields.push(jack_string);
        Ok(Self {
            buf: writer::leaf(CS_INTERFACE, &fields)?,
        })
    }
}

/// A physical MIDI IN port: an external IN jack wired to the embedded OUT jack the host
/// reads from.
pub struct ExternalInJack {
    buf: DescriptorBuffer,
}

impl ExternalInJack {
    pub fn new(usb_out_id: u8, in_jack_id: u8) -> Result<Self, Error> {
        let external = MidiInJack::new(JackType::External, in_jack_id, 0)?;
        let embedded = MidiOutJack::new(
            JackType::Embedded,
            usb_out_id,
            0,
            &[JackConnection {
                source_id: in_jack_id,
                source_pin: 1,
            }],
        )?;
        Ok(Self {
            buf: DescriptorBuffer::merge(&external.buf, &embedded.buf),
        })
    }
}

/// A physical MIDI OUT port: the embedded IN jack the host writes to, wired to an external
/// OUT jack.
pub struct ExternalOutJack {
    buf: DescriptorBuffer,
}

impl ExternalOutJack {
    pub fn new(usb_in_id: u8, out_jack_id: u8) -> Result<Self, Error> {
        let embedded = MidiInJack::new(JackType::Embedded, usb_in_id, 0)?;
        let external = MidiOutJack::new(
            JackType::External,
            out_jack_id,
            0,
            &[JackConnection {
                source_id: usb_in_id,
                source_pin: 1,
            }],
        )?;
        Ok(Self {
            buf: DescriptorBuffer::merge(&embedded.buf, &external.buf),
        })
    }
}

/// Class-specific MS bulk endpoint descriptor listing the embedded jacks bound to the
/// endpoint.
pub struct JackAssociation {
    buf: DescriptorBuffer,
}

impl JackAssociation {
    pub fn new(embedded_jacks: &[u8]) -> Result<Self, Error> {
        let mut fields = vec![MS_GENERAL, embedded_jacks.len() as u8];
        fields.extend_from_slice(embedded_jacks);
        Ok(Self {
            buf: writer::leaf(CS_ENDPOINT, &fields)?,
        })
    }
}

/// A MIDI streaming bulk endpoint: the 9-byte audio endpoint layout followed by its jack
/// association. Interval, refresh and synch address are always 0.
pub fn midi_endpoint(
    descriptor: &UsbEndpointDescriptor,
    association: &JackAssociation,
) -> Result<Endpoint, Error> {
    let mut descriptor = descriptor.clone();
    descriptor.interval = 0;
    Endpoint::audio(&descriptor, 0, 0, &[association])
}

/// A MIDI streaming interface. The class-specific header is generated; its `wTotalLength`
/// covers the header and all of `children` (jacks and endpoints).
pub fn midi_streaming_interface(
    interface_number: u8,
    alternate_setting: u8,
    interface_string: u8,
    children: &[&dyn Descriptor],
) -> Result<Interface, Error> {
    let total = 7 + children.iter().map(|child| child.len()).sum::<usize>();
    if total > usize::from(u16::MAX) {
        return Err(DescriptorError::TooLong {
            kind: "MIDI streaming",
            len: total,
        }
        .into());
    }

    let bcd = BCD_MSC.to_le_bytes();
    let total_bytes = (total as u16).to_le_bytes();
    let header = MsHeader {
        buf: writer::leaf(
            CS_INTERFACE,
            &[MS_HEADER, bcd[0], bcd[1], total_bytes[0], total_bytes[1]],
        )?,
    };
    debug!("MIDI streaming class-specific block: {} bytes", total);

    let mut all: Vec<&dyn Descriptor> = Vec::with_capacity(children.len() + 1);
    all.push(&header);
    all.extend_from_slice(children);

    let descriptor = InterfaceBuilder::new(interface_number)
        .alternate_setting(alternate_setting)
        .interface_class(USB_CLASS_AUDIO)
        .interface_sub_class(AUDIO_SUBCLASS_MIDI_STREAMING)
        .interface_string(interface_string)
        .build();
    Interface::new(&descriptor, &all)
}

/// Class-specific MS interface header, generated by `midi_streaming_interface`.
struct MsHeader {
    buf: DescriptorBuffer,
}
