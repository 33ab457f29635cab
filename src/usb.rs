use crate::writer::{AssociationCounters, ConfigurationCounters, InterfaceCounters};
use bit_field::BitField;
use failure::Error;
use usb_device::endpoint::{EndpointAddress, EndpointType};

/// Maximum number of endpoints in one direction. Specified by the USB specification.
pub const USB_MAX_ENDPOINTS: usize = 16;

/// Class-specific interface descriptor type, shared by audio, CDC and MIDI.
pub const CS_INTERFACE: u8 = 0x24;
/// Class-specific endpoint descriptor type.
pub const CS_ENDPOINT: u8 = 0x25;

/// Standard descriptor types
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UsbDescriptorType {
    Device = 1,
    Configuration = 2,
    String = 3,
    Interface = 4,
    Endpoint = 5,
    InterfaceAssociation = 11,
    Hid = 0x21,
}

/// Byte offsets of the standard descriptor fields, relative to the descriptor start.
pub mod offset {
    pub const LENGTH: usize = 0;
    pub const DESCRIPTOR_TYPE: usize = 1;

    pub const CONFIGURATION_TOTAL_LENGTH: usize = 2;
    pub const CONFIGURATION_NUM_INTERFACES: usize = 4;

    pub const INTERFACE_NUMBER: usize = 2;
    pub const INTERFACE_ALTERNATE_SETTING: usize = 3;
    pub const INTERFACE_NUM_ENDPOINTS: usize = 4;

    pub const ASSOCIATION_FIRST_INTERFACE: usize = 2;
    pub const ASSOCIATION_INTERFACE_COUNT: usize = 3;
}

/// How a parent adjusts its counters when a child of this category is appended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Category {
    Endpoint,
    Interface,
    InterfaceAssociation,
    Configuration,
    /// Bundles several standard descriptors and reports them to the parent itself.
    Custom,
    /// Class-specific bytes with no counting semantics.
    Opaque,
}

/// A finished descriptor node: its own header followed by its serialized children.
///
/// The category is a property of the implementing type. Only `Category::Custom`
/// nodes need to override the `on_add_to_*` hooks; the writer calls them instead of
/// the built-in counting rules.
pub trait Descriptor {
    fn category(&self) -> Category;

    fn bytes(&self) -> &[u8];

    fn len(&self) -> usize {
        self.bytes().len()
    }

    fn on_add_to_interface(&self, _interface: &mut InterfaceCounters) -> Result<(), Error> {
        Ok(())
    }

    fn on_add_to_association(&self, _association: &mut AssociationCounters) -> Result<(), Error> {
        Ok(())
    }

    fn on_add_to_configuration(
        &self,
        _configuration: &mut ConfigurationCounters,
    ) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct UsbDeviceDescriptor {
    pub usb_release: u16,
    pub device_class: u8,
    pub device_sub_class: u8,
    pub device_protocol: u8,
    pub max_packet_size_0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_release: u16,
    pub manufacturer: u8,
    pub product: u8,
    pub serial_number: u8,
    pub num_configurations: u8,
}

#[derive(Clone, Debug)]
pub struct UsbConfigurationDescriptor {
    pub configuration_value: u8,
    pub configuration_string: u8,
    pub attributes: u8,
    pub max_power: u8,
}

#[derive(Clone, Debug)]
pub struct UsbInterfaceDescriptor {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub interface_class: u8,
    pub interface_sub_class: u8,
    pub interface_protocol: u8,
    pub interface_string: u8,
}

#[derive(Clone, Debug)]
pub struct UsbInterfaceAssociationDescriptor {
    pub function_class: u8,
    pub function_sub_class: u8,
    pub function_protocol: u8,
    pub function_string: u8,
}

/// Synchronization type of an isochronous endpoint (`bmAttributes` bits 2..3).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Synchronization {
    None = 0,
    Asynchronous = 1,
    Adaptive = 2,
    Synchronous = 3,
}

/// Usage type of an isochronous endpoint (`bmAttributes` bits 4..5).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IsoUsage {
    Data = 0,
    Feedback = 1,
    ImplicitFeedback = 2,
}

#[derive(Clone, Debug)]
pub struct UsbEndpointDescriptor {
    pub address: EndpointAddress,
    pub ep_type: EndpointType,
    pub synchronization: Synchronization,
    pub usage: IsoUsage,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl UsbEndpointDescriptor {
    /// `bmAttributes`. Synchronization and usage are only encoded for isochronous endpoints.
    pub fn attributes(&self) -> u8 {
        let mut attributes = 0u8;
        attributes.set_bits(0..2, self.ep_type as u8);
        if self.ep_type == EndpointType::Isochronous {
            attributes.set_bits(2..4, self.synchronization as u8);
            attributes.set_bits(4..6, self.usage as u8);
        }
        attributes
    }
}
