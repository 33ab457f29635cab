use crate::buffer::DescriptorBuffer;
use crate::builder::InterfaceBuilder;
use crate::descriptor::Interface;
use crate::usb::{Descriptor, UsbDescriptorType};
use crate::writer;
use failure::Error;

pub const USB_CLASS_HID: u8 = 0x03;
const HID_SUBCLASS_NONE: u8 = 0x00;
const HID_SUBCLASS_BOOT: u8 = 0x01;

/// Class descriptor type of a report descriptor.
pub const HID_REPORT_DESCRIPTOR: u8 = 0x22;

impl_descriptor! {
    HidDescriptor => crate::usb::Category::Opaque,
}

/// Boot interface protocol, reported in `bInterfaceProtocol`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HidBootProtocol {
    None = 0,
    Keyboard = 1,
    Mouse = 2,
}

/// One `(bDescriptorType, wDescriptorLength)` entry of a HID descriptor.
#[derive(Clone, Copy, Debug)]
pub struct HidClassDescriptor {
    pub descriptor_type: u8,
    pub length: u16,
}

/// HID descriptor (type 0x21), listing the class descriptors the host may request.
pub struct HidDescriptor {
    buf: DescriptorBuffer,
}

impl HidDescriptor {
    pub fn new(
        bcd_hid: u16,
        country_code: u8,
        class_descriptors: &[HidClassDescriptor],
    ) -> Result<Self, Error> {
        let bcd = bcd_hid.to_le_bytes();
        let mut fields = vec![bcd[0], bcd[1], country_code, class_descriptors.len() as u8];
        for desc in class_descriptors {
            fields.push(desc.descriptor_type);
            fields.extend_from_slice(&desc.length.to_le_bytes());
        }
        Ok(Self {
            buf: writer::leaf(UsbDescriptorType::Hid as u8, &fields)?,
        })
    }

    /// A HID descriptor that announces a single report descriptor of `report_length` bytes.
    pub fn with_report(bcd_hid: u16, country_code: u8, report_length: u16) -> Result<Self, Error> {
        Self::new(
            bcd_hid,
            country_code,
            &[HidClassDescriptor {
                descriptor_type: HID_REPORT_DESCRIPTOR,
                length: report_length,
            }],
        )
    }
}

/// A HID interface without boot protocol support. `children` are the HID descriptor and
/// the interrupt endpoints.
pub fn hid_interface(
    interface_number: u8,
    alternate_setting: u8,
    interface_string: u8,
    children: &[&dyn Descriptor],
) -> Result<Interface, Error> {
    let descriptor = InterfaceBuilder::new(interface_number)
        .alternate_setting(alternate_setting)
        .interface_class(USB_CLASS_HID)
        .interface_sub_class(HID_SUBCLASS_NONE)
        .interface_string(interface_string)
        .build();
    Interface::new(&descriptor, children)
}

/// A HID interface supporting the boot protocol of keyboards or mice.
pub fn boot_interface(
    interface_number: u8,
    alternate_setting: u8,
    interface_string: u8,
    protocol: HidBootProtocol,
    children: &[&dyn Descriptor],
) -> Result<Interface, Error> {
    let descriptor = InterfaceBuilder::new(interface_number)
        .alternate_setting(alternate_setting)
        .interface_class(USB_CLASS_HID)
        .interface_sub_class(HID_SUBCLASS_BOOT)
        .interface_protocol(protocol as u8)
        .interface_string(interface_string)
        .build();
    Interface::new(&descriptor, children)
}
