use crate::buffer::DescriptorBuffer;
use crate::builder::InterfaceBuilder;
use crate::descriptor::{Endpoint, Interface, InterfaceAssociation};
use crate::usb::{Descriptor, UsbInterfaceAssociationDescriptor, CS_INTERFACE};
use crate::writer;
use failure::Error;

pub const USB_CLASS_CDC: u8 = 0x02;
pub const USB_CLASS_DATA: u8 = 0x0a;
const CDC_SUBCLASS_ACM: u8 = 0x02;
/// AT commands (V.250), the usual protocol of an ACM communications interface.
pub const CDC_PROTOCOL_AT: u8 = 0x01;

const CDC_TYPE_HEADER: u8 = 0x00;
const CDC_TYPE_CALL_MANAGEMENT: u8 = 0x01;
const CDC_TYPE_ACM: u8 = 0x02;
const CDC_TYPE_UNION: u8 = 0x06;

impl_descriptor! {
    FunctionalDescriptor => crate::usb::Category::Opaque,
}

/// A CDC functional descriptor (`CS_INTERFACE`) placed in the communications interface.
pub struct FunctionalDescriptor {
    buf: DescriptorBuffer,
}

impl FunctionalDescriptor {
    fn new(subtype: u8, fields: &[u8]) -> Result<Self, Error> {
        let mut body = vec![subtype];
        body.extend_from_slice(fields);
        Ok(Self {
            buf: writer::leaf(CS_INTERFACE, &body)?,
        })
    }

    /// Header functional descriptor carrying `bcdCDC`.
    pub fn header(bcd_cdc: u16) -> Result<Self, Error> {
        let bcd = bcd_cdc.to_le_bytes();
        Self::new(CDC_TYPE_HEADER, &[bcd[0], bcd[1]])
    }

    pub fn call_management(capabilities: u8, data_interface: u8) -> Result<Self, Error> {
        Self::new(CDC_TYPE_CALL_MANAGEMENT, &[capabilities, data_interface])
    }

    /// Abstract control management functional descriptor.
    pub fn acm(capabilities: u8) -> Result<Self, Error> {
        Self::new(CDC_TYPE_ACM, &[capabilities])
    }

    /// Union functional descriptor: the controlling interface and the interfaces it drives.
    pub fn union(control_interface: u8, subordinates: &[u8]) -> Result<Self, Error> {
        let mut fields = vec![control_interface];
        fields.extend_from_slice(subordinates);
        Self::new(CDC_TYPE_UNION, &fields)
    }
}

/// Communications class interface using the ACM subclass.
pub fn communications_interface(
    interface_number: u8,
    alternate_setting: u8,
    protocol: u8,
    interface_string: u8,
    children: &[&dyn Descriptor],
) -> Result<Interface, Error> {
    let descriptor = InterfaceBuilder::new(interface_number)
        .alternate_setting(alternate_setting)
        .interface_class(USB_CLASS_CDC)
        .interface_sub_class(CDC_SUBCLASS_ACM)
        .interface_protocol(protocol)
        .interface_string(interface_string)
        .build();
    Interface::new(&descriptor, children)
}

pub fn data_interface(
    interface_number: u8,
    alternate_setting: u8,
    protocol: u8,
    interface_string: u8,
    children: &[&dyn Descriptor],
) -> Result<Interface, Error> {
    let descriptor = InterfaceBuilder::new(interface_number)
        .alternate_setting(alternate_setting)
        .interface_class(USB_CLASS_DATA)
        .interface_protocol(protocol)
        .interface_string(interface_string)
        .build();
    Interface::new(&descriptor, children)
}

/// A virtual serial port: a communications interface and a data interface under one
/// interface association.
pub struct AcmFunction {
    pub comm_interface: u8,
    pub data_interface: u8,
    pub bcd_cdc: u16,
    pub acm_capabilities: u8,
    pub function_string: u8,
}

impl AcmFunction {
    pub fn new(comm_interface: u8, data_interface: u8) -> Self {
        AcmFunction {
            comm_interface,
            data_interface,
            bcd_cdc: 0x0110,
            acm_capabilities: 0x02,
            function_string: 0,
        }
    }

    /// `notify` is the interrupt IN endpoint of the communications interface; `read` and
    /// `write` are the bulk endpoints of the data interface, in that order.
    pub fn build(
        &self,
        notify: &Endpoint,
        read: &Endpoint,
        write: &Endpoint,
    ) -> Result<InterfaceAssociation, Error> {
        let header = FunctionalDescriptor::header(self.bcd_cdc)?;
        let call_management = FunctionalDescriptor::call_management(0x00, self.data_interface)?;
        let acm = FunctionalDescriptor::acm(self.acm_capabilities)?;
        let union = FunctionalDescriptor::union(self.comm_interface, &[self.data_interface])?;

        let comm = communications_interface(
            self.comm_interface,
            0,
            CDC_PROTOCOL_AT,
            0,
            &[&header, &call_management, &acm, &union, notify],
        )?;
        let data = data_interface(self.data_interface, 0, 0, 0, &[read, write])?;

        InterfaceAssociation::new(
            &UsbInterfaceAssociationDescriptor {
                function_class: USB_CLASS_CDC,
                function_sub_class: CDC_SUBCLASS_ACM,
                function_protocol: CDC_PROTOCOL_AT,
                function_string: self.function_string,
            },
            &[&comm, &data],
        )
    }
}

/// [`AcmFunction`] with default capabilities and CDC 1.10.
pub fn acm_function(
    comm_interface: u8,
    data_interface: u8,
    notify: &Endpoint,
    read: &Endpoint,
    write: &Endpoint,
) -> Result<InterfaceAssociation, Error> {
    AcmFunction::new(comm_interface, data_interface).build(notify, read, write)
}
