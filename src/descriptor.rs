use crate::buffer::DescriptorBuffer;
use crate::codec;
use crate::error::DescriptorError;
use crate::usb::{
    offset, Category, Descriptor, UsbConfigurationDescriptor, UsbDescriptorType,
    UsbDeviceDescriptor, UsbEndpointDescriptor, UsbInterfaceAssociationDescriptor,
    UsbInterfaceDescriptor,
};
use crate::writer::{AssociationCounters, ConfigurationCounters, DescriptorWriter};
use crate::EndpointInfo;
use failure::Error;

impl_descriptor! {
    Endpoint => Category::Endpoint,
    Interface => Category::Interface,
    InterfaceAssociation => Category::InterfaceAssociation,
    Configuration => Category::Configuration,
    CustomDescriptor => Category::Opaque,
    DeviceDescriptor => Category::Opaque,
}

/// Standard endpoint descriptor, optionally followed by class-specific endpoint descriptors.
pub struct Endpoint {
    descriptor: UsbEndpointDescriptor,
    buf: DescriptorBuffer,
}

impl Endpoint {
    pub fn new(
        descriptor: &UsbEndpointDescriptor,
        children: &[&dyn Descriptor],
    ) -> Result<Self, Error> {
        Self::write(descriptor, &[], children)
    }

    /// The 9-byte endpoint layout of the audio class, which appends `bRefresh` and
    /// `bSynchAddress`. USB MIDI 1.0 streaming endpoints use it.
    pub fn audio(
        descriptor: &UsbEndpointDescriptor,
        refresh: u8,
        synch_address: u8,
        children: &[&dyn Descriptor],
    ) -> Result<Self, Error> {
        Self::write(descriptor, &[refresh, synch_address], children)
    }

    fn write(
        descriptor: &UsbEndpointDescriptor,
        extra: &[u8],
        children: &[&dyn Descriptor],
    ) -> Result<Self, Error> {
        let mps = descriptor.max_packet_size.to_le_bytes();
        let mut fields = vec![
            descriptor.address.into(), // bEndpointAddress
            descriptor.attributes(),   // bmAttributes
            mps[0],
            mps[1],              // wMaxPacketSize
            descriptor.interval, // bInterval
        ];
        fields.extend_from_slice(extra);

        let w = DescriptorWriter::new(
            Category::Endpoint,
            UsbDescriptorType::Endpoint as u8,
            &fields,
            children,
        )?;
        Ok(Self {
            descriptor: descriptor.clone(),
            buf: w.finish()?,
        })
    }
}

impl EndpointInfo for Endpoint {
    fn descriptor(&self) -> &UsbEndpointDescriptor {
        &self.descriptor
    }
}

/// Standard interface descriptor. `bNumEndpoints` counts the endpoint children.
pub struct Interface {
    buf: DescriptorBuffer,
}

impl Interface {
    pub fn new(
        descriptor: &UsbInterfaceDescriptor,
        children: &[&dyn Descriptor],
    ) -> Result<Self, Error> {
        let w = DescriptorWriter::new(
            Category::Interface,
            UsbDescriptorType::Interface as u8,
            &[
                descriptor.interface_number,    // bInterfaceNumber
                descriptor.alternate_setting,   // bAlternateSetting
                0,                              // bNumEndpoints
                descriptor.interface_class,     // bInterfaceClass
                descriptor.interface_sub_class, // bInterfaceSubClass
                descriptor.interface_protocol,  // bInterfaceProtocol
                descriptor.interface_string,    // iInterface
            ],
            children,
        )?;
        Ok(Self { buf: w.finish()? })
    }

    pub fn interface_number(&self) -> u8 {
        self.buf[offset::INTERFACE_NUMBER]
    }

    pub fn alternate_setting(&self) -> u8 {
        self.buf[offset::INTERFACE_ALTERNATE_SETTING]
    }

    pub fn num_endpoints(&self) -> u8 {
        self.buf[offset::INTERFACE_NUM_ENDPOINTS]
    }
}

/// Alternate settings of one interface number, serialized back to back.
///
/// Parents count the group the way they would count its members added one by one, so the
/// shared interface number is counted once.
pub struct InterfaceGroup {
    buf: DescriptorBuffer,
    interface_number: u8,
    alternate_settings: Vec<u8>,
}

impl InterfaceGroup {
    pub fn new(interfaces: &[&Interface]) -> Result<Self, Error> {
        let interface_number = interfaces
            .first()
            .map(|interface| interface.interface_number())
            .ok_or(DescriptorError::EmptyInterfaceGroup)?;
        if interfaces
            .iter()
            .any(|interface| interface.interface_number() != interface_number)
        {
            return Err(DescriptorError::MixedInterfaceNumbers.into());
        }

        let buf = interfaces
            .iter()
            .fold(DescriptorBuffer::zeroed(0), |acc, interface| {
                DescriptorBuffer::merge(&acc, &interface.buf)
            });

        Ok(Self {
            buf,
            interface_number,
            alternate_settings: interfaces
                .iter()
                .map(|interface| interface.alternate_setting())
                .collect(),
        })
    }

    pub fn interface_number(&self) -> u8 {
        self.interface_number
    }
}

impl Descriptor for InterfaceGroup {
    fn category(&self) -> Category {
        Category::Custom
    }

    fn bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    fn on_add_to_association(&self, association: &mut AssociationCounters) -> Result<(), Error> {
        for &alternate_setting in &self.alternate_settings {
            association.add_interface(self.interface_number, alternate_setting)?;
        }
        Ok(())
    }

    fn on_add_to_configuration(
        &self,
        configuration: &mut ConfigurationCounters,
    ) -> Result<(), Error> {
        for &alternate_setting in &self.alternate_settings {
            configuration.add_interface(alternate_setting)?;
        }
        Ok(())
    }
}

/// Interface association descriptor grouping the interfaces of one function.
pub struct InterfaceAssociation {
    buf: DescriptorBuffer,
}

impl InterfaceAssociation {
    pub fn new(
        descriptor: &UsbInterfaceAssociationDescriptor,
        children: &[&dyn Descriptor],
    ) -> Result<Self, Error> {
        let w = DescriptorWriter::new(
            Category::InterfaceAssociation,
            UsbDescriptorType::InterfaceAssociation as u8,
            &[
                0,                             // bFirstInterface
                0,                             // bInterfaceCount
                descriptor.function_class,     // bFunctionClass
                descriptor.function_sub_class, // bFunctionSubClass
                descriptor.function_protocol,  // bFunctionProtocol
                descriptor.function_string,    // iFunction
            ],
            children,
        )?;
        Ok(Self { buf: w.finish()? })
    }

    pub fn first_interface(&self) -> u8 {
        self.buf[offset::ASSOCIATION_FIRST_INTERFACE]
    }

    pub fn interface_count(&self) -> u8 {
        self.buf[offset::ASSOCIATION_INTERFACE_COUNT]
    }
}

/// Configuration descriptor: the root of a descriptor table.
pub struct Configuration {
    buf: DescriptorBuffer,
}

impl Configuration {
    pub fn new(
        conf: &UsbConfigurationDescriptor,
        children: &[&dyn Descriptor],
    ) -> Result<Self, Error> {
        if conf.configuration_value == 0 {
            return Err(DescriptorError::ZeroConfigurationValue.into());
        }

        let mut w = DescriptorWriter::new(
            Category::Configuration,
            UsbDescriptorType::Configuration as u8,
            &[
                0,
                0,                         // wTotalLength
                0,                         // bNumInterfaces
                conf.configuration_value,  // bConfigurationValue
                conf.configuration_string, // iConfiguration
                conf.attributes,           // bmAttributes
                conf.max_power,            // bMaxPower
            ],
            children,
        )?;
        let total_length = w.total_length_u16("configuration")?;
        codec::write_u16_le(
            w.header_mut(),
            offset::CONFIGURATION_TOTAL_LENGTH,
            total_length,
        );
        Ok(Self { buf: w.finish()? })
    }

    pub fn total_length(&self) -> u16 {
        codec::read_u16_le(self.buf.as_slice(), offset::CONFIGURATION_TOTAL_LENGTH)
    }

    pub fn num_interfaces(&self) -> u8 {
        self.buf[offset::CONFIGURATION_NUM_INTERFACES]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_vec()
    }
}

/// A raw descriptor given byte for byte. The first byte must equal the byte count.
pub struct CustomDescriptor {
    buf: DescriptorBuffer,
}

impl CustomDescriptor {
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        let declared = bytes.first().map_or(0, |&len| usize::from(len));
        if bytes.len() < 2 || declared != bytes.len() {
            return Err(DescriptorError::CustomLengthMismatch {
                declared,
                actual: bytes.len(),
            }
            .into());
        }
        Ok(Self {
            buf: DescriptorBuffer::from_slice(bytes),
        })
    }
}

/// Standard device descriptor. It stands alone and is never a child of a configuration.
pub struct DeviceDescriptor {
    buf: DescriptorBuffer,
}

impl DeviceDescriptor {
    pub fn new(device: &UsbDeviceDescriptor) -> Result<Self, Error> {
        let usb = device.usb_release.to_le_bytes();
        let vid = device.vendor_id.to_le_bytes();
        let pid = device.product_id.to_le_bytes();
        let release = device.device_release.to_le_bytes();
        let w = DescriptorWriter::new(
            Category::Opaque,
            UsbDescriptorType::Device as u8,
            &[
                usb[0],
                usb[1],                   // bcdUSB
                device.device_class,      // bDeviceClass
                device.device_sub_class,  // bDeviceSubClass
                device.device_protocol,   // bDeviceProtocol
                device.max_packet_size_0, // bMaxPacketSize0
                vid[0],
                vid[1], // idVendor
                pid[0],
                pid[1], // idProduct
                release[0],
                release[1],                // bcdDevice
                device.manufacturer,       // iManufacturer
                device.product,            // iProduct
                device.serial_number,      // iSerialNumber
                device.num_configurations, // bNumConfigurations
            ],
            &[],
        )?;
        Ok(Self { buf: w.finish()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{
        ConfigurationBuilder, DeviceBuilder, EndpointBuilder, InterfaceBuilder, UsbVidPid,
    };
    use usb_device::endpoint::EndpointType;
    use usb_device::UsbDirection;

    fn bulk(address: u8) -> Endpoint {
        let descriptor = EndpointBuilder::new()
            .address(address)
            .ep_type(EndpointType::Bulk)
            .max_packet_size(64)
            .build()
            .unwrap();
        Endpoint::new(&descriptor, &[]).unwrap()
    }

    fn interface(number: u8, alternate_setting: u8, children: &[&dyn Descriptor]) -> Interface {
        let descriptor = InterfaceBuilder::new(number)
            .alternate_setting(alternate_setting)
            .interface_class(0xff)
            .build();
        Interface::new(&descriptor, children).unwrap()
    }

    fn function() -> UsbInterfaceAssociationDescriptor {
        UsbInterfaceAssociationDescriptor {
            function_class: 0xff,
            function_sub_class: 0,
            function_protocol: 0,
            function_string: 0,
        }
    }

    #[test]
    fn endpoint_layout() {
        let ep = bulk(0x81);
        assert_eq!(ep.bytes(), &[7, 5, 0x81, 0x02, 64, 0, 0]);
        assert_eq!(ep.direction(), UsbDirection::In);
        assert_eq!(ep.ep_type(), EndpointType::Bulk);
    }

    #[test]
    fn audio_endpoint_has_refresh_and_synch_address() {
        let descriptor = EndpointBuilder::new()
            .address(0x01)
            .ep_type(EndpointType::Bulk)
            .max_packet_size(64)
            .build()
            .unwrap();
        let ep = Endpoint::audio(&descriptor, 0, 0, &[]).unwrap();
        assert_eq!(ep.bytes(), &[9, 5, 0x01, 0x02, 64, 0, 0, 0, 0]);
    }

    #[test]
    fn empty_interface_is_header_only() {
        let iface = interface(0, 0, &[]);
        assert_eq!(iface.len(), 9);
        assert_eq!(iface.num_endpoints(), 0);
    }

    #[test]
    fn interface_counts_endpoints_and_length() {
        let (out, inp) = (bulk(0x02), bulk(0x82));
        let cs = CustomDescriptor::new(&[4, 0x24, 0x02, 0x02]).unwrap();
        let iface = interface(1, 0, &[&cs, &out, &inp]);
        assert_eq!(iface.num_endpoints(), 2);
        assert_eq!(iface.len(), 9 + 4 + 7 + 7);
        assert_eq!(&iface.bytes()[9..13], &[4, 0x24, 0x02, 0x02]);
    }

    #[test]
    fn association_takes_first_encountered_interface() {
        let (a, b) = (interface(2, 0, &[]), interface(3, 0, &[]));
        let assoc = InterfaceAssociation::new(&function(), &[&a, &b]).unwrap();
        assert_eq!(assoc.first_interface(), 2);
        assert_eq!(assoc.interface_count(), 2);

        let reversed = InterfaceAssociation::new(&function(), &[&b, &a]).unwrap();
        assert_eq!(reversed.first_interface(), 3);
        assert_eq!(reversed.interface_count(), 2);
    }

    #[test]
    fn alternate_settings_are_counted_once() {
        let alt0 = interface(0, 0, &[]);
        let ep = bulk(0x81);
        let alt1 = interface(0, 1, &[&ep]);
        let other = interface(1, 0, &[]);
        let conf = ConfigurationBuilder::new(1).build().unwrap();
        let config = Configuration::new(&conf, &[&alt0, &alt1, &other]).unwrap();
        assert_eq!(config.num_interfaces(), 2);
        assert_eq!(usize::from(config.total_length()), config.len());
        assert_eq!(config.len(), 9 + 9 + 16 + 9);
    }

    #[test]
    fn interface_group_counts_like_its_members() {
        let alt0 = interface(4, 0, &[]);
        let alt1 = interface(4, 1, &[]);
        let group = InterfaceGroup::new(&[&alt0, &alt1]).unwrap();
        assert_eq!(group.len(), 18);

        let assoc = InterfaceAssociation::new(&function(), &[&group]).unwrap();
        assert_eq!(assoc.first_interface(), 4);
        assert_eq!(assoc.interface_count(), 1);

        let conf = ConfigurationBuilder::new(1).build().unwrap();
        let config = Configuration::new(&conf, &[&group, &assoc]).unwrap();
        assert_eq!(config.num_interfaces(), 2);
    }

    #[test]
    fn interface_group_rejects_mixed_numbers() {
        let (a, b) = (interface(0, 0, &[]), interface(1, 1, &[]));
        let err = InterfaceGroup::new(&[&a, &b]).err().unwrap();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::MixedInterfaceNumbers)
        );
        assert!(InterfaceGroup::new(&[]).is_err());
    }

    #[test]
    fn zero_configuration_value_fails() {
        let conf = ConfigurationBuilder::new(0).build().unwrap();
        let err = Configuration::new(&conf, &[]).err().unwrap();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::ZeroConfigurationValue)
        );
    }

    #[test]
    fn custom_descriptor_length_must_match() {
        assert!(CustomDescriptor::new(&[8, 0x25, 0x01, 0, 0, 0, 0, 0]).is_ok());
        let err = CustomDescriptor::new(&[9, 0x25, 0x01]).err().unwrap();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::CustomLengthMismatch {
                declared: 9,
                actual: 3
            })
        );
        assert!(CustomDescriptor::new(&[]).is_err());
    }

    #[test]
    fn device_descriptor_layout() {
        let device = DeviceBuilder::new(UsbVidPid(0x1209, 0x0001))
            .manufacturer(1)
            .product(2)
            .build()
            .unwrap();
        let desc = DeviceDescriptor::new(&device).unwrap();
        assert_eq!(
            desc.bytes(),
            &[18, 1, 0x00, 0x02, 0, 0, 0, 8, 0x09, 0x12, 0x01, 0x00, 0x10, 0x00, 1, 2, 0, 1]
        );
    }

    #[test]
    fn composition_is_deterministic() {
        let build = || {
            let ep = bulk(0x81);
            let iface = interface(0, 0, &[&ep]);
            let conf = ConfigurationBuilder::new(1).build().unwrap();
            Configuration::new(&conf, &[&iface]).unwrap().into_bytes()
        };
        assert_eq!(build(), build());
    }
}
