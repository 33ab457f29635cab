use crate::error::DescriptorError;
use crate::usb::{
    IsoUsage, Synchronization, UsbConfigurationDescriptor, UsbDeviceDescriptor,
    UsbEndpointDescriptor, UsbInterfaceDescriptor, USB_MAX_ENDPOINTS,
};
use bit_field::BitField;
use failure::Error;
use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::UsbDirection;

/// A USB vendor ID and product ID pair.
pub struct UsbVidPid(pub u16, pub u16);

macro_rules! generate_field_setters {
    ( $( $(#[$meta:meta])* $name:ident: $type:ty, )* ) => {
        $(
            $(#[$meta])*
            pub fn $name(mut self, $name: $type) -> Self {
                self.descriptor.$name = $name;
                self
            }
        )*
    }
}

pub struct DeviceBuilder {
    descriptor: UsbDeviceDescriptor,
}

impl DeviceBuilder {
    pub fn new(vid_pid: UsbVidPid) -> Self {
        Self {
            descriptor: UsbDeviceDescriptor {
                usb_release: 0x0200,
                device_class: 0,
                device_sub_class: 0,
                device_protocol: 0,
                max_packet_size_0: 8,
                vendor_id: vid_pid.0,
                product_id: vid_pid.1,
                device_release: 0x0010,
                manufacturer: 0,
                product: 0,
                serial_number: 0,
                num_configurations: 1,
            },
        }
    }

    generate_field_setters! {
        /// Sets the device class code assigned by USB.org. Set to `0xff` for vendor-specific
        /// devices that do not conform to any class.
        ///
        /// Default: `0x00` (class code specified by interfaces)
        device_class: u8,

        /// Sets the device sub-class code. Depends on class.
        ///
        /// Default: `0x00`
        device_sub_class: u8,

        /// Sets the device protocol code. Depends on class and sub-class.
        ///
        /// Default: `0x00`
        device_protocol: u8,

        /// Sets the device release version in BCD.
        ///
        /// Default: `0x0010` ("0.1")
        device_release: u16,

        /// Sets the string index of the manufacturer name.
        ///
        /// Default: 0 (none)
        manufacturer: u8,

        /// Sets the string index of the product name.
        ///
        /// Default: 0 (none)
        product: u8,

        /// Sets the string index of the serial number.
        ///
        /// Default: 0 (none)
        serial_number: u8,

        /// Default: 1
        num_configurations: u8,
    }

    /// Sets the maximum packet size in bytes for the control endpoint 0.
    ///
    /// Valid values are 8, 16, 32 and 64; anything else makes `build` fail.
    ///
    /// Default: 8 bytes
    pub fn max_packet_size_0(mut self, max_packet_size_0: u8) -> Self {
        self.descriptor.max_packet_size_0 = max_packet_size_0;
        self
    }

    pub fn build(self) -> Result<UsbDeviceDescriptor, Error> {
        match self.descriptor.max_packet_size_0 {
            8 | 16 | 32 | 64 => Ok(self.descriptor),
            other => Err(DescriptorError::InvalidMaxPacketSize0(other).into()),
        }
    }
}

pub struct ConfigurationBuilder {
    descriptor: UsbConfigurationDescriptor,
    max_power_ma: usize,
}

impl ConfigurationBuilder {
    pub fn new(configuration_value: u8) -> Self {
        Self {
            descriptor: UsbConfigurationDescriptor {
                configuration_value,
                configuration_string: 0,
                attributes: 0x80,
                max_power: 50,
            },
            max_power_ma: 100,
        }
    }

    generate_field_setters! {
        /// Sets the string index describing this configuration.
        ///
        /// Default: 0 (none)
        configuration_string: u8,
    }

    /// Sets whether the device may have an external power source.
    ///
    /// This should be set to `true` even if the device is sometimes self-powered and may not
    /// always draw power from the USB bus.
    ///
    /// Default: `false`
    ///
    /// See also: `max_power`
    pub fn self_powered(mut self, self_powered: bool) -> Self {
        self.descriptor.attributes.set_bit(6, self_powered);
        self
    }

    /// Sets whether the device supports remotely waking up the host is requested.
    ///
    /// Default: `false`
    pub fn supports_remote_wakeup(mut self, supports_remote_wakeup: bool) -> Self {
        self.descriptor.attributes.set_bit(5, supports_remote_wakeup);
        self
    }

    /// Sets the maximum current drawn from the USB bus by the device in milliamps.
    ///
    /// The default is 100 mA. Values above 500 mA make `build` fail.
    ///
    /// See also: `self_powered`
    pub fn max_power(mut self, max_power_ma: usize) -> Self {
        self.max_power_ma = max_power_ma;
        self
    }

    pub fn build(mut self) -> Result<UsbConfigurationDescriptor, Error> {
        if self.max_power_ma > 500 {
            return Err(DescriptorError::InvalidMaxPower(self.max_power_ma).into());
        }
        self.descriptor.max_power = (self.max_power_ma / 2) as u8;
        Ok(self.descriptor)
    }
}

#[derive(Clone)]
pub struct InterfaceBuilder {
    descriptor: UsbInterfaceDescriptor,
}

impl InterfaceBuilder {
    pub fn new(interface_number: u8) -> Self {
        Self {
            descriptor: UsbInterfaceDescriptor {
                interface_number,
                alternate_setting: 0,
                interface_class: 0,
                interface_sub_class: 0,
                interface_protocol: 0,
                interface_string: 0,
            },
        }
    }

    generate_field_setters! {
        alternate_setting: u8,
        interface_class: u8,
        interface_sub_class: u8,
        interface_protocol: u8,
        interface_string: u8,
    }

    pub fn build(self) -> UsbInterfaceDescriptor {
        self.descriptor
    }
}

pub struct EndpointBuilder {
    pub number: Option<u8>,
    pub direction: Option<UsbDirection>,
    pub ep_type: Option<EndpointType>,
    pub max_packet_size: Option<u16>,
    pub interval: u8,
    pub synchronization: Synchronization,
    pub usage: IsoUsage,
}

impl EndpointBuilder {
    pub fn new() -> Self {
        Self {
            number: None,
            direction: None,
            ep_type: None,
            max_packet_size: None,
            interval: 0,
            synchronization: Synchronization::None,
            usage: IsoUsage::Data,
        }
    }

    pub fn number(mut self, number: u8) -> Self {
        self.number = Some(number);
        self
    }

    pub fn direction(mut self, direction: UsbDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Sets number and direction from a raw `bEndpointAddress` such as `0x82`.
    pub fn address(self, address: u8) -> Self {
        let address = EndpointAddress::from(address);
        self.number(address.index() as u8)
            .direction(address.direction())
    }

    pub fn ep_type(mut self, ep_type: EndpointType) -> Self {
        self.ep_type = Some(ep_type);
        self
    }

    pub fn max_packet_size(mut self, max_packet_size: u16) -> Self {
        self.max_packet_size = Some(max_packet_size);
        self
    }

    pub fn interval(mut self, interval: u8) -> Self {
        self.interval = interval;
        self
    }

    /// Only encoded for isochronous endpoints.
    pub fn synchronization(mut self, synchronization: Synchronization) -> Self {
        self.synchronization = synchronization;
        self
    }

    /// Only encoded for isochronous endpoints.
    pub fn usage(mut self, usage: IsoUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn build(self) -> Result<UsbEndpointDescriptor, Error> {
        let number = self.number.ok_or(DescriptorError::MissingField("endpoint number"))?;
        let direction = self
            .direction
            .ok_or(DescriptorError::MissingField("endpoint direction"))?;
        let ep_type = self.ep_type.ok_or(DescriptorError::MissingField("endpoint type"))?;
        let max_packet_size = self
            .max_packet_size
            .ok_or(DescriptorError::MissingField("max packet size"))?;
        if usize::from(number) >= USB_MAX_ENDPOINTS {
            return Err(DescriptorError::InvalidEndpointNumber(number).into());
        }

        Ok(UsbEndpointDescriptor {
            address: EndpointAddress::from_parts(usize::from(number), direction),
            ep_type,
            synchronization: self.synchronization,
            usage: self.usage,
            max_packet_size,
            interval: self.interval,
        })
    }
}

impl Default for EndpointBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_defaults() {
        let conf = ConfigurationBuilder::new(1).build().unwrap();
        assert_eq!(conf.attributes, 0x80);
        assert_eq!(conf.max_power, 50);
        assert_eq!(conf.configuration_string, 0);
    }

    #[test]
    fn configuration_attributes_and_power() {
        let conf = ConfigurationBuilder::new(2)
            .self_powered(true)
            .supports_remote_wakeup(true)
            .max_power(500)
            .build()
            .unwrap();
        assert_eq!(conf.attributes, 0xe0);
        assert_eq!(conf.max_power, 250);

        let err = ConfigurationBuilder::new(1).max_power(501).build().unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::InvalidMaxPower(501))
        );
    }

    #[test]
    fn device_rejects_bad_ep0_size() {
        assert!(DeviceBuilder::new(UsbVidPid(0x1209, 0x0001))
            .max_packet_size_0(64)
            .build()
            .is_ok());
        let err = DeviceBuilder::new(UsbVidPid(0x1209, 0x0001))
            .max_packet_size_0(12)
            .build()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::InvalidMaxPacketSize0(12))
        );
    }

    #[test]
    fn endpoint_from_raw_address() {
        let ep = EndpointBuilder::new()
            .address(0x82)
            .ep_type(EndpointType::Bulk)
            .max_packet_size(64)
            .build()
            .unwrap();
        assert_eq!(u8::from(ep.address), 0x82);
        assert_eq!(ep.address.direction(), UsbDirection::In);
    }

    #[test]
    fn endpoint_missing_fields() {
        let err = EndpointBuilder::new()
            .number(1)
            .direction(UsbDirection::Out)
            .max_packet_size(8)
            .build()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::MissingField("endpoint type"))
        );
    }
}
