//! Composes USB descriptor tables (configuration, interface association, interface, endpoint
//! and class-specific descriptors) into the exact byte layout a device reports to the host.
//!
//! Trees are built bottom-up: every node is constructed from its fields and its already
//! finished children, and the root [`Configuration`](descriptor::Configuration) holds the
//! complete table.

use bit_field::BitField;

pub use usb_device::UsbDirection;
pub use usb_device::endpoint::{EndpointType, EndpointAddress};

/// Implements [`Descriptor`] for nodes that keep their bytes in a `buf` field and use the
/// built-in counting rules of their category.
macro_rules! impl_descriptor {
    ( $( $node:ident => $category:expr, )* ) => {
        $(
            impl $crate::usb::Descriptor for $node {
                fn category(&self) -> $crate::usb::Category {
                    $category
                }

                fn bytes(&self) -> &[u8] {
                    self.buf.as_slice()
                }
            }
        )*
    }
}

pub mod buffer;
pub mod builder;
pub mod cdc;
pub mod codec;
pub mod compare;
pub mod descriptor;
pub mod error;
pub mod hid;
pub mod midi;
pub mod string;
pub mod uac2;
pub mod usb;
pub mod writer;

pub use error::DescriptorError;
pub use usb::{Category, Descriptor};

pub trait EndpointInfo {
    fn descriptor(&self) -> &usb::UsbEndpointDescriptor;

    fn address(&self) -> EndpointAddress {
        self.descriptor().address
    }

    fn ep_type(&self) -> EndpointType {
        match self.descriptor().attributes().get_bits(0..2) {
            0b00 => EndpointType::Control,
            0b01 => EndpointType::Isochronous,
            0b10 => EndpointType::Bulk,
            0b11 => EndpointType::Interrupt,
            _ => unreachable!(),
        }
    }

    fn direction(&self) -> UsbDirection {
        self.address().direction()
    }
}
