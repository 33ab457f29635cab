use crate::buffer::DescriptorBuffer;
use crate::error::DescriptorError;
use crate::usb::{offset, Category, Descriptor};
use failure::Error;
use log::{debug, trace};

/// Serializes one composite descriptor: its fixed header followed by every child, in order.
///
/// The buffer is sized up front from the header and the children's lengths. `finish`
/// appends the children, applying each child's counting rule to the header first.
pub struct DescriptorWriter<'a> {
    kind: Category,
    buf: DescriptorBuffer,
    header_len: usize,
    position: usize,
    children: &'a [&'a dyn Descriptor],
    first_interface_seen: bool,
}

impl<'a> DescriptorWriter<'a> {
    /// Writes `[bLength, bDescriptorType, fields...]` into a buffer large enough for the
    /// header plus all `children`. `kind` selects the counting rules of the node being built.
    pub fn new(
        kind: Category,
        descriptor_type: u8,
        fields: &[u8],
        children: &'a [&'a dyn Descriptor],
    ) -> Result<Self, Error> {
        let header_len = fields.len() + 2;
        if header_len > usize::from(u8::MAX) {
            return Err(DescriptorError::TooLong {
                kind: "descriptor header",
                len: header_len,
            }
            .into());
        }

        let total = header_len + children.iter().map(|child| child.len()).sum::<usize>();
        let mut buf = DescriptorBuffer::zeroed(total);
        buf[offset::LENGTH] = header_len as u8;
        buf[offset::DESCRIPTOR_TYPE] = descriptor_type;
        let position = buf.copy_from(2, fields);

        Ok(Self {
            kind,
            buf,
            header_len,
            position,
            children,
            first_interface_seen: false,
        })
    }

    /// Length of the header plus every child.
    pub fn total_length(&self) -> usize {
        self.buf.len()
    }

    /// [`total_length`](Self::total_length) as a 16-bit `wTotalLength` field.
    pub fn total_length_u16(&self, kind: &'static str) -> Result<u16, Error> {
        if self.buf.len() > usize::from(u16::MAX) {
            return Err(DescriptorError::TooLong {
                kind,
                len: self.buf.len(),
            }
            .into());
        }
        Ok(self.buf.len() as u16)
    }

    /// The header bytes, for fields that depend on the children (such as total lengths).
    pub fn header_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len;
        &mut self.buf.as_mut_slice()[..header_len]
    }

    pub fn finish(mut self) -> Result<DescriptorBuffer, Error> {
        let children = self.children;
        for child in children {
            self.append(*child)?;
        }

        if self.position != self.buf.len() {
            return Err(DescriptorError::StructuralMismatch {
                expected: self.buf.len(),
                written: self.position,
            }
            .into());
        }

        debug!(
            "composed {:?} descriptor: {} bytes, {} children",
            self.kind,
            self.buf.len(),
            children.len()
        );
        Ok(self.buf)
    }

    fn append(&mut self, child: &dyn Descriptor) -> Result<(), Error> {
        let bytes = child.bytes();
        if bytes.len() != child.len() {
            return Err(DescriptorError::StructuralMismatch {
                expected: child.len(),
                written: bytes.len(),
            }
            .into());
        }

        self.dispatch(child)?;

        trace!(
            "{:?} <- {:?} ({} bytes at offset {})",
            self.kind,
            child.category(),
            bytes.len(),
            self.position
        );
        self.position = self.buf.copy_from(self.position, bytes);
        Ok(())
    }

    fn dispatch(&mut self, child: &dyn Descriptor) -> Result<(), Error> {
        let bytes = child.bytes();
        let field = |at: usize| {
            bytes.get(at).copied().ok_or(DescriptorError::StructuralMismatch {
                expected: at + 1,
                written: bytes.len(),
            })
        };
        match (self.kind, child.category()) {
            (_, Category::Configuration) => Err(DescriptorError::NestedConfiguration.into()),

            (Category::Interface, Category::Endpoint) => self.interface_counters().add_endpoint(),
            (Category::Interface, Category::Custom) => {
                child.on_add_to_interface(&mut self.interface_counters())
            }

            (Category::InterfaceAssociation, Category::Interface) => {
                let interface_number = field(offset::INTERFACE_NUMBER)?;
                let alternate_setting = field(offset::INTERFACE_ALTERNATE_SETTING)?;
                self.association_counters()
                    .add_interface(interface_number, alternate_setting)
            }
            (Category::InterfaceAssociation, Category::Custom) => {
                child.on_add_to_association(&mut self.association_counters())
            }

            (Category::Configuration, Category::Interface) => {
                let alternate_setting = field(offset::INTERFACE_ALTERNATE_SETTING)?;
                self.configuration_counters().add_interface(alternate_setting)
            }
            (Category::Configuration, Category::InterfaceAssociation) => {
                let interface_count = field(offset::ASSOCIATION_INTERFACE_COUNT)?;
                self.configuration_counters().add_interfaces(interface_count)
            }
            (Category::Configuration, Category::Custom) => {
                child.on_add_to_configuration(&mut self.configuration_counters())
            }

            _ => Ok(()),
        }
    }

    fn interface_counters(&mut self) -> InterfaceCounters<'_> {
        InterfaceCounters { buf: &mut self.buf }
    }

    fn association_counters(&mut self) -> AssociationCounters<'_> {
        AssociationCounters {
            buf: &mut self.buf,
            first_interface_seen: &mut self.first_interface_seen,
        }
    }

    fn configuration_counters(&mut self) -> ConfigurationCounters<'_> {
        ConfigurationCounters { buf: &mut self.buf }
    }
}

/// Serializes a class-specific descriptor that has no children.
pub fn leaf(descriptor_type: u8, fields: &[u8]) -> Result<DescriptorBuffer, Error> {
    DescriptorWriter::new(Category::Opaque, descriptor_type, fields, &[])?.finish()
}

fn increment(
    buf: &mut DescriptorBuffer,
    at: usize,
    by: u8,
    name: &'static str,
) -> Result<(), Error> {
    buf[at] = buf[at]
        .checked_add(by)
        .ok_or(DescriptorError::CounterOverflow(name))?;
    Ok(())
}

/// Counters of an interface descriptor under construction.
pub struct InterfaceCounters<'a> {
    buf: &'a mut DescriptorBuffer,
}

impl InterfaceCounters<'_> {
    pub fn add_endpoint(&mut self) -> Result<(), Error> {
        increment(self.buf, offset::INTERFACE_NUM_ENDPOINTS, 1, "bNumEndpoints")
    }
}

/// Counters of an interface association descriptor under construction.
pub struct AssociationCounters<'a> {
    buf: &'a mut DescriptorBuffer,
    first_interface_seen: &'a mut bool,
}

impl AssociationCounters<'_> {
    /// The first interface reported fixes `bFirstInterface`; only alternate setting 0
    /// adds to `bInterfaceCount`.
    pub fn add_interface(
        &mut self,
        interface_number: u8,
        alternate_setting: u8,
    ) -> Result<(), Error> {
        if !*self.first_interface_seen {
            self.buf[offset::ASSOCIATION_FIRST_INTERFACE] = interface_number;
            *self.first_interface_seen = true;
        }
        if alternate_setting == 0 {
            increment(self.buf, offset::ASSOCIATION_INTERFACE_COUNT, 1, "bInterfaceCount")?;
        }
        Ok(())
    }
}

/// Counters of a configuration descriptor under construction.
pub struct ConfigurationCounters<'a> {
    buf: &'a mut DescriptorBuffer,
}

impl ConfigurationCounters<'_> {
    /// Only alternate setting 0 adds to `bNumInterfaces`.
    pub fn add_interface(&mut self, alternate_setting: u8) -> Result<(), Error> {
        if alternate_setting == 0 {
            self.add_interfaces(1)?;
        }
        Ok(())
    }

    pub fn add_interfaces(&mut self, count: u8) -> Result<(), Error> {
        increment(self.buf, offset::CONFIGURATION_NUM_INTERFACES, count, "bNumInterfaces")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Raw(Category, Vec<u8>);

    impl Descriptor for Raw {
        fn category(&self) -> Category {
            self.0
        }

        fn bytes(&self) -> &[u8] {
            &self.1
        }
    }

    /// Claims a length that its bytes do not have.
    struct Lying;

    impl Descriptor for Lying {
        fn category(&self) -> Category {
            Category::Opaque
        }

        fn bytes(&self) -> &[u8] {
            &[3, 0x24, 0]
        }

        fn len(&self) -> usize {
            4
        }
    }

    #[test]
    fn header_then_children() {
        let a = Raw(Category::Opaque, vec![3, 0x24, 1]);
        let b = Raw(Category::Opaque, vec![2, 0x24]);
        let children: [&dyn Descriptor; 2] = [&a, &b];
        let w = DescriptorWriter::new(Category::Opaque, 0x24, &[7], &children).unwrap();
        assert_eq!(w.total_length(), 8);
        let buf = w.finish().unwrap();
        assert_eq!(buf.as_slice(), &[3, 0x24, 7, 3, 0x24, 1, 2, 0x24]);
    }

    #[test]
    fn endpoints_count_only_under_interfaces() {
        let ep = Raw(Category::Endpoint, vec![7, 5, 0x81, 2, 64, 0, 0]);
        let children: [&dyn Descriptor; 2] = [&ep, &ep];

        let fields = [0, 0, 0, 0xff, 0, 0, 0];
        let interface = DescriptorWriter::new(Category::Interface, 4, &fields, &children)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(interface[offset::INTERFACE_NUM_ENDPOINTS], 2);

        let opaque = DescriptorWriter::new(Category::Opaque, 0x24, &fields, &children)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(opaque[offset::INTERFACE_NUM_ENDPOINTS], 0);
    }

    /// Stands for two endpoints packed into one child.
    struct EndpointPair(Vec<u8>);

    impl Descriptor for EndpointPair {
        fn category(&self) -> Category {
            Category::Custom
        }

        fn bytes(&self) -> &[u8] {
            &self.0
        }

        fn on_add_to_interface(&self, interface: &mut InterfaceCounters) -> Result<(), Error> {
            interface.add_endpoint()?;
            interface.add_endpoint()
        }
    }

    #[test]
    fn custom_child_counts_under_interface() {
        let pair = EndpointPair(vec![7, 5, 0x01, 2, 64, 0, 0, 7, 5, 0x81, 2, 64, 0, 0]);
        let children: [&dyn Descriptor; 1] = [&pair];
        let fields = [0, 0, 0, 0xff, 0, 0, 0];
        let interface = DescriptorWriter::new(Category::Interface, 4, &fields, &children)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(interface[offset::INTERFACE_NUM_ENDPOINTS], 2);
        assert_eq!(interface.len(), 9 + 14);
    }

    #[test]
    fn short_interface_child_is_structural() {
        let short = Raw(Category::Interface, vec![2, 4]);
        let children: [&dyn Descriptor; 1] = [&short];
        let err = DescriptorWriter::new(Category::Configuration, 2, &[0; 7], &children)
            .unwrap()
            .finish()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::StructuralMismatch {
                expected: 4,
                written: 2
            })
        );

        let short = Raw(Category::InterfaceAssociation, vec![3, 11, 0]);
        let children: [&dyn Descriptor; 1] = [&short];
        let err = DescriptorWriter::new(Category::Configuration, 2, &[0; 7], &children)
            .unwrap()
            .finish()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::StructuralMismatch {
                expected: 4,
                written: 3
            })
        );
    }

    #[test]
    fn nested_configuration_is_rejected() {
        let config = Raw(Category::Configuration, vec![9, 2, 9, 0, 0, 1, 0, 0x80, 50]);
        let children: [&dyn Descriptor; 1] = [&config];
        let err = DescriptorWriter::new(Category::Configuration, 2, &[0; 7], &children)
            .unwrap()
            .finish()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::NestedConfiguration)
        );
    }

    #[test]
    fn length_disagreement_is_structural() {
        let children: [&dyn Descriptor; 1] = [&Lying];
        let err = DescriptorWriter::new(Category::Opaque, 0x24, &[0], &children)
            .unwrap()
            .finish()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::StructuralMismatch {
                expected: 4,
                written: 3
            })
        );
    }

    #[test]
    fn counter_overflow_fails() {
        let assoc = Raw(Category::InterfaceAssociation, vec![8, 11, 0, 200, 0, 0, 0, 0]);
        let children: [&dyn Descriptor; 2] = [&assoc, &assoc];
        let err = DescriptorWriter::new(Category::Configuration, 2, &[0; 7], &children)
            .unwrap()
            .finish()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DescriptorError>(),
            Some(&DescriptorError::CounterOverflow("bNumInterfaces"))
        );
    }

    #[test]
    fn oversized_header_is_rejected() {
        let fields = [0u8; 254];
        assert!(DescriptorWriter::new(Category::Opaque, 0x24, &fields, &[]).is_err());
    }
}
