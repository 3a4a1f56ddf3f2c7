//! Attribute tables hosted by the device.

use super::DeviceConfig;
use crate::error::Error;
use crate::modbus::{self, ATTR_BAUDRATE_ID, Baudrate, CLUSTER_REVISION_DEFAULT};
use crate::zcl::basic::BasicAttributes;
use crate::zcl::{ATTR_GLOBAL_CLUSTER_REVISION_ID, AttrValue, AttributeStore, ClusterRole};

/// Identify cluster identifier.
pub const IDENTIFY_CLUSTER_ID: u16 = 0x0003;
/// Identify time attribute identifier.
pub const ATTR_IDENTIFY_TIME_ID: u16 = 0x0000;
/// Identify time when not identifying.
pub const IDENTIFY_TIME_DEFAULT: u16 = 0x0000;

/// Device application context: every attribute the endpoints expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub basic: BasicAttributes,
    pub identify_time: u16,
    pub baudrate: Baudrate,
    test_endpoint: u8,
    modbus_endpoint: u8,
}

impl DeviceAttributes {
    pub fn new(config: &DeviceConfig) -> Result<Self, Error> {
        Ok(Self {
            basic: BasicAttributes::new()?,
            identify_time: IDENTIFY_TIME_DEFAULT,
            baudrate: config.baudrate,
            test_endpoint: config.test_endpoint,
            modbus_endpoint: config.modbus_endpoint,
        })
    }

    /// Validate and store a Modbus cluster attribute write.
    pub fn write_modbus_attribute(&mut self, attr_id: u16, value: &[u8]) -> Result<(), Error> {
        modbus::check_value(ClusterRole::Server, attr_id, self.modbus_endpoint, value)?;
        if attr_id == ATTR_BAUDRATE_ID {
            let raw = value.first().copied().ok_or(Error::InvalidValue)?;
            self.baudrate = Baudrate::from_raw(raw).ok_or(Error::InvalidValue)?;
        }
        Ok(())
    }
}

impl AttributeStore for DeviceAttributes {
    fn read_attribute(
        &self,
        endpoint: u8,
        cluster_id: u16,
        role: ClusterRole,
        attr_id: u16,
    ) -> Option<AttrValue> {
        if role != ClusterRole::Server {
            return None;
        }
        match (cluster_id, attr_id) {
            (modbus::CLUSTER_ID, ATTR_BAUDRATE_ID) if endpoint == self.modbus_endpoint => {
                Some(AttrValue::Enum8(self.baudrate as u8))
            }
            (modbus::CLUSTER_ID, ATTR_GLOBAL_CLUSTER_REVISION_ID) if endpoint == self.modbus_endpoint => {
                Some(AttrValue::U16(CLUSTER_REVISION_DEFAULT))
            }
            (IDENTIFY_CLUSTER_ID, ATTR_IDENTIFY_TIME_ID) if endpoint == self.test_endpoint => {
                Some(AttrValue::U16(self.identify_time))
            }
            _ => None,
        }
    }
}
