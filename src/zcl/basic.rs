//! Basic cluster attribute storage.
//!
//! ZCL character strings are length prefixed: the first byte holds the
//! number of characters that follow.

use crate::error::Error;

/// ZCL version reported by the device.
pub const ZCL_VERSION: u8 = 0x08;
/// Default application version.
pub const APPLICATION_VERSION_DEFAULT: u8 = 0x00;
/// Default stack version.
pub const STACK_VERSION_DEFAULT: u8 = 0x00;
/// Default hardware version.
pub const HW_VERSION_DEFAULT: u8 = 0x00;
/// Power source: DC source.
pub const POWER_SOURCE_DC_SOURCE: u8 = 0x04;
/// Physical environment: unspecified.
pub const ENV_UNSPECIFIED: u8 = 0x00;

/// Storage for a ZCL string of up to 32 characters, length byte included.
pub type ZclString = [u8; 33];
/// Storage for a ZCL string of up to 16 characters, length byte included.
pub type ZclShortString = [u8; 17];

/// Write `value` into `dest` as a length-prefixed string.
///
/// Fails with [`Error::BufferOverflow`] and leaves `dest` untouched when the
/// string and its length byte do not fit.
///
/// ```rust
/// use zb_modbus::zcl::basic::set_pascal_string;
///
/// let mut buf = [0u8; 8];
/// set_pascal_string("test", &mut buf).unwrap();
/// assert_eq!(&buf[..5], &[4, b't', b'e', b's', b't']);
/// ```
pub fn set_pascal_string(value: &str, dest: &mut [u8]) -> Result<(), Error> {
    let bytes = value.as_bytes();
    let len = u8::try_from(bytes.len()).map_err(|_| Error::BufferOverflow)?;
    if bytes.len() + 1 > dest.len() {
        return Err(Error::BufferOverflow);
    }
    dest[0] = len;
    dest[1..=bytes.len()].copy_from_slice(bytes);
    Ok(())
}

/// Read a length-prefixed string back out of attribute storage.
pub fn pascal_str(src: &[u8]) -> Option<&str> {
    let (&len, rest) = src.split_first()?;
    let body = rest.get(..usize::from(len))?;
    core::str::from_utf8(body).ok()
}

/// Basic cluster attributes, extended set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAttributes {
    pub zcl_version: u8,
    pub app_version: u8,
    pub stack_version: u8,
    pub hw_version: u8,
    pub mf_name: ZclString,
    pub model_id: ZclString,
    pub date_code: ZclShortString,
    pub power_source: u8,
    pub location_id: ZclShortString,
    pub ph_env: u8,
    pub sw_ver: ZclShortString,
}

impl BasicAttributes {
    /// Attribute values the bridge firmware ships with.
    pub fn new() -> Result<Self, Error> {
        let mut attrs = Self {
            zcl_version: ZCL_VERSION,
            app_version: APPLICATION_VERSION_DEFAULT,
            stack_version: STACK_VERSION_DEFAULT,
            hw_version: HW_VERSION_DEFAULT,
            mf_name: [0; 33],
            model_id: [0; 33],
            date_code: [0; 17],
            power_source: POWER_SOURCE_DC_SOURCE,
            location_id: [0; 17],
            ph_env: ENV_UNSPECIFIED,
            sw_ver: [0; 17],
        };
        set_pascal_string("TEST NV", &mut attrs.mf_name)?;
        set_pascal_string("test", &mut attrs.model_id)?;
        set_pascal_string("17022023", &mut attrs.date_code)?;
        set_pascal_string("test123", &mut attrs.sw_ver)?;
        set_pascal_string("Not set", &mut attrs.location_id)?;
        Ok(attrs)
    }
}
