use crate::ConfigError;

/// Reserved first-byte pattern announcing a 10-bit address (`0b11110xx` once
/// shifted onto the wire).
const TEN_BIT_CODE: u8 = 0b0111_1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressSize {
    SevenBit,
    TenBit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InternalAddressSize {
    None = 0,
    OneByte = 1,
    TwoBytes = 2,
    ThreeBytes = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwiAddress {
    pub address: u16,
    pub size: AddressSize,
}

impl TwiAddress {
    #[inline]
    pub const fn seven_bit(address: u8) -> Self {
        Self {
            address: address as u16,
            size: AddressSize::SevenBit,
        }
    }

    #[inline]
    pub const fn ten_bit(address: u16) -> Self {
        Self {
            address,
            size: AddressSize::TenBit,
        }
    }
}

/// Register/offset address sent after the device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwiInternalAddress {
    pub address: u32,
    pub size: InternalAddressSize,
}

impl TwiInternalAddress {
    pub const NONE: Self = Self {
        address: 0,
        size: InternalAddressSize::None,
    };

    #[inline]
    pub const fn new(address: u32, size: InternalAddressSize) -> Self {
        Self { address, size }
    }
}

/// What the address registers are actually programmed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncodedAddress {
    pub device: u8,
    pub internal: u32,
    /// Bytes of `internal` put on the wire, 0..=3.
    pub internal_size: u8,
}

/// Folds a 7 or 10-bit device address and its internal address into the
/// device byte and internal-address word of the master mode registers.
///
/// For a 10-bit device the top two address bits ride in the device byte next
/// to the reserved `0b11110` code and the low eight bits become the first
/// internal-address byte, so the caller's internal address may use at most
/// two bytes.
pub fn encode(
    address: TwiAddress,
    internal: TwiInternalAddress,
) -> Result<EncodedAddress, ConfigError> {
    match address.size {
        AddressSize::TenBit => {
            if internal.size > InternalAddressSize::TwoBytes {
                return Err(ConfigError::InternalAddressTooLong);
            }

            Ok(EncodedAddress {
                device: TEN_BIT_CODE | ((address.address >> 8) & 0b11) as u8,
                internal: (address.address & 0xFF) as u32 | ((internal.address & 0xFFFF) << 8),
                internal_size: internal.size as u8 + 1,
            })
        }
        AddressSize::SevenBit => Ok(EncodedAddress {
            device: (address.address & 0x7F) as u8,
            internal: internal.address & 0x00FF_FFFF,
            internal_size: internal.size as u8,
        }),
    }
}
