//! Capabilities the driver needs from the board support code.
//!
//! Everything here is implemented outside this crate on top of the device's
//! register block and DMA controller. All methods take `&self`: the driver
//! calls them from two interrupt vectors and from the foreground.

use crate::Direction;

bitflags::bitflags! {
    /// Bits of the TWI status register the driver cares about. Also used as
    /// the interrupt enable/disable/mask word, bit for bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u32 {
        const TX_READY = 1 << 0;
        const TX_COMPLETE = 1 << 1;
        const RX_READY = 1 << 2;
        const NACK = 1 << 3;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Status({=u32:#b})", self.bits());
    }
}

/// NVIC priority of the TWI interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

impl Priority {
    pub const fn level(self) -> u8 {
        match self {
            Priority::Highest => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::Lowest => 4,
        }
    }
}

pub trait TwiRegisters {
    /// One read of the status register. Reading may clear latched bits (NACK).
    fn status(&self) -> Status;

    /// Currently enabled interrupt sources.
    fn interrupt_mask(&self) -> Status;

    fn enable_interrupts(&self, sources: Status);

    fn disable_interrupts(&self, sources: Status);

    fn set_start(&self);
    fn set_stop(&self);
    fn set_start_stop(&self);

    fn transmit(&self, byte: u8);
    fn read_byte(&self) -> u8;

    fn set_direction(&self, direction: Direction);

    // device: 7 bits, internal_size: 0..=3
    fn set_address(&self, device: u8, internal: u32, internal_size: u8);

    fn reset_module(&self);
    fn enable(&self);
    fn disable(&self);

    fn set_speed(&self, frequency: u32);

    fn set_irq_priority(&self, priority: Priority);
    fn enable_irq(&self);

    #[inline]
    fn is_tx_ready(&self) -> bool {
        self.status().contains(Status::TX_READY)
    }

    #[inline]
    fn is_rx_ready(&self) -> bool {
        self.status().contains(Status::RX_READY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaSetupError;

/// The DMA channel pair serving one TWI unit.
pub trait TwiDma {
    /// Queue a peripheral-to-memory transfer of `len` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `len` byte writes until the transfer is done
    /// or the channel is disabled.
    unsafe fn start_rx_transfer(
        &self,
        ptr: *mut u8,
        len: u16,
        handle_interrupts: bool,
        include_next: bool,
    ) -> Result<(), DmaSetupError>;

    /// Queue a memory-to-peripheral transfer of `len` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `len` byte reads until the transfer is done
    /// or the channel is disabled.
    unsafe fn start_tx_transfer(
        &self,
        ptr: *const u8,
        len: u16,
        handle_interrupts: bool,
        include_next: bool,
    ) -> Result<(), DmaSetupError>;

    fn done_reading(&self) -> bool;
    fn done_writing(&self) -> bool;

    fn start_rx_done_interrupts(&self);
    fn stop_rx_done_interrupts(&self);
    fn start_tx_done_interrupts(&self);
    fn stop_tx_done_interrupts(&self);

    fn disable(&self);
    fn reset(&self);
}
