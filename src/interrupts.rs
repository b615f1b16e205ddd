use crate::{HardwareError, Status, TwiDma, TwiMaster, TwiRegisters};

bitflags::bitflags! {
    /// Why the state machine was entered.
    ///
    /// Flags are cleared as the state machine consumes them; whatever is left
    /// when a transaction ends is what the completion handler sees.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptCause: u16 {
        const TX_READY = 1 << 0;
        const TX_DONE = 1 << 1;
        const TX_ERROR = 1 << 2;
        const TX_TRANSFER_DONE = 1 << 3;
        const RX_READY = 1 << 4;
        const RX_ERROR = 1 << 5;
        const RX_TRANSFER_DONE = 1 << 6;
        const NACK = 1 << 7;
        /// Set next to TX_ERROR/RX_ERROR when the DMA channel refused a transfer.
        const DMA_SETUP_FAILED = 1 << 8;
    }
}

bitflags::bitflags! {
    /// Interrupt sources, as passed by the DMA vector as a hint and to
    /// [`TwiMaster::set_interrupts`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Interrupts: u16 {
        const ON_TX_READY = 1 << 0;
        const ON_TX_DONE = 1 << 1;
        const ON_TX_TRANSFER_DONE = 1 << 2;
        const ON_RX_READY = 1 << 3;
        const ON_RX_TRANSFER_DONE = 1 << 4;
        const ON_TX_ERROR = 1 << 5;
        const ON_RX_ERROR = 1 << 6;
        const ON_NACK = 1 << 7;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InterruptCause {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "InterruptCause({=u16:#b})", self.bits());
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Interrupts {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Interrupts({=u16:#b})", self.bits());
    }
}

impl InterruptCause {
    /// Causes reported by the DMA vector. Peripheral flags never come from here.
    pub fn from_hint(hint: Interrupts) -> Self {
        let mut cause = Self::empty();
        cause.set(
            Self::TX_TRANSFER_DONE,
            hint.contains(Interrupts::ON_TX_TRANSFER_DONE),
        );
        cause.set(
            Self::RX_TRANSFER_DONE,
            hint.contains(Interrupts::ON_RX_TRANSFER_DONE),
        );
        cause.set(Self::TX_ERROR, hint.contains(Interrupts::ON_TX_ERROR));
        cause.set(Self::RX_ERROR, hint.contains(Interrupts::ON_RX_ERROR));
        cause
    }

    /// Causes from one status snapshot.
    ///
    /// The peripheral raises status bits whose interrupt is disabled, and
    /// sometimes before their precondition holds, so only enabled sources count.
    pub fn from_status(status: Status, enabled: Status) -> Self {
        let live = status & enabled;

        let mut cause = Self::empty();
        cause.set(Self::TX_READY, live.contains(Status::TX_READY));
        cause.set(Self::TX_DONE, live.contains(Status::TX_COMPLETE));
        cause.set(Self::RX_READY, live.contains(Status::RX_READY));
        cause.set(Self::NACK, live.contains(Status::NACK));
        cause
    }

    /// Clears `flag`, returning whether it was set.
    pub fn take(&mut self, flag: Self) -> bool {
        let present = self.intersects(flag);
        self.remove(flag);
        present
    }

    /// Outcome of a finished transaction.
    pub fn result(&self) -> Result<(), HardwareError> {
        if self.contains(Self::DMA_SETUP_FAILED) {
            Err(HardwareError::DmaSetupFailed)
        } else if self.contains(Self::NACK) {
            Err(HardwareError::Nack)
        } else if self.contains(Self::RX_ERROR) {
            Err(HardwareError::RxError)
        } else if self.contains(Self::TX_ERROR) {
            Err(HardwareError::TxError)
        } else {
            Ok(())
        }
    }
}

/// Turns an interrupt into a cause.
///
/// With a hint the call came from the DMA vector and the TWI registers are not
/// read at all. Without one the status register is read exactly once.
pub fn classify<R: TwiRegisters>(regs: &R, hint: Option<Interrupts>) -> InterruptCause {
    match hint {
        Some(hint) => InterruptCause::from_hint(hint),
        None => InterruptCause::from_status(regs.status(), regs.interrupt_mask()),
    }
}

/// Body of the TWI interrupt vector.
pub fn handle_twi_interrupt<R: TwiRegisters, D: TwiDma>(master: &TwiMaster<'_, R, D>) {
    master.handle_interrupts(None);
}

/// Body of the DMA interrupt vector for the channels serving this TWI unit.
pub fn handle_dma_interrupt<R: TwiRegisters, D: TwiDma>(
    master: &TwiMaster<'_, R, D>,
    hint: Interrupts,
) {
    master.handle_interrupts(Some(hint));
}
