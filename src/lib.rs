#![cfg_attr(not(test), no_std)]

mod address;
mod bridge;
mod buffer;
mod config;
mod hw;
mod interrupts;
mod master;
mod state_holder;
mod transfer;

#[cfg(test)]
mod mock;

pub use address::{
    encode, AddressSize, EncodedAddress, InternalAddressSize, TwiAddress, TwiInternalAddress,
};
pub use bridge::{CompletionChannel, CompletionHandler};
pub use config::{Config, Instance};
pub use hw::{DmaSetupError, Priority, Status, TwiDma, TwiRegisters};
pub use interrupts::{
    classify, handle_dma_interrupt, handle_twi_interrupt, InterruptCause, Interrupts,
};
pub use master::TwiMaster;

#[cfg(feature = "dump")]
pub use master::StateDump;

/// Position of the single in-flight transaction in the transfer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::NoUninit)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferState {
    Idle,

    TXReadyToSendFirstByte,
    TXSendingFirstByte,
    TXDMAStarted,
    TXWaitingForTXReady1,
    TXWaitingForTXReady2,
    TXError,
    TXDone,

    /// Never entered.
    RXReadyToReadFirstByte,
    RXReadingFirstByte,
    RXDMAStarted,
    RXWaitingForRXReady,
    RXWaitingForLastChar,
    RXError,
    RXDone,
}

impl TransferState {
    pub fn is_idle(self) -> bool {
        matches!(self, TransferState::Idle)
    }

    pub fn is_rx(self) -> bool {
        matches!(
            self,
            TransferState::RXReadyToReadFirstByte
                | TransferState::RXReadingFirstByte
                | TransferState::RXDMAStarted
                | TransferState::RXWaitingForRXReady
                | TransferState::RXWaitingForLastChar
                | TransferState::RXError
                | TransferState::RXDone
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferState::TXDone
                | TransferState::RXDone
                | TransferState::TXError
                | TransferState::RXError
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Read,
    Write,
}

/// Rejected address programming. Nothing reaches the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A 10-bit device address spends one internal-address byte on its low
    /// bits, leaving room for at most two more.
    InternalAddressTooLong,
}

/// Rejected `start_transfer` call. Driver state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    Busy,
    InvalidArgument,
}

/// Failure of a transaction, only ever observed through the terminal
/// [`InterruptCause`] handed to the completion handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    Nack,
    TxError,
    RxError,
    DmaSetupFailed,
}
