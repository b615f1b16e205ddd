use core::cell::Cell;
#[cfg(feature = "dump")]
use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use critical_section::Mutex;
#[cfg(feature = "dump")]
use heapless::Deque;

use crate::{
    address, buffer::TransferBuffer, interrupts::classify, state_holder::StateHolder,
    CompletionHandler, Config, ConfigError, Direction, InterruptCause, Interrupts, Priority,
    Status, TransferError, TransferState, TwiAddress, TwiDma, TwiInternalAddress, TwiRegisters,
};

pub const STATES_HISTORY_SIZE: usize = 8;
#[cfg(feature = "dump")]
pub const CAUSES_HISTORY_SIZE: usize = 4;

#[cfg(feature = "dump")]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateDump {
    pub state_history: [TransferState; STATES_HISTORY_SIZE],
    pub current_state: TransferState,
    pub cause_history: [InterruptCause; CAUSES_HISTORY_SIZE],
}

#[cfg(feature = "dump")]
fn deque_into_array<T: Copy, const N: usize>(d: &Deque<T, N>, arr: &mut [T; N]) {
    let n = d.len();
    let (a, b) = d.as_slices();
    let s = N - n;

    arr[s..s + a.len()].copy_from_slice(a);
    arr[s + a.len()..].copy_from_slice(b);
}

/// Master-mode driver for one TWI unit.
///
/// Shared between the foreground, the TWI interrupt vector and the DMA
/// interrupt vector, so everything goes through `&self`. At most one
/// transaction is in flight.
pub struct TwiMaster<'d, R: TwiRegisters, D: TwiDma> {
    pub(crate) regs: R,
    pub(crate) dma: D,
    config: Config,

    pub(crate) state_holder: StateHolder<STATES_HISTORY_SIZE>,
    pub(crate) buffer: TransferBuffer,

    handler: Mutex<Cell<Option<&'d dyn CompletionHandler>>>,

    internal_address_value: AtomicU32,
    internal_address_to_send: AtomicU8,

    #[cfg(feature = "dump")]
    cause_history: Mutex<RefCell<Deque<InterruptCause, CAUSES_HISTORY_SIZE>>>,
}

impl<'d, R: TwiRegisters, D: TwiDma> TwiMaster<'d, R, D> {
    /// No hardware is touched until [`init`](Self::init).
    pub const fn new(regs: R, dma: D, config: Config) -> Self {
        Self {
            regs,
            dma,
            config,
            state_holder: StateHolder::new(),
            buffer: TransferBuffer::new(),
            handler: Mutex::new(Cell::new(None)),
            internal_address_value: AtomicU32::new(0),
            internal_address_to_send: AtomicU8::new(0),
            #[cfg(feature = "dump")]
            cause_history: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Bring the unit from reset to an enabled, idle master with every
    /// interrupt source off and the IRQ line enabled at the configured priority.
    pub fn init(&self) {
        // The vendor asks for one status read after the clock comes up.
        let _ = self.regs.status();
        self.regs.reset_module();
        self.regs.disable();

        self.dma.reset();
        self.regs.set_speed(self.bus_frequency());
        self.regs.enable();

        self.set_interrupts(Interrupts::empty(), self.config.priority);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "twi{}: up at {} Hz",
            self.config.instance.number,
            self.bus_frequency()
        );
    }

    /// Configured bus clock, capped at what the unit can drive.
    fn bus_frequency(&self) -> u32 {
        let max = self.config.instance.max_frequency();
        if self.config.frequency > max {
            #[cfg(feature = "defmt")]
            defmt::warn!("twi: {} Hz out of range, using {} Hz", self.config.frequency, max);
            max
        } else {
            self.config.frequency
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> TransferState {
        self.state_holder.get_state()
    }

    pub(crate) fn set_state(&self, state: TransferState) {
        self.state_holder.set_state(state)
    }

    /// Program the target of the following transfers.
    pub fn set_address(
        &self,
        device: TwiAddress,
        internal: TwiInternalAddress,
    ) -> Result<(), ConfigError> {
        let encoded = address::encode(device, internal)?;

        self.regs
            .set_address(encoded.device, encoded.internal, encoded.internal_size);

        self.internal_address_value.store(0, Ordering::SeqCst);
        self.internal_address_to_send.store(0, Ordering::SeqCst);

        self.regs.enable();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn internal_address_pending(&self) -> (u32, u8) {
        (
            self.internal_address_value.load(Ordering::SeqCst),
            self.internal_address_to_send.load(Ordering::SeqCst),
        )
    }

    pub fn set_completion_handler(&self, handler: &'d dyn CompletionHandler) {
        critical_section::with(|cs| self.handler.borrow(cs).set(Some(handler)));
    }

    pub fn clear_completion_handler(&self) {
        critical_section::with(|cs| self.handler.borrow(cs).set(None));
    }

    pub(crate) fn completion_handler(&self) -> Option<&'d dyn CompletionHandler> {
        critical_section::with(|cs| self.handler.borrow(cs).get())
    }

    /// Enable exactly `interrupts` (TWI sources and DMA done interrupts),
    /// disable the rest, and set up the IRQ line.
    pub fn set_interrupts(&self, interrupts: Interrupts, priority: Priority) {
        let mut sources = Status::empty();
        sources.set(
            Status::TX_READY,
            interrupts.contains(Interrupts::ON_TX_READY),
        );
        sources.set(
            Status::TX_COMPLETE,
            interrupts.contains(Interrupts::ON_TX_DONE),
        );
        sources.set(Status::NACK, interrupts.contains(Interrupts::ON_NACK));
        sources.set(
            Status::RX_READY,
            interrupts.contains(Interrupts::ON_RX_READY),
        );

        self.regs.enable_interrupts(sources);
        self.regs.disable_interrupts(Status::all().difference(sources));

        if interrupts.contains(Interrupts::ON_RX_TRANSFER_DONE) {
            self.dma.start_rx_done_interrupts();
        } else {
            self.dma.stop_rx_done_interrupts();
        }
        if interrupts.contains(Interrupts::ON_TX_TRANSFER_DONE) {
            self.dma.start_tx_done_interrupts();
        } else {
            self.dma.stop_tx_done_interrupts();
        }

        self.regs.set_irq_priority(priority);
        self.regs.enable_irq();
    }

    /// Transactions that can be started right now: 0 or 1.
    pub fn message_slots_available(&self) -> u8 {
        if self.state().is_idle() && self.dma.done_writing() && self.dma.done_reading() {
            1
        } else {
            0
        }
    }

    pub fn done_writing(&self) -> bool {
        self.dma.done_writing()
    }

    pub fn done_reading(&self) -> bool {
        self.dma.done_reading()
    }

    /// Start reading or writing `len` bytes at `buffer` from/to the device
    /// programmed by [`set_address`](Self::set_address).
    ///
    /// Returns once the transaction is set up; the interrupt vectors carry it
    /// on and the completion handler is told when it is over. A one-byte read
    /// is the exception and finishes before this returns.
    ///
    /// # Safety
    ///
    /// `buffer` must stay valid for `len` bytes (writable for reads) and must
    /// not be otherwise accessed until the completion handler has been called.
    pub unsafe fn start_transfer(
        &self,
        buffer: *mut u8,
        len: u16,
        direction: Direction,
    ) -> Result<(), TransferError> {
        if !self.state().is_idle() {
            return Err(TransferError::Busy);
        }
        if buffer.is_null() || len == 0 {
            return Err(TransferError::InvalidArgument);
        }

        // A stale done hint must not reach the new transaction.
        self.dma.stop_rx_done_interrupts();
        self.dma.stop_tx_done_interrupts();

        self.buffer.set(buffer, len);

        match direction {
            Direction::Read => {
                // With an internal address the hardware writes it first.
                self.regs.set_direction(Direction::Read);

                match len {
                    1 => {
                        self.regs.set_start_stop();
                        self.set_state(TransferState::RXWaitingForLastChar);
                    }
                    2 => {
                        self.regs.set_start();
                        self.set_state(TransferState::RXWaitingForRXReady);
                        self.regs.enable_interrupts(Status::RX_READY);
                    }
                    _ => {
                        self.regs.set_start();
                        self.set_state(TransferState::RXReadingFirstByte);
                        self.regs.enable_interrupts(Status::RX_READY);
                    }
                }
                self.regs.enable_interrupts(Status::NACK);

                // A byte may already be waiting.
                let mut cause = InterruptCause::empty();
                self.advance(&mut cause);
            }
            Direction::Write => {
                self.set_state(TransferState::TXReadyToSendFirstByte);
                self.regs
                    .enable_interrupts(Status::TX_READY | Status::NACK);
            }
        }

        Ok(())
    }

    /// Classify the current interrupt and run the state machine on it.
    /// `hint` is `Some` only when called from the DMA vector.
    pub fn handle_interrupts(&self, hint: Option<Interrupts>) {
        let mut cause = classify(&self.regs, hint);
        self.advance(&mut cause);
    }

    /// Every TWI interrupt source and both DMA done interrupts off.
    pub(crate) fn disable_all_sources(&self) {
        self.regs.disable_interrupts(Status::all());
        self.dma.stop_rx_done_interrupts();
        self.dma.stop_tx_done_interrupts();
    }

    pub(crate) fn record_cause(&self, _cause: InterruptCause) {
        #[cfg(feature = "dump")]
        critical_section::with(|cs| {
            let mut h = self.cause_history.borrow_ref_mut(cs);
            if h.is_full() {
                h.pop_front();
            }
            let _ = h.push_back(_cause);
        });
    }

    #[cfg(feature = "dump")]
    pub fn dump_state(&self) -> StateDump {
        let mut states = [TransferState::Idle; STATES_HISTORY_SIZE];
        let mut causes = [InterruptCause::empty(); CAUSES_HISTORY_SIZE];

        critical_section::with(|cs| {
            let states_deque = self.state_holder.get_history(cs);
            deque_into_array(&states_deque, &mut states);

            let causes_deque = self.cause_history.borrow_ref(cs);
            deque_into_array(&causes_deque, &mut causes);
        });

        StateDump {
            state_history: states,
            current_state: self.state(),
            cause_history: causes,
        }
    }
}
