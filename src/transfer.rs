//! The transfer state machine.
//!
//! Bytes in the middle of a transfer are moved by DMA. The first byte of a
//! read (and any byte before a word-aligned address), the first byte of a
//! write and the last one or two bytes of both are moved by hand: DMA cannot
//! place STOP before the final byte, and the TCM only accepts word-aligned
//! DMA accesses.

use crate::{
    Direction, InterruptCause, Status, TransferState, TwiDma, TwiMaster, TwiRegisters,
};

/// Outcome of evaluating the current state once.
enum Step {
    /// The state moved on; evaluate again with what is left of the cause.
    Continue,
    /// Nothing more to do until the next interrupt.
    Wait,
    /// Back to idle, completion delivered.
    Complete,
}

impl<'d, R: TwiRegisters, D: TwiDma> TwiMaster<'d, R, D> {
    /// Feed one interrupt cause to the state machine.
    ///
    /// Consumed flags are removed from `cause`. Several states may be passed
    /// through in one call when finishing one step already satisfies the
    /// next. Returns `true` when this call finished the transaction.
    pub fn advance(&self, cause: &mut InterruptCause) -> bool {
        if !self.state().is_idle() {
            if cause.contains(InterruptCause::RX_ERROR) {
                self.set_state(TransferState::RXError);
            }
            if cause.contains(InterruptCause::TX_ERROR) {
                self.set_state(TransferState::TXError);
            }

            let state = self.state();
            if cause.contains(InterruptCause::NACK) && !state.is_terminal() {
                self.set_state(if state.is_rx() {
                    TransferState::RXError
                } else {
                    TransferState::TXError
                });
            }
        }

        loop {
            match self.step(cause) {
                Step::Continue => continue,
                Step::Wait => return false,
                Step::Complete => return true,
            }
        }
    }

    fn step(&self, cause: &mut InterruptCause) -> Step {
        match self.state() {
            TransferState::Idle => {
                if !cause.is_empty() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("twi: spurious interrupt {}", *cause);
                }
                self.disable_all_sources();
                *cause = InterruptCause::empty();
                Step::Wait
            }

            TransferState::TXError | TransferState::RXError => {
                self.abort();
                self.finish(*cause)
            }
            TransferState::TXDone | TransferState::RXDone => self.finish(*cause),

            TransferState::RXReadyToReadFirstByte => Step::Wait,
            TransferState::RXReadingFirstByte => self.rx_first_byte(cause),
            TransferState::RXDMAStarted => self.rx_dma_done(cause),
            TransferState::RXWaitingForRXReady => self.rx_next_to_last(cause),
            TransferState::RXWaitingForLastChar => self.rx_last(cause),

            TransferState::TXReadyToSendFirstByte => self.tx_first_byte(cause),
            TransferState::TXSendingFirstByte => self.tx_start_dma(cause),
            TransferState::TXDMAStarted => self.tx_dma_done(cause),
            TransferState::TXWaitingForTXReady1 => self.tx_last(cause),
            TransferState::TXWaitingForTXReady2 => self.tx_drained(cause),
        }
    }

    fn rx_first_byte(&self, cause: &mut InterruptCause) -> Step {
        if !cause.take(InterruptCause::RX_READY) {
            return Step::Wait;
        }

        if !self.buffer.is_word_aligned() {
            self.buffer.push(self.regs.read_byte());

            if self.buffer.len() <= 2 {
                self.set_state(TransferState::RXWaitingForRXReady);
                return Step::Continue;
            }
            return Step::Wait;
        }

        self.regs.disable_interrupts(Status::RX_READY);

        let len = self.buffer.len() - 2;
        self.set_state(TransferState::RXDMAStarted);

        // The byte sitting in the holding register is the first one DMA takes.
        // SAFETY: the cursor and the two bytes kept back stay inside the
        // buffer handed to `start_transfer`.
        let started = unsafe { self.dma.start_rx_transfer(self.buffer.ptr(), len, true, false) };
        if started.is_err() {
            return self.dma_failed(cause, Direction::Read);
        }

        self.buffer.advance(len);
        self.buffer.set_len(2);
        Step::Continue
    }

    // Runs from the DMA vector.
    fn rx_dma_done(&self, cause: &mut InterruptCause) -> Step {
        if !cause.take(InterruptCause::RX_TRANSFER_DONE) {
            return Step::Wait;
        }

        self.set_state(TransferState::RXWaitingForRXReady);

        self.dma.stop_rx_done_interrupts();
        self.dma.disable();

        self.regs.enable_interrupts(Status::RX_READY);
        Step::Wait
    }

    fn rx_next_to_last(&self, cause: &mut InterruptCause) -> Step {
        if !cause.contains(InterruptCause::RX_READY) && !self.regs.is_rx_ready() {
            self.regs.enable_interrupts(Status::RX_READY);
            return Step::Wait;
        }
        cause.remove(InterruptCause::RX_READY);

        // STOP goes out after the byte now being received.
        self.regs.set_stop();
        self.buffer.push(self.regs.read_byte());

        self.set_state(TransferState::RXWaitingForLastChar);
        Step::Continue
    }

    fn rx_last(&self, cause: &mut InterruptCause) -> Step {
        // Busy-wait: the last byte is at most one byte time away, unless the
        // target NACKs instead.
        loop {
            let status = self.regs.status();
            if status.contains(Status::RX_READY) {
                break;
            }
            if status.contains(Status::NACK) {
                cause.insert(InterruptCause::NACK);
                self.set_state(TransferState::RXError);
                return Step::Continue;
            }
            core::hint::spin_loop();
        }

        cause.remove(InterruptCause::RX_READY);
        cause.insert(InterruptCause::RX_TRANSFER_DONE);

        self.buffer.push(self.regs.read_byte());
        self.buffer.release();

        self.set_state(TransferState::RXDone);
        self.regs
            .disable_interrupts(Status::RX_READY | Status::NACK);
        Step::Continue
    }

    fn tx_first_byte(&self, cause: &mut InterruptCause) -> Step {
        if !cause.contains(InterruptCause::TX_READY) {
            return Step::Wait;
        }

        self.regs.set_direction(Direction::Write);

        if self.buffer.len() >= 2 {
            cause.remove(InterruptCause::TX_READY);

            self.set_state(TransferState::TXSendingFirstByte);
            if let Some(byte) = self.buffer.pop() {
                self.regs.transmit(byte);
            }
            return Step::Wait;
        }

        self.set_state(TransferState::TXWaitingForTXReady1);
        Step::Continue
    }

    fn tx_start_dma(&self, cause: &mut InterruptCause) -> Step {
        if !cause.contains(InterruptCause::TX_READY) {
            return Step::Wait;
        }

        if self.buffer.len() <= 1 {
            self.set_state(TransferState::TXWaitingForTXReady1);
            self.regs.enable_interrupts(Status::TX_READY);
            return Step::Continue;
        }

        cause.remove(InterruptCause::TX_READY);
        self.regs.disable_interrupts(Status::TX_READY);
        self.regs.enable_interrupts(Status::NACK);

        let len = self.buffer.len() - 1;
        self.set_state(TransferState::TXDMAStarted);

        // SAFETY: see `rx_first_byte`; one byte is kept back for STOP.
        let started = unsafe { self.dma.start_tx_transfer(self.buffer.ptr(), len, true, false) };
        if started.is_err() {
            return self.dma_failed(cause, Direction::Write);
        }

        self.buffer.advance(len);
        self.buffer.set_len(1);
        Step::Continue
    }

    // Runs from the DMA vector.
    fn tx_dma_done(&self, cause: &mut InterruptCause) -> Step {
        if !cause.take(InterruptCause::TX_TRANSFER_DONE) {
            return Step::Wait;
        }

        self.set_state(TransferState::TXWaitingForTXReady1);

        self.dma.stop_tx_done_interrupts();
        self.dma.disable();

        // TX ready may already be up, the next step polls for it.
        self.regs.enable_interrupts(Status::TX_READY);
        Step::Continue
    }

    fn tx_last(&self, cause: &mut InterruptCause) -> Step {
        cause.remove(InterruptCause::TX_DONE | InterruptCause::TX_TRANSFER_DONE);

        if !cause.contains(InterruptCause::TX_READY) && !self.regs.is_tx_ready() {
            return Step::Wait;
        }
        cause.remove(InterruptCause::TX_READY);
        self.regs.disable_interrupts(Status::TX_READY);

        self.regs.set_stop();
        if let Some(byte) = self.buffer.pop() {
            self.regs.transmit(byte);
        }
        self.buffer.release();

        self.set_state(TransferState::TXWaitingForTXReady2);
        self.regs.enable_interrupts(Status::TX_COMPLETE);
        Step::Continue
    }

    fn tx_drained(&self, cause: &mut InterruptCause) -> Step {
        if !cause.intersects(InterruptCause::TX_READY | InterruptCause::TX_DONE) {
            return Step::Wait;
        }

        cause.insert(InterruptCause::TX_TRANSFER_DONE);

        self.set_state(TransferState::TXDone);
        self.regs
            .disable_interrupts(Status::TX_READY | Status::TX_COMPLETE | Status::NACK);
        Step::Continue
    }

    fn dma_failed(&self, cause: &mut InterruptCause, direction: Direction) -> Step {
        #[cfg(feature = "defmt")]
        defmt::error!("twi: dma refused {} transfer", direction);

        cause.insert(InterruptCause::DMA_SETUP_FAILED);
        match direction {
            Direction::Read => {
                cause.insert(InterruptCause::RX_ERROR);
                self.set_state(TransferState::RXError);
            }
            Direction::Write => {
                cause.insert(InterruptCause::TX_ERROR);
                self.set_state(TransferState::TXError);
            }
        }
        Step::Continue
    }

    /// Stop everything; nothing further may land in the caller's buffer.
    fn abort(&self) {
        self.disable_all_sources();
        self.dma.disable();
        self.buffer.release();
    }

    fn finish(&self, cause: InterruptCause) -> Step {
        self.set_state(TransferState::Idle);
        self.record_cause(cause);

        match self.completion_handler() {
            Some(handler) => handler.on_complete(cause),
            None => {
                #[cfg(feature = "defmt")]
                defmt::error!("twi: transfer finished with no completion handler");

                if cfg!(debug_assertions) {
                    panic!("transfer finished with no completion handler");
                }
            }
        }

        Step::Complete
    }
}
