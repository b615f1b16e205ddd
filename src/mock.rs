//! Simulated TWI unit, DMA channel pair and target device for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::{Direction, DmaSetupError, Interrupts, Priority, Status, TwiDma, TwiRegisters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    ReadStatus,
    EnableSources(Status),
    DisableSources(Status),
    Start,
    Stop,
    StartStop,
    Transmit(u8),
    ReadByte(u8),
    Direction(Direction),
    SetAddress(u8, u32, u8),
    ResetModule,
    Enable,
    Disable,
    SetSpeed(u32),
    IrqPriority(u8),
    EnableIrqLine,

    DmaRx(u16),
    DmaTx(u16),
    DmaRxDoneInterrupts(bool),
    DmaTxDoneInterrupts(bool),
    DmaDisable,
    DmaReset,
}

impl Op {
    /// A DMA transfer was set up.
    pub fn is_dma_transfer(&self) -> bool {
        matches!(self, Op::DmaRx(_) | Op::DmaTx(_))
    }
}

#[derive(Default)]
struct State {
    ops: RefCell<Vec<Op>>,
    /// Bytes the target will still send.
    device: RefCell<VecDeque<u8>>,
    /// Bytes that went out on the bus.
    wire: RefCell<Vec<u8>>,
    extra_status: Cell<Status>,
    enabled: Cell<Status>,
    dma_hint: Cell<Option<Interrupts>>,
    refuse_dma: Cell<bool>,
    dma_bytes: Cell<usize>,
    manual_reads: Cell<usize>,
    manual_writes: Cell<usize>,
}

impl State {
    fn log(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }
}

pub struct Bus(Rc<State>);

impl Bus {
    pub fn new() -> Self {
        Self(Rc::new(State::default()))
    }

    pub fn regs(&self) -> MockTwi {
        MockTwi(self.0.clone())
    }

    pub fn dma(&self) -> MockDma {
        MockDma(self.0.clone())
    }

    pub fn load_device(&self, bytes: &[u8]) {
        self.0.device.borrow_mut().extend(bytes.iter().copied());
    }

    /// Status bits reported on top of the simulated ones.
    pub fn set_status(&self, status: Status) {
        self.0.extra_status.set(status);
    }

    pub fn refuse_dma(&self) {
        self.0.refuse_dma.set(true);
    }

    pub fn take_dma_hint(&self) -> Option<Interrupts> {
        self.0.dma_hint.take()
    }

    pub fn enabled(&self) -> Status {
        self.0.enabled.get()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.ops.borrow().clone()
    }

    pub fn ops_matching(&self, f: impl Fn(&Op) -> bool) -> Vec<Op> {
        self.0.ops.borrow().iter().copied().filter(|op| f(op)).collect()
    }

    pub fn clear_ops(&self) {
        self.0.ops.borrow_mut().clear();
    }

    pub fn wire(&self) -> Vec<u8> {
        self.0.wire.borrow().clone()
    }

    pub fn dma_bytes(&self) -> usize {
        self.0.dma_bytes.get()
    }

    pub fn manual_reads(&self) -> usize {
        self.0.manual_reads.get()
    }

    pub fn manual_writes(&self) -> usize {
        self.0.manual_writes.get()
    }
}

pub struct MockTwi(Rc<State>);

impl TwiRegisters for MockTwi {
    fn status(&self) -> Status {
        self.0.log(Op::ReadStatus);

        let mut status = Status::TX_READY | Status::TX_COMPLETE | self.0.extra_status.get();
        if !self.0.device.borrow().is_empty() {
            status |= Status::RX_READY;
        }
        status
    }

    fn interrupt_mask(&self) -> Status {
        self.0.enabled.get()
    }

    fn enable_interrupts(&self, sources: Status) {
        self.0.log(Op::EnableSources(sources));
        self.0.enabled.set(self.0.enabled.get() | sources);
    }

    fn disable_interrupts(&self, sources: Status) {
        self.0.log(Op::DisableSources(sources));
        self.0.enabled.set(self.0.enabled.get() - sources);
    }

    fn set_start(&self) {
        self.0.log(Op::Start);
    }

    fn set_stop(&self) {
        self.0.log(Op::Stop);
    }

    fn set_start_stop(&self) {
        self.0.log(Op::StartStop);
    }

    fn transmit(&self, byte: u8) {
        self.0.log(Op::Transmit(byte));
        self.0.wire.borrow_mut().push(byte);
        self.0.manual_writes.set(self.0.manual_writes.get() + 1);
    }

    fn read_byte(&self) -> u8 {
        let byte = self.0.device.borrow_mut().pop_front().unwrap_or(0xFF);
        self.0.log(Op::ReadByte(byte));
        self.0.manual_reads.set(self.0.manual_reads.get() + 1);
        byte
    }

    fn set_direction(&self, direction: Direction) {
        self.0.log(Op::Direction(direction));
    }

    fn set_address(&self, device: u8, internal: u32, internal_size: u8) {
        self.0.log(Op::SetAddress(device, internal, internal_size));
    }

    fn reset_module(&self) {
        self.0.log(Op::ResetModule);
    }

    fn enable(&self) {
        self.0.log(Op::Enable);
    }

    fn disable(&self) {
        self.0.log(Op::Disable);
    }

    fn set_speed(&self, frequency: u32) {
        self.0.log(Op::SetSpeed(frequency));
    }

    fn set_irq_priority(&self, priority: Priority) {
        self.0.log(Op::IrqPriority(priority.level()));
    }

    fn enable_irq(&self) {
        self.0.log(Op::EnableIrqLine);
    }
}

/// Completes every transfer immediately and raises the done hint for the
/// test to deliver.
pub struct MockDma(Rc<State>);

impl TwiDma for MockDma {
    unsafe fn start_rx_transfer(
        &self,
        ptr: *mut u8,
        len: u16,
        handle_interrupts: bool,
        _include_next: bool,
    ) -> Result<(), DmaSetupError> {
        if self.0.refuse_dma.get() {
            return Err(DmaSetupError);
        }
        self.0.log(Op::DmaRx(len));

        let mut device = self.0.device.borrow_mut();
        for i in 0..len as usize {
            let byte = device.pop_front().unwrap_or(0xFF);
            ptr.add(i).write(byte);
        }
        self.0.dma_bytes.set(self.0.dma_bytes.get() + len as usize);

        if handle_interrupts {
            self.0.dma_hint.set(Some(Interrupts::ON_RX_TRANSFER_DONE));
        }
        Ok(())
    }

    unsafe fn start_tx_transfer(
        &self,
        ptr: *const u8,
        len: u16,
        handle_interrupts: bool,
        _include_next: bool,
    ) -> Result<(), DmaSetupError> {
        if self.0.refuse_dma.get() {
            return Err(DmaSetupError);
        }
        self.0.log(Op::DmaTx(len));

        let mut wire = self.0.wire.borrow_mut();
        for i in 0..len as usize {
            wire.push(ptr.add(i).read());
        }
        self.0.dma_bytes.set(self.0.dma_bytes.get() + len as usize);

        if handle_interrupts {
            self.0.dma_hint.set(Some(Interrupts::ON_TX_TRANSFER_DONE));
        }
        Ok(())
    }

    fn done_reading(&self) -> bool {
        self.0.dma_hint.get() != Some(Interrupts::ON_RX_TRANSFER_DONE)
    }

    fn done_writing(&self) -> bool {
        self.0.dma_hint.get() != Some(Interrupts::ON_TX_TRANSFER_DONE)
    }

    fn start_rx_done_interrupts(&self) {
        self.0.log(Op::DmaRxDoneInterrupts(true));
    }

    fn stop_rx_done_interrupts(&self) {
        self.0.log(Op::DmaRxDoneInterrupts(false));
    }

    fn start_tx_done_interrupts(&self) {
        self.0.log(Op::DmaTxDoneInterrupts(true));
    }

    fn stop_tx_done_interrupts(&self) {
        self.0.log(Op::DmaTxDoneInterrupts(false));
    }

    fn disable(&self) {
        self.0.log(Op::DmaDisable);
        self.0.dma_hint.set(None);
    }

    fn reset(&self) {
        self.0.log(Op::DmaReset);
    }
}
