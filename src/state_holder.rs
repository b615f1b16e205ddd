use core::cell::{Ref, RefCell};

use atomic::{Atomic, Ordering};
use critical_section::{CriticalSection, Mutex};
use heapless::Deque;

use crate::TransferState;

/// The transfer state shared by the TWI and DMA interrupt vectors.
///
/// Only plain loads and stores are used; which vector may move the state on
/// is decided by the state itself.
pub struct StateHolder<const HISTORY_SIZE: usize> {
    history: Mutex<RefCell<Deque<TransferState, HISTORY_SIZE>>>,
    state: Atomic<TransferState>,
}

impl<const HISTORY_SIZE: usize> StateHolder<HISTORY_SIZE> {
    pub const fn new() -> Self {
        Self {
            history: Mutex::new(RefCell::new(Deque::new())),
            state: Atomic::new(TransferState::Idle),
        }
    }

    pub fn set_state(&self, state: TransferState) {
        if self.get_state() == state {
            return;
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("twi: {} -> {}", self.get_state(), state);

        self.add_state_in_history(state);
        self.state.store(state, Ordering::SeqCst);
    }

    pub fn get_state(&self) -> TransferState {
        self.state.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn get_history<'cs>(
        &'cs self,
        cs: CriticalSection<'cs>,
    ) -> Ref<'cs, Deque<TransferState, HISTORY_SIZE>> {
        self.history.borrow_ref(cs)
    }

    fn add_state_in_history(&self, state: TransferState) {
        critical_section::with(|cs| {
            let mut h = self.history.borrow_ref_mut(cs);
            if h.is_full() {
                h.pop_front();
            }
            // Cannot fail, a slot was just freed.
            let _ = h.push_back(state);
        });
    }
}
