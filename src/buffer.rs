use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU16, Ordering};

/// Cursor into the caller's buffer for the transaction in flight.
///
/// The memory stays owned by the caller; this only remembers where the next
/// byte goes and how many are left. The pointer is nulled as soon as the last
/// byte has been moved so a late interrupt cannot touch reused memory.
pub struct TransferBuffer {
    ptr: AtomicPtr<u8>,
    len: AtomicU16,
}

impl TransferBuffer {
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
            len: AtomicU16::new(0),
        }
    }

    pub fn set(&self, ptr: *mut u8, len: u16) {
        self.ptr.store(ptr, Ordering::SeqCst);
        self.len.store(len, Ordering::SeqCst);
    }

    pub fn ptr(&self) -> *mut u8 {
        self.ptr.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> u16 {
        self.len.load(Ordering::SeqCst)
    }

    pub fn set_len(&self, len: u16) {
        self.len.store(len, Ordering::SeqCst);
    }

    pub fn is_word_aligned(&self) -> bool {
        self.ptr() as usize & 0b11 == 0
    }

    /// Move the cursor `n` bytes forward without touching the length.
    pub fn advance(&self, n: u16) {
        let p = self.ptr();
        if !p.is_null() {
            self.ptr.store(p.wrapping_add(n as usize), Ordering::SeqCst);
        }
    }

    /// Store `byte` at the cursor and step past it.
    pub fn push(&self, byte: u8) {
        let p = self.ptr();
        if p.is_null() {
            return;
        }

        // SAFETY: the pointer was handed over by `start_transfer` whose caller
        // guarantees it is writable for the whole transfer, and the cursor
        // never moves past the requested length.
        unsafe { p.write_volatile(byte) };
        self.ptr.store(p.wrapping_add(1), Ordering::SeqCst);
        self.len.store(self.len().saturating_sub(1), Ordering::SeqCst);
    }

    /// Byte at the cursor, stepping past it.
    pub fn pop(&self) -> Option<u8> {
        let p = self.ptr();
        if p.is_null() {
            return None;
        }

        // SAFETY: see `push`.
        let byte = unsafe { p.read_volatile() };
        self.ptr.store(p.wrapping_add(1), Ordering::SeqCst);
        self.len.store(self.len().saturating_sub(1), Ordering::SeqCst);
        Some(byte)
    }

    pub fn release(&self) {
        self.ptr.store(ptr::null_mut(), Ordering::SeqCst);
    }
}
