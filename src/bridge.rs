use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel};

use crate::InterruptCause;

/// Receiver of finished transactions. Called from interrupt context, once per
/// transaction, after the driver is back to idle.
pub trait CompletionHandler: Sync {
    fn on_complete(&self, cause: InterruptCause);
}

pub type CompletionQueue<const SZ: usize> =
    channel::Channel<CriticalSectionRawMutex, InterruptCause, SZ>;

/// Hands terminal causes from the interrupt vectors to a foreground task.
pub struct CompletionChannel<const CHSIZE: usize> {
    channel: CompletionQueue<CHSIZE>,
}

impl<const CHSIZE: usize> CompletionChannel<CHSIZE> {
    pub const fn new() -> Self {
        Self {
            channel: CompletionQueue::new(),
        }
    }

    pub async fn wait(&self) -> InterruptCause {
        self.channel.receive().await
    }

    pub fn try_take(&self) -> Option<InterruptCause> {
        self.channel.try_receive().ok()
    }
}

impl<const CHSIZE: usize> Default for CompletionChannel<CHSIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CHSIZE: usize> CompletionHandler for CompletionChannel<CHSIZE> {
    fn on_complete(&self, cause: InterruptCause) {
        if self.channel.try_send(cause).is_err() {
            // Nobody drained the previous completions.
            #[cfg(feature = "defmt")]
            defmt::warn!("twi: completion dropped, channel full: {}", cause);
        }
    }
}
