use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

/// Single-slot mailbox: a post replaces whatever has not been taken yet.
///
/// Readers wait on [`Mailbox::doorbell`] (usable in `select!`) and then call
/// [`Mailbox::take`]. The doorbell holds at most one pending ring, so a burst
/// of posts wakes the reader once.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    ring: Sender<()>,
    doorbell: Receiver<()>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        let (ring, doorbell) = bounded(1);
        Self {
            slot: Mutex::new(None),
            ring,
            doorbell,
        }
    }

    /// Returns the value that was overwritten, if any.
    pub fn post(&self, value: T) -> Option<T> {
        let replaced = self.slot.lock().replace(value);
        // Full means a wake-up is already pending.
        if let Err(TrySendError::Disconnected(())) = self.ring.try_send(()) {
            tracing::trace!("mailbox doorbell disconnected");
        }
        replaced
    }

    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn doorbell(&self) -> &Receiver<()> {
        &self.doorbell
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
