//! Delivery of completions and UI events to the coordinating thread.
//!
//! Background tasks never touch UI state directly. They post into a
//! [`Notifier`]; the thread that owns the UI drains the matching [`Inbox`]
//! and runs callbacks there, in posting order.

use agentdesk_core::event::{DeskEvent, EventSink};
use tokio::sync::mpsc;

/// Deferred work to run on the coordinating thread.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

enum InboxItem {
    Event(DeskEvent),
    Callback(Callback),
}

/// Creates a connected notifier/inbox pair.
pub fn inbox() -> (Notifier, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier { tx }, Inbox { rx })
}

/// Sending half, cloned into every background task.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<InboxItem>,
}

impl Notifier {
    /// Queues `callback`; returns false when the inbox is gone.
    pub fn post<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(InboxItem::Callback(Box::new(callback))).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventSink for Notifier {
    fn publish(&self, event: DeskEvent) {
        if self.tx.send(InboxItem::Event(event)).is_err() {
            tracing::trace!("Inbox closed, dropping event");
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").field("closed", &self.is_closed()).finish()
    }
}

/// Receiving half, owned by the coordinating thread.
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<InboxItem>,
}

impl Inbox {
    /// Runs everything already queued without waiting.
    ///
    /// Events are handed to `observer`; callbacks are invoked. Returns the
    /// number of items handled.
    pub fn try_dispatch<F>(&mut self, mut observer: F) -> usize
    where
        F: FnMut(&DeskEvent),
    {
        let mut handled = 0;
        while let Ok(item) = self.rx.try_recv() {
            Self::run(item, &mut observer);
            handled += 1;
        }
        handled
    }

    /// Waits for the next item and handles it.
    ///
    /// Returns false once every [`Notifier`] has been dropped and the queue
    /// is empty.
    pub async fn dispatch_next<F>(&mut self, mut observer: F) -> bool
    where
        F: FnMut(&DeskEvent),
    {
        match self.rx.recv().await {
            Some(item) => {
                Self::run(item, &mut observer);
                true
            }
            None => false,
        }
    }

    fn run<F>(item: InboxItem, observer: &mut F)
    where
        F: FnMut(&DeskEvent),
    {
        match item {
            InboxItem::Event(event) => observer(&event),
            InboxItem::Callback(callback) => callback(),
        }
    }
}
