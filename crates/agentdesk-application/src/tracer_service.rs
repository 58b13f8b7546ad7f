//! In-memory tracer with observer callbacks.
//!
//! `record` may be called from runtime workers. With a [`Notifier`] attached,
//! callbacks are posted to the inbox and run where it is drained.

use std::sync::Arc;

use agentdesk_core::tracer::{TracerCallback, TracerEvent, TracerService};
use agentdesk_execution::Notifier;
use parking_lot::RwLock;

type SharedCallback = Arc<dyn Fn(&TracerEvent) + Send + Sync + 'static>;

#[derive(Default)]
pub struct InMemoryTracerService {
    events: RwLock<Vec<TracerEvent>>,
    callbacks: RwLock<Vec<SharedCallback>>,
    notifier: Option<Notifier>,
}

impl InMemoryTracerService {
    /// A tracer that invokes callbacks inline on the recording thread.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracer that delivers callbacks through `notifier`.
    pub fn with_notifier(notifier: Notifier) -> Self {
        Self {
            notifier: Some(notifier),
            ..Self::default()
        }
    }
}

impl TracerService for InMemoryTracerService {
    fn record(&self, event: TracerEvent) {
        tracing::trace!(event = %event.summary(), "Tracer event");
        self.events.write().push(event.clone());

        // Snapshot so callbacks run without any tracer lock held.
        let callbacks = self.callbacks.read().clone();
        if callbacks.is_empty() {
            return;
        }
        let deliver = move || {
            for callback in &callbacks {
                callback(&event);
            }
        };
        match &self.notifier {
            Some(notifier) => {
                if !notifier.post(deliver) {
                    tracing::trace!("Inbox closed, dropping tracer callbacks");
                }
            }
            None => deliver(),
        }
    }

    fn register_callback(&self, callback: TracerCallback) {
        self.callbacks.write().push(Arc::from(callback));
    }

    fn events(&self) -> Vec<TracerEvent> {
        self.events.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_core::agent::AgentId;
    use agentdesk_core::tracer::TracerEventKind;
    use agentdesk_execution::inbox;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn removed() -> TracerEvent {
        TracerEvent::new(TracerEventKind::AgentRemoved {
            agent_id: AgentId::new(),
        })
    }

    #[test]
    fn test_callbacks_see_later_events_only() {
        let tracer = InMemoryTracerService::new();
        tracer.record(removed());

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        tracer.register_callback(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tracer.record(removed());
        tracer.record(removed());

        assert_eq!(tracer.events().len(), 3);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callbacks_wait_for_inbox_drain() {
        let (notifier, mut inbox) = inbox();
        let tracer = Arc::new(InMemoryTracerService::with_notifier(notifier));
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tracer.register_callback(Box::new(move |_| {
            sink.lock().push(std::thread::current().id());
        }));

        let worker_tracer = Arc::clone(&tracer);
        std::thread::spawn(move || worker_tracer.record(removed()))
            .join()
            .unwrap();

        assert!(seen.lock().is_empty());
        assert_eq!(tracer.events().len(), 1);

        assert_eq!(inbox.try_dispatch(|_| {}), 1);
        assert_eq!(*seen.lock(), vec![std::thread::current().id()]);
    }

    #[test]
    fn test_callback_may_register_another_callback() {
        let tracer = Arc::new(InMemoryTracerService::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&tracer);
        let counter = Arc::clone(&seen);
        tracer.register_callback(Box::new(move |_| {
            if let Some(tracer) = weak.upgrade() {
                let counter = Arc::clone(&counter);
                tracer.register_callback(Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }));

        tracer.record(removed());
        tracer.record(removed());

        // The first record added one callback, which saw the second record.
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
