//! Status and notifier bookkeeping shared by the plugins

use parking_lot::{Mutex, RwLock};

use crate::traits::{Notifier, Status, TransportEvent};

#[derive(Debug, Default)]
pub(crate) struct PluginState {
    status: Mutex<Status>,
    notifier: RwLock<Notifier>,
}

impl PluginState {
    pub(crate) fn status(&self) -> Status {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: Status) {
        *self.status.lock() = status;
    }

    pub(crate) fn set_notifier(&self, notifier: Notifier) {
        *self.notifier.write() = notifier;
    }

    /// Deliver an event; the lock is released before the callback runs
    pub(crate) fn emit(&self, event: TransportEvent) {
        let notifier = self.notifier.read().clone();
        notifier.notify(event);
    }

    /// Mark open and announce it
    pub(crate) fn opened(&self) {
        self.set_status(Status::Open);
        self.emit(TransportEvent::Connected);
    }

    /// Mark closed and announce it
    pub(crate) fn closed(&self, reason: Option<String>) {
        self.set_status(Status::Closed);
        self.emit(TransportEvent::Disconnected { reason });
    }

    /// Report a failed open and fall back to closed
    pub(crate) fn failed(&self, message: String) {
        self.set_status(Status::Closed);
        self.emit(TransportEvent::Error(message));
    }
}
