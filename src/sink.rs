//! Hand-off points for emitted events and track snapshots.
//!
//! Delivery never blocks the caller: a full channel drops the item, a
//! disconnected one logs and drops it.

use crossbeam::channel::{Sender, TrySendError};

pub trait Sink<T> {
    fn deliver(&mut self, item: T);
}

impl<T> Sink<T> for Sender<T> {
    fn deliver(&mut self, item: T) {
        match self.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::debug!("sink full, dropping item");
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("sink disconnected, dropping item");
            }
        }
    }
}

impl<T> Sink<T> for Vec<T> {
    fn deliver(&mut self, item: T) {
        self.push(item);
    }
}

/// Adapts a closure into a sink
pub struct FnSink<F>(pub F);

impl<T, F: FnMut(T)> Sink<T> for FnSink<F> {
    fn deliver(&mut self, item: T) {
        (self.0)(item)
    }
}

/// Discards everything
pub struct NullSink;

impl<T> Sink<T> for NullSink {
    fn deliver(&mut self, _item: T) {}
}
