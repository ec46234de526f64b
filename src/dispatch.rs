use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Marshals callback invocations onto a host-chosen lane. Invoked with the
/// supervisor lock already released, so a dispatch may itself call back into
/// the client without risk of deadlock.
pub trait DispatchQueue: Send + Sync {
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>);
}

/// Runs every dispatched task inline, on the caller's thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDispatch;

impl DispatchQueue for ImmediateDispatch {
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

/// Hands dispatched tasks to an `mpsc` channel for a host-owned worker loop
/// to drain in order.
#[derive(Clone)]
pub struct ChannelDispatch {
    sender: UnboundedSender<Box<dyn FnOnce() + Send>>,
}

impl ChannelDispatch {
    pub fn new() -> (Self, UnboundedReceiver<Box<dyn FnOnce() + Send>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DispatchQueue for ChannelDispatch {
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>) {
        // The receiver outliving the client is the host's responsibility;
        // if it's gone there's nobody left to notify.
        let _ = self.sender.send(task);
    }
}
