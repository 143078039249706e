//! Periodic ARP cache maintenance.

use std::sync::mpsc::{
    self,
    RecvTimeoutError,
    Sender,
};
use std::sync::Arc;
use std::thread::{
    self,
    JoinHandle,
};
use std::time::Duration;

use crate::core::service::Router;
use crate::core::time::Env;
use crate::Result;

/// Handle to a thread sweeping a router's ARP cache on a fixed period.
///
/// The thread exits when the handle is stopped or dropped.
pub struct Sweeper {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Starts sweeping a router every period.
    pub fn spawn<T>(router: Arc<Router<T>>, period: Duration) -> Result<Sweeper>
    where
        T: Env + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name(String::from("arp-sweeper"))
            .spawn(move || {
                debug!("Sweeping ARP cache every {:?}.", period);
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            router.sweep();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("ARP cache sweeper stopped.");
            })?;

        Ok(Sweeper {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops the sweeper, waiting for an in progress sweep to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Hanging up wakes the thread immediately.
        self.stop_tx.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("ARP cache sweeper panicked.");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
