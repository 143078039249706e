use std::collections::VecDeque;
use std::sync::{
    Mutex,
    MutexGuard,
};

use crate::core::repr::EthernetFrame;

#[derive(Debug)]
pub enum Error {
    /// Indicates that no frame is currently available.
    Nothing,
    /// Indicates the device could not accept a frame right now.
    Busy,
    /// Indicates an error where a buffer was not large enough.
    Overflow,
    /// Indicates a frame addressed to an interface the device does not have.
    UnknownInterface(String),
    /// Indicates an OS level error.
    IO(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A transport for raw Ethernet frames across a set of named interfaces.
///
/// Devices are shared between the packet path and the sweeper, so both
/// operations take `&self` and implementations synchronize internally.
pub trait Device: Send + Sync {
    /// Sends a complete Ethernet frame out of the named interface.
    fn send(&self, buffer: &[u8], ifr_name: &str) -> Result<()>;

    /// Receives a single frame, returning its length and the name of the
    /// interface it arrived on.
    ///
    /// Returns `Err(Error::Nothing)` when no frame is pending.
    fn recv(&self, buffer: &mut [u8]) -> Result<(usize, String)>;

    /// Returns the size of the largest frame the device can receive.
    fn max_transmission_unit(&self) -> usize;
}

/// A frame tagged with the interface it travels on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedFrame {
    pub ifr_name: String,
    pub buffer: Vec<u8>,
}

/// An in-memory device; received frames are injected and sent frames are
/// captured for inspection.
#[derive(Debug)]
pub struct Buffered {
    ifr_names: Vec<String>,
    max_transmission_unit: usize,
    rx: Mutex<VecDeque<TaggedFrame>>,
    tx: Mutex<Vec<TaggedFrame>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(err) => err.into_inner(),
    }
}

impl Buffered {
    /// Creates a device with the named interfaces.
    pub fn new<S: AsRef<str>>(ifr_names: &[S]) -> Buffered {
        Buffered {
            ifr_names: ifr_names
                .iter()
                .map(|ifr_name| String::from(ifr_name.as_ref()))
                .collect(),
            max_transmission_unit: EthernetFrame::<&[u8]>::MAX_FRAME_LEN,
            rx: Mutex::new(VecDeque::new()),
            tx: Mutex::new(Vec::new()),
        }
    }

    fn check_ifr_name(&self, ifr_name: &str) -> Result<()> {
        if self.ifr_names.iter().any(|name| name == ifr_name) {
            Ok(())
        } else {
            Err(Error::UnknownInterface(String::from(ifr_name)))
        }
    }

    /// Queues a frame as if it arrived on an interface.
    pub fn inject(&self, buffer: &[u8], ifr_name: &str) -> Result<()> {
        self.check_ifr_name(ifr_name)?;
        lock(&self.rx).push_back(TaggedFrame {
            ifr_name: String::from(ifr_name),
            buffer: buffer.to_vec(),
        });
        Ok(())
    }

    /// Removes and returns every frame sent so far, oldest first.
    pub fn take_sent(&self) -> Vec<TaggedFrame> {
        std::mem::replace(&mut *lock(&self.tx), Vec::new())
    }
}

impl Device for Buffered {
    fn send(&self, buffer: &[u8], ifr_name: &str) -> Result<()> {
        self.check_ifr_name(ifr_name)?;
        lock(&self.tx).push(TaggedFrame {
            ifr_name: String::from(ifr_name),
            buffer: buffer.to_vec(),
        });
        Ok(())
    }

    fn recv(&self, buffer: &mut [u8]) -> Result<(usize, String)> {
        let frame = match lock(&self.rx).pop_front() {
            Some(frame) => frame,
            None => return Err(Error::Nothing),
        };

        // Oversized frames are consumed, as a short read from a TAP would.
        if frame.buffer.len() > buffer.len() {
            return Err(Error::Overflow);
        }

        let len = frame.buffer.len();
        buffer[.. len].copy_from_slice(&frame.buffer);
        Ok((len, frame.ifr_name))
    }

    fn max_transmission_unit(&self) -> usize {
        self.max_transmission_unit
    }
}
