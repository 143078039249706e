use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::time::Duration;

use crate::core::dev::{
    Device,
    Error,
    Result,
};
use crate::core::repr::EthernetFrame;
use crate::linux::tap::Tap;

/// A device with one TAP per router interface.
///
/// Interfaces keep their router names; the TAP backing interface `eth1` is
/// named by prefixing it, so `sr-` yields `sr-eth1`.
pub struct TapSet {
    taps: Vec<(String, Tap)>,
    poll_timeout: Duration,
    next: AtomicUsize,
}

impl TapSet {
    /// Opens a TAP for each interface name.
    ///
    /// `recv` waits up to poll_timeout for a frame before returning
    /// `Error::Nothing`.
    pub fn open<S: AsRef<str>>(ifr_names: &[S], prefix: &str, poll_timeout: Duration) -> Result<TapSet> {
        let mut taps = Vec::with_capacity(ifr_names.len());

        for ifr_name in ifr_names {
            let ifr_name = ifr_name.as_ref();
            let tap = Tap::new(&format!("{}{}", prefix, ifr_name))?;
            taps.push((String::from(ifr_name), tap));
        }

        Ok(TapSet {
            taps,
            poll_timeout,
            next: AtomicUsize::new(0),
        })
    }
}

impl Device for TapSet {
    fn send(&self, buffer: &[u8], ifr_name: &str) -> Result<()> {
        match self.taps.iter().find(|(name, _)| name == ifr_name) {
            Some((_, tap)) => tap.send(buffer),
            None => Err(Error::UnknownInterface(String::from(ifr_name))),
        }
    }

    fn recv(&self, buffer: &mut [u8]) -> Result<(usize, String)> {
        if self.taps.is_empty() {
            return Err(Error::Nothing);
        }

        let mut pollfds: Vec<libc::pollfd> = self
            .taps
            .iter()
            .map(|(_, tap)| libc::pollfd {
                fd: tap.fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let ready = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                self.poll_timeout.as_millis() as libc::c_int,
            )
        };

        if ready < 0 {
            let err = std::io::Error::last_os_error();
            return match err.kind() {
                std::io::ErrorKind::Interrupted => Err(Error::Nothing),
                _ => Err(Error::IO(err)),
            };
        }

        // Rotate the starting TAP so a busy interface cannot starve the rest.
        let start = self.next.fetch_add(1, Ordering::Relaxed) % self.taps.len();

        for i in 0 .. self.taps.len() {
            let index = (start + i) % self.taps.len();
            if pollfds[index].revents & libc::POLLIN == 0 {
                continue;
            }

            let (ifr_name, tap) = &self.taps[index];
            match tap.recv(buffer) {
                Ok(buffer_len) => return Ok((buffer_len, ifr_name.clone())),
                Err(Error::Nothing) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(Error::Nothing)
    }

    fn max_transmission_unit(&self) -> usize {
        self.taps
            .iter()
            .map(|(_, tap)| EthernetFrame::<&[u8]>::buffer_len(tap.max_transmission_unit()))
            .max()
            .unwrap_or(EthernetFrame::<&[u8]>::MAX_FRAME_LEN)
    }
}
