use crate::core::dev::{
    Error,
    Result,
};
use crate::linux::libc as _libc;

/// [TAP interface](https://www.kernel.org/doc/Documentation/networking/tuntap.txt)
/// for sending and receiving raw ethernet frames.
///
/// The file descriptor is non-blocking: reads with nothing pending return
/// `Error::Nothing` and writes the kernel cannot accept return `Error::Busy`.
#[derive(Debug)]
pub struct Tap {
    fd: libc::c_int,
    ifr_name: String,
    max_transmission_unit: usize,
}

impl Tap {
    /// Creates or binds to an existing TAP interface with the specified name.
    pub fn new(ifr_name: &str) -> Result<Tap> {
        let ifreq = _libc::c_ifreq::with_name(ifr_name).ok_or_else(|| {
            Error::IO(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("TAP name '{}' is too long", ifr_name),
            ))
        })?;

        unsafe {
            let fd = libc::open(
                "/dev/net/tun\0".as_ptr() as *const libc::c_char,
                libc::O_RDWR | libc::O_NONBLOCK,
            );

            if fd == -1 {
                return Err(Error::IO(std::io::Error::last_os_error()));
            }

            let mut _ifreq = ifreq;
            _ifreq.ifr_ifru.ifr_flags = _libc::IFF_TAP | _libc::IFF_NO_PI;
            if libc::ioctl(fd, _libc::TUNSETIFF as _, &mut _ifreq as *mut _libc::c_ifreq) == -1 {
                let err = std::io::Error::last_os_error();
                libc::close(fd);
                return Err(Error::IO(err));
            }

            let max_transmission_unit = match Self::mtu(ifreq) {
                Ok(mtu) => mtu,
                Err(err) => {
                    libc::close(fd);
                    return Err(err);
                }
            };

            debug!(
                "Opened TAP {} with MTU {}.",
                ifr_name, max_transmission_unit
            );

            Ok(Tap {
                fd,
                ifr_name: String::from(ifr_name),
                max_transmission_unit,
            })
        }
    }

    /// Queries the IP MTU of an interface.
    unsafe fn mtu(mut ifreq: _libc::c_ifreq) -> Result<usize> {
        let sockfd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0);

        if sockfd == -1 {
            return Err(Error::IO(std::io::Error::last_os_error()));
        }

        if libc::ioctl(sockfd, _libc::SIOCGIFMTU as _, &mut ifreq as *mut _libc::c_ifreq) == -1 {
            let err = std::io::Error::last_os_error();
            libc::close(sockfd);
            return Err(Error::IO(err));
        }

        libc::close(sockfd);
        Ok(ifreq.ifr_ifru.ifr_mtu as usize)
    }

    pub fn ifr_name(&self) -> &str {
        &self.ifr_name
    }

    pub fn fd(&self) -> libc::c_int {
        self.fd
    }

    /// Returns the IP MTU of the interface, excluding the Ethernet header.
    pub fn max_transmission_unit(&self) -> usize {
        self.max_transmission_unit
    }

    pub fn send(&self, buffer: &[u8]) -> Result<()> {
        unsafe {
            let wrote = libc::write(
                self.fd,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
            );

            if wrote < 0 && _libc::errno() == libc::EAGAIN {
                Err(Error::Busy)
            } else if wrote < 0 {
                Err(Error::IO(std::io::Error::last_os_error()))
            } else {
                Ok(())
            }
        }
    }

    pub fn recv(&self, buffer: &mut [u8]) -> Result<usize> {
        unsafe {
            let read = libc::read(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            );

            if read < 0 && _libc::errno() == libc::EAGAIN {
                Err(Error::Nothing)
            } else if read < 0 {
                Err(Error::IO(std::io::Error::last_os_error()))
            } else {
                Ok(read as usize)
            }
        }
    }
}

impl Drop for Tap {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
