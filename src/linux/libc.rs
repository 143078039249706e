#![allow(non_camel_case_types)]

pub const IFF_TAP: libc::c_short = 0x0002;

pub const IFF_NO_PI: libc::c_short = 0x1000;

pub const TUNSETIFF: libc::c_ulong = 0x400454CA;

pub const SIOCGIFMTU: libc::c_ulong = 0x8921;

#[repr(C)]
#[derive(Clone, Copy)]
pub union c_ifr_ifru {
    pub ifr_flags: libc::c_short,
    pub ifr_mtu: libc::c_int,
    // struct sockaddr sized, the largest member of the kernel union.
    _pad: [u8; 24],
}

#[repr(C)]
#[derive(Clone, Copy)]
/// [https://linux.die.net/man/7/netdevice](https://linux.die.net/man/7/netdevice)
pub struct c_ifreq {
    pub ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    pub ifr_ifru: c_ifr_ifru,
}

impl c_ifreq {
    /// Creates a request for an interface, or None if the name does not fit
    /// with its NUL terminator.
    pub fn with_name(ifr_name: &str) -> Option<c_ifreq> {
        if ifr_name.len() >= libc::IF_NAMESIZE {
            return None;
        }

        let mut ifreq = c_ifreq {
            ifr_name: [0; libc::IF_NAMESIZE],
            ifr_ifru: c_ifr_ifru { _pad: [0; 24] },
        };

        for (i, c) in ifr_name.as_bytes().iter().enumerate() {
            ifreq.ifr_name[i] = *c as libc::c_char;
        }

        Some(ifreq)
    }
}

/// Returns the errno of the last failed call on this thread.
pub fn errno() -> libc::c_int {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}
