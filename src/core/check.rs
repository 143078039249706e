use byteorder::{
    ByteOrder,
    NetworkEndian,
};

/// Calculates the Internet Checksum from [RFC1071](https://tools.ietf.org/html/rfc1071).
///
/// A buffer with a valid checksum embedded in it sums to zero. See
/// [IPv4 header checksum](https://en.wikipedia.org/wiki/IPv4_header_checksum)
/// for an example.
pub fn internet_checksum(buffer: &[u8]) -> u16 {
    let mut acc: u32 = 0;

    let mut words = buffer.chunks_exact(2);
    for word in &mut words {
        acc += NetworkEndian::read_u16(word) as u32;
    }

    if let [last] = words.remainder() {
        acc += (*last as u32) << 8;
    }

    while acc > 0xFFFF {
        acc = (acc & 0xFFFF) + (acc >> 16);
    }

    !(acc as u16)
}
