use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::result::Result as StdResult;
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::core::check::internet_checksum;
use crate::{
    Error,
    Result,
};

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 4]);

impl Address {
    pub const UNSPECIFIED: Address = Address([0; 4]);

    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Tries to create an IPv4 address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Exhausted);
        }

        let mut _addr: [u8; 4] = [0; 4];
        _addr.copy_from_slice(addr);
        Ok(Address(_addr))
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the address as a host byte order integer.
    pub fn as_u32(&self) -> u32 {
        NetworkEndian::read_u32(&self.0)
    }

    /// Checks if this is the 0.0.0.0 address.
    pub fn is_unspecified(&self) -> bool {
        self.0 == [0; 4]
    }
}

impl From<u32> for Address {
    /// Creates an address from a host byte order integer.
    fn from(addr: u32) -> Address {
        let mut bytes = [0; 4];
        NetworkEndian::write_u32(&mut bytes, addr);
        Address(bytes)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses an IPv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let mut ipv4: [u8; 4] = [0; 4];
        let mut tokens = addr.split('.');

        for byte in ipv4.iter_mut() {
            let token = tokens.next().ok_or(())?;
            *byte = token.parse::<u8>().map_err(|_| ())?;
        }

        if tokens.next().is_some() {
            return Err(());
        }

        Ok(Address::new(ipv4))
    }
}

/// [https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers](https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers)
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const TCP: u8 = 6;

    pub const UDP: u8 = 17;
}

mod fields {
    use std::ops::Range;

    pub const VERSION_AND_IHL: usize = 0;

    pub const DSCP_AND_ECN: usize = 1;

    pub const PACKET_LEN: Range<usize> = 2 .. 4;

    pub const IDENTIFICATION: Range<usize> = 4 .. 6;

    pub const FLAGS_AND_FRAGMENT_OFFSET: Range<usize> = 6 .. 8;

    pub const TTL: usize = 8;

    pub const PROTOCOL: usize = 9;

    pub const CHECKSUM: Range<usize> = 10 .. 12;

    pub const SRC_ADDR: Range<usize> = 12 .. 16;

    pub const DST_ADDR: Range<usize> = 16 .. 20;
}

/// View of a byte buffer as an IPv4 packet.
///
/// The buffer may extend past the end of the packet, e.g. because of
/// Ethernet padding; only the first packet_len() bytes belong to the packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const MIN_HEADER_LEN: usize = 20;

    /// Tries to create an IPv4 packet view over a byte buffer.
    ///
    /// The version, header length and packet length fields are validated
    /// against the buffer so the accessors below never read out of bounds.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        let buffer_len = buffer.as_ref().len();

        if buffer_len < Self::MIN_HEADER_LEN {
            return Err(Error::Exhausted);
        }

        let packet = Packet { buffer };

        if packet.ip_version() != 4 || packet.header_len() < Self::MIN_HEADER_LEN {
            return Err(Error::Malformed);
        }

        if packet.header_len() > buffer_len || packet.packet_len() as usize > buffer_len {
            return Err(Error::Exhausted);
        }

        if (packet.packet_len() as usize) < packet.header_len() {
            return Err(Error::Malformed);
        }

        Ok(packet)
    }

    /// Returns the length of an IPv4 packet with no options and the specified
    /// payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::MIN_HEADER_LEN + payload_len
    }

    /// Checks the header checksum.
    ///
    /// The checksum is recomputed with the checksum field zeroed and compared
    /// against the stored value.
    pub fn check_encoding(&self) -> Result<()> {
        if self.gen_header_checksum() != self.header_checksum() {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    /// Calculates the header checksum as if the checksum field were zero.
    pub fn gen_header_checksum(&self) -> u16 {
        let mut header = [0; 60];
        let header_len = self.header_len();
        header[.. header_len].copy_from_slice(self.header());
        header[fields::CHECKSUM].copy_from_slice(&[0, 0]);
        internet_checksum(&header[.. header_len])
    }

    pub fn ip_version(&self) -> u8 {
        self.buffer.as_ref()[fields::VERSION_AND_IHL] >> 4
    }

    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[fields::VERSION_AND_IHL] & 0x0F) as usize) * 4
    }

    pub fn dscp_ecn(&self) -> u8 {
        self.buffer.as_ref()[fields::DSCP_AND_ECN]
    }

    pub fn packet_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::PACKET_LEN])
    }

    pub fn identification(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::IDENTIFICATION])
    }

    pub fn flags(&self) -> u8 {
        self.buffer.as_ref()[fields::FLAGS_AND_FRAGMENT_OFFSET.start] >> 5
    }

    pub fn fragment_offset(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::FLAGS_AND_FRAGMENT_OFFSET]) & 0x1FFF
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[fields::TTL]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer.as_ref()[fields::PROTOCOL]
    }

    pub fn header_checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    pub fn src_addr(&self) -> Address {
        let mut addr = [0; 4];
        addr.copy_from_slice(&self.buffer.as_ref()[fields::SRC_ADDR]);
        Address(addr)
    }

    pub fn dst_addr(&self) -> Address {
        let mut addr = [0; 4];
        addr.copy_from_slice(&self.buffer.as_ref()[fields::DST_ADDR]);
        Address(addr)
    }

    /// Returns an immutable view of the header, including options.
    pub fn header(&self) -> &[u8] {
        &self.buffer.as_ref()[.. self.header_len()]
    }

    /// Returns an immutable view of the payload, excluding any trailing
    /// padding in the buffer.
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len() .. self.packet_len() as usize]
    }

    /// Returns the whole packet, excluding any trailing padding in the buffer.
    pub fn packet(&self) -> &[u8] {
        &self.buffer.as_ref()[.. self.packet_len() as usize]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.as_mut()[fields::TTL] = ttl;
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[fields::SRC_ADDR].copy_from_slice(addr.as_bytes());
    }

    pub fn set_dst_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[fields::DST_ADDR].copy_from_slice(addr.as_bytes());
    }

    pub fn set_header_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum);
    }

    /// Recomputes and writes the header checksum.
    pub fn fill_checksum(&mut self) {
        let checksum = self.gen_header_checksum();
        self.set_header_checksum(checksum);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let (header_len, packet_len) = (self.header_len(), self.packet_len() as usize);
        &mut self.buffer.as_mut()[header_len .. packet_len]
    }
}

/// Safe representation of an IPv4 header without options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_addr: Address,
    pub dst_addr: Address,
    pub protocol: u8,
    pub ttl: u8,
    pub identification: u16,
    pub payload_len: usize,
}

impl Repr {
    /// Returns the size of the IPv4 packet, header and payload, when
    /// serialized to a buffer.
    pub fn buffer_len(&self) -> usize {
        Packet::<&[u8]>::buffer_len(self.payload_len)
    }

    /// Deserializes an IPv4 packet's header into an IPv4 representation.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            src_addr: packet.src_addr(),
            dst_addr: packet.dst_addr(),
            protocol: packet.protocol(),
            ttl: packet.ttl(),
            identification: packet.identification(),
            payload_len: packet.payload().len(),
        }
    }

    /// Serializes a 20 byte header, checksum included, into the start of a
    /// buffer.
    ///
    /// The buffer must hold at least buffer_len() bytes; the payload itself
    /// is left to the caller.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < self.buffer_len() || self.buffer_len() > 0xFFFF {
            return Err(Error::Exhausted);
        }

        let header = &mut buffer[.. Packet::<&[u8]>::MIN_HEADER_LEN];
        header[fields::VERSION_AND_IHL] = 0x45;
        header[fields::DSCP_AND_ECN] = 0;
        NetworkEndian::write_u16(&mut header[fields::PACKET_LEN], self.buffer_len() as u16);
        NetworkEndian::write_u16(&mut header[fields::IDENTIFICATION], self.identification);
        NetworkEndian::write_u16(&mut header[fields::FLAGS_AND_FRAGMENT_OFFSET], 0);
        header[fields::TTL] = self.ttl;
        header[fields::PROTOCOL] = self.protocol;
        NetworkEndian::write_u16(&mut header[fields::CHECKSUM], 0);
        header[fields::SRC_ADDR].copy_from_slice(self.src_addr.as_bytes());
        header[fields::DST_ADDR].copy_from_slice(self.dst_addr.as_bytes());

        let checksum = internet_checksum(header);
        NetworkEndian::write_u16(&mut header[fields::CHECKSUM], checksum);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_buffer_less_than_min_header() {
        let buffer: [u8; 1] = [0; 1];
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Exhausted));
    }

    #[test]
    fn test_packet_wrong_version() {
        let mut buffer: [u8; 20] = [0; 20];
        buffer[0] = 0x65;
        buffer[3] = 20;
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Malformed));
    }

    #[test]
    fn test_packet_header_less_than_min_header() {
        let mut buffer: [u8; 20] = [0; 20];
        buffer[0] = 0x44;
        buffer[3] = 20;
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Malformed));
    }

    #[test]
    fn test_packet_buffer_less_than_header() {
        // 0x0F = 15 words = 60 bytes
        let mut buffer: [u8; 20] = [0; 20];
        buffer[0] = 0x4F;
        buffer[3] = 20;
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Exhausted));
    }

    #[test]
    fn test_packet_buffer_less_than_packet() {
        let mut buffer: [u8; 20] = [0; 20];
        buffer[0] = 0x45;
        buffer[2] = 0xFF;
        buffer[3] = 0xFF;
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Exhausted));
    }

    #[test]
    fn test_packet_with_valid_buffer() {
        let buffer: [u8; 40] = [
            0x45, 0x11, 0x00, 0x24, 0xFF, 0xFF, 0x41, 0x01, 0x02, 0x03, 0x00, 0x04, 0x01, 0x02,
            0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE, 0xEE, 0xEE, 0xEE,
        ];

        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_eq!(4, packet.ip_version());
        assert_eq!(20, packet.header_len());
        assert_eq!(0x11, packet.dscp_ecn());
        assert_eq!(36, packet.packet_len());
        assert_eq!(65535, packet.identification());
        assert_eq!(2, packet.flags());
        assert_eq!(257, packet.fragment_offset());
        assert_eq!(2, packet.ttl());
        assert_eq!(3, packet.protocol());
        assert_eq!(4, packet.header_checksum());
        assert_eq!(Address::new([1, 2, 3, 4]), packet.src_addr());
        assert_eq!(Address::new([5, 6, 7, 8]), packet.dst_addr());
        // Trailing padding is not part of the payload.
        assert_eq!(16, packet.payload().len());
        assert_eq!(1, packet.payload()[0]);
    }

    #[test]
    fn test_serialize_produces_valid_checksum() {
        let repr = Repr {
            src_addr: Address::new([10, 0, 1, 1]),
            dst_addr: Address::new([10, 0, 2, 2]),
            protocol: protocols::ICMP,
            ttl: 64,
            identification: 0x1234,
            payload_len: 8,
        };

        let mut buffer = vec![0; repr.buffer_len()];
        repr.serialize(&mut buffer).unwrap();

        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Ok(()));
        assert_eq!(internet_checksum(packet.header()), 0);
        assert_eq!(Repr::deserialize(&packet), repr);
    }

    #[test]
    fn test_check_encoding_detects_corruption() {
        let repr = Repr {
            src_addr: Address::new([10, 0, 1, 1]),
            dst_addr: Address::new([10, 0, 2, 2]),
            protocol: protocols::UDP,
            ttl: 64,
            identification: 0,
            payload_len: 0,
        };

        let mut buffer = vec![0; repr.buffer_len()];
        repr.serialize(&mut buffer).unwrap();
        buffer[8] = 63;

        let mut packet = Packet::try_new(&mut buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Checksum));

        packet.fill_checksum();
        assert_matches!(packet.check_encoding(), Ok(()));
    }

    #[test]
    fn test_address_conversions() {
        let addr: Address = "10.0.1.5".parse().unwrap();
        assert_eq!(addr, Address::new([10, 0, 1, 5]));
        assert_eq!(addr.as_u32(), 0x0A000105);
        assert_eq!(Address::from(0x0A000105), addr);
        assert_eq!(addr.to_string(), "10.0.1.5");
        assert_eq!("10.0.1".parse::<Address>(), Err(()));
        assert_eq!("10.0.1.256".parse::<Address>(), Err(()));
        assert_eq!("10.0.1.5.6".parse::<Address>(), Err(()));
    }
}
