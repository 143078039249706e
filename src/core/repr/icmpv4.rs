use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::core::check::internet_checksum;
use crate::{
    Error,
    Result,
};

/// Safe representation of an ICMP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repr {
    EchoReply {
        id: u16,
        seq: u16,
    },
    EchoRequest {
        id: u16,
        seq: u16,
    },
    /// Carries payload_len bytes of the datagram that triggered the error.
    DestinationUnreachable {
        reason: DestinationUnreachable,
        payload_len: usize,
    },
    TimeExceeded {
        reason: TimeExceeded,
        payload_len: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestinationUnreachable {
    NetUnreachable = 0,
    HostUnreachable = 1,
    PortUnreachable = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeExceeded {
    TtlExpired = 0,
}

/// [https://www.iana.org/assignments/icmp-parameters/icmp-parameters.xhtml](https://www.iana.org/assignments/icmp-parameters/icmp-parameters.xhtml)
pub mod types {
    pub const ECHO_REPLY: u8 = 0;

    pub const DESTINATION_UNREACHABLE: u8 = 3;

    pub const ECHO_REQUEST: u8 = 8;

    pub const TIME_EXCEEDED: u8 = 11;
}

impl Repr {
    /// Returns the ICMP packet size needed to serialize this ICMP
    /// representation.
    ///
    /// Echo payloads are not accounted for and are left to the caller.
    pub fn buffer_len(&self) -> usize {
        match *self {
            Repr::DestinationUnreachable { payload_len, .. } => {
                Packet::<&[u8]>::buffer_len(payload_len)
            }
            Repr::TimeExceeded { payload_len, .. } => Packet::<&[u8]>::buffer_len(payload_len),
            _ => Packet::<&[u8]>::HEADER_LEN,
        }
    }

    /// Tries to deserialize a packet into an ICMP representation.
    pub fn deserialize<T>(packet: &Packet<T>) -> Result<Repr>
    where
        T: AsRef<[u8]>,
    {
        let echo_id_seq = || {
            (
                NetworkEndian::read_u16(&packet.header()[0 .. 2]),
                NetworkEndian::read_u16(&packet.header()[2 .. 4]),
            )
        };

        let payload_len = packet.payload().len();

        match (packet._type(), packet.code()) {
            (types::ECHO_REPLY, 0) => {
                let (id, seq) = echo_id_seq();
                Ok(Repr::EchoReply { id, seq })
            }
            (types::ECHO_REQUEST, 0) => {
                let (id, seq) = echo_id_seq();
                Ok(Repr::EchoRequest { id, seq })
            }
            (types::DESTINATION_UNREACHABLE, code) => {
                let reason = match code {
                    0 => DestinationUnreachable::NetUnreachable,
                    1 => DestinationUnreachable::HostUnreachable,
                    3 => DestinationUnreachable::PortUnreachable,
                    _ => return Err(Error::Malformed),
                };
                Ok(Repr::DestinationUnreachable {
                    reason,
                    payload_len,
                })
            }
            (types::TIME_EXCEEDED, 0) => Ok(Repr::TimeExceeded {
                reason: TimeExceeded::TtlExpired,
                payload_len,
            }),
            _ => Err(Error::Malformed),
        }
    }

    /// Serializes the ICMP representation into a packet.
    ///
    /// The checksum covers the payload, so the payload must be written to the
    /// packet BEFORE serializing the representation.
    pub fn serialize<T>(&self, packet: &mut Packet<T>) -> Result<()>
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        fn echo<T>(packet: &mut Packet<T>, type_of: u8, id: u16, seq: u16)
        where
            T: AsRef<[u8]> + AsMut<[u8]>,
        {
            packet.set_type(type_of);
            packet.set_code(0);
            NetworkEndian::write_u16(&mut packet.header_mut()[0 .. 2], id);
            NetworkEndian::write_u16(&mut packet.header_mut()[2 .. 4], seq);
        }

        fn error<T>(packet: &mut Packet<T>, payload_len: usize, type_of: u8, code: u8) -> Result<()>
        where
            T: AsRef<[u8]> + AsMut<[u8]>,
        {
            if packet.payload().len() != payload_len {
                return Err(Error::Malformed);
            }
            packet.set_type(type_of);
            packet.set_code(code);
            packet.header_mut().copy_from_slice(&[0; 4]);
            Ok(())
        }

        match *self {
            Repr::EchoReply { id, seq } => echo(packet, types::ECHO_REPLY, id, seq),
            Repr::EchoRequest { id, seq } => echo(packet, types::ECHO_REQUEST, id, seq),
            Repr::DestinationUnreachable {
                reason,
                payload_len,
            } => error(
                packet,
                payload_len,
                types::DESTINATION_UNREACHABLE,
                reason as u8,
            )?,
            Repr::TimeExceeded {
                reason,
                payload_len,
            } => error(packet, payload_len, types::TIME_EXCEEDED, reason as u8)?,
        };

        packet.fill_checksum();

        Ok(())
    }
}

/// [https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol](https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol)
mod fields {
    use std::ops::{
        Range,
        RangeFrom,
    };

    pub const TYPE: usize = 0;

    pub const CODE: usize = 1;

    pub const CHECKSUM: Range<usize> = 2 .. 4;

    pub const HEADER: Range<usize> = 4 .. 8;

    pub const PAYLOAD: RangeFrom<usize> = 8 ..;
}

/// View of a byte buffer as an ICMP packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 8;

    pub const MAX_PACKET_LEN: usize = 65515;

    /// Tries to create an ICMP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN || buffer.as_ref().len() > Self::MAX_PACKET_LEN
        {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of an ICMP packet with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    /// Checks if the packet has a valid checksum.
    pub fn check_encoding(&self) -> Result<()> {
        if internet_checksum(self.buffer.as_ref()) != 0 {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    pub fn _type(&self) -> u8 {
        self.buffer.as_ref()[fields::TYPE]
    }

    pub fn code(&self) -> u8 {
        self.buffer.as_ref()[fields::CODE]
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    pub fn header(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::HEADER]
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::PAYLOAD]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_type(&mut self, type_of: u8) {
        self.buffer.as_mut()[fields::TYPE] = type_of
    }

    pub fn set_code(&mut self, code: u8) {
        self.buffer.as_mut()[fields::CODE] = code;
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum);
    }

    /// Computes the checksum over the whole packet and writes it.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = internet_checksum(self.buffer.as_ref());
        self.set_checksum(checksum);
    }

    pub fn header_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::HEADER]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::PAYLOAD]
    }
}
