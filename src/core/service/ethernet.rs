use crate::core::repr::{
    eth_types,
    EthernetFrame,
};
use crate::core::service::{
    arp,
    ipv4,
    Interface,
    Outcome,
    Router,
};
use crate::core::time::Env;
use crate::{
    Error,
    Result,
};

/// Send an Ethernet frame via an interface.
///
/// The frame's source address is set to the interface address; the closure
/// fills in the rest.
pub fn send_frame<T, F>(
    router: &Router<T>,
    interface: &Interface,
    eth_frame_len: usize,
    f: F,
) -> Result<()>
where
    T: Env,
    F: FnOnce(&mut EthernetFrame<&mut [u8]>) -> Result<()>,
{
    let mut eth_buffer = vec![0; eth_frame_len];
    let mut eth_frame = EthernetFrame::try_new(&mut eth_buffer[..])?;
    eth_frame.set_src_addr(interface.ethernet_addr);
    f(&mut eth_frame)?;
    router.send(eth_frame.as_ref(), &interface.name);
    Ok(())
}

/// Receives an Ethernet frame from an interface.
///
/// The frame is dispatched on its payload type; anything other than ARP or
/// IPv4 is ignored.
pub fn recv_frame<T: Env>(
    router: &Router<T>,
    ingress: &Interface,
    eth_buffer: &[u8],
) -> Result<Outcome> {
    let eth_frame = EthernetFrame::try_new(eth_buffer)?;

    match eth_frame.payload_type() {
        eth_types::ARP => arp::recv_packet(router, ingress, &eth_frame),
        eth_types::IPV4 => ipv4::recv_packet(router, ingress, &eth_frame),
        i => {
            debug!("Ignoring ethernet frame with type 0x{:04X}.", i);
            Err(Error::Ignored)
        }
    }
}
