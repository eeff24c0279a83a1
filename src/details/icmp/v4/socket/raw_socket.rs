use super::TSocket;
use crate::details::icmp::v4::icmpv4::MIN_RECEIVE_TIMEOUT;
use crate::details::icmp::v4::Ttl;
use socket2::{Domain, Protocol, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::{io, time::Duration};

pub(crate) struct RawSocket {
    socket: socket2::Socket,
}

impl RawSocket {
    /// Opens a raw ICMPv4 socket bound to `source` (`0.0.0.0` binds to any local address).
    pub(crate) fn new(source: Ipv4Addr) -> Result<Self, io::Error> {
        tracing::trace!("creating RawSocket bound to {}", source);
        let socket = socket2::Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        socket.bind(&SocketAddr::new(IpAddr::V4(source), 0).into())?;
        Ok(RawSocket { socket })
    }
}

impl TSocket for RawSocket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr, ttl: Ttl) -> io::Result<usize> {
        self.socket.set_ttl(ttl.into())?;
        self.socket.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)> {
        self.socket.set_read_timeout(Some(timeout.max(MIN_RECEIVE_TIMEOUT)))?;

        // Socket2 gives a safety guaranty which allows us to do an unsafe cast from `&mut [u8]`
        // to `&mut [std::mem::MaybeUninit<u8>]`: it never writes uninitialized bytes into the buffer.
        // https://docs.rs/socket2/0.4.7/socket2/struct.Socket.html#method.recv
        //
        // On a RAW socket we get the whole IP packet, header included.
        let (n_bytes, socket_addr) = self.socket.recv_from(unsafe {
            &mut *(buf as *mut [u8] as *mut [std::mem::MaybeUninit<u8>])
        })?;
        let ip = socket_addr
            .as_socket_ipv4()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "received from a non-IPv4 address"))?;
        Ok((n_bytes, IpAddr::V4(*ip.ip())))
    }
}
