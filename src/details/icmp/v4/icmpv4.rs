use super::codec;
use super::{TSocket, Ttl};
use crate::details::records::{ProbeIdentity, ReceiveOutcome, ReceivedPacket};
use crate::details::TraceError;
use pnet_packet::Packet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::result::Result;
use std::time::{Duration, Instant};

// Large enough for any Time Exceeded a router sends back, including quoted options.
const RECV_BUFFER_SIZE: usize = 1600;

// The socket read timeout has microsecond resolution and a zero timeout blocks without limit.
pub(crate) const MIN_RECEIVE_TIMEOUT: Duration = Duration::from_micros(1);

pub(crate) struct IcmpV4<S> {
    payload: [u8; codec::PAYLOAD_SIZE],
    socket: S,
}

impl<S> IcmpV4<S>
where
    S: TSocket + 'static,
{
    pub(crate) fn new(socket: S) -> IcmpV4<S> {
        IcmpV4 { payload: codec::new_probe_payload(), socket }
    }

    /// Sends one echo probe carrying `identity` with the given TTL and returns the send time.
    pub(crate) fn send_probe(&self, ipv4: Ipv4Addr, ttl: Ttl, identity: ProbeIdentity) -> Result<Instant, TraceError> {
        let addr = SocketAddr::new(IpAddr::V4(ipv4), 0);

        let package = codec::new_echo_probe_package(identity, &self.payload)
            .ok_or_else(|| TraceError::new("could not create ICMP package"))?;

        let addr2: socket2::SockAddr = addr.into();
        let send_time: Instant = Instant::now();
        self.socket.send_to(package.packet(), &addr2, ttl)?;
        tracing::trace!("probe {} sent to {} with ttl {}", identity.sequence_number, ipv4, ttl);

        Ok(send_time)
    }

    /// Waits for the next datagram until `deadline`. Less than `MIN_RECEIVE_TIMEOUT` left is a timeout without
    /// touching the socket.
    pub(crate) fn receive_with_deadline(&self, deadline: Instant) -> ReceiveOutcome {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining < MIN_RECEIVE_TIMEOUT {
            return ReceiveOutcome::Timeout;
        }

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        match self.socket.recv_from(&mut buf, remaining) {
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => ReceiveOutcome::Timeout,
            Err(e) => ReceiveOutcome::Error(e),
            Ok((n_bytes, source)) => {
                let received_at: Instant = Instant::now();
                tracing::trace!("{} bytes received from {}", n_bytes, source);
                ReceiveOutcome::Packet(ReceivedPacket { bytes: buf[..n_bytes].to_vec(), source, received_at })
            }
        }
    }
}
