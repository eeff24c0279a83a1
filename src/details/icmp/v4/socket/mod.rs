use crate::details::icmp::v4::Ttl;
use std::{io, net::IpAddr, time::Duration};

pub(crate) mod raw_socket;

pub(crate) trait TSocket: Send + Sync {
    /// Sends `buf` with the given time-to-live. The TTL applies to this send only as far as callers are concerned.
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr, ttl: Ttl) -> io::Result<usize>;
    /// Receives one IPv4 datagram, waiting at most `timeout`.
    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::{HashSet, VecDeque};
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::sync::Mutex;

    use pnet_packet::icmp::checksum;
    use pnet_packet::icmp::echo_reply::EchoReplyPacket;
    use pnet_packet::icmp::echo_reply::MutableEchoReplyPacket;
    use pnet_packet::icmp::echo_request::EchoRequestPacket;
    use pnet_packet::icmp::IcmpCode;
    use pnet_packet::icmp::IcmpPacket;
    use pnet_packet::icmp::IcmpType;
    use pnet_packet::Packet;

    pub(crate) const LOCAL_HOST: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 100);
    pub(crate) const FOREIGN_HOST: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 99);

    pub(crate) fn ipv4_datagram(source: Ipv4Addr, icmp: &[u8]) -> Vec<u8> {
        let mut datagram = ipv4_header(source, LOCAL_HOST, 64, 0, icmp.len());
        datagram.extend_from_slice(icmp);
        datagram
    }

    fn ipv4_header(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        ttl: u8,
        option_words: u8,
        payload_len: usize,
    ) -> Vec<u8> {
        let header_len = usize::from(5 + option_words) * 4;
        let total_len = u16::try_from(header_len + payload_len).unwrap();
        let mut header = vec![0x40 | (5 + option_words), 0];
        header.extend_from_slice(&total_len.to_be_bytes());
        header.extend_from_slice(&[0, 0, 0, 0, ttl, 1, 0, 0]);
        header.extend_from_slice(&source.octets());
        header.extend_from_slice(&destination.octets());
        header.resize(header_len, 0);
        header
    }

    /// A router's Time Exceeded message quoting the first 8 bytes of `original_icmp`.
    pub(crate) fn time_exceeded_message(original_icmp: &[u8], original_destination: Ipv4Addr, option_words: u8) -> Vec<u8> {
        let mut message = vec![11, 0, 0, 0, 0, 0, 0, 0];
        message.extend(ipv4_header(LOCAL_HOST, original_destination, 1, option_words, original_icmp.len()));
        message.extend_from_slice(&original_icmp[..original_icmp.len().min(8)]);
        let icmp_checksum = checksum(&IcmpPacket::new(&message).unwrap());
        message[2..4].copy_from_slice(&icmp_checksum.to_be_bytes());
        message
    }

    pub(crate) fn echo_reply_message(identifier: u16, sequence_number: u16, payload: &[u8]) -> Vec<u8> {
        let buf = vec![0u8; EchoReplyPacket::minimum_packet_size() + payload.len()];
        let mut package: MutableEchoReplyPacket<'_> = MutableEchoReplyPacket::owned(buf).unwrap();
        package.set_icmp_type(IcmpType::new(0)); // echo reply
        package.set_icmp_code(IcmpCode::new(0)); // echo reply
        package.set_identifier(identifier);
        package.set_sequence_number(sequence_number);
        package.set_payload(payload);
        package.set_checksum(0_u16);
        package.set_checksum(checksum(&IcmpPacket::new(package.packet()).unwrap()));
        package.packet().to_vec()
    }

    // Same probe, but with an identifier nobody on this host used.
    fn foreign_copy_of(probe: &[u8]) -> Vec<u8> {
        let mut foreign = probe.to_vec();
        if foreign.len() >= 6 {
            foreign[4] ^= 0xFF;
            foreign[5] ^= 0xFF;
        }
        foreign
    }

    /// The path the mock simulates: `routers[i]` answers probes with TTL `i + 1` (`None` stays silent),
    /// every larger TTL reaches `destination`.
    #[derive(Clone, Debug)]
    pub(crate) struct Route {
        pub routers: Vec<Option<Ipv4Addr>>,
        pub destination: Ipv4Addr,
    }

    impl Route {
        fn reply_to(&self, probe: &[u8], ttl: Ttl) -> Option<(Vec<u8>, IpAddr)> {
            let hop = usize::from(ttl.0);
            if hop <= self.routers.len() {
                let router = self.routers[hop - 1]?;
                let message = time_exceeded_message(probe, self.destination, 0);
                return Some((ipv4_datagram(router, &message), IpAddr::V4(router)));
            }
            let echo_request = EchoRequestPacket::new(probe)?;
            let message = echo_reply_message(
                echo_request.get_identifier(),
                echo_request.get_sequence_number(),
                echo_request.payload(),
            );
            Some((ipv4_datagram(self.destination, &message), IpAddr::V4(self.destination)))
        }
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    pub(crate) enum OnSend {
        ReturnErr,
        ReturnDefault,
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    pub(crate) enum OnReceive {
        /// Replies according to the route; an empty inbox reports would-block.
        ReturnRouteReplies,
        ReturnErr,
        ReturnForeignPackets,
    }

    #[derive(Clone, Debug)]
    pub(crate) struct SentProbe {
        pub bytes: Vec<u8>,
        pub ip_addr: IpAddr,
        pub ttl: Ttl,
    }

    impl SentProbe {
        pub(crate) fn sequence_number(&self) -> u16 {
            EchoRequestPacket::new(&self.bytes).unwrap().get_sequence_number()
        }
    }

    #[derive(Default)]
    struct MockState {
        sent: Vec<SentProbe>,
        inbox: VecDeque<(Vec<u8>, IpAddr)>,
        received_cnt: usize,
        lost_replies: HashSet<usize>,
        foreign_before_reply: usize,
        malformed_before_reply: bool,
        stale_before_reply: bool,
        receive_timeouts: Vec<Duration>,
    }

    #[derive(Clone)]
    pub(crate) struct SocketMock {
        on_send: OnSend,
        on_receive: OnReceive,
        route: Route,
        state: Arc<Mutex<MockState>>,
    }

    impl SocketMock {
        pub(crate) fn new(on_send: OnSend, on_receive: OnReceive, route: Route) -> Self {
            Self { on_send, on_receive, route, state: Arc::new(Mutex::new(MockState::default())) }
        }

        pub(crate) fn with_route(routers: &[Option<Ipv4Addr>], destination: Ipv4Addr) -> Self {
            Self::new(
                OnSend::ReturnDefault,
                OnReceive::ReturnRouteReplies,
                Route { routers: routers.to_vec(), destination },
            )
        }

        /// Drops the genuine reply to the `n`-th probe sent (counting from 1).
        pub(crate) fn losing_reply_to_probe(self, n: usize) -> Self {
            self.state.lock().unwrap().lost_replies.insert(n);
            self
        }

        pub(crate) fn with_foreign_packets_before_each_reply(self, n: usize) -> Self {
            self.state.lock().unwrap().foreign_before_reply = n;
            self
        }

        pub(crate) fn with_malformed_packet_before_each_reply(self) -> Self {
            self.state.lock().unwrap().malformed_before_reply = true;
            self
        }

        /// Before each genuine reply, answers the previous probe again as a late duplicate.
        pub(crate) fn with_stale_reply_before_each_reply(self) -> Self {
            self.state.lock().unwrap().stale_before_reply = true;
            self
        }

        pub(crate) fn sent_probes(&self) -> Vec<SentProbe> {
            self.state.lock().unwrap().sent.clone()
        }

        pub(crate) fn should_send_number_of_messages(&self, n: usize) -> &Self {
            assert_eq!(n, self.state.lock().unwrap().sent.len());
            self
        }

        pub(crate) fn should_send_to_address(&self, addr: &IpAddr) -> &Self {
            assert!(self.state.lock().unwrap().sent.iter().any(|e| *addr == e.ip_addr));
            self
        }

        pub(crate) fn should_receive_number_of_messages(&self, n: usize) -> &Self {
            assert_eq!(n, self.state.lock().unwrap().received_cnt);
            self
        }

        pub(crate) fn should_wait_at_least(&self, min: Duration) -> &Self {
            assert!(self.state.lock().unwrap().receive_timeouts.iter().all(|timeout| *timeout >= min));
            self
        }
    }

    impl TSocket for SocketMock {
        fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr, ttl: Ttl) -> io::Result<usize> {
            if self.on_send == OnSend::ReturnErr {
                return Err(io::Error::new(io::ErrorKind::Other, "simulating error in mock"));
            }
            let ip_addr = addr
                .as_socket()
                .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "error in extracting IP address from SockAddr"))?
                .ip();

            let mut state = self.state.lock().unwrap();
            let previous = state.sent.last().cloned();
            state.sent.push(SentProbe { bytes: buf.to_vec(), ip_addr, ttl });
            let probe_number = state.sent.len();

            if self.on_receive != OnReceive::ReturnRouteReplies {
                return Ok(buf.len());
            }
            for _ in 0..state.foreign_before_reply {
                let message = time_exceeded_message(&foreign_copy_of(buf), self.route.destination, 0);
                state.inbox.push_back((ipv4_datagram(FOREIGN_HOST, &message), IpAddr::V4(FOREIGN_HOST)));
            }
            if state.stale_before_reply {
                if let Some(stale) = previous.and_then(|previous| self.route.reply_to(&previous.bytes, ttl)) {
                    state.inbox.push_back(stale);
                }
            }
            if state.malformed_before_reply {
                state.inbox.push_back((vec![0x45, 0, 0, 3], IpAddr::V4(FOREIGN_HOST)));
            }
            if !state.lost_replies.contains(&probe_number) {
                if let Some(reply) = self.route.reply_to(buf, ttl) {
                    state.inbox.push_back(reply);
                }
            }
            Ok(buf.len())
        }

        fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)> {
            let mut state = self.state.lock().unwrap();
            state.receive_timeouts.push(timeout);
            let (datagram, source) = match self.on_receive {
                OnReceive::ReturnErr => {
                    return Err(io::Error::new(io::ErrorKind::Other, "simulating error in mock"));
                }
                OnReceive::ReturnForeignPackets => {
                    let probe = state.sent.last().map(|probe| probe.bytes.clone()).unwrap_or_default();
                    let message = echo_reply_message(0, 0, &foreign_copy_of(&probe));
                    (ipv4_datagram(FOREIGN_HOST, &message), IpAddr::V4(FOREIGN_HOST))
                }
                OnReceive::ReturnRouteReplies => match state.inbox.pop_front() {
                    Some(entry) => entry,
                    None => {
                        return Err(io::Error::new(io::ErrorKind::WouldBlock, "simulating would-block in mock"));
                    }
                },
            };
            state.received_cnt += 1;

            if buf.len() < datagram.len() {
                return Err(io::Error::new(io::ErrorKind::Other, "buffer too small"));
            }
            buf[..datagram.len()].copy_from_slice(&datagram);
            Ok((datagram.len(), source))
        }
    }
}
