use crate::details::icmp::v4::SequenceNumber;
use crate::ReplyKind;
use std::io;
use std::net::IpAddr;
use std::time::Instant;

/// The (identifier, sequence number) pair a probe carries in its echo header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ProbeIdentity {
    pub identifier: u16,
    pub sequence_number: SequenceNumber,
}

impl ProbeIdentity {
    pub(crate) fn new(identifier: u16, sequence_number: SequenceNumber) -> Self {
        ProbeIdentity { identifier, sequence_number }
    }
}

/// A raw datagram as handed over by the socket.
#[derive(Debug)]
pub(crate) struct ReceivedPacket {
    pub bytes: Vec<u8>,
    pub source: IpAddr,
    pub received_at: Instant,
}

#[derive(Debug)]
pub(crate) enum ReceiveOutcome {
    Packet(ReceivedPacket),
    Timeout,
    Error(io::Error),
}

/// A classified ICMP message. `identity` is `None` when the message does not carry one of our probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReceivedReply {
    pub kind: ReplyKind,
    pub source: IpAddr,
    pub identity: Option<ProbeIdentity>,
    pub received_at: Instant,
}
