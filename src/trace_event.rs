use std::fmt;
use std::net::IpAddr;
use std::sync::mpsc;
use std::time::Duration;

/// How a received ICMP message was classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    TimeExceeded,
    EchoReply,
    Other,
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyKind::TimeExceeded => write!(f, "TimeExceeded"),
            ReplyKind::EchoReply => write!(f, "EchoReply"),
            ReplyKind::Other => write!(f, "Other"),
        }
    }
}

/// Progress of a trace. `pass` 0 is the discovery pass, `hop` the TTL of the probe concerned.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    ProbeSent { pass: u16, hop: u8, sequence_number: u16 },
    SendFailed { pass: u16, hop: u8, message: String },
    ReplyAccepted { pass: u16, hop: u8, kind: ReplyKind, source: IpAddr, sequence_number: u16, rtt: Duration },
    ForeignPacketIgnored { pass: u16, hop: u8, source: IpAddr },
    MalformedPacket { pass: u16, hop: u8, source: IpAddr, message: String },
    ReceiveFailed { pass: u16, hop: u8, message: String },
    ProbeTimedOut { pass: u16, hop: u8 },
    HopDiscovered { hop: u8, address: IpAddr, display_name: String, kind: ReplyKind },
    HopSilent { hop: u8 },
    DestinationReached { pass: u16, hop: u8 },
    PassCompleted { pass: u16 },
}

/// Receives the events of a running trace, in order.
pub trait TraceEventSink {
    fn on_event(&mut self, event: TraceEvent);
}

impl TraceEventSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

impl TraceEventSink for mpsc::Sender<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        // mpsc::Sender::send() returns error only if mpsc::Receiver is closed.
        if self.send(event).is_err() {
            tracing::debug!("trace event receiver is gone");
        }
    }
}
