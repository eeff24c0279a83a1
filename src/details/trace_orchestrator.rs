use crate::details::correlator::is_own_reply;
use crate::details::hop_registry::HopRegistry;
use crate::details::icmp::v4::codec;
use crate::details::icmp::v4::{IcmpV4, SequenceNumber, TSocket, Ttl};
use crate::details::records::{ProbeIdentity, ReceiveOutcome, ReceivedReply};
use crate::details::stats;
use crate::{HopSummary, HostNameResolver, ReplyKind, TraceEvent, TraceEventSink};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Upper bound on datagrams inspected while waiting for one reply. Unrelated ICMP traffic may arrive
/// faster than the timeout elapses; running out of attempts counts as a timeout.
pub(crate) const MAX_RECEIVE_ATTEMPTS: usize = 1000;

/// Longest wait for one reply. Longer timeouts are cut down to this.
pub(crate) const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Run parameters, already validated.
#[derive(Clone, Debug)]
pub(crate) struct TraceSettings {
    pub destination: Ipv4Addr,
    pub max_hops: Ttl,
    pub send_count: u16,
    pub timeout: Duration,
    pub debug: bool,
    pub identifier: u16,
}

enum ProbeOutcome {
    Reply { reply: ReceivedReply, rtt: Duration },
    Timeout,
    SocketError,
}

/// Drives pass 0 (discovery) and passes `1..=send_count` (statistics), one probe in flight at a time.
pub(crate) struct TraceOrchestrator<S> {
    icmpv4: IcmpV4<S>,
    settings: TraceSettings,
    registry: HopRegistry,
    next_sequence_number: SequenceNumber,
}

impl<S> TraceOrchestrator<S>
where
    S: TSocket + 'static,
{
    pub(crate) fn new(icmpv4: IcmpV4<S>, settings: TraceSettings) -> Self {
        TraceOrchestrator {
            icmpv4,
            settings,
            registry: HopRegistry::new(),
            next_sequence_number: SequenceNumber::start_value(),
        }
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &HopRegistry {
        &self.registry
    }

    pub(crate) fn run<R, E>(&mut self, resolver: &R, sink: &mut E) -> Vec<HopSummary>
    where
        R: HostNameResolver + ?Sized,
        E: TraceEventSink + ?Sized,
    {
        tracing::debug!(
            "tracing {} with max {} hops, {} statistics passes",
            self.settings.destination,
            self.settings.max_hops,
            self.settings.send_count
        );
        for pass in 0..=self.settings.send_count {
            for hop_distance in self.settings.max_hops.hops_up_to() {
                if pass > 0 && self.registry.is_silent(hop_distance) {
                    tracing::trace!("pass {}: skipping silent hop {}", pass, hop_distance);
                    continue;
                }
                let Some(outcome) = self.probe(pass, hop_distance, sink) else {
                    continue;
                };
                if self.book(pass, hop_distance, outcome, resolver, sink) == Some(ReplyKind::EchoReply) {
                    sink.on_event(TraceEvent::DestinationReached { pass, hop: hop_distance.into() });
                    break;
                }
            }
            sink.on_event(TraceEvent::PassCompleted { pass });
        }
        tracing::debug!("trace finished with {} hop records", self.registry.len());
        stats::summarize(&self.registry)
    }

    // Sends one probe and waits for its reply. `None` if nothing could be sent.
    fn probe<E>(&mut self, pass: u16, hop_distance: Ttl, sink: &mut E) -> Option<ProbeOutcome>
    where
        E: TraceEventSink + ?Sized,
    {
        let identity = ProbeIdentity::new(self.settings.identifier, self.next_sequence_number);
        self.next_sequence_number = self.next_sequence_number.next();
        let hop = hop_distance.into();

        let send_time = match self.icmpv4.send_probe(self.settings.destination, hop_distance, identity) {
            Ok(send_time) => send_time,
            Err(e) => {
                tracing::warn!("pass {}: sending probe with ttl {} failed: {}", pass, hop_distance, e);
                sink.on_event(TraceEvent::SendFailed { pass, hop, message: e.to_string() });
                return None;
            }
        };
        if pass > 0 {
            self.registry.record_send(hop_distance);
        }
        sink.on_event(TraceEvent::ProbeSent { pass, hop, sequence_number: identity.sequence_number.into() });

        Some(self.await_reply(pass, hop_distance, identity, send_time, sink))
    }

    fn await_reply<E>(
        &self,
        pass: u16,
        hop_distance: Ttl,
        expected: ProbeIdentity,
        send_time: Instant,
        sink: &mut E,
    ) -> ProbeOutcome
    where
        E: TraceEventSink + ?Sized,
    {
        let hop = hop_distance.into();
        let deadline = send_time + self.settings.timeout.min(MAX_TIMEOUT);

        for _ in 0..MAX_RECEIVE_ATTEMPTS {
            let packet = match self.icmpv4.receive_with_deadline(deadline) {
                ReceiveOutcome::Packet(packet) => packet,
                ReceiveOutcome::Timeout => {
                    sink.on_event(TraceEvent::ProbeTimedOut { pass, hop });
                    return ProbeOutcome::Timeout;
                }
                ReceiveOutcome::Error(e) => {
                    tracing::error!("pass {}: receiving reply for ttl {} failed: {}", pass, hop_distance, e);
                    sink.on_event(TraceEvent::ReceiveFailed { pass, hop, message: e.to_string() });
                    return ProbeOutcome::SocketError;
                }
            };
            if self.settings.debug {
                tracing::debug!("datagram from {}: {}", packet.source, hex(&packet.bytes));
            }

            let reply = match codec::decode_datagram(&packet.bytes, packet.source, packet.received_at) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::debug!("ignoring datagram from {}: {}", packet.source, e);
                    sink.on_event(TraceEvent::MalformedPacket {
                        pass,
                        hop,
                        source: packet.source,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            if !is_own_reply(reply.identity, expected) {
                tracing::trace!("ignoring {} from {} ({:?})", reply.kind, reply.source, reply.identity);
                sink.on_event(TraceEvent::ForeignPacketIgnored { pass, hop, source: reply.source });
                continue;
            }

            let rtt = reply.received_at.saturating_duration_since(send_time);
            sink.on_event(TraceEvent::ReplyAccepted {
                pass,
                hop,
                kind: reply.kind,
                source: reply.source,
                sequence_number: expected.sequence_number.into(),
                rtt,
            });
            return ProbeOutcome::Reply { reply, rtt };
        }

        tracing::warn!("pass {}: no reply for ttl {} within {} datagrams", pass, hop_distance, MAX_RECEIVE_ATTEMPTS);
        sink.on_event(TraceEvent::ProbeTimedOut { pass, hop });
        ProbeOutcome::Timeout
    }

    // Applies the outcome of one probe to the registry; returns the kind of an accepted reply.
    fn book<R, E>(
        &mut self,
        pass: u16,
        hop_distance: Ttl,
        outcome: ProbeOutcome,
        resolver: &R,
        sink: &mut E,
    ) -> Option<ReplyKind>
    where
        R: HostNameResolver + ?Sized,
        E: TraceEventSink + ?Sized,
    {
        let hop = hop_distance.into();
        match outcome {
            ProbeOutcome::Timeout if pass == 0 => {
                if self.registry.mark_silent(hop_distance) {
                    sink.on_event(TraceEvent::HopSilent { hop });
                }
                None
            }
            ProbeOutcome::Timeout | ProbeOutcome::SocketError => None,
            ProbeOutcome::Reply { reply, rtt } => {
                if pass == 0 {
                    if self.registry.get(hop_distance).is_none() {
                        let display_name = resolver.reverse_lookup(reply.source);
                        self.registry.insert_discovered(hop_distance, reply.source, display_name.clone(), rtt);
                        sink.on_event(TraceEvent::HopDiscovered {
                            hop,
                            address: reply.source,
                            display_name,
                            kind: reply.kind,
                        });
                    }
                } else {
                    self.registry.record_reply(hop_distance, rtt);
                }
                Some(reply.kind)
            }
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
