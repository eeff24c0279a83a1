use crate::details::decode_error::DecodeError;
use crate::details::icmp::v4::SequenceNumber;
use crate::details::records::{ProbeIdentity, ReceivedReply};
use crate::ReplyKind;
use pnet_packet::icmp::{
    echo_reply::EchoReplyPacket,
    echo_request::{EchoRequestPacket as EchoRequestPacketV4, MutableEchoRequestPacket as MutableEchoRequestPacketV4},
    IcmpPacket, IcmpTypes,
};
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::Packet;
use rand::Rng;
use std::net::IpAddr;
use std::time::Instant;

pub(crate) const PAYLOAD_SIZE: usize = 56;
pub(crate) const PROBE_TAG: &[u8] = b"trace-fox echo probe";

const ICMP_HEADER_SIZE: usize = 8;
const IPV4_MIN_HEADER_SIZE: usize = 20;

/// Probe payload: the fixed tag followed by random filler, drawn once per run.
pub(crate) fn new_probe_payload() -> [u8; PAYLOAD_SIZE] {
    let mut payload = [0u8; PAYLOAD_SIZE];
    payload[..PROBE_TAG.len()].copy_from_slice(PROBE_TAG);
    rand::thread_rng().fill(&mut payload[PROBE_TAG.len()..]);
    payload
}

pub(crate) fn new_echo_probe_package(
    identity: ProbeIdentity,
    payload: &[u8],
) -> Option<MutableEchoRequestPacketV4<'static>> {
    let buf = vec![0u8; EchoRequestPacketV4::minimum_packet_size() + payload.len()];
    let mut package = MutableEchoRequestPacketV4::owned(buf)?;
    package.set_sequence_number(identity.sequence_number.into());
    package.set_identifier(identity.identifier);
    package.set_icmp_type(IcmpTypes::EchoRequest);
    package.set_payload(payload);

    package.set_checksum(0_u16);
    let checksum = pnet_packet::icmp::checksum(&IcmpPacket::new(package.packet())?);
    package.set_checksum(checksum);
    Some(package)
}

/// Skips the IPv4 header a raw socket delivers in front of every ICMP message.
pub(crate) fn icmp_message_of(datagram: &[u8]) -> Result<&[u8], DecodeError> {
    let ipv4_packet = Ipv4Packet::new(datagram).ok_or(DecodeError::TooShort { len: datagram.len() })?;
    if ipv4_packet.get_version() != 4 {
        return Err(DecodeError::Malformed(format!("IP version {}", ipv4_packet.get_version())));
    }
    let header_len = usize::from(ipv4_packet.get_header_length()) * 4;
    if header_len < IPV4_MIN_HEADER_SIZE || header_len > datagram.len() {
        return Err(DecodeError::Malformed(format!("IPv4 header length {header_len}")));
    }
    Ok(&datagram[header_len..])
}

pub(crate) fn decode_datagram(
    datagram: &[u8],
    source: IpAddr,
    received_at: Instant,
) -> Result<ReceivedReply, DecodeError> {
    decode_reply(icmp_message_of(datagram)?, source, received_at)
}

pub(crate) fn decode_reply(icmp: &[u8], source: IpAddr, received_at: Instant) -> Result<ReceivedReply, DecodeError> {
    if icmp.len() < ICMP_HEADER_SIZE {
        return Err(DecodeError::TooShort { len: icmp.len() });
    }
    let icmp_packet = IcmpPacket::new(icmp).ok_or(DecodeError::TooShort { len: icmp.len() })?;
    let (kind, identity) = match icmp_packet.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let echo_reply = EchoReplyPacket::new(icmp).ok_or(DecodeError::TooShort { len: icmp.len() })?;
            let identity =
                ProbeIdentity::new(echo_reply.get_identifier(), SequenceNumber::from(echo_reply.get_sequence_number()));
            (ReplyKind::EchoReply, Some(identity))
        }
        IcmpTypes::TimeExceeded => (ReplyKind::TimeExceeded, embedded_identity(&icmp[ICMP_HEADER_SIZE..])),
        _ => (ReplyKind::Other, None),
    };
    Ok(ReceivedReply { kind, source, identity, received_at })
}

// `original` is the quoted datagram: its IPv4 header, then the leading bytes of our echo request.
fn embedded_identity(original: &[u8]) -> Option<ProbeIdentity> {
    let first_byte = *original.first()?;
    if first_byte >> 4 != 4 {
        return None;
    }
    let header_len = usize::from(first_byte & 0x0F) * 4;
    if header_len < IPV4_MIN_HEADER_SIZE {
        return None;
    }
    let echo = original.get(header_len..)?;
    let identifier = u16::from_be_bytes([*echo.get(4)?, *echo.get(5)?]);
    // Routers may quote fewer than the 8 bytes RFC 792 asks for.
    let sequence_number = match echo.get(6..)? {
        [high, low, ..] => u16::from_be_bytes([*high, *low]),
        [high] => u16::from_be_bytes([*high, 0]),
        [] => return None,
    };
    Some(ProbeIdentity::new(identifier, SequenceNumber::from(sequence_number)))
}
