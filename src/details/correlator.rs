use crate::details::records::ProbeIdentity;

/// A reply is ours only if it echoes both the identifier and the sequence number of the probe in flight.
pub(crate) fn is_own_reply(extracted: Option<ProbeIdentity>, expected: ProbeIdentity) -> bool {
    match extracted {
        Some(identity) => {
            identity.identifier == expected.identifier && identity.sequence_number == expected.sequence_number
        }
        None => false,
    }
}
