/// Sequence field of an echo probe. Counts `1..=u16::MAX` and then starts over at 1; zero is never used.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct SequenceNumber(u16);

impl SequenceNumber {
    const FIRST: u16 = 1;
    const LAST: u16 = u16::MAX;

    pub(crate) fn start_value() -> SequenceNumber {
        SequenceNumber(Self::FIRST)
    }

    /// Number of probes that can be told apart before `next` repeats a value.
    pub(crate) fn distinct_values() -> usize {
        usize::from(Self::LAST - Self::FIRST) + 1
    }

    pub(crate) fn next(self) -> Self {
        match self.0 {
            Self::LAST => Self::start_value(),
            n => SequenceNumber(n + 1),
        }
    }
}

impl From<SequenceNumber> for u16 {
    fn from(sequence_number: SequenceNumber) -> Self {
        sequence_number.0
    }
}

impl From<u16> for SequenceNumber {
    fn from(value: u16) -> Self {
        SequenceNumber(value)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
