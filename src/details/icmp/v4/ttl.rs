/// Time-to-live of an outgoing probe. Doubles as the hop distance a reply is booked under.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct Ttl(pub u8);

impl Ttl {
    /// Every hop distance from 1 up to and including `self`.
    pub(crate) fn hops_up_to(self) -> impl Iterator<Item = Ttl> {
        (1..=self.0).map(Ttl)
    }
}

impl From<Ttl> for u8 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

// socket2 takes the TTL as u32.
impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        u32::from(ttl.0)
    }
}

impl std::fmt::Display for Ttl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
