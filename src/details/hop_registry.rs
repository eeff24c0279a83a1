use crate::details::icmp::v4::Ttl;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

/// Everything learned about one hop distance during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HopRecord {
    pub hop_distance: Ttl,
    /// `None` only for silent hops.
    pub address: Option<IpAddr>,
    pub display_name: String,
    pub sent: u32,
    pub received: u32,
    pub rtt_sum_micros: u64,
    pub iterations: u32,
    pub silent: bool,
}

/// Hop records keyed by hop distance. A record is created at most once and never removed.
#[derive(Debug, Default)]
pub(crate) struct HopRegistry {
    hops: BTreeMap<Ttl, HopRecord>,
}

fn micros(rtt: Duration) -> u64 {
    u64::try_from(rtt.as_micros()).unwrap_or(u64::MAX)
}

impl HopRegistry {
    pub(crate) fn new() -> Self {
        HopRegistry::default()
    }

    pub(crate) fn get(&self, hop_distance: Ttl) -> Option<&HopRecord> {
        self.hops.get(&hop_distance)
    }

    pub(crate) fn is_silent(&self, hop_distance: Ttl) -> bool {
        self.get(hop_distance).map_or(false, |record| record.silent)
    }

    /// Books the first reply seen at `hop_distance`. Returns `false` if the hop was already known.
    pub(crate) fn insert_discovered(
        &mut self,
        hop_distance: Ttl,
        address: IpAddr,
        display_name: String,
        rtt: Duration,
    ) -> bool {
        if self.hops.contains_key(&hop_distance) {
            return false;
        }
        self.hops.insert(
            hop_distance,
            HopRecord {
                hop_distance,
                address: Some(address),
                display_name,
                sent: 0,
                received: 0,
                rtt_sum_micros: micros(rtt),
                iterations: 1,
                silent: false,
            },
        );
        true
    }

    /// Records a hop that never answered. Returns `false` if the hop was already known.
    pub(crate) fn mark_silent(&mut self, hop_distance: Ttl) -> bool {
        if self.hops.contains_key(&hop_distance) {
            return false;
        }
        self.hops.insert(
            hop_distance,
            HopRecord {
                hop_distance,
                address: None,
                display_name: String::new(),
                sent: 0,
                received: 0,
                rtt_sum_micros: 0,
                iterations: 0,
                silent: true,
            },
        );
        true
    }

    /// Counts a transmitted probe against a known, answering hop.
    pub(crate) fn record_send(&mut self, hop_distance: Ttl) -> bool {
        match self.hops.get_mut(&hop_distance) {
            Some(record) if !record.silent => {
                record.sent += 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn record_reply(&mut self, hop_distance: Ttl, rtt: Duration) -> bool {
        match self.hops.get_mut(&hop_distance) {
            Some(record) if !record.silent => {
                record.received += 1;
                record.rtt_sum_micros = record.rtt_sum_micros.saturating_add(micros(rtt));
                record.iterations += 1;
                true
            }
            _ => false,
        }
    }

    /// Records in ascending hop distance.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &HopRecord> {
        self.hops.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.hops.len()
    }
}
