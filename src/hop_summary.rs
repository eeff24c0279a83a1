use std::net::IpAddr;

/// Final statistics for one answering hop.
#[derive(Clone, Debug, PartialEq)]
pub struct HopSummary {
    pub hop_distance: u8,
    pub address: IpAddr,
    pub display_name: String,
    /// Probes sent during statistics passes. The discovery pass is not counted.
    pub sent: u32,
    pub received: u32,
    /// `None` when no statistics probe was sent to this hop.
    pub loss_percent: Option<f64>,
    pub average_rtt_millis: Option<f64>,
}
