use crate::details::hop_registry::{HopRecord, HopRegistry};
use crate::HopSummary;

/// One summary per answering hop, in ascending hop distance. Silent hops are left out.
pub(crate) fn summarize(registry: &HopRegistry) -> Vec<HopSummary> {
    registry.iter().filter(|record| !record.silent).filter_map(summarize_hop).collect()
}

fn summarize_hop(record: &HopRecord) -> Option<HopSummary> {
    Some(HopSummary {
        hop_distance: record.hop_distance.into(),
        address: record.address?,
        display_name: record.display_name.clone(),
        sent: record.sent,
        received: record.received,
        loss_percent: loss_percent(record.sent, record.received),
        average_rtt_millis: average_rtt_millis(record.rtt_sum_micros, record.iterations),
    })
}

fn loss_percent(sent: u32, received: u32) -> Option<f64> {
    if sent == 0 {
        return None;
    }
    let loss = 100.0 - f64::from(received) / f64::from(sent) * 100.0;
    Some(loss.clamp(0.0, 100.0))
}

#[allow(clippy::cast_precision_loss)]
fn average_rtt_millis(rtt_sum_micros: u64, iterations: u32) -> Option<f64> {
    if iterations == 0 {
        return None;
    }
    Some(rtt_sum_micros as f64 / f64::from(iterations) / 1000.0)
}
