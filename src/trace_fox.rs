use crate::details::icmp::v4::{IcmpV4, RawSocket, SequenceNumber, TSocket, Ttl};
use crate::details::{TraceError, TraceOrchestrator, TraceResult, TraceSettings};
use crate::{HopSummary, HostNameResolver, TraceEventSink};
use std::net::Ipv4Addr;
use std::time::Duration;

#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug)]
pub struct TraceFoxConfig {
    pub destination: Ipv4Addr,
    /// Local address the raw socket is bound to, `0.0.0.0` for any.
    pub source: Ipv4Addr,
    pub max_hops: u8,
    /// Number of statistics passes after discovery.
    pub send_count: u16,
    pub timeout: Duration,
    /// Dump every received datagram at debug level.
    pub debug: bool,
}

impl TraceFoxConfig {
    pub const DEFAULT_MAX_HOPS: u8 = 50;
    pub const DEFAULT_SEND_COUNT: u16 = 10;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
    pub const MAX_TIMEOUT: Duration = crate::details::MAX_TIMEOUT;

    pub fn new(destination: Ipv4Addr) -> Self {
        TraceFoxConfig {
            destination,
            source: Ipv4Addr::UNSPECIFIED,
            max_hops: Self::DEFAULT_MAX_HOPS,
            send_count: Self::DEFAULT_SEND_COUNT,
            timeout: Self::DEFAULT_TIMEOUT,
            debug: false,
        }
    }

    fn validate(&self) -> Result<(), TraceError> {
        if self.max_hops == 0 {
            return Err(TraceError::new("max_hops must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(TraceError::new("timeout must be greater than zero"));
        }
        if self.timeout > Self::MAX_TIMEOUT {
            return Err(TraceError::new(format!(
                "timeout must not exceed {} seconds",
                Self::MAX_TIMEOUT.as_secs()
            )));
        }
        let passes = usize::from(self.send_count) + 1;
        let probes = usize::from(self.max_hops) * passes;
        if probes > SequenceNumber::distinct_values() {
            return Err(TraceError::new(format!(
                "{} hops over {} passes need {} sequence numbers, only {} are available",
                self.max_hops,
                passes,
                probes,
                SequenceNumber::distinct_values()
            )));
        }
        Ok(())
    }
}

/// A prepared trace. Running it consumes the tracer.
pub struct Tracer(TraceOrchestrator<RawSocket>);

impl Tracer {
    /// Probes the path hop by hop and returns one summary per answering hop, ordered by hop distance.
    pub fn run<R, E>(mut self, resolver: &R, sink: &mut E) -> Vec<HopSummary>
    where
        R: HostNameResolver + ?Sized,
        E: TraceEventSink + ?Sized,
    {
        self.0.run(resolver, sink)
    }
}

/// Validates `config` and opens the raw ICMP socket. Failing to open the socket (usually missing privileges) is
/// the only fatal error of a trace.
pub fn create(config: &TraceFoxConfig) -> TraceResult<Tracer> {
    config.validate()?;
    let socket = RawSocket::new(config.source).map_err(|e| {
        tracing::error!("could not open raw ICMP socket: {}", e);
        TraceError::new(format!("could not open raw ICMP socket: {e}"))
    })?;
    Ok(Tracer(create_with_socket(config, socket, process_identifier())))
}

fn create_with_socket<S>(config: &TraceFoxConfig, socket: S, identifier: u16) -> TraceOrchestrator<S>
where
    S: TSocket + 'static,
{
    let settings = TraceSettings {
        destination: config.destination,
        max_hops: Ttl(config.max_hops),
        send_count: config.send_count,
        timeout: config.timeout,
        debug: config.debug,
        identifier,
    };
    TraceOrchestrator::new(IcmpV4::new(socket), settings)
}

#[allow(clippy::cast_possible_truncation)]
fn process_identifier() -> u16 {
    std::process::id() as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::icmp::v4::tests::SocketMock;
    use crate::TraceEvent;
    use std::net::IpAddr;

    const TARGET: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 7);

    #[test]
    fn defaults() {
        let config = TraceFoxConfig::new(TARGET);
        assert_eq!(Ipv4Addr::UNSPECIFIED, config.source);
        assert_eq!((50, 10), (config.max_hops, config.send_count));
        assert_eq!(Duration::from_secs(1), config.timeout);
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_max_hops_is_rejected() {
        let config = TraceFoxConfig { max_hops: 0, ..TraceFoxConfig::new(TARGET) };
        let result = create(&config);
        assert_eq!("TraceError: max_hops must be at least 1", result.err().unwrap().to_string());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = TraceFoxConfig { timeout: Duration::ZERO, ..TraceFoxConfig::new(TARGET) };
        assert!(create(&config).is_err());
    }

    #[test]
    fn timeout_above_maximum_is_rejected() {
        let longest = TraceFoxConfig { timeout: TraceFoxConfig::MAX_TIMEOUT, ..TraceFoxConfig::new(TARGET) };
        assert!(longest.validate().is_ok());

        let config = TraceFoxConfig { timeout: Duration::from_secs(u64::MAX), ..TraceFoxConfig::new(TARGET) };
        let result = create(&config);
        assert_eq!("TraceError: timeout must not exceed 3600 seconds", result.err().unwrap().to_string());
    }

    #[test]
    fn probe_budget_must_fit_sequence_numbers() {
        let fits = TraceFoxConfig { max_hops: 255, send_count: 256, ..TraceFoxConfig::new(TARGET) };
        assert!(fits.validate().is_ok());

        let too_many = TraceFoxConfig { max_hops: 255, send_count: 257, ..TraceFoxConfig::new(TARGET) };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn trace_with_mock_socket() {
        let config = TraceFoxConfig { max_hops: 4, send_count: 1, ..TraceFoxConfig::new(TARGET) };
        let socket = SocketMock::with_route(&[Some(Ipv4Addr::new(10, 0, 0, 1))], TARGET);
        let mut orchestrator = create_with_socket(&config, socket.clone(), 0x1234);
        let mut events = Vec::<TraceEvent>::new();

        let summaries = orchestrator.run(&|ip_addr: IpAddr| ip_addr.to_string(), &mut events);

        socket.should_send_number_of_messages(4).should_send_to_address(&IpAddr::V4(TARGET));
        assert_eq!(2, summaries.len());
        assert_eq!("192.0.2.7", summaries[1].display_name);
        assert_eq!(Some(&TraceEvent::PassCompleted { pass: 1 }), events.last());
    }
}
