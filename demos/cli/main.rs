use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::mpsc;
use std::time::Duration;

use trace_fox::{DnsHostNameResolver, GenericError, HopSummary, TraceEvent, TraceFoxConfig};

const DOTS_PER_LINE: usize = 20;
const BANNER: &str = "===========================================================
trace-fox: finds the route to a host, then sends further
ICMP echo probes to every hop that answered and reports
per-hop round trip time and packet loss.
Raw ICMP sockets usually require root privileges.
===========================================================";

#[derive(Debug)]
struct Error {
    pub message: String,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Error")?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[derive(argh::FromArgs)]
/// trace-fox - trace the route to a host and collect per-hop statistics
struct Args {
    #[argh(option, short = 'H')]
    /// IPv4 address or host name of the destination
    host: String,

    #[argh(option, short = 's', default = "Ipv4Addr::UNSPECIFIED")]
    /// local IPv4 address to send from
    source: Ipv4Addr,

    #[argh(option, short = 't', default = "TraceFoxConfig::DEFAULT_MAX_HOPS")]
    /// maximum TTL to probe
    max_hops: u8,

    #[argh(option, short = 'c', default = "TraceFoxConfig::DEFAULT_SEND_COUNT")]
    /// number of statistics probes per hop
    count: u16,

    #[argh(option, short = 'w', default = "1")]
    /// seconds to wait for each reply
    wait: u64,

    #[argh(switch, short = 'd')]
    /// log every received packet
    debug: bool,
}

fn resolve_destination(host: &str) -> Result<Ipv4Addr, GenericError> {
    if let Ok(ipv4) = host.parse::<Ipv4Addr>() {
        return Ok(ipv4);
    }
    dns_lookup::lookup_host(host)?
        .into_iter()
        .find_map(|ip_addr| match ip_addr {
            IpAddr::V4(ipv4) => Some(ipv4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| Error { message: format!("{host} has no IPv4 address") }.into())
}

// Prints progress while the trace runs on the main thread.
fn report_progress(events: mpsc::Receiver<TraceEvent>) {
    let mut dots = 0;
    for event in events {
        match event {
            TraceEvent::HopDiscovered { hop, address, display_name, kind } => {
                println!("{hop:>3}  reply {kind} from {address} ({display_name})");
            }
            TraceEvent::HopSilent { hop } => println!("{hop:>3}  no reply"),
            TraceEvent::ProbeSent { pass, .. } if pass > 0 => {
                print!(".");
                dots += 1;
                if dots % DOTS_PER_LINE == 0 {
                    println!();
                }
                let _ = std::io::stdout().flush();
            }
            TraceEvent::SendFailed { hop, message, .. } | TraceEvent::ReceiveFailed { hop, message, .. } => {
                eprintln!("hop {hop}: {message}");
            }
            TraceEvent::PassCompleted { pass: 0 } => {
                println!("Route traced, collecting statistics (answering hops only)");
            }
            _ => {}
        }
    }
}

fn format_summary(summary: &HopSummary) -> String {
    let rtt = summary.average_rtt_millis.map_or_else(|| "n/a".to_owned(), |rtt| format!("{rtt:.2}ms"));
    let loss = summary.loss_percent.map_or_else(|| "n/a".to_owned(), |loss| format!("{loss:.0}%"));
    format!(
        "{:>3}  rtt: {}  host: {} ({})  sent: {}  received: {}  lost: {}",
        summary.hop_distance, rtt, summary.address, summary.display_name, summary.sent, summary.received, loss
    )
}

fn main() -> Result<(), GenericError> {
    let args: Args = argh::from_env();

    let level = if args.debug { tracing::Level::TRACE } else { tracing::Level::WARN };
    let subscriber = tracing_subscriber::FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    println!("{BANNER}");
    let destination = resolve_destination(&args.host)?;
    let config = TraceFoxConfig {
        source: args.source,
        max_hops: args.max_hops,
        send_count: args.count,
        timeout: Duration::from_secs(args.wait),
        debug: args.debug,
        ..TraceFoxConfig::new(destination)
    };

    let tracer = match trace_fox::create(&config) {
        Ok(tracer) => tracer,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    println!("Tracing route to {} ({destination}), max {} hops", args.host, config.max_hops);

    let (mut tx, rx) = mpsc::channel::<TraceEvent>();
    let reporter = std::thread::spawn(move || report_progress(rx));
    let summaries = tracer.run(&DnsHostNameResolver, &mut tx);
    drop(tx);
    reporter.join().map_err(|_| Error { message: "progress reporter panicked".to_owned() })?;

    println!("\n===========================================================");
    for summary in &summaries {
        println!("{}", format_summary(summary));
    }
    Ok(())
}
