//! Beacon Simulation Example
//!
//! This example runs two simulated devices in one process: a laptop browsing
//! for a service type and a printer advertising an instance of it. Beacons are
//! exchanged through an in-memory radio and advertisements through an
//! in-memory plugin task, and every resulting event is logged.
//!
//! # Usage
//!
//! ```
//! cargo run --package d2d-discovery --example beacon_sim
//! ```
//!
//! With a different service:
//! ```
//! cargo run --package d2d-discovery --example beacon_sim -- --service _airplay._tcp.local. --port 7000
//! ```

use std::time::{Duration, Instant};

use clap::Parser;
use d2d_discovery::{
    AdvertiseRequest, Beacon, BrowseRequest, DiscoveryConfig, DiscoveryEvent, DnsType, EthAddr,
    InterfaceId, PluginEvent, RadioCommand, Record, RecordScope, ServiceFlags, SharedDiscovery,
    TransportMessage,
};
use sansio::Protocol;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "Beacon Simulation")]
#[command(version = "0.1.0")]
#[command(about = "Two simulated devices discovering each other over a proximity beacon")]
struct Args {
    /// Service type browsed for and advertised
    #[arg(long, default_value = "_ipp._tcp.local.")]
    service: String,

    /// Instance label of the advertised service
    #[arg(long, default_value = "printer")]
    instance: String,

    /// Port of the advertised service
    #[arg(long, default_value = "631")]
    port: u16,

    /// Delay in milliseconds before an empty beacon is switched off
    #[arg(long, default_value = "300")]
    stop_delay: u64,
}

const LAPTOP: EthAddr = EthAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const PRINTER: EthAddr = EthAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);

/// Moves the beacon updates of `from` to `to` over the simulated radio.
fn pump_radio(
    from: &SharedDiscovery,
    from_addr: EthAddr,
    to: &SharedDiscovery,
) -> Result<(), Box<dyn std::error::Error>> {
    let commands: Vec<RadioCommand> = {
        let mut from = from.lock()?;
        std::iter::from_fn(|| from.poll_write()).collect()
    };
    for cmd in commands {
        log::info!("[radio] {from_addr}: {cmd:?}");
        if let RadioCommand::PublishBeacon { browse, advertise } = cmd {
            to.lock()?.handle_read(TransportMessage {
                now: Instant::now(),
                peer_addr: from_addr,
                message: Beacon::new(browse, advertise),
            })?;
        }
    }
    Ok(())
}

/// Logs the events of one device and forwards its advertisements to the
/// simulated plugin.
fn drain_events(
    name: &str,
    device: &SharedDiscovery,
    plugin: &mpsc::UnboundedSender<PluginEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let events: Vec<DiscoveryEvent> = {
        let mut device = device.lock()?;
        std::iter::from_fn(|| device.poll_event()).collect()
    };
    for event in events {
        log::info!("[{name}] {event}");
        let forwarded = match event {
            DiscoveryEvent::StartAdvertising {
                key,
                value,
                transport,
            } => PluginEvent::ServiceFound {
                transport,
                instance: 1,
                key,
                value,
            },
            DiscoveryEvent::StopAdvertising {
                key,
                value,
                transport,
            } => PluginEvent::ServiceLost {
                transport,
                instance: 1,
                key,
                value,
            },
            _ => continue,
        };
        plugin.send(forwarded)?;
    }
    Ok(())
}

fn deliver(device: &SharedDiscovery, event: PluginEvent) -> shared::error::Result<()> {
    device.lock()?.handle_event(event)
}

/// Waits until the plugin task has brought `device` to `count` records.
async fn wait_for_records(
    device: &SharedDiscovery,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let current = device.lock()?.external_record_count();
        if current == count {
            log::info!("{current} records injected");
            return Ok(());
        }
        tokio::time::timeout(Duration::from_secs(1), device.notified()).await?;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config =
        DiscoveryConfig::default().with_beacon_stop_delay(Duration::from_millis(args.stop_delay));
    let laptop = SharedDiscovery::new(config.clone());
    let printer = SharedDiscovery::new(config);

    let instance_name = format!("{}.{}", args.instance, args.service);
    let host = format!("{}.local.", args.instance);
    let records = vec![
        Record::ptr(&args.service, &instance_name, 120)?,
        Record::srv(&instance_name, args.port, &host, 120)?,
        Record::txt(&instance_name, vec!["txtvers=1".to_string()], 120)?,
    ];

    laptop.lock()?.start_browse(BrowseRequest {
        service_type: args.service.clone(),
        handle: 1,
        interface: InterfaceId::Any,
        flags: ServiceFlags::AUTO_TRIGGER,
    })?;
    printer.lock()?.start_advertise(AdvertiseRequest {
        instance_name: instance_name.clone(),
        rr_type: DnsType::Srv,
        handle: 1,
        interface: InterfaceId::Any,
        flags: ServiceFlags::AUTO_TRIGGER,
        scope: RecordScope::Any,
        records,
    })?;

    // The plugin delivers found/lost callbacks to the laptop from its own task.
    let (plugin_tx, mut plugin_rx) = mpsc::unbounded_channel::<PluginEvent>();
    let plugin_laptop = laptop.clone();
    let plugin_task = tokio::spawn(async move {
        while let Some(event) = plugin_rx.recv().await {
            if let Err(err) = deliver(&plugin_laptop, event) {
                log::error!("[plugin] {err}");
            }
        }
    });

    pump_radio(&laptop, LAPTOP, &printer)?;
    pump_radio(&printer, PRINTER, &laptop)?;
    drain_events("laptop", &laptop, &plugin_tx)?;
    drain_events("printer", &printer, &plugin_tx)?;

    wait_for_records(&laptop, 3).await?;
    drain_events("laptop", &laptop, &plugin_tx)?;

    // The printer leaves.
    printer
        .lock()?
        .stop_advertise(&instance_name, DnsType::Srv)?;
    drain_events("printer", &printer, &plugin_tx)?;
    pump_radio(&printer, PRINTER, &laptop)?;

    wait_for_records(&laptop, 0).await?;
    drain_events("laptop", &laptop, &plugin_tx)?;

    // Let the printer's empty beacon run out.
    let deadline = printer.lock()?.poll_timeout();
    if let Some(deadline) = deadline {
        tokio::time::sleep(deadline.saturating_duration_since(Instant::now())).await;
        printer.lock()?.handle_timeout(Instant::now())?;
        pump_radio(&printer, PRINTER, &laptop)?;
    }

    drop(plugin_tx);
    plugin_task.await?;
    let laptop = laptop.lock()?;
    log::info!(
        "[laptop] {} records left, {} peers known",
        laptop.external_record_count(),
        laptop.peer_count()
    );
    Ok(())
}
