//! Runs a router over one TAP per configured interface.
//!
//! ```text
//! cargo run --example router -- --interfaces demos/interfaces --rtable demos/rtable
//! ```

extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate srouter;

use std::sync::Arc;
use std::time::Duration;

use srouter::core::arp_cache::ArpCacheConfig;
use srouter::core::config;
use srouter::core::service::sweeper::Sweeper;
use srouter::core::service::Router;
use srouter::core::time::SystemEnv;

lazy_static! {
    /// How often pending ARP requests and cache entries are checked.
    static ref SWEEP_PERIOD: Duration = Duration::from_secs(1);

    /// How long a receive waits on the TAPs before giving up.
    static ref POLL_TIMEOUT: Duration = Duration::from_millis(100);

    static ref ARP_CACHE_CONFIG: ArpCacheConfig = ArpCacheConfig::default();
}

fn main() {
    env_logger::init();

    let matches = clap::App::new("router")
        .about("Static IPv4 router over Linux TAP interfaces")
        .arg(
            clap::Arg::with_name("interfaces")
                .long("interfaces")
                .value_name("FILE")
                .help("Interface list, one 'name mac ip' per line")
                .default_value("demos/interfaces")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("rtable")
                .long("rtable")
                .value_name("FILE")
                .help("Routing table, one 'destination gateway mask interface' per line")
                .default_value("demos/rtable")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("tap-prefix")
                .long("tap-prefix")
                .value_name("PREFIX")
                .help("Prefix of the TAP backing each interface")
                .default_value("sr-")
                .takes_value(true),
        )
        .get_matches();

    if let Err(err) = run(&matches) {
        eprintln!("router: {}", err);
        std::process::exit(1);
    }
}

#[cfg(target_os = "linux")]
fn run(matches: &clap::ArgMatches) -> srouter::Result<()> {
    use srouter::linux::dev::TapSet;

    let interfaces = config::load_interfaces(matches.value_of("interfaces").unwrap_or_default())?;
    let route_table =
        config::load_route_table(matches.value_of("rtable").unwrap_or_default(), &interfaces)?;

    for interface in &interfaces {
        info!(
            "Interface {} at {} ({}).",
            interface.name, interface.ipv4_addr, interface.ethernet_addr
        );
    }

    for route in route_table.iter() {
        info!("Route {}.", route);
    }

    let ifr_names: Vec<String> = interfaces
        .iter()
        .map(|interface| interface.name.clone())
        .collect();

    let dev = TapSet::open(
        &ifr_names,
        matches.value_of("tap-prefix").unwrap_or_default(),
        *POLL_TIMEOUT,
    )?;

    let router = Arc::new(Router::new(
        interfaces,
        route_table,
        *ARP_CACHE_CONFIG,
        Arc::new(dev),
        SystemEnv::new(),
    ));

    let _sweeper = Sweeper::spawn(router.clone(), *SWEEP_PERIOD)?;

    router.run()
}

#[cfg(not(target_os = "linux"))]
fn run(_: &clap::ArgMatches) -> srouter::Result<()> {
    Err(srouter::Error::Config(String::from(
        "TAP interfaces are only supported on Linux",
    )))
}
