//! Startup configuration for a router.
//!
//! Interfaces are listed one per line as `name mac ip`:
//!
//! ```text
//! eth1 06:11:22:33:44:01 10.0.1.1
//! ```
//!
//! Routes are listed one per line as `destination gateway mask interface`:
//!
//! ```text
//! 10.0.1.0 0.0.0.0 255.255.255.0 eth1
//! ```
//!
//! Blank lines and lines starting with `#` are skipped in both formats.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::core::route_table::{
    RouteEntry,
    RouteTable,
};
use crate::core::service::Interface;
use crate::{
    Error,
    Result,
};

/// Yields (line number, fields) for every non-empty, non-comment line.
fn records(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| (n, line.split_whitespace().collect()))
}

fn field<T: FromStr>(line: usize, what: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("line {}: invalid {} '{}'", line, what, value)))
}

fn arity(line: usize, fields: &[&str], expected: usize) -> Result<()> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "line {}: expected {} fields, found {}",
            line,
            expected,
            fields.len()
        )))
    }
}

/// Parses an interface list.
pub fn parse_interfaces(text: &str) -> Result<Vec<Interface>> {
    let mut interfaces: Vec<Interface> = Vec::new();

    for (line, fields) in records(text) {
        arity(line, &fields, 3)?;

        if interfaces.iter().any(|interface| interface.name == fields[0]) {
            return Err(Error::Config(format!(
                "line {}: duplicate interface '{}'",
                line, fields[0]
            )));
        }

        interfaces.push(Interface {
            name: String::from(fields[0]),
            ethernet_addr: field(line, "Ethernet address", fields[1])?,
            ipv4_addr: field(line, "IPv4 address", fields[2])?,
        });
    }

    Ok(interfaces)
}

/// Parses a routing table, checking every route against the interfaces.
pub fn parse_route_table(text: &str, interfaces: &[Interface]) -> Result<RouteTable> {
    let mut entries = Vec::new();

    for (line, fields) in records(text) {
        arity(line, &fields, 4)?;

        let ifr_name = fields[3];
        if !interfaces.iter().any(|interface| interface.name == ifr_name) {
            return Err(Error::Config(format!(
                "line {}: unknown interface '{}'",
                line, ifr_name
            )));
        }

        entries.push(RouteEntry::new(
            field(line, "destination", fields[0])?,
            field(line, "subnet mask", fields[2])?,
            field(line, "gateway", fields[1])?,
            ifr_name,
        ));
    }

    Ok(RouteTable::new(entries))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|err| Error::Config(format!("{}: {}", path.display(), err)))
}

/// Loads an interface list from a file.
pub fn load_interfaces<P: AsRef<Path>>(path: P) -> Result<Vec<Interface>> {
    parse_interfaces(&read(path.as_ref())?)
}

/// Loads a routing table from a file.
pub fn load_route_table<P: AsRef<Path>>(path: P, interfaces: &[Interface]) -> Result<RouteTable> {
    parse_route_table(&read(path.as_ref())?, interfaces)
}
