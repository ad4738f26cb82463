//! Cluster membership table.
//!
//! Membership is fixed for the lifetime of the run: every process is
//! started with the same hosts file (`<id> <ip> <port>` per line,
//! 1-indexed ids) and derives the identical table from it.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use crate::error::ConfigError;
use crate::ids::ProcessId;

/// A single cluster member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Host {
    pub id: ProcessId,
    pub addr: SocketAddr,
}

/// Ordered `id -> address` mapping for the whole cluster.
///
/// The table also maintains the reverse `address -> id` index used by the
/// listener to attribute inbound datagrams to a peer.
#[derive(Clone, Debug)]
pub struct HostsTable {
    hosts: Vec<Host>,
    by_addr: HashMap<SocketAddr, ProcessId>,
}

impl HostsTable {
    /// Build a table from an already-resolved host list.
    pub fn new(mut hosts: Vec<Host>) -> Result<Self, ConfigError> {
        hosts.sort_by_key(|h| h.id);
        let mut by_addr = HashMap::with_capacity(hosts.len());
        for (i, host) in hosts.iter().enumerate() {
            if i > 0 && hosts[i - 1].id == host.id {
                return Err(ConfigError::DuplicateHost(host.id));
            }
            by_addr.insert(host.addr, host.id);
        }
        Ok(Self { hosts, by_addr })
    }

    /// Parse a hosts file: one `<id> <ip> <port>` triple per line.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut hosts = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let parsed = (|| {
                let id: ProcessId = fields.next()?.parse().ok()?;
                let ip: IpAddr = fields.next()?.parse().ok()?;
                let port: u16 = fields.next()?.parse().ok()?;
                Some(Host {
                    id,
                    addr: SocketAddr::new(ip, port),
                })
            })();
            match parsed {
                Some(host) => hosts.push(host),
                None => {
                    return Err(ConfigError::Hosts {
                        line: i + 1,
                        reason: format!("expected `<id> <ip> <port>`, got `{line}`"),
                    })
                }
            }
        }
        Self::new(hosts)
    }

    /// Total number of cluster members, including the local process.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// All members in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    /// All members except `me`, in id order.
    pub fn peers(&self, me: ProcessId) -> impl Iterator<Item = &Host> {
        self.hosts.iter().filter(move |h| h.id != me)
    }

    pub fn addr_of(&self, id: ProcessId) -> Result<SocketAddr, ConfigError> {
        self.hosts
            .iter()
            .find(|h| h.id == id)
            .map(|h| h.addr)
            .ok_or(ConfigError::UnknownProcess(id))
    }

    pub fn id_of(&self, addr: &SocketAddr) -> Option<ProcessId> {
        self.by_addr.get(addr).copied()
    }
}
