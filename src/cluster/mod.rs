//! Cluster membership as seen by the client.
//!
//! A [`MembershipSnapshot`] is an immutable, ordered view of the members the
//! transport currently knows about. Membership can change between calls, so
//! anything derived from a snapshot (notably the coordinator) must be
//! recomputed per invocation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{JetError, Result};

/// Unique identity of a cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network address of a member in `host:port` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`. IPv6 hosts must be bracketed (`[::1]:5701`).
    pub fn parse(s: &str) -> Result<Self> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| JetError::Config(format!("Address '{}' is missing a port", s)))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(JetError::Config(format!("Address '{}' has an empty host", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| JetError::Config(format!("Address '{}' has an invalid port", s)))?;
        Ok(Self::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Snapshot of a single cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub address: Address,
}

impl Member {
    pub fn new(id: MemberId, address: Address) -> Self {
        Self { id, address }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member [{}]:{}", self.address, self.id)
    }
}

/// Ordered, immutable view of the cluster membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSnapshot {
    members: Vec<Member>,
}

impl MembershipSnapshot {
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    /// Resolve the member that handles cluster-wide job bookkeeping.
    ///
    /// This is the first member in iteration order. It is a heuristic: the
    /// snapshot carries no role information, so the result is not guaranteed
    /// to be the elected coordinator.
    pub fn coordinator(&self) -> Result<&Member> {
        self.members.first().ok_or(JetError::NoCoordinatorAvailable)
    }
}

impl FromIterator<Member> for MembershipSnapshot {
    fn from_iter<I: IntoIterator<Item = Member>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
