use uuid::Uuid;

use crate::cluster::{Address, Member, MemberId, MembershipSnapshot};
use crate::error::{JetError, Result};
use crate::protocol::frame::DEFAULT_MAX_FRAME_LENGTH;

/// A cluster member the client knows about up front.
#[derive(Debug, Clone)]
pub struct MemberConfig {
    pub id: Uuid,
    pub addr: String, // host:port format, supports both IP and hostnames
}

/// Configuration for connecting a client to a cluster.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub cluster_name: String,
    /// Initial membership, in the order used for coordinator resolution
    pub members: Vec<MemberConfig>,
    pub connect_timeout_ms: u64,
    pub max_frame_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster_name: "jet".to_string(),
            members: Vec::new(),
            connect_timeout_ms: 5_000,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl ClientConfig {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            ..Default::default()
        }
    }

    pub fn with_member(mut self, id: Uuid, addr: impl Into<String>) -> Self {
        self.members.push(MemberConfig {
            id,
            addr: addr.into(),
        });
        self
    }

    /// Initial membership snapshot, preserving configured order.
    pub fn membership(&self) -> Result<MembershipSnapshot> {
        let mut members = Vec::with_capacity(self.members.len());
        for m in &self.members {
            let member = Member::new(MemberId(m.id), Address::parse(&m.addr)?);
            if members.iter().any(|existing: &Member| existing.id == member.id) {
                return Err(JetError::Config(format!("Duplicate member id {}", m.id)));
            }
            members.push(member);
        }
        Ok(MembershipSnapshot::new(members))
    }
}
