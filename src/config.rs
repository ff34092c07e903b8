use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("empty cluster address list")]
    EmptyCluster,

    #[error("invalid node id {id} for cluster of size {cluster_size}")]
    InvalidNodeId { id: usize, cluster_size: usize },
}

/// Cluster membership for one node: its id and the shared, order-significant
/// peer address list. A node's identity is its index into that list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node_id: usize,
    pub peers: Vec<String>,
}

impl Config {
    /// Parses a comma-separated cluster address list and checks that
    /// `node_id` names one of its entries.
    pub fn new(node_id: usize, cluster: &str) -> Result<Self, ConfigError> {
        let peers: Vec<String> = cluster
            .split(',')
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .collect();

        if peers.is_empty() {
            return Err(ConfigError::EmptyCluster);
        }

        if node_id >= peers.len() {
            return Err(ConfigError::InvalidNodeId {
                id: node_id,
                cluster_size: peers.len(),
            });
        }

        Ok(Self { node_id, peers })
    }

    /// The address this node binds its own listener to.
    pub fn listen_addr(&self) -> &str {
        &self.peers[self.node_id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_cluster() {
        let cfg = Config::new(1, "127.0.0.1:8000,127.0.0.1:8001,127.0.0.1:8002").unwrap();
        assert_eq!(cfg.peers.len(), 3);
        assert_eq!(cfg.listen_addr(), "127.0.0.1:8001");
    }

    #[test]
    fn trims_whitespace_around_addresses() {
        let cfg = Config::new(0, " 127.0.0.1:8000 , 127.0.0.1:8001 ").unwrap();
        assert_eq!(cfg.peers[0], "127.0.0.1:8000");
        assert_eq!(cfg.peers[1], "127.0.0.1:8001");
    }

    #[test]
    fn rejects_out_of_range_node_id() {
        let err = Config::new(3, "127.0.0.1:8000,127.0.0.1:8001").unwrap_err();
        match err {
            ConfigError::InvalidNodeId { id, cluster_size } => {
                assert_eq!(id, 3);
                assert_eq!(cluster_size, 2);
            }
            other => panic!("expected InvalidNodeId, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_cluster() {
        assert!(matches!(
            Config::new(0, "  ,  "),
            Err(ConfigError::EmptyCluster)
        ));
    }
}
