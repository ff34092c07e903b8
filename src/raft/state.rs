use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Follower => write!(f, "follower"),
            NodeRole::Candidate => write!(f, "candidate"),
            NodeRole::Leader => write!(f, "leader"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub current_term: u64,
    pub voted_for: Option<usize>,
    pub role: NodeRole,
    pub commit_index: u64,
    pub last_applied: u64,
}

impl NodeState {
    pub fn new() -> Self {
        Self {
            current_term: 0,
            voted_for: None,
            role: NodeRole::Follower,
            commit_index: 0,
            last_applied: 0,
        }
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}
