#[derive(Debug, Clone)]
pub struct RaftConfig {
    pub id: usize,
    pub peers: Vec<String>, // index i is the address of node id i, self included
    pub heartbeat_interval: u64,  // in milliseconds
    pub election_timeout_min: u64, // in milliseconds
    pub election_timeout_max: u64, // in milliseconds
    pub poll_interval: u64,        // in milliseconds
}

impl RaftConfig {
    pub fn new(id: usize, peers: Vec<String>) -> Self {
        Self {
            id,
            peers,
            heartbeat_interval: 100,
            election_timeout_min: 300,
            election_timeout_max: 450,
            poll_interval: 20,
        }
    }
}
