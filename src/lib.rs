pub mod config;
pub mod network;
pub mod raft;

// Public exports
pub use config::Config;
pub use network::{GrpcTransport, RaftTransport};
pub use raft::{Raft, RaftConfig, RaftNode};
