mod config;
mod error;
mod log;
mod node;
mod state;

pub use self::config::RaftConfig;
pub use self::error::RaftError;
pub use self::log::{Log, LogEntry};
pub use self::node::RaftNode;
pub use self::state::{NodeRole, NodeState};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
// Use external log crate, not our own log module
use ::log::debug;

use crate::network::RaftTransport;

#[derive(Debug, Clone)]
pub struct RequestVoteArgs {
    pub term: u64,
    pub candidate_id: usize,
    pub last_log_index: u64,
    pub last_log_term: u64,
}

#[derive(Debug, Clone)]
pub struct RequestVoteReply {
    pub term: u64,
    pub vote_granted: bool,
}

#[derive(Debug, Clone)]
pub struct AppendEntriesArgs {
    pub term: u64,
    pub leader_id: usize,
    pub prev_log_index: u64,
    pub prev_log_term: u64,
    pub entries: Vec<LogEntry>,
    pub leader_commit: u64,
}

#[derive(Debug, Clone)]
pub struct AppendEntriesReply {
    pub term: u64,
    pub success: bool,
}

/// The consensus service: the locked node plus the transport used to reach
/// its peers.
pub struct Raft {
    pub node: Arc<Mutex<RaftNode>>,
    transport: Arc<dyn RaftTransport>,
}

impl Raft {
    pub fn new(config: RaftConfig, transport: Arc<dyn RaftTransport>) -> Self {
        let node = RaftNode::new(config);
        Self {
            node: Arc::new(Mutex::new(node)),
            transport,
        }
    }

    /// Spawns the background ticker that drives elections and heartbeats.
    /// It runs until the process exits.
    pub async fn start(&self) {
        {
            let mut node = self.node.lock().await;
            node.reset_last_contact();
        }

        let node = Arc::clone(&self.node);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            run_ticker(node, transport).await;
        });
    }
}

/// Polls on a short cadence while Follower/Candidate and sleeps the
/// heartbeat interval while Leader. The lock is only held to inspect state;
/// all network traffic happens in the fan-out tasks.
async fn run_ticker(node: Arc<Mutex<RaftNode>>, transport: Arc<dyn RaftTransport>) {
    loop {
        let (role, heartbeat_interval, poll_interval) = {
            let node = node.lock().await;
            (
                node.role(),
                node.config().heartbeat_interval,
                node.config().poll_interval,
            )
        };

        match role {
            NodeRole::Leader => {
                broadcast_heartbeats(&node, &transport).await;
                sleep(Duration::from_millis(heartbeat_interval)).await;
            }
            NodeRole::Follower | NodeRole::Candidate => {
                let timed_out = {
                    let node = node.lock().await;
                    node.election_timeout_elapsed()
                };

                if timed_out {
                    run_election(&node, &transport).await;
                }

                sleep(Duration::from_millis(poll_interval)).await;
            }
        }
    }
}

/// Promotes the node to Candidate under the lock, then requests votes from
/// every other peer concurrently. Each reply re-acquires the lock and is
/// tallied against the term this election was campaigned for; a peer that
/// cannot be reached simply contributes nothing.
async fn run_election(node: &Arc<Mutex<RaftNode>>, transport: &Arc<dyn RaftTransport>) {
    let (args, peers) = {
        let mut node = node.lock().await;
        node.begin_election()
    };

    for (peer, address) in peers.into_iter().enumerate() {
        if peer == args.candidate_id {
            continue;
        }

        let node = Arc::clone(node);
        let transport = Arc::clone(transport);
        let args = args.clone();
        tokio::spawn(async move {
            match transport.request_vote(&address, args.clone()).await {
                Ok(reply) => {
                    let mut node = node.lock().await;
                    node.handle_vote_reply(args.term, &reply);
                }
                Err(e) => {
                    debug!("RequestVote to {address} failed: {e}");
                }
            }
        });
    }
}

/// Sends one round of empty AppendEntries to every other peer. Unreachable
/// peers are skipped for the round; the next interval retries
/// unconditionally.
async fn broadcast_heartbeats(node: &Arc<Mutex<RaftNode>>, transport: &Arc<dyn RaftTransport>) {
    let (args, peers) = {
        let node = node.lock().await;
        match node.begin_heartbeat_round() {
            Ok(round) => round,
            // Demoted between the ticker's role check and this call.
            Err(RaftError::NotLeader) => return,
        }
    };

    for (peer, address) in peers.into_iter().enumerate() {
        if peer == args.leader_id {
            continue;
        }

        let node = Arc::clone(node);
        let transport = Arc::clone(transport);
        let args = args.clone();
        tokio::spawn(async move {
            match transport.append_entries(&address, args.clone()).await {
                Ok(reply) => {
                    let mut node = node.lock().await;
                    node.handle_heartbeat_reply(args.term, &reply);
                }
                Err(e) => {
                    debug!("AppendEntries to {address} failed, skipping this round: {e}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Canned per-address replies; an address with no entry is unreachable.
    #[derive(Default)]
    struct MockTransport {
        vote_replies: HashMap<String, RequestVoteReply>,
        append_replies: HashMap<String, AppendEntriesReply>,
    }

    #[async_trait]
    impl RaftTransport for MockTransport {
        async fn request_vote(
            &self,
            address: &str,
            _args: RequestVoteArgs,
        ) -> Result<RequestVoteReply, NetworkError> {
            self.vote_replies
                .get(address)
                .cloned()
                .ok_or_else(|| NetworkError::ConnectionError(format!("no route to {address}")))
        }

        async fn append_entries(
            &self,
            address: &str,
            _args: AppendEntriesArgs,
        ) -> Result<AppendEntriesReply, NetworkError> {
            self.append_replies
                .get(address)
                .cloned()
                .ok_or_else(|| NetworkError::ConnectionError(format!("no route to {address}")))
        }
    }

    fn addrs() -> Vec<String> {
        vec![
            "10.0.0.1:7000".to_string(),
            "10.0.0.2:7000".to_string(),
            "10.0.0.3:7000".to_string(),
        ]
    }

    fn grant(term: u64) -> RequestVoteReply {
        RequestVoteReply {
            term,
            vote_granted: true,
        }
    }

    fn reject(term: u64) -> RequestVoteReply {
        RequestVoteReply {
            term,
            vote_granted: false,
        }
    }

    async fn settle() {
        sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn election_with_one_grant_and_one_rejection_wins_majority() {
        let mut transport = MockTransport::default();
        transport.vote_replies.insert(addrs()[1].clone(), grant(1));
        transport.vote_replies.insert(addrs()[2].clone(), reject(1));

        let raft = Raft::new(RaftConfig::new(0, addrs()), Arc::new(transport));
        run_election(&raft.node, &raft.transport).await;
        settle().await;

        let node = raft.node.lock().await;
        assert!(node.is_leader());
        assert_eq!(node.current_term(), 1);
    }

    #[tokio::test]
    async fn election_with_unreachable_peer_still_reaches_majority() {
        let mut transport = MockTransport::default();
        // Only one peer answers; together with the self-vote that is 2 of 3.
        transport.vote_replies.insert(addrs()[1].clone(), grant(1));

        let raft = Raft::new(RaftConfig::new(0, addrs()), Arc::new(transport));
        run_election(&raft.node, &raft.transport).await;
        settle().await;

        assert!(raft.node.lock().await.is_leader());
    }

    #[tokio::test]
    async fn election_without_majority_stays_candidate() {
        let mut transport = MockTransport::default();
        transport.vote_replies.insert(addrs()[1].clone(), reject(1));
        transport.vote_replies.insert(addrs()[2].clone(), reject(1));

        let raft = Raft::new(RaftConfig::new(0, addrs()), Arc::new(transport));
        run_election(&raft.node, &raft.transport).await;
        settle().await;

        let node = raft.node.lock().await;
        assert_eq!(node.role(), NodeRole::Candidate);
        assert_eq!(node.current_term(), 1);
    }

    #[tokio::test]
    async fn higher_term_in_vote_reply_reverts_to_follower() {
        let mut transport = MockTransport::default();
        transport.vote_replies.insert(addrs()[1].clone(), reject(9));

        let raft = Raft::new(RaftConfig::new(0, addrs()), Arc::new(transport));
        run_election(&raft.node, &raft.transport).await;
        settle().await;

        let node = raft.node.lock().await;
        assert_eq!(node.role(), NodeRole::Follower);
        assert_eq!(node.current_term(), 9);
        assert_eq!(node.voted_for(), None);
    }

    #[tokio::test]
    async fn heartbeat_round_with_higher_term_reply_demotes_leader() {
        let mut transport = MockTransport::default();
        transport.vote_replies.insert(addrs()[1].clone(), grant(1));
        transport.append_replies.insert(
            addrs()[1].clone(),
            AppendEntriesReply {
                term: 7,
                success: false,
            },
        );

        let raft = Raft::new(RaftConfig::new(0, addrs()), Arc::new(transport));
        run_election(&raft.node, &raft.transport).await;
        settle().await;
        assert!(raft.node.lock().await.is_leader());

        broadcast_heartbeats(&raft.node, &raft.transport).await;
        settle().await;

        let node = raft.node.lock().await;
        assert_eq!(node.role(), NodeRole::Follower);
        assert_eq!(node.current_term(), 7);
    }

    #[tokio::test]
    async fn heartbeat_round_survives_unreachable_peers() {
        let mut transport = MockTransport::default();
        transport.vote_replies.insert(addrs()[1].clone(), grant(1));
        // No append replies configured: every peer is down this round.

        let raft = Raft::new(RaftConfig::new(0, addrs()), Arc::new(transport));
        run_election(&raft.node, &raft.transport).await;
        settle().await;

        broadcast_heartbeats(&raft.node, &raft.transport).await;
        settle().await;

        assert!(raft.node.lock().await.is_leader());
    }

    #[tokio::test]
    async fn heartbeat_round_is_a_no_op_for_non_leaders() {
        let raft = Raft::new(
            RaftConfig::new(0, addrs()),
            Arc::new(MockTransport::default()),
        );

        broadcast_heartbeats(&raft.node, &raft.transport).await;
        settle().await;

        let node = raft.node.lock().await;
        assert_eq!(node.role(), NodeRole::Follower);
        assert_eq!(node.current_term(), 0);
    }

    #[tokio::test]
    async fn ticker_elects_a_leader_after_silence() {
        let mut transport = MockTransport::default();
        transport.vote_replies.insert(addrs()[1].clone(), grant(1));
        transport.vote_replies.insert(addrs()[2].clone(), grant(1));

        let mut config = RaftConfig::new(0, addrs());
        config.election_timeout_min = 50;
        config.election_timeout_max = 100;

        let raft = Raft::new(config, Arc::new(transport));
        raft.start().await;

        sleep(Duration::from_millis(400)).await;

        let node = raft.node.lock().await;
        assert!(node.is_leader());
        assert!(node.current_term() >= 1);
    }
}
