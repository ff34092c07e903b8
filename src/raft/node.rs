use rand::Rng;
use std::time::{Duration, Instant};
// Use external log crate, not our own log module
use ::log::{debug, info};

use super::{
    AppendEntriesArgs, AppendEntriesReply, Log, NodeRole, NodeState, RaftConfig, RaftError,
    RequestVoteArgs, RequestVoteReply,
};

/// The consensus record of a single node.
///
/// All fields are mutated exclusively while the owning `Raft` service holds
/// its mutex; none of the methods here perform any I/O, so the lock is never
/// held across a network call.
pub struct RaftNode {
    // Node identity
    id: usize,
    peers: Vec<String>,

    // Raft state
    state: NodeState,
    log: Log,

    // Configuration
    config: RaftConfig,

    // Election state
    last_contact: Instant,
    votes_received: usize,

    // Leader state, (re)initialized at the moment of promotion
    next_index: Vec<u64>,
    match_index: Vec<u64>,
}

impl RaftNode {
    pub fn new(config: RaftConfig) -> Self {
        let id = config.id;
        let peers = config.peers.clone();

        Self {
            id,
            peers,
            state: NodeState::new(),
            log: Log::new(),
            config,
            last_contact: Instant::now(),
            votes_received: 0,
            next_index: Vec::new(),
            match_index: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn config(&self) -> &RaftConfig {
        &self.config
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn role(&self) -> NodeRole {
        self.state.role
    }

    pub fn current_term(&self) -> u64 {
        self.state.current_term
    }

    pub fn voted_for(&self) -> Option<usize> {
        self.state.voted_for
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.state.role, NodeRole::Leader)
    }

    pub fn reset_last_contact(&mut self) {
        self.last_contact = Instant::now();
    }

    /// Rolls a fresh randomized election timeout. Re-rolled on every ticker
    /// check so that competing candidates desynchronize.
    pub fn roll_election_timeout(&self) -> Duration {
        let mut rng = rand::rng();
        let timeout_ms =
            rng.random_range(self.config.election_timeout_min..=self.config.election_timeout_max);
        Duration::from_millis(timeout_ms)
    }

    pub fn election_timeout_elapsed(&self) -> bool {
        self.last_contact.elapsed() > self.roll_election_timeout()
    }

    /// Promotes self to Candidate for a new term and returns the vote
    /// request plus the peer list for the fan-out. The self-vote is counted
    /// here; a single-node cluster wins on the spot.
    pub fn begin_election(&mut self) -> (RequestVoteArgs, Vec<String>) {
        self.state.role = NodeRole::Candidate;
        self.state.current_term += 1;
        self.state.voted_for = Some(self.id);
        self.last_contact = Instant::now();
        self.votes_received = 1;

        info!(
            "[node {}] starting election for term {}",
            self.id, self.state.current_term
        );

        if self.votes_received > self.peers.len() / 2 {
            self.become_leader();
        }

        let args = RequestVoteArgs {
            term: self.state.current_term,
            candidate_id: self.id,
            last_log_index: self.log.last_index(),
            last_log_term: self.log.last_term(),
        };

        (args, self.peers.clone())
    }

    /// Applies one vote reply from the election started for `election_term`.
    /// Replies that arrive after the election is decided (role or term moved
    /// on) are no-ops.
    pub fn handle_vote_reply(&mut self, election_term: u64, reply: &RequestVoteReply) {
        if self.state.role != NodeRole::Candidate || self.state.current_term != election_term {
            return;
        }

        if reply.term > self.state.current_term {
            self.become_follower(reply.term);
            return;
        }

        if reply.vote_granted {
            self.votes_received += 1;
            if self.votes_received > self.peers.len() / 2 {
                self.become_leader();
            }
        }
    }

    /// Returns the empty AppendEntries round for the current term, or
    /// `NotLeader` if this node was demoted between the ticker's role check
    /// and this call.
    pub fn begin_heartbeat_round(&self) -> Result<(AppendEntriesArgs, Vec<String>), RaftError> {
        if !self.is_leader() {
            return Err(RaftError::NotLeader);
        }

        let args = AppendEntriesArgs {
            term: self.state.current_term,
            leader_id: self.id,
            prev_log_index: self.log.last_index(),
            prev_log_term: self.log.last_term(),
            entries: Vec::new(),
            leader_commit: self.state.commit_index,
        };

        Ok((args, self.peers.clone()))
    }

    /// Applies one heartbeat reply from the round sent at `round_term`.
    pub fn handle_heartbeat_reply(&mut self, round_term: u64, reply: &AppendEntriesReply) {
        if self.state.role != NodeRole::Leader || self.state.current_term != round_term {
            return;
        }

        if reply.term > self.state.current_term {
            info!(
                "[node {}] observed term {} from a peer, stepping down",
                self.id, reply.term
            );
            self.become_follower(reply.term);
        }
    }

    pub fn handle_request_vote(&mut self, args: &RequestVoteArgs) -> RequestVoteReply {
        debug!(
            "[node {}] received RequestVote from {} (term {})",
            self.id, args.candidate_id, args.term
        );

        if args.term < self.state.current_term {
            return RequestVoteReply {
                term: self.state.current_term,
                vote_granted: false,
            };
        }

        if args.term > self.state.current_term {
            self.become_follower(args.term);
        }

        let can_vote = self.state.voted_for.is_none()
            || self.state.voted_for == Some(args.candidate_id);

        if can_vote {
            self.state.voted_for = Some(args.candidate_id);
            self.last_contact = Instant::now();
            info!(
                "[node {}] voted for {} in term {}",
                self.id, args.candidate_id, self.state.current_term
            );
        }

        RequestVoteReply {
            term: self.state.current_term,
            vote_granted: can_vote,
        }
    }

    pub fn handle_append_entries(&mut self, args: &AppendEntriesArgs) -> AppendEntriesReply {
        if args.term < self.state.current_term {
            return AppendEntriesReply {
                term: self.state.current_term,
                success: false,
            };
        }

        self.last_contact = Instant::now();

        if args.term > self.state.current_term {
            self.become_follower(args.term);
        } else if self.state.role == NodeRole::Candidate {
            // A leader already exists for this term.
            debug!(
                "[node {}] valid AppendEntries from {} in term {}, abandoning candidacy",
                self.id, args.leader_id, args.term
            );
            self.state.role = NodeRole::Follower;
        }

        AppendEntriesReply {
            term: self.state.current_term,
            success: true,
        }
    }

    fn become_follower(&mut self, term: u64) {
        let was = self.state.role;
        self.state.current_term = term;
        self.state.voted_for = None;
        self.state.role = NodeRole::Follower;
        self.votes_received = 0;

        if was != NodeRole::Follower {
            info!("[node {}] {} -> follower at term {}", self.id, was, term);
        }
    }

    fn become_leader(&mut self) {
        info!(
            "[node {}] became leader for term {}",
            self.id, self.state.current_term
        );

        self.state.role = NodeRole::Leader;
        let next = self.log.len() as u64;
        self.next_index = vec![next; self.peers.len()];
        self.match_index = vec![0; self.peers.len()];
    }

    #[cfg(test)]
    pub(crate) fn next_index(&self) -> &[u64] {
        &self.next_index
    }

    #[cfg(test)]
    pub(crate) fn match_index(&self) -> &[u64] {
        &self.match_index
    }
}
