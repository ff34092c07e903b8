use std::sync::Arc;
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};

use crate::network::proto::raft_service_server::RaftService;
use crate::raft::{AppendEntriesArgs, LogEntry, RaftNode, RequestVoteArgs};
use log::debug;

use super::proto::*;

pub struct RaftServer {
    node: Arc<Mutex<RaftNode>>,
}

impl RaftServer {
    pub fn new(node: Arc<Mutex<RaftNode>>) -> Self {
        Self { node }
    }
}

#[tonic::async_trait]
impl RaftService for RaftServer {
    async fn request_vote(
        &self,
        request: Request<RequestVoteRequest>,
    ) -> Result<Response<RequestVoteResponse>, Status> {
        let req = request.into_inner();
        debug!("Received RequestVote: {:?}", req);

        let args = RequestVoteArgs {
            term: req.term,
            candidate_id: req.candidate_id as usize,
            last_log_index: req.last_log_index,
            last_log_term: req.last_log_term,
        };

        let reply = {
            let mut node = self.node.lock().await;
            node.handle_request_vote(&args)
        };

        Ok(Response::new(RequestVoteResponse {
            term: reply.term,
            vote_granted: reply.vote_granted,
        }))
    }

    async fn append_entries(
        &self,
        request: Request<AppendEntriesRequest>,
    ) -> Result<Response<AppendEntriesResponse>, Status> {
        let req = request.into_inner();
        debug!(
            "Received AppendEntries: term={}, leader={}, entries={}",
            req.term,
            req.leader_id,
            req.entries.len()
        );

        let entries = req
            .entries
            .into_iter()
            .map(|e| LogEntry {
                term: e.term,
                command: e.command,
            })
            .collect();

        let args = AppendEntriesArgs {
            term: req.term,
            leader_id: req.leader_id as usize,
            prev_log_index: req.prev_log_index,
            prev_log_term: req.prev_log_term,
            entries,
            leader_commit: req.leader_commit,
        };

        let reply = {
            let mut node = self.node.lock().await;
            node.handle_append_entries(&args)
        };

        Ok(Response::new(AppendEntriesResponse {
            term: reply.term,
            success: reply.success,
        }))
    }
}
