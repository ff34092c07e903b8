use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use crate::raft::{AppendEntriesArgs, AppendEntriesReply, RequestVoteArgs, RequestVoteReply};

use crate::network::proto::raft_service_client::RaftServiceClient;
use crate::network::proto::{AppendEntriesRequest, RequestVoteRequest};

use super::NetworkError;

pub struct RaftClient {
    address: String,
    client: Option<RaftServiceClient<Channel>>,
}

impl RaftClient {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            client: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), NetworkError> {
        let endpoint = Endpoint::from_shared(format!("http://{}", self.address))
            .map_err(|e| NetworkError::ConnectionError(e.to_string()))?;

        let channel = endpoint
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(5))
            .connect()
            .await?;

        self.client = Some(RaftServiceClient::new(channel));

        Ok(())
    }

    pub async fn request_vote(
        &mut self,
        args: RequestVoteArgs,
    ) -> Result<RequestVoteReply, NetworkError> {
        if self.client.is_none() {
            self.connect().await?;
        }

        let request = RequestVoteRequest {
            term: args.term,
            candidate_id: args.candidate_id as u64,
            last_log_index: args.last_log_index,
            last_log_term: args.last_log_term,
        };

        let response = self
            .client
            .as_mut()
            .ok_or_else(|| NetworkError::ConnectionError("Client not connected".to_string()))?
            .request_vote(Request::new(request))
            .await?
            .into_inner();

        Ok(RequestVoteReply {
            term: response.term,
            vote_granted: response.vote_granted,
        })
    }

    pub async fn append_entries(
        &mut self,
        args: AppendEntriesArgs,
    ) -> Result<AppendEntriesReply, NetworkError> {
        if self.client.is_none() {
            self.connect().await?;
        }

        let entries = args
            .entries
            .into_iter()
            .map(|e| crate::network::proto::LogEntry {
                term: e.term,
                command: e.command,
            })
            .collect();

        let request = AppendEntriesRequest {
            term: args.term,
            leader_id: args.leader_id as u64,
            prev_log_index: args.prev_log_index,
            prev_log_term: args.prev_log_term,
            entries,
            leader_commit: args.leader_commit,
        };

        let response = self
            .client
            .as_mut()
            .ok_or_else(|| NetworkError::ConnectionError("Client not connected".to_string()))?
            .append_entries(Request::new(request))
            .await?
            .into_inner();

        Ok(AppendEntriesReply {
            term: response.term,
            success: response.success,
        })
    }
}
