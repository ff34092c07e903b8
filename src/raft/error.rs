use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaftError {
    #[error("Not a leader")]
    NotLeader,
}
