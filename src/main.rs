use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;

use quorum::network::proto::raft_service_server::RaftServiceServer;
use quorum::network::{GrpcTransport, RaftServer};
use quorum::raft::{Raft, RaftConfig};
use quorum::Config;

#[derive(Parser)]
#[command(name = "quorum", about = "A Raft-style leader election node")]
struct Args {
    /// Index of this node in the cluster address list
    #[arg(long)]
    id: usize,

    /// Comma-separated cluster addresses; index i is the address of node id i
    #[arg(
        long,
        default_value = "127.0.0.1:8000,127.0.0.1:8001,127.0.0.1:8002"
    )]
    cluster: String,

    /// Heartbeat interval in milliseconds
    #[arg(long, default_value_t = 100)]
    heartbeat_ms: u64,

    /// Lower bound of the randomized election timeout in milliseconds
    #[arg(long, default_value_t = 300)]
    election_min_ms: u64,

    /// Upper bound of the randomized election timeout in milliseconds
    #[arg(long, default_value_t = 450)]
    election_max_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::new(args.id, &args.cluster)?;

    let addr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_addr()))?;

    let mut raft_config = RaftConfig::new(config.node_id, config.peers.clone());
    raft_config.heartbeat_interval = args.heartbeat_ms;
    raft_config.election_timeout_min = args.election_min_ms;
    raft_config.election_timeout_max = args.election_max_ms;

    let raft = Raft::new(raft_config, Arc::new(GrpcTransport));
    let raft_server = RaftServer::new(Arc::clone(&raft.node));

    {
        let node = raft.node.lock().await;
        info!("Starting node {} on {} as {}", node.id(), addr, node.role());
    }

    raft.start().await;

    // Binding failure is the one non-recoverable startup error.
    tonic::transport::Server::builder()
        .add_service(RaftServiceServer::new(raft_server))
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .with_context(|| format!("gRPC server on {addr} failed"))?;

    info!("Shutting down node {}", config.node_id);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
