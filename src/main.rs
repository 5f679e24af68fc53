use clap::Parser;
use pose_extractor_lib::cli::{self, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pose_extractor_lib::init_logging();
    cli::run(Args::parse()).await
}
