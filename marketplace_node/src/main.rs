use anyhow::Result;
use log::info;

use marketplace_node::api::server;
use marketplace_node::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    info!(
        "starting marketplace node: port={} seed={} ranker_model={}",
        config.port, config.seed_demo_data, config.ranker.model
    );

    server::start(config).await
}
