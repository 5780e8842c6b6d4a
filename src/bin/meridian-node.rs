//! Meridian node binary: flag parsing, wallet bootstrap, and wiring of the
//! blockchain, consensus engine, node runtime and API server.

use clap::Parser;
use meridian::api;
use meridian::blockchain::Blockchain;
use meridian::consensus::{PoS, Validator};
use meridian::crypto::KeyPair;
use meridian::economics::{BLOCK_TIME, INITIAL_SUPPLY, MIN_STAKE};
use meridian::node::Node;
use meridian::wallet::Wallet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "meridian-node", version, about = "Meridian proof-of-stake blockchain node")]
struct Cli {
    /// API server port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Node identifier
    #[arg(long, default_value = "node1")]
    node_id: String,

    /// Run as a validator
    #[arg(long)]
    validator: bool,

    /// Wallet file path
    #[arg(long)]
    wallet: Option<PathBuf>,

    /// Create a new wallet file and exit
    #[arg(long)]
    new_wallet: bool,

    /// Genesis address (for the first node)
    #[arg(long)]
    genesis: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    if let Err(e) = run(cli).await {
        error!(error = %e, "fatal initialization failure");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("starting Meridian node");

    if cli.new_wallet {
        return create_new_wallet();
    }

    let genesis_address = match &cli.genesis {
        Some(address) => address.clone(),
        None => {
            let keypair = KeyPair::generate()?;
            let address = keypair.address();
            info!(%address, "generated genesis address");
            address
        }
    };

    let blockchain = Arc::new(RwLock::new(Blockchain::new(
        &genesis_address,
        INITIAL_SUPPLY,
    )));
    info!(
        genesis = %genesis_address,
        supply = INITIAL_SUPPLY,
        "blockchain initialized"
    );

    let consensus = Arc::new(PoS::new(MIN_STAKE, BLOCK_TIME));
    info!(
        min_stake = MIN_STAKE,
        block_time_secs = BLOCK_TIME.as_secs(),
        "PoS consensus initialized"
    );

    let node_address = format!("localhost:{}", cli.port);
    let node = Arc::new(Node::new(
        &cli.node_id,
        &node_address,
        blockchain.clone(),
        consensus,
    ));

    if cli.validator {
        let wallet_path = cli
            .wallet
            .as_ref()
            .ok_or("validator mode requires --wallet")?;
        let wallet = Wallet::load(wallet_path)?;
        let keypair = wallet.keypair()?;

        {
            let mut bc = blockchain.write().await;
            if bc.state.add_stake(&wallet.address, MIN_STAKE).is_err() {
                // A fresh validator identity holds nothing yet; seed it
                // with enough balance to cover the minimum stake.
                bc.state.set_balance(&wallet.address, MIN_STAKE * 2);
                bc.state.add_stake(&wallet.address, MIN_STAKE)?;
            }
        }

        node.set_validator(Validator::from_keypair(&keypair, MIN_STAKE))?;
        info!(address = %wallet.address, stake = MIN_STAKE, "running as validator");
    }

    node.start();

    let api_node = node.clone();
    let api_port = cli.port;
    tokio::spawn(async move {
        if let Err(e) = api::run_api_server(api_node, api_port).await {
            error!(error = %e, "API server failed");
            std::process::exit(1);
        }
    });

    info!(
        node = %cli.node_id,
        port = cli.port,
        height = blockchain.read().await.height(),
        "node started"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    node.stop();
    Ok(())
}

fn create_new_wallet() -> Result<(), Box<dyn std::error::Error>> {
    let wallet = Wallet::new()?;
    let filename = format!("wallet_{}.json", &wallet.address[..8]);
    wallet.save(&filename)?;

    info!(address = %wallet.address, file = %filename, "new wallet created");
    info!("keep the wallet file safe; it contains your private key");
    Ok(())
}
