use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use meridian_client::{
    AccountCache, BaseTx, BatchDispatcher, ClientConfig, NodeTransport, RpcTransport, SharedCache,
};
use meridian_codec::Codec;
use meridian_keyring::MemoryKeyring;
use meridian_types::msgs::MsgSend;
use meridian_types::{AccAddress, BroadcastMode, Coins, Msg};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key name the imported CLI key is stored under
const CLI_SIGNER: &str = "cli";

#[derive(Parser)]
#[command(
    name = "meridian",
    about = "Build, sign and broadcast transactions to a Cosmos-style chain",
    version,
    author
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "URL", help = "Node RPC endpoint")]
    node: Option<String>,

    #[arg(long, global = true, value_name = "ID", help = "Chain ID")]
    chain_id: Option<String>,

    #[arg(long, global = true, value_name = "LEVEL", help = "Log level (trace, debug, info, warn, error)")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Send coins to an address")]
    Send {
        #[arg(long, value_name = "ADDRESS", help = "Recipient bech32 address")]
        to: String,

        #[arg(long, value_name = "COINS", help = "Amount, e.g. 10stake")]
        amount: String,

        #[arg(long, value_name = "HEX", help = "Hex encoded secp256k1 private key of the sender")]
        private_key: String,

        #[arg(long, value_name = "COINS", help = "Fee, overrides the configured fee")]
        fee: Option<String>,

        #[arg(long, help = "Gas limit, overrides the configured gas")]
        gas: Option<u64>,

        #[arg(long, default_value = "", help = "Transaction memo")]
        memo: String,

        #[arg(long, value_name = "MODE", help = "Broadcast mode (async, sync, commit)")]
        mode: Option<String>,

        #[arg(long, help = "Simulate instead of broadcasting")]
        simulate: bool,
    },

    #[command(about = "Query account number and sequence")]
    Account {
        #[arg(value_name = "ADDRESS", help = "Bech32 account address")]
        address: String,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    #[command(about = "Display version information")]
    Version,
}

#[derive(Subcommand)]
enum ConfigCommands {
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        overwrite: bool,
    },

    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Set a configuration value")]
    Set {
        #[arg(value_name = "KEY")]
        key: String,

        #[arg(value_name = "VALUE")]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(ClientConfig::default_config_file);

    match cli.command {
        Commands::Version => version_command(),
        Commands::Config { ref command } => config_command(command, &config_path),
        Commands::Send {
            ref to,
            ref amount,
            ref private_key,
            ref fee,
            gas,
            ref memo,
            ref mode,
            simulate,
        } => {
            let config = load_config(&cli, &config_path)?;
            setup_logging(&config)?;

            let mut base_tx = BaseTx::new(CLI_SIGNER, "")
                .with_memo(memo.clone())
                .with_simulate(simulate);
            if let Some(fee) = fee {
                base_tx = base_tx.with_fee(fee.parse::<Coins>().context("invalid fee")?);
            }
            if let Some(gas) = gas {
                base_tx = base_tx.with_gas(gas);
            }
            if let Some(mode) = mode {
                base_tx = base_tx.with_mode(mode.parse::<BroadcastMode>().map_err(|e| anyhow!(e))?);
            }

            send_command(config, to, amount, private_key, base_tx).await
        }
        Commands::Account { ref address } => {
            let config = load_config(&cli, &config_path)?;
            setup_logging(&config)?;
            account_command(config, address).await
        }
    }
}

fn version_command() -> Result<()> {
    println!("meridian {}", env!("CARGO_PKG_VERSION"));
    println!("build: {}", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn setup_logging(config: &ClientConfig) -> Result<()> {
    meridian_log::init_tracing_with_level(&config.log_level).map_err(|e| anyhow!(e))
}

/// Config file (or defaults) with command line overrides applied
fn load_config(cli: &Cli, path: &Path) -> Result<ClientConfig> {
    let mut config = if path.exists() {
        ClientConfig::load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?
    } else {
        ClientConfig::default()
    };

    if let Some(node) = &cli.node {
        config.set("node", node)?;
    }
    if let Some(chain_id) = &cli.chain_id {
        config.set("chain_id", chain_id)?;
    }
    if let Some(level) = &cli.log_level {
        config.set("log_level", level)?;
    }
    config.validate()?;
    Ok(config)
}

fn config_command(command: &ConfigCommands, path: &Path) -> Result<()> {
    match command {
        ConfigCommands::Init { overwrite } => {
            if path.exists() && !overwrite {
                return Err(anyhow!(
                    "{} already exists, pass --overwrite to replace it",
                    path.display()
                ));
            }
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            ClientConfig::default().save_to_file(path)?;
            println!("wrote {}", path.display());
        }
        ConfigCommands::Show => {
            let config = if path.exists() {
                ClientConfig::load_from_file(path)?
            } else {
                ClientConfig::default()
            };
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Set { key, value } => {
            let mut config = if path.exists() {
                ClientConfig::load_from_file(path)?
            } else {
                ClientConfig::default()
            };
            config.set(key, value)?;
            config.validate()?;
            config.save_to_file(path)?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

async fn send_command(
    config: ClientConfig,
    to: &str,
    amount: &str,
    private_key: &str,
    base_tx: BaseTx,
) -> Result<()> {
    let keys = Arc::new(MemoryKeyring::new());
    let sender = keys
        .import_private_key(CLI_SIGNER, &base_tx.password, private_key)
        .context("invalid private key")?;
    let recipient: AccAddress = to.parse().context("invalid recipient")?;
    let amount: Coins = amount.parse().context("invalid amount")?;

    let transport = Arc::new(RpcTransport::new(&config.node, config.timeout())?);
    let dispatcher = BatchDispatcher::new(config, transport, keys, Arc::new(Codec::with_defaults()))?;

    let msgs: Vec<Box<dyn Msg>> = vec![Box::new(MsgSend::new(sender.address, recipient, amount))];
    match dispatcher.send(&msgs, &base_tx).await {
        Ok(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Err(err) => {
            if !err.results.is_empty() {
                println!("{}", serde_json::to_string_pretty(&err.results)?);
            }
            Err(err.into())
        }
    }
}

async fn account_command(config: ClientConfig, address: &str) -> Result<()> {
    let address: AccAddress = address.parse().context("invalid account address")?;

    let transport: Arc<dyn NodeTransport> = Arc::new(RpcTransport::new(&config.node, config.timeout())?);
    let store = Arc::new(SharedCache::new(config.cache_capacity, config.cache_expiry()));
    let accounts = AccountCache::new(store, transport, config.timeout());

    let state = accounts.query_and_refresh_account(&address.to_string()).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "address": address.to_string(),
            "account_number": state.account_number,
            "sequence": state.sequence,
        }))?
    );
    Ok(())
}
