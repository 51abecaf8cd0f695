//! DID registry command line.
//!
//! Operates the chain and account registries kept in a local sled
//! database. Every command opens the database, runs one registry call and
//! prints the result as JSON.

mod node_config;

use crate::node_config::NodeConfig;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use didreg_registry::{AccountDidRegistry, ChainDidRegistry, RoleBasedPolicy};
use didreg_storage::{KvStore, SledStore};
use didreg_types::{AccountDoc, ChainDoc, Did, DocPointer, Status};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CHAIN_TREE: &str = "chain_registry";
const ACCOUNT_TREE: &str = "account_registry";

#[derive(Parser)]
#[command(name = "didreg")]
#[command(about = "DID registry command line", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Overrides `data_dir` from the configuration
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Enforce admin and owner roles instead of trusting the caller
    #[arg(long)]
    enforce_roles: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Bootstrap the genesis identifiers of the configured registries
    Genesis,
    /// Chain identifier operations
    Chain {
        #[command(subcommand)]
        action: ChainCommands,
    },
    /// Account identifier operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },
    /// Admin list of a registry
    Admins {
        #[command(subcommand)]
        action: AdminCommands,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RegistryKind {
    Chain,
    Account,
}

#[derive(Args)]
struct Target {
    /// Identifier acting on the registry
    #[arg(long)]
    caller: Did,
    did: Did,
}

#[derive(Args)]
struct DocArgs {
    #[command(flatten)]
    target: Target,
    /// Document address (external document mode)
    #[arg(long, requires = "hash", conflicts_with = "doc")]
    addr: Option<String>,
    /// Hex encoded document hash (external document mode)
    #[arg(long, requires = "addr")]
    hash: Option<String>,
    /// JSON document file (internal document mode)
    #[arg(long, value_name = "PATH")]
    doc: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ChainCommands {
    /// Apply for a chain identifier
    Apply(Target),
    /// Approve or reject a pending application
    AuditApply {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        reject: bool,
    },
    Register(DocArgs),
    Update(DocArgs),
    /// Force the status of a chain identifier
    Audit {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        status: String,
    },
    Freeze(Target),
    Unfreeze(Target),
    Delete(Target),
    Resolve { did: Did },
    Status { did: Did },
}

#[derive(Subcommand)]
enum AccountCommands {
    Register(DocArgs),
    Update(DocArgs),
    Freeze(Target),
    Unfreeze(Target),
    Delete(Target),
    Resolve { did: Did },
    Status { did: Did },
}

#[derive(Subcommand)]
enum AdminCommands {
    List {
        #[arg(value_enum)]
        registry: RegistryKind,
    },
    Add {
        #[arg(value_enum)]
        registry: RegistryKind,
        did: Did,
    },
    Remove {
        #[arg(value_enum)]
        registry: RegistryKind,
        did: Did,
    },
}

impl AdminCommands {
    fn registry(&self) -> RegistryKind {
        match self {
            AdminCommands::List { registry }
            | AdminCommands::Add { registry, .. }
            | AdminCommands::Remove { registry, .. } => *registry,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = NodeConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }
    init_logging(&config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &config, &mut out)
}

fn init_logging(config: &NodeConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

/// Registries opened over one sled database, each in its own tree.
struct Node {
    db: sled::Db,
    config: NodeConfig,
    enforce_roles: bool,
}

impl Node {
    fn open(config: &NodeConfig, enforce_roles: bool) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data dir {}", config.data_dir.display())
        })?;
        let db = didreg_storage::open_db(&config.data_dir)
            .with_context(|| format!("failed to open {}", config.data_dir.display()))?;
        debug!(path = %config.data_dir.display(), "registry database opened");
        Ok(Self {
            db,
            config: config.clone(),
            enforce_roles,
        })
    }

    fn store(&self, tree: &str) -> Result<Arc<dyn KvStore>> {
        Ok(Arc::new(SledStore::from_db(self.db.clone(), tree)?))
    }

    fn chain(&self) -> Result<ChainDidRegistry> {
        let registry =
            ChainDidRegistry::from_store(self.config.chain_registry(), self.store(CHAIN_TREE)?)?;
        Ok(if self.enforce_roles {
            registry.with_policy(RoleBasedPolicy)
        } else {
            registry
        })
    }

    fn account(&self) -> Result<AccountDidRegistry> {
        let registry = AccountDidRegistry::from_store(
            self.config.account_registry(),
            self.store(ACCOUNT_TREE)?,
        )?;
        Ok(if self.enforce_roles {
            registry.with_policy(RoleBasedPolicy)
        } else {
            registry
        })
    }
}

impl Drop for Node {
    // Registries that bailed out early never reached `close`.
    fn drop(&mut self) {
        if let Err(err) = self.db.flush() {
            warn!(error = %err, "failed to flush registry database");
        }
    }
}

fn run(cli: &Cli, config: &NodeConfig, out: &mut impl Write) -> Result<()> {
    let value = match &cli.command {
        Commands::Version => json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
        Commands::Genesis => {
            let node = Node::open(config, cli.enforce_roles)?;
            genesis(&node)?
        }
        Commands::Chain { action } => {
            let node = Node::open(config, cli.enforce_roles)?;
            let mut chains = node.chain()?;
            let value = chain_command(&mut chains, action)?;
            chains.close()?;
            value
        }
        Commands::Account { action } => {
            let node = Node::open(config, cli.enforce_roles)?;
            let mut accounts = node.account()?;
            let value = account_command(&mut accounts, action)?;
            accounts.close()?;
            value
        }
        Commands::Admins { action } => {
            let node = Node::open(config, cli.enforce_roles)?;
            match action.registry() {
                RegistryKind::Chain => {
                    let mut chains = node.chain()?;
                    match action {
                        AdminCommands::List { .. } => {}
                        AdminCommands::Add { did, .. } => chains.add_admin(did.clone())?,
                        AdminCommands::Remove { did, .. } => chains.remove_admin(did)?,
                    }
                    let admins = json!({ "admins": chains.admins() });
                    chains.close()?;
                    admins
                }
                RegistryKind::Account => {
                    let mut accounts = node.account()?;
                    match action {
                        AdminCommands::List { .. } => {}
                        AdminCommands::Add { did, .. } => accounts.add_admin(did.clone())?,
                        AdminCommands::Remove { did, .. } => accounts.remove_admin(did)?,
                    }
                    let admins = json!({ "admins": accounts.admins() });
                    accounts.close()?;
                    admins
                }
            }
        }
    };

    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn genesis(node: &Node) -> Result<Value> {
    let mut report = serde_json::Map::new();
    if node.config.chain.as_ref().is_some_and(|c| c.genesis.is_some()) {
        let mut chains = node.chain()?;
        chains.setup_genesis()?;
        report.insert("chain".to_string(), json!(chains.self_id()));
        chains.close()?;
    }
    if node.config.account.as_ref().is_some_and(|c| c.genesis.is_some()) {
        let mut accounts = node.account()?;
        accounts.setup_genesis()?;
        report.insert(
            "account".to_string(),
            json!({
                "did": accounts.self_id(),
                "chain": accounts.self_chain_did(),
            }),
        );
        accounts.close()?;
    }
    if report.is_empty() {
        bail!("no registry has a genesis configured");
    }
    info!(registries = report.len(), "genesis complete");
    Ok(Value::Object(report))
}

fn chain_command(chains: &mut ChainDidRegistry, action: &ChainCommands) -> Result<Value> {
    Ok(match action {
        ChainCommands::Apply(t) => {
            chains.apply(&t.caller, &t.did)?;
            status_json(&t.did, chains.status(&t.did)?)
        }
        ChainCommands::AuditApply { target: t, reject } => {
            chains.audit_apply(&t.caller, &t.did, !reject)?;
            status_json(&t.did, chains.status(&t.did)?)
        }
        ChainCommands::Register(args) => {
            let t = &args.target;
            let pointer = match args.doc_source()? {
                DocSource::External { addr, hash } => {
                    chains.register(&t.caller, &t.did, addr, hash)?
                }
                DocSource::Internal(path) => {
                    chains.register_with_doc(&t.caller, read_json::<ChainDoc>(&path)?)?
                }
            };
            pointer_json(&t.did, &pointer)
        }
        ChainCommands::Update(args) => {
            let t = &args.target;
            let pointer = match args.doc_source()? {
                DocSource::External { addr, hash } => chains.update(&t.caller, &t.did, addr, hash)?,
                DocSource::Internal(path) => {
                    chains.update_with_doc(&t.caller, read_json::<ChainDoc>(&path)?)?
                }
            };
            pointer_json(&t.did, &pointer)
        }
        ChainCommands::Audit { target: t, status } => {
            chains.audit(&t.caller, &t.did, parse_status(status)?)?;
            status_json(&t.did, chains.status(&t.did)?)
        }
        ChainCommands::Freeze(t) => {
            chains.freeze(&t.caller, &t.did)?;
            status_json(&t.did, chains.status(&t.did)?)
        }
        ChainCommands::Unfreeze(t) => {
            chains.unfreeze(&t.caller, &t.did)?;
            status_json(&t.did, chains.status(&t.did)?)
        }
        ChainCommands::Delete(t) => {
            chains.delete(&t.caller, &t.did)?;
            status_json(&t.did, chains.status(&t.did)?)
        }
        ChainCommands::Resolve { did } => match chains.resolve(did)? {
            Some(found) => json!({ "item": found.item, "doc": found.doc }),
            None => Value::Null,
        },
        ChainCommands::Status { did } => status_json(did, chains.status(did)?),
    })
}

fn account_command(accounts: &mut AccountDidRegistry, action: &AccountCommands) -> Result<Value> {
    Ok(match action {
        AccountCommands::Register(args) => {
            let t = &args.target;
            let pointer = match args.doc_source()? {
                DocSource::External { addr, hash } => {
                    accounts.register(&t.caller, &t.did, addr, hash)?
                }
                DocSource::Internal(path) => {
                    accounts.register_with_doc(&t.caller, read_json::<AccountDoc>(&path)?)?
                }
            };
            pointer_json(&t.did, &pointer)
        }
        AccountCommands::Update(args) => {
            let t = &args.target;
            let pointer = match args.doc_source()? {
                DocSource::External { addr, hash } => {
                    accounts.update(&t.caller, &t.did, addr, hash)?
                }
                DocSource::Internal(path) => {
                    accounts.update_with_doc(&t.caller, read_json::<AccountDoc>(&path)?)?
                }
            };
            pointer_json(&t.did, &pointer)
        }
        AccountCommands::Freeze(t) => {
            accounts.freeze(&t.caller, &t.did)?;
            status_json(&t.did, accounts.status(&t.did)?)
        }
        AccountCommands::Unfreeze(t) => {
            accounts.unfreeze(&t.caller, &t.did)?;
            status_json(&t.did, accounts.status(&t.did)?)
        }
        AccountCommands::Delete(t) => {
            accounts.delete(&t.caller, &t.did)?;
            status_json(&t.did, accounts.status(&t.did)?)
        }
        AccountCommands::Resolve { did } => match accounts.resolve(did)? {
            Some(found) => json!({ "item": found.item, "doc": found.doc }),
            None => Value::Null,
        },
        AccountCommands::Status { did } => status_json(did, accounts.status(did)?),
    })
}

enum DocSource {
    External { addr: String, hash: Vec<u8> },
    Internal(PathBuf),
}

impl DocArgs {
    fn doc_source(&self) -> Result<DocSource> {
        match (&self.addr, &self.hash, &self.doc) {
            (Some(addr), Some(hash), None) => Ok(DocSource::External {
                addr: addr.clone(),
                hash: hex::decode(hash.trim_start_matches("0x"))
                    .context("document hash must be hex")?,
            }),
            (None, None, Some(path)) => Ok(DocSource::Internal(path.clone())),
            _ => bail!("pass either --addr and --hash, or --doc"),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_status(raw: &str) -> Result<Status> {
    if let Ok(code) = raw.parse::<i32>() {
        return Ok(Status::from_code(code)?);
    }
    Status::ALL
        .into_iter()
        .find(|s| s.as_str() == raw)
        .ok_or_else(|| anyhow!("unknown status: {raw}"))
}

fn status_json(did: &Did, status: Status) -> Value {
    json!({ "did": did, "status": status.as_str(), "code": status.code() })
}

fn pointer_json(did: &Did, pointer: &DocPointer) -> Value {
    json!({ "did": did, "addr": pointer.addr, "hash": hex::encode(&pointer.hash) })
}
