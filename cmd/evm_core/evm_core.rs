//! `evm_core`: drives the Top-Level Loop over a JSON fixture describing a
//! block's pre-state, metadata, transactions and claimed post-state
//! digests, and reports whether the claims hold (§6 "Output").

use anyhow::{bail, Context, Result};
use clap::Parser;
use ethereum_types::{Address, H256, U256};
use evm_core_vm::{
    run_block, Account, BlockClaims, BlockEnv, DefaultPrecompiles, Fork, InMemoryWorldState,
    TxEnv, Withdrawal, WorldState,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "evm_core", about = "Runs a block fixture through the execution core")]
struct Cli {
    /// Path to a JSON fixture (pre-state, block, transactions, claims).
    fixture: PathBuf,

    /// Fork to execute under, overriding whatever the fixture's block says.
    #[arg(long, value_enum)]
    fork: Option<ForkArg>,

    /// Emit tracing output at this level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ForkArg {
    Frontier,
    Byzantium,
    IstanbulBerlin,
    London,
    Shanghai,
}

impl From<ForkArg> for Fork {
    fn from(value: ForkArg) -> Self {
        match value {
            ForkArg::Frontier => Fork::Frontier,
            ForkArg::Byzantium => Fork::Byzantium,
            ForkArg::IstanbulBerlin => Fork::IstanbulBerlin,
            ForkArg::London => Fork::London,
            ForkArg::Shanghai => Fork::Shanghai,
        }
    }
}

#[derive(Deserialize)]
struct AccountFixture {
    #[serde(default)]
    nonce: u64,
    #[serde(default)]
    balance: U256,
    #[serde(default)]
    code: Option<bytes::Bytes>,
    #[serde(default)]
    storage: BTreeMap<U256, U256>,
}

#[derive(Deserialize)]
struct Fixture {
    pre_state: BTreeMap<Address, AccountFixture>,
    block: BlockEnv,
    transactions: Vec<TxEnv>,
    #[serde(default)]
    withdrawals: Vec<Withdrawal>,
    claims: BlockClaims,
}

fn load_world(pre_state: BTreeMap<Address, AccountFixture>) -> InMemoryWorldState {
    let mut world = InMemoryWorldState::new();
    for (addr, fixture) in pre_state {
        let code_hash = match &fixture.code {
            Some(code) if !code.is_empty() => {
                let hash = evm_core_common::keccak256(code);
                world.write_code(hash, code.clone());
                hash
            }
            _ => evm_core_common::empty_string_hash(),
        };
        for (key, value) in fixture.storage {
            world.write_storage(addr, key, value);
        }
        world.write_account(
            addr,
            Account {
                nonce: fixture.nonce,
                balance: fixture.balance,
                storage_root: H256::zero(),
                code_hash,
            },
        );
    }
    world
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let raw = std::fs::read_to_string(&cli.fixture)
        .with_context(|| format!("reading fixture {}", cli.fixture.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw).context("parsing fixture JSON")?;

    let mut block = fixture.block;
    if let Some(fork) = cli.fork {
        block.fork = fork.into();
    }
    let fork = block.fork;

    let world = load_world(fixture.pre_state);
    let precompiles = DefaultPrecompiles;

    info!(transactions = fixture.transactions.len(), ?fork, "running block");
    match run_block(
        world,
        fork,
        &precompiles,
        &block,
        &fixture.transactions,
        &fixture.withdrawals,
        &fixture.claims,
    ) {
        Ok((_world, outcome)) => {
            for (index, receipt) in outcome.receipts.iter().enumerate() {
                info!(index, status = receipt.status, gas = receipt.cumulative_gas_used, "receipt");
            }
            println!("OK: claimed digests match, {} receipts produced", outcome.receipts.len());
            Ok(())
        }
        Err(err) => {
            bail!("block rejected: {err}");
        }
    }
}
