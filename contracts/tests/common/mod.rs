//! Shared fixtures for the contract integration tests.
//!
//! Every test gets its own ledger with the same cast:
//!
//! - `issuer` controls the `TV2` token contract,
//! - `distributor` received the entire `TV2` ceiling at genesis,
//! - `alice` and `bob` are pool users funded by the distributor,
//! - `vault` is deployed and bound to `TV2`.

#![allow(dead_code)]

use lumina_contracts::{CallEnv, TokenLedger, Vault};
use lumina_protocol::config::LedgerConfig;
use lumina_protocol::crypto::Keypair;
use lumina_protocol::ledger::{AccountId, Ledger, LedgerState, StateView, TokenId};
use lumina_protocol::logging::{init_logging, LogFormat};
use lumina_protocol::transaction::{AccountUpdateForest, TransactionBuilder};
use lumina_protocol::{Receipt, SettlementError};

pub const NATIVE_GRANT: u64 = 1_000;
pub const TOKEN_GRANT: u64 = 1_000;

pub struct Pool {
    pub ledger: Ledger,
    pub token: TokenLedger,
    pub vault: Vault,
    pub issuer: Keypair,
    pub distributor: Keypair,
    pub alice: Keypair,
    pub bob: Keypair,
}

impl Pool {
    pub fn tv2(&self) -> TokenId {
        self.token.token_id()
    }

    pub fn native(&self, who: &Keypair) -> u64 {
        self.ledger.balance(&AccountId::native(who.address()))
    }

    pub fn tokens(&self, who: &Keypair) -> u64 {
        self.ledger.balance(&AccountId::new(who.address(), self.tv2()))
    }

    pub fn shares(&self, who: &Keypair) -> u64 {
        self.ledger
            .balance(&AccountId::new(who.address(), self.vault.share_token()))
    }

    pub fn custody(&self) -> u64 {
        self.ledger
            .balance(&AccountId::new(self.vault.address(), self.tv2()))
    }

    pub fn vault_native(&self) -> u64 {
        self.ledger.balance(&self.vault.state_account())
    }

    pub fn liquidity_supply(&self) -> u64 {
        self.ledger
            .read(|s| self.vault.state(s))
            .map(|s| s.liquidity_supply)
            .unwrap_or_default()
    }
}

/// Settles `forest` as one transaction by `sender`, signed by `sender`.
pub fn submit(ledger: &Ledger, sender: &Keypair, memo: &str, forest: AccountUpdateForest) -> Result<Receipt, SettlementError> {
    let tx = TransactionBuilder::new(sender.address())
        .memo(memo)
        .forest(forest)
        .build()
        .signed_by(sender)?;
    ledger.submit(&tx)
}

/// Runs a contract call against a fresh snapshot as `sender` and settles
/// what it returns. Contract errors are reported as `Err(anyhow)`.
pub fn call<E, F>(ledger: &Ledger, sender: &Keypair, memo: &str, f: F) -> anyhow::Result<Result<Receipt, SettlementError>>
where
    E: std::error::Error + Send + Sync + 'static,
    F: FnOnce(&CallEnv<'_>) -> Result<AccountUpdateForest, E>,
{
    let snapshot = ledger.snapshot();
    let env = CallEnv::new(&snapshot, sender.address()).with_config(ledger.config());
    let forest = f(&env)?;
    Ok(submit(ledger, sender, memo, forest))
}

/// Builds the standard pool. Panics on setup failure: tests only.
pub fn pool() -> Pool {
    // Only the first test in the binary installs the subscriber.
    let _ = init_logging("warn", LogFormat::Pretty);

    let issuer = Keypair::from_seed(&[0x11; 32]);
    let distributor = Keypair::from_seed(&[0x22; 32]);
    let alice = Keypair::from_seed(&[0xA1; 32]);
    let bob = Keypair::from_seed(&[0xB0; 32]);

    let genesis = LedgerState::genesis([
        (distributor.address(), NATIVE_GRANT * 10),
        (alice.address(), NATIVE_GRANT),
        (bob.address(), NATIVE_GRANT),
    ])
    .unwrap();
    let ledger = Ledger::new(genesis, LedgerConfig::default());

    let (token, mint) = TokenLedger::deploy(&ledger, issuer.address(), "TV2").unwrap();
    call(&ledger, &issuer, "genesis mint", |env| {
        token.mint(env, &mint, distributor.address(), u64::MAX)
    })
    .unwrap()
    .unwrap();

    for user in [&alice, &bob] {
        call(&ledger, &distributor, "fund", |env| {
            token.transfer(env, distributor.address(), user.address(), TOKEN_GRANT)
        })
        .unwrap()
        .unwrap();
    }

    let vault = Vault::deploy(&ledger, Keypair::from_seed(&[0x5A; 32])).unwrap();
    call(&ledger, &alice, "initialize", |env| vault.initialize(env, token.token_id()))
        .unwrap()
        .unwrap();

    let pool = Pool {
        ledger,
        token,
        vault,
        issuer,
        distributor,
        alice,
        bob,
    };
    assert_conserved(&pool);
    pool
}

/// Supply conservation over every token, and share supply equals the
/// vault's recorded liquidity supply.
pub fn assert_conserved(pool: &Pool) {
    pool.ledger
        .read(|s| s.check_supply_conservation())
        .unwrap();
    let share_supply = pool
        .ledger
        .read(|s| s.total_supply(&pool.vault.share_token()))
        .unwrap();
    assert_eq!(share_supply, pool.liquidity_supply());
}
