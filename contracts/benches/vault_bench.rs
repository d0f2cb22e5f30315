// Vault benchmarks.
//
// Measures building a deposit forest against a snapshot, and the full
// build-sign-settle path for deposits and withdrawals.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use lumina_contracts::{CallEnv, TokenLedger, Vault};
use lumina_protocol::config::LedgerConfig;
use lumina_protocol::crypto::Keypair;
use lumina_protocol::ledger::{Ledger, LedgerState};
use lumina_protocol::transaction::{AccountUpdateForest, TransactionBuilder};

struct Fixture {
    ledger: Ledger,
    vault: Vault,
    user: Keypair,
}

fn settle(ledger: &Ledger, sender: &Keypair, forest: AccountUpdateForest) {
    let tx = TransactionBuilder::new(sender.address())
        .forest(forest)
        .build()
        .signed_by(sender)
        .expect("bench transaction encodes");
    ledger.submit(&tx).expect("bench transaction settles");
}

fn fixture() -> Fixture {
    let issuer = Keypair::from_seed(&[0x11; 32]);
    let holder = Keypair::from_seed(&[0x22; 32]);
    let user = Keypair::from_seed(&[0xA1; 32]);
    let ledger = Ledger::new(
        LedgerState::genesis([(user.address(), 1_000_000_000)]).expect("genesis"),
        LedgerConfig::default(),
    );

    let (token, mint) = TokenLedger::deploy(&ledger, issuer.address(), "TV2").expect("deploy token");
    let forest = token
        .mint(&CallEnv::new(&ledger.snapshot(), issuer.address()), &mint, holder.address(), 1_000_000_000)
        .expect("mint");
    settle(&ledger, &issuer, forest);
    let forest = token
        .transfer(
            &CallEnv::new(&ledger.snapshot(), holder.address()),
            holder.address(),
            user.address(),
            1_000_000_000,
        )
        .expect("fund");
    settle(&ledger, &holder, forest);

    let vault = Vault::deploy(&ledger, Keypair::from_seed(&[0x5A; 32])).expect("deploy vault");
    let forest = vault
        .initialize(&CallEnv::new(&ledger.snapshot(), user.address()), token.token_id())
        .expect("initialize");
    settle(&ledger, &user, forest);

    Fixture { ledger, vault, user }
}

fn bench_build(c: &mut Criterion) {
    let f = fixture();
    let snapshot = f.ledger.snapshot();
    let env = CallEnv::new(&snapshot, f.user.address());

    c.bench_function("vault/build_deposit", |b| {
        b.iter(|| f.vault.deposit(&env, 10, 10).expect("deposit builds"));
    });
}

fn bench_deposit(c: &mut Criterion) {
    let f = fixture();

    c.bench_function("vault/deposit_settle", |b| {
        b.iter(|| {
            let snapshot = f.ledger.snapshot();
            let forest = f
                .vault
                .deposit(&CallEnv::new(&snapshot, f.user.address()), 10, 10)
                .expect("deposit builds");
            settle(&f.ledger, &f.user, forest);
        });
    });
}

fn bench_withdraw(c: &mut Criterion) {
    c.bench_function("vault/withdraw_settle", |b| {
        b.iter_batched(
            || {
                let f = fixture();
                let forest = f
                    .vault
                    .deposit(&CallEnv::new(&f.ledger.snapshot(), f.user.address()), 100, 1)
                    .expect("deposit builds");
                settle(&f.ledger, &f.user, forest);
                f
            },
            |f| {
                let forest = f
                    .vault
                    .withdraw(&CallEnv::new(&f.ledger.snapshot(), f.user.address()), 50)
                    .expect("withdraw builds");
                settle(&f.ledger, &f.user, forest);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_build, bench_deposit, bench_withdraw);
criterion_main!(benches);
