// ============ Shared Test Helpers ============
// Builders used by the integration, adversarial, and fuzz modules.

use tezdex_engine::{CallCtx, TokenView};
use tezdex_math::U256;
use tezdex_sdk::{settle, MockTokenLedger, TezBank};
use tezdex_types::{Address, ExchangePair, PairConfig, ShareAccount};

pub const ALICE: Address = Address::repeat(0xA1);
pub const BOB: Address = Address::repeat(0xB1);
pub const CAROL: Address = Address::repeat(0xC1);
pub const DAVE: Address = Address::repeat(0xD1);
pub const EVE: Address = Address::repeat(0xE1);
pub const TOKEN: Address = Address::repeat(0x01);
pub const PAIR: Address = Address::repeat(0xAA);

pub fn ctx(sender: Address, now: u64) -> CallCtx {
    CallCtx::new(sender, now)
}

/// Build a pair directly in a funded state, all shares held by
/// `holder`. Bypasses the factory so tests can pin exact pool numbers.
pub fn make_pair(tez_pool: u128, token_pool: u128, total_supply: u128, holder: Address) -> ExchangePair {
    let mut pair = ExchangePair::new(PAIR, TOKEN, PairConfig::default());
    pair.tez_pool = tez_pool;
    pair.token_pool = token_pool;
    pair.total_supply = total_supply;
    pair.invariant = U256::product(tez_pool, token_pool);
    pair.shares.insert(
        holder,
        ShareAccount {
            balance: total_supply,
            ..Default::default()
        },
    );
    pair
}

/// Split the holdings of a `make_pair` result between two holders.
pub fn split_shares(pair: &mut ExchangePair, from: Address, to: Address, amount: u128) {
    let from_balance = pair.balance_of(from);
    pair.shares.entry(from).or_default().balance = from_balance - amount;
    pair.shares.entry(to).or_default().balance += amount;
}

/// Token ledger view that never refuses: useful where a test targets
/// engine arithmetic rather than the allowance path.
pub struct AllowAll;

impl TokenView for AllowAll {
    fn balance(&self, _owner: Address) -> u128 {
        u128::MAX
    }

    fn allowance(&self, _owner: Address, _spender: Address) -> u128 {
        u128::MAX
    }
}

/// A funded off-chain world: `who` holds tokens and tez, and has
/// pre-approved `spender` on the token ledger.
pub fn funded_world(
    who: Address,
    spender: Address,
    tokens: u128,
    tez: u128,
) -> (MockTokenLedger, TezBank) {
    let mut ledger = MockTokenLedger::new();
    let mut bank = TezBank::new();
    ledger.issue(who, tokens);
    ledger.approve(who, spender, tokens).unwrap();
    bank.credit(who, tez);
    (ledger, bank)
}

/// Assert the bookkeeping invariants that must hold after every
/// completed operation.
pub fn assert_pair_invariants(pair: &ExchangePair) {
    assert_eq!(
        pair.invariant,
        U256::product(pair.tez_pool, pair.token_pool),
        "cached invariant must equal the recomputed pool product"
    );
    assert_eq!(
        pair.share_sum(),
        pair.total_supply,
        "share balances must sum to total supply"
    );
    let drained = pair.total_supply == 0;
    assert_eq!(
        drained,
        pair.tez_pool == 0 && pair.token_pool == 0,
        "pair must be either fully funded or fully drained"
    );
}

/// Settle effects for the standard test pair address and panic on
/// failure, for flows whose settlement is expected to clear.
pub fn settle_ok(
    effects: &tezdex_engine::EffectSet,
    ledger: &mut MockTokenLedger,
    bank: &mut TezBank,
) {
    settle(PAIR, effects, ledger, bank).expect("settlement should clear");
}
