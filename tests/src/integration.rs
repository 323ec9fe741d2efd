// ============ Integration Tests ============
// Full lifecycles across the engine, factory, and sdk working
// together: launch a pair through the factory, trade against it,
// invest and divest, run the governance cycle, and settle every
// effect set through the reference executor.

use tezdex_engine::{exchange, governance, Effect};
use tezdex_factory::{DexCall, Factory, OpRegistry, TokenCall, TokenReply};
use tezdex_math::U256;
use tezdex_sdk::{settle, MockTokenLedger, PairSnapshot, TezBank};
use tezdex_types::{Address, PairConfig, DEFAULT_VETO_WINDOW_SECS};

use crate::support::*;

// ============ Test 1: Factory Launch ============

/// Launching an exchange through the factory creates the pair, funds
/// both pools, mints the initial shares, and produces effects the
/// executor can settle against real balances.
#[test]
fn test_launch_exchange_creates_funded_pair() {
    let mut factory = Factory::new(OpRegistry::standard(), PairConfig::default());
    let pair_address = Factory::derive_pair_address(TOKEN);

    let mut ledger = MockTokenLedger::new();
    let mut bank = TezBank::new();
    ledger.issue(ALICE, 2_000_000);
    ledger.approve(ALICE, pair_address, 1_000_000).unwrap();
    bank.credit(ALICE, 50_000);

    let (launched_address, effects) = factory
        .launch_exchange(&ctx(ALICE, 0), &ledger, TOKEN, 1_000_000, 10_000)
        .unwrap();
    assert_eq!(launched_address, pair_address);
    settle(pair_address, &effects, &mut ledger, &mut bank).unwrap();

    let pair = factory.resolve_pair(TOKEN).unwrap();
    assert_eq!(pair.tez_pool, 10_000);
    assert_eq!(pair.token_pool, 1_000_000);
    assert_eq!(pair.total_supply, 10_000);
    assert_eq!(pair.balance_of(ALICE), 10_000);
    assert_eq!(pair.invariant, U256::product(10_000, 1_000_000));
    assert_pair_invariants(pair);

    // value actually moved
    assert_eq!(ledger.get_balance(ALICE), 1_000_000);
    assert_eq!(ledger.get_balance(pair_address), 1_000_000);
    assert_eq!(bank.balance(ALICE), 40_000);
    assert_eq!(bank.balance(pair_address), 10_000);
}

// ============ Test 2: Divest Reference Vector ============

/// The canonical divest: pools (10_000, 1_000_000), supply 1_000,
/// burning 100 shares pays exactly (1_000, 100_000) and leaves the
/// invariant at 8_100_000_000.
#[test]
fn test_divest_liquidity_reference_vector() {
    let mut pair = make_pair(10_000, 1_000_000, 1_000, ALICE);

    let effects =
        exchange::divest_liquidity(&mut pair, &ctx(ALICE, 0), 100, 1, 1).unwrap();

    assert_eq!(
        effects,
        vec![
            Effect::TezTransfer {
                to: ALICE,
                amount: 1_000,
            },
            Effect::TokenTransfer {
                token: TOKEN,
                from: PAIR,
                to: ALICE,
                amount: 100_000,
            },
        ]
    );
    assert_eq!(pair.tez_pool, 9_000);
    assert_eq!(pair.token_pool, 900_000);
    assert_eq!(pair.total_supply, 900);
    assert_eq!(pair.balance_of(ALICE), 900);
    assert_eq!(pair.invariant.as_u128(), Some(8_100_000_000));
    assert_pair_invariants(&pair);
}

// ============ Test 3: Native -> Token Swap ============

#[test]
fn test_tez_to_token_swap() {
    let mut pair = make_pair(10_000, 1_000_000, 10_000, ALICE);
    let mut ledger = MockTokenLedger::new();
    let mut bank = TezBank::new();
    ledger.issue(PAIR, 1_000_000);
    bank.credit(BOB, 5_000);

    // after the 0.3% fee: floor(1_000_000 * 997 / 10_997) = 90_661
    let effects = exchange::tez_to_token(&mut pair, &ctx(BOB, 0), 1_000, 90_000).unwrap();
    settle_ok(&effects, &mut ledger, &mut bank);

    assert_eq!(pair.tez_pool, 11_000);
    assert_eq!(pair.token_pool, 909_339);
    assert_eq!(pair.invariant.as_u128(), Some(11_000 * 909_339));
    assert_pair_invariants(&pair);

    assert_eq!(ledger.get_balance(BOB), 90_661);
    assert_eq!(bank.balance(BOB), 4_000);
    assert_eq!(bank.balance(PAIR), 1_000);
}

// ============ Test 4: Token -> Native Swap ============

#[test]
fn test_token_to_tez_swap_with_allowance() {
    let mut pair = make_pair(10_000, 1_000_000, 10_000, ALICE);
    let (mut ledger, mut bank) = funded_world(BOB, PAIR, 100_000, 0);
    bank.credit(PAIR, 10_000);

    // after the 0.3% fee: floor(10_000 * 99_700 / 1_099_700) = 906
    let effects =
        exchange::token_to_tez(&mut pair, &ctx(BOB, 0), &ledger, 100_000, 900).unwrap();
    settle_ok(&effects, &mut ledger, &mut bank);

    assert_eq!(pair.token_pool, 1_100_000);
    assert_eq!(pair.tez_pool, 9_094);
    assert_pair_invariants(&pair);

    assert_eq!(ledger.get_balance(BOB), 0);
    assert_eq!(ledger.get_balance(PAIR), 100_000);
    assert_eq!(bank.balance(BOB), 906);
    assert_eq!(bank.balance(PAIR), 10_000 - 906);
}

// ============ Test 5: Invest Then Divest ============

/// Round trip at the pool's exact ratio: deposits come back whole, no
/// more, no less, and the share count follows the native deposit.
#[test]
fn test_invest_then_divest_roundtrip() {
    let mut pair = make_pair(10_000, 1_000_000, 10_000, ALICE);

    let effects = exchange::invest_liquidity(
        &mut pair,
        &ctx(BOB, 0),
        &AllowAll,
        1_000,
        1,
        100_000,
    )
    .unwrap();
    assert_eq!(
        effects,
        vec![
            Effect::TezReceipt {
                from: BOB,
                amount: 1_000,
            },
            Effect::TokenTransfer {
                token: TOKEN,
                from: BOB,
                to: PAIR,
                amount: 100_000,
            },
        ]
    );
    assert_eq!(pair.balance_of(BOB), 1_000);
    assert_eq!(pair.total_supply, 11_000);
    assert_eq!(pair.tez_pool, 11_000);
    assert_eq!(pair.token_pool, 1_100_000);
    assert_pair_invariants(&pair);

    let effects =
        exchange::divest_liquidity(&mut pair, &ctx(BOB, 0), 1_000, 1, 1).unwrap();
    assert_eq!(
        effects,
        vec![
            Effect::TezTransfer {
                to: BOB,
                amount: 1_000,
            },
            Effect::TokenTransfer {
                token: TOKEN,
                from: PAIR,
                to: BOB,
                amount: 100_000,
            },
        ]
    );
    assert_eq!(pair.balance_of(BOB), 0);
    assert_eq!(pair.total_supply, 10_000);
    assert_pair_invariants(&pair);
}

// ============ Test 6: Full Divest Reopens Initialization ============

#[test]
fn test_full_divest_reopens_initialization() {
    let mut pair = make_pair(10_000, 1_000_000, 10_000, ALICE);

    assert_eq!(
        exchange::initialize_exchange(&mut pair, &ctx(BOB, 0), 10, 10),
        Err(tezdex_engine::DexError::AlreadyInitialized)
    );

    exchange::divest_liquidity(&mut pair, &ctx(ALICE, 0), 10_000, 1, 1).unwrap();
    assert_eq!(pair.total_supply, 0);
    assert_eq!(pair.tez_pool, 0);
    assert_eq!(pair.token_pool, 0);
    assert!(pair.invariant.is_zero());
    assert_pair_invariants(&pair);

    // a drained pair accepts a fresh funding epoch
    exchange::initialize_exchange(&mut pair, &ctx(BOB, 0), 500_000, 5_000).unwrap();
    assert_eq!(pair.total_supply, 5_000);
    assert_eq!(pair.balance_of(BOB), 5_000);
    assert_pair_invariants(&pair);
}

// ============ Test 7: Transferred Shares Divest ============

/// Shares received from another holder divest exactly like
/// first-hand shares (reference scenario from the original suite).
#[test]
fn test_share_transfer_then_divest_by_recipient() {
    let mut factory = Factory::new(OpRegistry::standard(), PairConfig::default());
    let pair_address = Factory::derive_pair_address(TOKEN);

    let mut ledger = MockTokenLedger::new();
    let mut bank = TezBank::new();
    ledger.issue(ALICE, 1_000_000);
    ledger.approve(ALICE, pair_address, 1_000_000).unwrap();
    bank.credit(ALICE, 10_000);

    let (_, effects) = factory
        .launch_exchange(&ctx(ALICE, 0), &ledger, TOKEN, 1_000_000, 10_000)
        .unwrap();
    settle(pair_address, &effects, &mut ledger, &mut bank).unwrap();

    // hand 1_000 shares to bob through the pair's own token surface
    let reply = factory
        .call_token(
            &ctx(ALICE, 0),
            TOKEN,
            TokenCall::Transfer {
                from: ALICE,
                to: BOB,
                amount: 1_000,
            },
        )
        .unwrap();
    assert_eq!(reply, TokenReply::Unit);

    // the read surface answers through the same dispatch table
    assert_eq!(
        factory
            .call_token(&ctx(CAROL, 0), TOKEN, TokenCall::GetBalance { owner: BOB })
            .unwrap(),
        TokenReply::Nat(1_000)
    );
    assert_eq!(
        factory
            .call_token(
                &ctx(CAROL, 0),
                TOKEN,
                TokenCall::GetAllowance {
                    owner: ALICE,
                    spender: BOB,
                },
            )
            .unwrap(),
        TokenReply::Nat(0)
    );
    assert_eq!(
        factory
            .call_token(&ctx(CAROL, 0), TOKEN, TokenCall::GetTotalSupply)
            .unwrap(),
        TokenReply::Nat(10_000)
    );

    let effects = factory
        .call_dex(
            &ctx(BOB, 0),
            &ledger,
            TOKEN,
            DexCall::DivestLiquidity {
                shares_burned: 1_000,
                min_tez_out: 1,
                min_token_out: 1,
            },
        )
        .unwrap();
    settle(pair_address, &effects, &mut ledger, &mut bank).unwrap();

    let pair = factory.resolve_pair(TOKEN).unwrap();
    assert_eq!(pair.balance_of(BOB), 0);
    assert_eq!(pair.balance_of(ALICE), 9_000);
    assert_eq!(pair.total_supply, 9_000);
    assert_eq!(pair.tez_pool, 9_000);
    assert_eq!(pair.token_pool, 900_000);
    assert_pair_invariants(pair);

    assert_eq!(ledger.get_balance(BOB), 100_000);
    assert_eq!(bank.balance(BOB), 1_000);
}

// ============ Test 8: Governance Promotion & Reward ============

/// A majority vote opens exactly one pending change; once the veto
/// window lapses, the next governance touch promotes the candidate,
/// who can then sweep accrued rewards.
#[test]
fn test_governance_vote_promote_withdraw() {
    let mut pair = make_pair(10_000, 1_000_000, 1_000, ALICE);

    governance::vote(&mut pair, &ctx(ALICE, 100), DAVE).unwrap();
    let pending = pair.governance.pending_delegate.unwrap();
    assert_eq!(pending.candidate, DAVE);
    assert_eq!(pending.veto_deadline, 100 + DEFAULT_VETO_WINDOW_SECS);
    assert_eq!(pair.governance.current_delegate, None);

    // reward lands after the window: the credit promotes, then counts
    let after = pending.veto_deadline;
    let effects = governance::receive_reward(&mut pair, &ctx(CAROL, after), 5_000).unwrap();
    assert_eq!(
        effects,
        vec![Effect::TezReceipt {
            from: CAROL,
            amount: 5_000,
        }]
    );
    assert_eq!(pair.governance.current_delegate, Some(DAVE));
    assert_eq!(pair.governance.pending_delegate, None);
    assert_eq!(pair.governance.reward_pool, 5_000);

    let effects = exchange::withdraw_profit(&mut pair, &ctx(DAVE, after + 1), EVE).unwrap();
    assert_eq!(
        effects,
        vec![Effect::TezTransfer {
            to: EVE,
            amount: 5_000,
        }]
    );
    assert_eq!(pair.governance.reward_pool, 0);
    assert_pair_invariants(&pair);
}

// ============ Test 9: Veto Cancels Pending ============

#[test]
fn test_veto_cancels_pending_change() {
    let mut pair = make_pair(10_000, 1_000_000, 1_300, ALICE);
    split_shares(&mut pair, ALICE, BOB, 700);

    governance::vote(&mut pair, &ctx(ALICE, 0), DAVE).unwrap();
    assert!(pair.governance.pending_delegate.is_some());

    // 700 veto weight > 600 supporting weight: change dies in window
    governance::veto(&mut pair, &ctx(BOB, 10)).unwrap();
    assert_eq!(pair.governance.pending_delegate, None);
    assert_eq!(pair.governance.current_delegate, None);
    assert!(pair.governance.vetoes.is_empty());

    // deadline passing later must not resurrect the candidate
    governance::receive_reward(&mut pair, &ctx(CAROL, DEFAULT_VETO_WINDOW_SECS * 2), 1).unwrap();
    assert_eq!(pair.governance.current_delegate, None);
}

// ============ Test 10: Pairs Are Independent ============

#[test]
fn test_two_pairs_do_not_interfere() {
    let token_b = Address::repeat(0x02);
    let mut factory = Factory::new(OpRegistry::standard(), PairConfig::default());

    let mut ledger = MockTokenLedger::new();
    let mut bank = TezBank::new();
    for token in [TOKEN, token_b] {
        let pair_address = Factory::derive_pair_address(token);
        ledger.issue(ALICE, 1_000_000);
        ledger.approve(ALICE, pair_address, 1_000_000).unwrap();
        bank.credit(ALICE, 10_000);
        let (_, effects) = factory
            .launch_exchange(&ctx(ALICE, 0), &ledger, token, 1_000_000, 10_000)
            .unwrap();
        settle(pair_address, &effects, &mut ledger, &mut bank).unwrap();
    }

    let pair_a_before = factory.resolve_pair(TOKEN).unwrap().clone();

    bank.credit(BOB, 3_000);
    let effects = factory
        .call_dex(
            &ctx(BOB, 0),
            &ledger,
            token_b,
            DexCall::TezToToken {
                tez_in: 3_000,
                min_tokens_out: 1,
            },
        )
        .unwrap();
    settle(
        Factory::derive_pair_address(token_b),
        &effects,
        &mut ledger,
        &mut bank,
    )
    .unwrap();

    // trading B moved B's pools and left A byte-identical
    assert_ne!(
        factory.resolve_pair(token_b).unwrap().tez_pool,
        pair_a_before.tez_pool
    );
    assert_eq!(factory.resolve_pair(TOKEN).unwrap(), &pair_a_before);
}

// ============ Test 11: Snapshot Persistence ============

/// A pair snapshotted mid-lifecycle restores byte-for-byte and keeps
/// operating identically to the original.
#[test]
fn test_snapshot_restores_working_pair() {
    let mut pair = make_pair(10_000, 1_000_000, 10_000, ALICE);
    exchange::tez_to_token(&mut pair, &ctx(BOB, 0), 1_000, 1).unwrap();
    governance::vote(&mut pair, &ctx(ALICE, 50), DAVE).unwrap();

    let snapshot = PairSnapshot::capture(&pair);
    let json = snapshot.to_json().unwrap();
    let mut restored = PairSnapshot::from_json(&json).unwrap().restore().unwrap();
    assert_eq!(restored, pair);

    let original_effects =
        exchange::divest_liquidity(&mut pair, &ctx(ALICE, 60), 2_500, 1, 1).unwrap();
    let restored_effects =
        exchange::divest_liquidity(&mut restored, &ctx(ALICE, 60), 2_500, 1, 1).unwrap();
    assert_eq!(original_effects, restored_effects);
    assert_eq!(restored, pair);
    assert_pair_invariants(&restored);
}
