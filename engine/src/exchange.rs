// ============ Swap / Liquidity Engine ============
// The six reserve-touching operations. Shared shape: reject before any
// mutation, mutate, recompute the cached invariant last, return the
// effect set the runtime must settle.

use tezdex_math::{amounts_for_burn, quote_out, shares_for_deposit, tokens_for_deposit, U256};
use tezdex_types::{Address, ExchangePair};

use crate::{governance, ledger, CallCtx, DexError, Effect, EffectSet, TokenView};

fn recompute_invariant(pair: &mut ExchangePair) {
    pair.invariant = U256::product(pair.tez_pool, pair.token_pool);
}

fn require_initialized(pair: &ExchangePair) -> Result<(), DexError> {
    if pair.is_initialized() {
        Ok(())
    } else {
        Err(DexError::NotInitialized)
    }
}

// ============ Initialize ============

/// Fund a fresh (or fully drained) pair. The native-asset deposit
/// defines the share unit: the caller receives `tez_amount` shares.
/// Vote bookkeeping from a previous funding epoch is discarded; the
/// standing delegate and any undistributed rewards survive.
pub fn initialize_exchange(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    token_amount: u128,
    tez_amount: u128,
) -> Result<EffectSet, DexError> {
    if pair.is_initialized() {
        return Err(DexError::AlreadyInitialized);
    }
    if token_amount == 0 || tez_amount == 0 {
        return Err(DexError::WrongParams);
    }

    ledger::mint(pair, ctx.sender, tez_amount)?;
    pair.tez_pool = tez_amount;
    pair.token_pool = token_amount;
    pair.governance.voters.clear();
    pair.governance.vetoes.clear();
    pair.governance.pending_delegate = None;
    recompute_invariant(pair);

    Ok(vec![
        Effect::TezReceipt {
            from: ctx.sender,
            amount: tez_amount,
        },
        Effect::TokenTransfer {
            token: pair.token_address,
            from: ctx.sender,
            to: pair.address,
            amount: token_amount,
        },
    ])
}

// ============ Swaps ============

/// Sell native asset into the pool for tokens.
pub fn tez_to_token(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    tez_in: u128,
    min_tokens_out: u128,
) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;
    if tez_in == 0 || min_tokens_out == 0 {
        return Err(DexError::WrongParams);
    }

    let tokens_out = quote_out(pair.tez_pool, pair.token_pool, tez_in, pair.config.fee)?;
    if tokens_out < min_tokens_out {
        return Err(DexError::SlippageExceeded);
    }
    let new_tez_pool = pair
        .tez_pool
        .checked_add(tez_in)
        .ok_or(DexError::Overflow)?;
    let new_token_pool = pair
        .token_pool
        .checked_sub(tokens_out)
        .ok_or(DexError::InsufficientLiquidity)?;

    pair.tez_pool = new_tez_pool;
    pair.token_pool = new_token_pool;
    recompute_invariant(pair);

    Ok(vec![
        Effect::TezReceipt {
            from: ctx.sender,
            amount: tez_in,
        },
        Effect::TokenTransfer {
            token: pair.token_address,
            from: pair.address,
            to: ctx.sender,
            amount: tokens_out,
        },
    ])
}

/// Sell tokens into the pool for native asset. The caller must have
/// pre-approved the pair on the external token ledger.
pub fn token_to_tez(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    token_ledger: &dyn TokenView,
    token_in: u128,
    min_tez_out: u128,
) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;
    if token_in == 0 || min_tez_out == 0 {
        return Err(DexError::WrongParams);
    }
    if token_ledger.allowance(ctx.sender, pair.address) < token_in {
        return Err(DexError::NotEnoughAllowance);
    }

    let tez_out = quote_out(pair.token_pool, pair.tez_pool, token_in, pair.config.fee)?;
    if tez_out < min_tez_out {
        return Err(DexError::SlippageExceeded);
    }
    let new_token_pool = pair
        .token_pool
        .checked_add(token_in)
        .ok_or(DexError::Overflow)?;
    let new_tez_pool = pair
        .tez_pool
        .checked_sub(tez_out)
        .ok_or(DexError::InsufficientLiquidity)?;

    pair.token_pool = new_token_pool;
    pair.tez_pool = new_tez_pool;
    recompute_invariant(pair);

    Ok(vec![
        Effect::TokenTransfer {
            token: pair.token_address,
            from: ctx.sender,
            to: pair.address,
            amount: token_in,
        },
        Effect::TezTransfer {
            to: ctx.sender,
            amount: tez_out,
        },
    ])
}

// ============ Liquidity ============

/// Deposit native asset plus the proportional token amount, minting
/// shares. `max_tokens` caps the token side the caller is willing to
/// fund (the required amount rounds up).
pub fn invest_liquidity(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    token_ledger: &dyn TokenView,
    tez_in: u128,
    min_shares: u128,
    max_tokens: u128,
) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;
    if tez_in == 0 || min_shares == 0 {
        return Err(DexError::WrongParams);
    }

    let tokens_required = tokens_for_deposit(pair.token_pool, pair.tez_pool, tez_in)?;
    if tokens_required > max_tokens {
        return Err(DexError::TokenAmountTooHigh);
    }
    let shares_out = shares_for_deposit(pair.total_supply, pair.tez_pool, tez_in)?;
    if shares_out == 0 {
        return Err(DexError::WrongParams);
    }
    if shares_out < min_shares {
        return Err(DexError::SlippageExceeded);
    }
    if token_ledger.allowance(ctx.sender, pair.address) < tokens_required {
        return Err(DexError::NotEnoughAllowance);
    }

    let new_tez_pool = pair
        .tez_pool
        .checked_add(tez_in)
        .ok_or(DexError::Overflow)?;
    let new_token_pool = pair
        .token_pool
        .checked_add(tokens_required)
        .ok_or(DexError::Overflow)?;

    ledger::mint(pair, ctx.sender, shares_out)?;
    pair.tez_pool = new_tez_pool;
    pair.token_pool = new_token_pool;
    recompute_invariant(pair);

    Ok(vec![
        Effect::TezReceipt {
            from: ctx.sender,
            amount: tez_in,
        },
        Effect::TokenTransfer {
            token: pair.token_address,
            from: ctx.sender,
            to: pair.address,
            amount: tokens_required,
        },
    ])
}

/// Burn shares for the pro-rata slice of both pools. Burning the whole
/// supply drains the pair back to its uninitialized state.
pub fn divest_liquidity(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    shares_burned: u128,
    min_tez_out: u128,
    min_token_out: u128,
) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;
    if shares_burned == 0 || min_tez_out == 0 || min_token_out == 0 {
        return Err(DexError::WrongParams);
    }
    if shares_burned > pair.balance_of(ctx.sender) || shares_burned > pair.total_supply {
        return Err(DexError::WrongParams);
    }

    let (tez_out, token_out) = amounts_for_burn(
        pair.total_supply,
        pair.tez_pool,
        pair.token_pool,
        shares_burned,
    )?;
    if tez_out < min_tez_out || token_out < min_token_out {
        return Err(DexError::SlippageExceeded);
    }

    ledger::burn(pair, ctx.sender, shares_burned)?;
    // outputs are pro-rata floors, never above the pools
    pair.tez_pool -= tez_out;
    pair.token_pool -= token_out;
    recompute_invariant(pair);

    Ok(vec![
        Effect::TezTransfer {
            to: ctx.sender,
            amount: tez_out,
        },
        Effect::TokenTransfer {
            token: pair.token_address,
            from: pair.address,
            to: ctx.sender,
            amount: token_out,
        },
    ])
}

// ============ Reward Withdrawal ============

/// Pay the accrued reward pool out to `recipient`. Only the current
/// delegate may claim; an expired pending change is promoted first so
/// the check sees the delegate the clock says is in charge.
pub fn withdraw_profit(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    recipient: Address,
) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;

    if governance::effective_delegate(pair, ctx.now) != Some(ctx.sender) {
        return Err(DexError::Unauthorized);
    }
    if pair.governance.reward_pool == 0 {
        return Err(DexError::NoProfitAvailable);
    }

    governance::poll(pair, ctx.now);
    let amount = pair.governance.reward_pool;
    pair.governance.reward_pool = 0;

    Ok(vec![Effect::TezTransfer {
        to: recipient,
        amount,
    }])
}
