// ============ Share Ledger ============
// Fungible-token semantics scoped to one pair's liquidity shares.
// Transfer and approval are part of the pair's public surface;
// mint and burn are reserved for the swap/liquidity engine.

use tezdex_types::{Address, ExchangePair, ShareAccount};

use crate::DexError;

/// Move shares between holders. The recipient account is created on
/// first credit; drained accounts are kept so allowances stay
/// addressable.
pub fn transfer(
    pair: &mut ExchangePair,
    from: Address,
    to: Address,
    amount: u128,
) -> Result<(), DexError> {
    let from_balance = pair.balance_of(from);
    if from_balance < amount {
        return Err(DexError::InsufficientBalance);
    }
    if from == to {
        return Ok(());
    }
    let to_balance = pair.balance_of(to);
    let new_to = to_balance.checked_add(amount).ok_or(DexError::Overflow)?;

    pair.shares.entry(from).or_default().balance = from_balance - amount;
    pair.shares.entry(to).or_default().balance = new_to;
    Ok(())
}

/// Set (never increment) a spender's allowance. Changing one non-zero
/// value directly to another is rejected to close the classic
/// approval front-running race: the owner must zero it first.
pub fn approve(
    pair: &mut ExchangePair,
    owner: Address,
    spender: Address,
    amount: u128,
) -> Result<(), DexError> {
    let current = pair.allowance_of(owner, spender);
    if current != 0 && amount != 0 {
        return Err(DexError::UnsafeAllowanceChange);
    }
    pair.shares
        .entry(owner)
        .or_default()
        .allowances
        .insert(spender, amount);
    Ok(())
}

/// Spend `from`'s shares on their behalf, consuming allowance.
pub fn transfer_from(
    pair: &mut ExchangePair,
    spender: Address,
    from: Address,
    to: Address,
    amount: u128,
) -> Result<(), DexError> {
    let allowed = pair.allowance_of(from, spender);
    if allowed < amount {
        return Err(DexError::NotEnoughAllowance);
    }
    transfer(pair, from, to, amount)?;
    pair.shares
        .entry(from)
        .or_default()
        .allowances
        .insert(spender, allowed - amount);
    Ok(())
}

/// Create shares. Engine-internal.
pub(crate) fn mint(pair: &mut ExchangePair, to: Address, amount: u128) -> Result<(), DexError> {
    let new_supply = pair
        .total_supply
        .checked_add(amount)
        .ok_or(DexError::Overflow)?;
    let new_balance = pair
        .balance_of(to)
        .checked_add(amount)
        .ok_or(DexError::Overflow)?;

    pair.total_supply = new_supply;
    pair.shares.entry(to).or_default().balance = new_balance;
    Ok(())
}

/// Destroy shares. Engine-internal.
pub(crate) fn burn(pair: &mut ExchangePair, from: Address, amount: u128) -> Result<(), DexError> {
    let balance = pair.balance_of(from);
    if balance < amount {
        return Err(DexError::InsufficientBalance);
    }
    let new_supply = pair
        .total_supply
        .checked_sub(amount)
        .ok_or(DexError::InsufficientBalance)?;

    pair.total_supply = new_supply;
    pair.shares.entry(from).or_default().balance = balance - amount;
    Ok(())
}

// ============ Tests ============
