// ============ TezDex SDK ============
// Off-chain runtime pieces around the engine: a reference token
// ledger, a native-asset bank, and the executor that settles an
// engine-emitted effect set against both -- all or nothing. Also the
// JSON snapshot plumbing a host can use to persist pairs.
//
// The engine never moves value; everything here exists so callers and
// tests have a concrete place where value actually moves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tezdex_engine::{DexError, Effect, EffectSet, TokenView};
use tezdex_types::{Address, ExchangePair};

// ============ Mock Token Ledger ============

/// In-memory fungible-token ledger with the standard
/// transfer/approve/allowance surface the engine consumes. Stands in
/// for the external token contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockTokenLedger {
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<(Address, Address), u128>,
    total_supply: u128,
}

impl MockTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue fresh tokens to `owner` (test setup path).
    pub fn issue(&mut self, owner: Address, amount: u128) {
        *self.balances.entry(owner).or_insert(0) += amount;
        self.total_supply += amount;
    }

    pub fn get_balance(&self, owner: Address) -> u128 {
        self.balances.get(&owner).copied().unwrap_or(0)
    }

    pub fn get_allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    pub fn get_total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Set (never increment) `spender`'s allowance, with the same
    /// non-zero-to-non-zero guard the share ledger applies.
    pub fn approve(
        &mut self,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), DexError> {
        let current = self.get_allowance(owner, spender);
        if current != 0 && amount != 0 {
            return Err(DexError::UnsafeAllowanceChange);
        }
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    /// Move tokens on behalf of `spender`; allowance is consumed
    /// unless the spender is the owner.
    pub fn transfer(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), DexError> {
        if spender != from {
            let allowed = self.get_allowance(from, spender);
            if allowed < amount {
                return Err(DexError::NotEnoughAllowance);
            }
            self.allowances.insert((from, spender), allowed - amount);
        }
        let from_balance = self.get_balance(from);
        if from_balance < amount {
            return Err(DexError::InsufficientBalance);
        }
        self.balances.insert(from, from_balance - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

impl TokenView for MockTokenLedger {
    fn balance(&self, owner: Address) -> u128 {
        self.get_balance(owner)
    }

    fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.get_allowance(owner, spender)
    }
}

// ============ Native-Asset Bank ============

/// Native-asset balances for every participant, pairs included.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TezBank {
    balances: BTreeMap<Address, u128>,
}

impl TezBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, owner: Address, amount: u128) {
        *self.balances.entry(owner).or_insert(0) += amount;
    }

    pub fn balance(&self, owner: Address) -> u128 {
        self.balances.get(&owner).copied().unwrap_or(0)
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), DexError> {
        let from_balance = self.balance(from);
        if from_balance < amount {
            return Err(DexError::InsufficientBalance);
        }
        self.balances.insert(from, from_balance - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

// ============ Settlement ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// A token-ledger call failed; the effect set was not applied.
    Token(DexError),
    /// A native-asset move failed; the effect set was not applied.
    Tez(DexError),
}

/// Settle an effect set on behalf of the pair at `pair_address`.
/// Applies every transfer or none: work happens on scratch copies that
/// replace the real ledgers only when the whole set clears.
pub fn settle(
    pair_address: Address,
    effects: &EffectSet,
    ledger: &mut MockTokenLedger,
    bank: &mut TezBank,
) -> Result<(), SettlementError> {
    let mut ledger_draft = ledger.clone();
    let mut bank_draft = bank.clone();

    for effect in effects {
        match *effect {
            Effect::TokenTransfer {
                token: _,
                from,
                to,
                amount,
            } => {
                ledger_draft
                    .transfer(pair_address, from, to, amount)
                    .map_err(SettlementError::Token)?;
            }
            Effect::TezTransfer { to, amount } => {
                bank_draft
                    .transfer(pair_address, to, amount)
                    .map_err(SettlementError::Tez)?;
            }
            Effect::TezReceipt { from, amount } => {
                bank_draft
                    .transfer(from, pair_address, amount)
                    .map_err(SettlementError::Tez)?;
            }
        }
    }

    *ledger = ledger_draft;
    *bank = bank_draft;
    Ok(())
}

// ============ Snapshots ============

/// Hex-armored snapshot of one pair, JSON-friendly for host storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSnapshot {
    pub pair: String,
    pub token: String,
    pub data: String,
}

impl PairSnapshot {
    pub fn capture(pair: &ExchangePair) -> Self {
        Self {
            pair: hex::encode(pair.address.as_bytes()),
            token: hex::encode(pair.token_address.as_bytes()),
            data: hex::encode(pair.serialize()),
        }
    }

    pub fn restore(&self) -> Option<ExchangePair> {
        let bytes = hex::decode(&self.data).ok()?;
        ExchangePair::deserialize(&bytes)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ============ Tests ============
