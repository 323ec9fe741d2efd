// ============ TezDex Engine ============
// The per-pair state machine: share ledger, reserve bookkeeping, swap
// and liquidity operations, and delegate governance.
//
// Operations are free functions over the ExchangePair record. Every
// operation validates completely before the first mutation, recomputes
// the cached invariant as its final state change, and returns the
// external transfers it requires as an effect set -- settlement is the
// runtime's job, never the engine's. A failed operation leaves the
// pair untouched.

pub mod exchange;
pub mod governance;
pub mod ledger;

use tezdex_math::MathError;
use tezdex_types::{Address, Timestamp};

// ============ Error Types ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DexError {
    AlreadyInitialized,
    NotInitialized,
    WrongParams,
    SlippageExceeded,
    InsufficientLiquidity,
    InsufficientBalance,
    NotEnoughAllowance,
    UnsafeAllowanceChange,
    TokenAmountTooHigh,
    NoProfitAvailable,
    Unauthorized,
    Overflow,
}

impl From<MathError> for DexError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientLiquidity => DexError::InsufficientLiquidity,
            MathError::Overflow => DexError::Overflow,
            MathError::DivisionByZero => DexError::WrongParams,
        }
    }
}

// ============ Call Context ============

/// Who is calling and when. Time is always supplied by the caller so
/// the veto-window check stays deterministic and testable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallCtx {
    pub sender: Address,
    pub now: Timestamp,
}

impl CallCtx {
    pub fn new(sender: Address, now: Timestamp) -> Self {
        Self { sender, now }
    }
}

// ============ Effects ============

/// A transfer instruction the runtime must settle. The engine computes
/// the full set before finalizing its own state; it never moves value
/// itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Call into the external token ledger: move `amount` of `token`
    /// from `from` to `to`.
    TokenTransfer {
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    },
    /// The pair pays out native asset.
    TezTransfer { to: Address, amount: u128 },
    /// The pair must be credited native asset by `from`.
    TezReceipt { from: Address, amount: u128 },
}

pub type EffectSet = Vec<Effect>;

// ============ Token Ledger Seam ============

/// Read-only view onto the external token ledger. The engine checks
/// allowances and balances through this seam; actual transfers are
/// emitted as effects and settled outside.
pub trait TokenView {
    fn balance(&self, owner: Address) -> u128;
    fn allowance(&self, owner: Address, spender: Address) -> u128;
}

/// View for calls that never touch the external token ledger.
pub struct NoTokenView;

impl TokenView for NoTokenView {
    fn balance(&self, _owner: Address) -> u128 {
        0
    }

    fn allowance(&self, _owner: Address, _spender: Address) -> u128 {
        0
    }
}
