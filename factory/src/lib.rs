// ============ TezDex Factory ============
// Deploys and tracks one exchange pair per token, and owns the single
// operation registry every pair dispatches through. Handlers are
// installed once by (index, name) -- the original exchange shipped
// nine dex lambdas and five share-token lambdas this way -- so pairs
// hold only data and zero duplicated code.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tezdex_engine::{exchange, governance, ledger, CallCtx, DexError, EffectSet, TokenView};
use tezdex_types::{Address, ExchangePair, PairConfig};

// ============ Call Variants ============

/// One dex operation with its parameters. Each variant maps to a fixed
/// registry slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DexCall {
    InitializeExchange {
        token_amount: u128,
        tez_amount: u128,
    },
    TezToToken {
        tez_in: u128,
        min_tokens_out: u128,
    },
    TokenToTez {
        token_in: u128,
        min_tez_out: u128,
    },
    WithdrawProfit {
        recipient: Address,
    },
    InvestLiquidity {
        tez_in: u128,
        min_shares: u128,
        max_tokens: u128,
    },
    DivestLiquidity {
        shares_burned: u128,
        min_tez_out: u128,
        min_token_out: u128,
    },
    Vote {
        candidate: Address,
    },
    Veto,
    ReceiveReward {
        amount: u128,
    },
}

/// One share-token operation on the pair's own shares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenCall {
    Transfer {
        from: Address,
        to: Address,
        amount: u128,
    },
    Approve {
        spender: Address,
        amount: u128,
    },
    GetBalance {
        owner: Address,
    },
    GetAllowance {
        owner: Address,
        spender: Address,
    },
    GetTotalSupply,
}

/// Result of a share-token call: state changes answer with `Unit`,
/// reads with `Nat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenReply {
    Unit,
    Nat(u128),
}

// ============ Registry Slots ============

pub const DEX_FUNCTION_COUNT: usize = 9;
pub const TOKEN_FUNCTION_COUNT: usize = 5;

pub const DEX_FUNCTION_NAMES: [&str; DEX_FUNCTION_COUNT] = [
    "initializeExchange",
    "tezToToken",
    "tokenToTez",
    "withdrawProfit",
    "investLiquidity",
    "divestLiquidity",
    "vote",
    "veto",
    "receiveReward",
];

pub const TOKEN_FUNCTION_NAMES: [&str; TOKEN_FUNCTION_COUNT] = [
    "transfer",
    "approve",
    "getBalance",
    "getAllowance",
    "getTotalSupply",
];

fn dex_slot(call: &DexCall) -> usize {
    match call {
        DexCall::InitializeExchange { .. } => 0,
        DexCall::TezToToken { .. } => 1,
        DexCall::TokenToTez { .. } => 2,
        DexCall::WithdrawProfit { .. } => 3,
        DexCall::InvestLiquidity { .. } => 4,
        DexCall::DivestLiquidity { .. } => 5,
        DexCall::Vote { .. } => 6,
        DexCall::Veto => 7,
        DexCall::ReceiveReward { .. } => 8,
    }
}

fn token_slot(call: &TokenCall) -> usize {
    match call {
        TokenCall::Transfer { .. } => 0,
        TokenCall::Approve { .. } => 1,
        TokenCall::GetBalance { .. } => 2,
        TokenCall::GetAllowance { .. } => 3,
        TokenCall::GetTotalSupply => 4,
    }
}

// ============ Handlers ============

type DexHandler =
    fn(&mut ExchangePair, &CallCtx, &dyn TokenView, &DexCall) -> Result<EffectSet, DexError>;

type TokenHandler = fn(&mut ExchangePair, &CallCtx, &TokenCall) -> Result<TokenReply, DexError>;

fn op_initialize_exchange(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    _tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::InitializeExchange {
            token_amount,
            tez_amount,
        } => exchange::initialize_exchange(pair, ctx, token_amount, tez_amount),
        _ => Err(DexError::WrongParams),
    }
}

fn op_tez_to_token(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    _tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::TezToToken {
            tez_in,
            min_tokens_out,
        } => exchange::tez_to_token(pair, ctx, tez_in, min_tokens_out),
        _ => Err(DexError::WrongParams),
    }
}

fn op_token_to_tez(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::TokenToTez {
            token_in,
            min_tez_out,
        } => exchange::token_to_tez(pair, ctx, tokens, token_in, min_tez_out),
        _ => Err(DexError::WrongParams),
    }
}

fn op_withdraw_profit(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    _tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::WithdrawProfit { recipient } => exchange::withdraw_profit(pair, ctx, recipient),
        _ => Err(DexError::WrongParams),
    }
}

fn op_invest_liquidity(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::InvestLiquidity {
            tez_in,
            min_shares,
            max_tokens,
        } => exchange::invest_liquidity(pair, ctx, tokens, tez_in, min_shares, max_tokens),
        _ => Err(DexError::WrongParams),
    }
}

fn op_divest_liquidity(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    _tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::DivestLiquidity {
            shares_burned,
            min_tez_out,
            min_token_out,
        } => exchange::divest_liquidity(pair, ctx, shares_burned, min_tez_out, min_token_out),
        _ => Err(DexError::WrongParams),
    }
}

fn op_vote(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    _tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::Vote { candidate } => governance::vote(pair, ctx, candidate),
        _ => Err(DexError::WrongParams),
    }
}

fn op_veto(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    _tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::Veto => governance::veto(pair, ctx),
        _ => Err(DexError::WrongParams),
    }
}

fn op_receive_reward(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    _tokens: &dyn TokenView,
    call: &DexCall,
) -> Result<EffectSet, DexError> {
    match *call {
        DexCall::ReceiveReward { amount } => governance::receive_reward(pair, ctx, amount),
        _ => Err(DexError::WrongParams),
    }
}

fn op_share_transfer(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    call: &TokenCall,
) -> Result<TokenReply, DexError> {
    match *call {
        TokenCall::Transfer { from, to, amount } => {
            if ctx.sender == from {
                ledger::transfer(pair, from, to, amount)?;
            } else {
                ledger::transfer_from(pair, ctx.sender, from, to, amount)?;
            }
            Ok(TokenReply::Unit)
        }
        _ => Err(DexError::WrongParams),
    }
}

fn op_share_approve(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    call: &TokenCall,
) -> Result<TokenReply, DexError> {
    match *call {
        TokenCall::Approve { spender, amount } => {
            ledger::approve(pair, ctx.sender, spender, amount)?;
            Ok(TokenReply::Unit)
        }
        _ => Err(DexError::WrongParams),
    }
}

fn op_share_balance(
    pair: &mut ExchangePair,
    _ctx: &CallCtx,
    call: &TokenCall,
) -> Result<TokenReply, DexError> {
    match *call {
        TokenCall::GetBalance { owner } => Ok(TokenReply::Nat(pair.balance_of(owner))),
        _ => Err(DexError::WrongParams),
    }
}

fn op_share_allowance(
    pair: &mut ExchangePair,
    _ctx: &CallCtx,
    call: &TokenCall,
) -> Result<TokenReply, DexError> {
    match *call {
        TokenCall::GetAllowance { owner, spender } => {
            Ok(TokenReply::Nat(pair.allowance_of(owner, spender)))
        }
        _ => Err(DexError::WrongParams),
    }
}

fn op_share_total_supply(
    pair: &mut ExchangePair,
    _ctx: &CallCtx,
    call: &TokenCall,
) -> Result<TokenReply, DexError> {
    match *call {
        TokenCall::GetTotalSupply => Ok(TokenReply::Nat(pair.total_supply)),
        _ => Err(DexError::WrongParams),
    }
}

fn dex_handler_by_name(name: &str) -> Option<DexHandler> {
    match name {
        "initializeExchange" => Some(op_initialize_exchange),
        "tezToToken" => Some(op_tez_to_token),
        "tokenToTez" => Some(op_token_to_tez),
        "withdrawProfit" => Some(op_withdraw_profit),
        "investLiquidity" => Some(op_invest_liquidity),
        "divestLiquidity" => Some(op_divest_liquidity),
        "vote" => Some(op_vote),
        "veto" => Some(op_veto),
        "receiveReward" => Some(op_receive_reward),
        _ => None,
    }
}

fn token_handler_by_name(name: &str) -> Option<TokenHandler> {
    match name {
        "transfer" => Some(op_share_transfer),
        "approve" => Some(op_share_approve),
        "getBalance" => Some(op_share_balance),
        "getAllowance" => Some(op_share_allowance),
        "getTotalSupply" => Some(op_share_total_supply),
        _ => None,
    }
}

// ============ Error Types ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    UnknownFunction,
    FunctionAlreadySet,
    IndexOutOfRange,
    FunctionNotSet,
    ExchangeLaunched,
    ExchangeNotFound,
    Dex(DexError),
}

impl From<DexError> for FactoryError {
    fn from(err: DexError) -> Self {
        FactoryError::Dex(err)
    }
}

// ============ Operation Registry ============

/// The shared dispatch table. Built once, then immutable; every pair
/// routes through the same handlers.
pub struct OpRegistry {
    dex: [Option<DexHandler>; DEX_FUNCTION_COUNT],
    token: [Option<TokenHandler>; TOKEN_FUNCTION_COUNT],
}

impl OpRegistry {
    pub fn empty() -> Self {
        Self {
            dex: [None; DEX_FUNCTION_COUNT],
            token: [None; TOKEN_FUNCTION_COUNT],
        }
    }

    /// Registry with every operation installed at its canonical slot.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for (index, name) in DEX_FUNCTION_NAMES.iter().enumerate() {
            // canonical names always resolve
            let _ = registry.install_dex(index, name);
        }
        for (index, name) in TOKEN_FUNCTION_NAMES.iter().enumerate() {
            let _ = registry.install_token(index, name);
        }
        registry
    }

    /// Register a named dex operation at `index`. A slot can be filled
    /// only once.
    pub fn install_dex(&mut self, index: usize, name: &str) -> Result<(), FactoryError> {
        if index >= DEX_FUNCTION_COUNT {
            return Err(FactoryError::IndexOutOfRange);
        }
        if self.dex[index].is_some() {
            return Err(FactoryError::FunctionAlreadySet);
        }
        self.dex[index] = Some(dex_handler_by_name(name).ok_or(FactoryError::UnknownFunction)?);
        Ok(())
    }

    /// Register a named share-token operation at `index`.
    pub fn install_token(&mut self, index: usize, name: &str) -> Result<(), FactoryError> {
        if index >= TOKEN_FUNCTION_COUNT {
            return Err(FactoryError::IndexOutOfRange);
        }
        if self.token[index].is_some() {
            return Err(FactoryError::FunctionAlreadySet);
        }
        self.token[index] =
            Some(token_handler_by_name(name).ok_or(FactoryError::UnknownFunction)?);
        Ok(())
    }

    pub fn dispatch_dex(
        &self,
        pair: &mut ExchangePair,
        ctx: &CallCtx,
        tokens: &dyn TokenView,
        call: &DexCall,
    ) -> Result<EffectSet, FactoryError> {
        let handler = self.dex[dex_slot(call)].ok_or(FactoryError::FunctionNotSet)?;
        Ok(handler(pair, ctx, tokens, call)?)
    }

    pub fn dispatch_token(
        &self,
        pair: &mut ExchangePair,
        ctx: &CallCtx,
        call: &TokenCall,
    ) -> Result<TokenReply, FactoryError> {
        let handler = self.token[token_slot(call)].ok_or(FactoryError::FunctionNotSet)?;
        Ok(handler(pair, ctx, call)?)
    }
}

// ============ Factory ============

/// Token -> pair directory plus the registry all pairs share.
pub struct Factory {
    registry: OpRegistry,
    pair_config: PairConfig,
    pairs: BTreeMap<Address, ExchangePair>,
}

impl Factory {
    pub fn new(registry: OpRegistry, pair_config: PairConfig) -> Self {
        Self {
            registry,
            pair_config,
            pairs: BTreeMap::new(),
        }
    }

    /// Deterministic pair identity derived from the token it trades.
    pub fn derive_pair_address(token: Address) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(b"tezdex/pair");
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Address(bytes)
    }

    /// Create and fund the pair for `token`. A token that already has
    /// a pair cannot be launched twice; a drained pair is re-funded
    /// through `initializeExchange` on the pair itself.
    pub fn launch_exchange(
        &mut self,
        ctx: &CallCtx,
        tokens: &dyn TokenView,
        token: Address,
        token_amount: u128,
        tez_amount: u128,
    ) -> Result<(Address, EffectSet), FactoryError> {
        if self.pairs.contains_key(&token) {
            return Err(FactoryError::ExchangeLaunched);
        }

        let pair_address = Self::derive_pair_address(token);
        let mut pair = ExchangePair::new(pair_address, token, self.pair_config);
        let effects = self.registry.dispatch_dex(
            &mut pair,
            ctx,
            tokens,
            &DexCall::InitializeExchange {
                token_amount,
                tez_amount,
            },
        )?;

        self.pairs.insert(token, pair);
        Ok((pair_address, effects))
    }

    pub fn resolve_pair(&self, token: Address) -> Option<&ExchangePair> {
        self.pairs.get(&token)
    }

    pub fn resolve_pair_mut(&mut self, token: Address) -> Option<&mut ExchangePair> {
        self.pairs.get_mut(&token)
    }

    /// Route a dex operation to the pair trading `token`.
    pub fn call_dex(
        &mut self,
        ctx: &CallCtx,
        tokens: &dyn TokenView,
        token: Address,
        call: DexCall,
    ) -> Result<EffectSet, FactoryError> {
        let pair = self
            .pairs
            .get_mut(&token)
            .ok_or(FactoryError::ExchangeNotFound)?;
        self.registry.dispatch_dex(pair, ctx, tokens, &call)
    }

    /// Route a share-token operation to the pair trading `token`.
    pub fn call_token(
        &mut self,
        ctx: &CallCtx,
        token: Address,
        call: TokenCall,
    ) -> Result<TokenReply, FactoryError> {
        let pair = self
            .pairs
            .get_mut(&token)
            .ok_or(FactoryError::ExchangeNotFound)?;
        self.registry.dispatch_token(pair, ctx, &call)
    }
}

// ============ Tests ============
