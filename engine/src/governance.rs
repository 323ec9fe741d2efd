// ============ Governance Engine ============
// Share-weighted delegate election per pair:
//
//   NoDelegate -> DelegateActive <-> PendingChange -> DelegateActive
//
// A candidate out-tallying the standing delegate opens a pending
// change with a veto deadline. Veto weight beyond the candidate's own
// support cancels it. An expired pending change is promoted lazily by
// the next operation that looks at governance state -- there is no
// background job. Vote and veto weights are snapshots of the caller's
// share balance at call time; moving shares afterwards does not move
// the recorded weight.
//
// Failed operations mutate nothing: validation (including the "who is
// the delegate right now" question) runs against a non-mutating view,
// and the due promotion is committed only on success paths.

use tezdex_types::{Address, ExchangePair, PendingDelegate, Timestamp, VoteRecord};

use crate::{CallCtx, DexError, Effect, EffectSet};

// ============ Lazy Transition ============

/// The delegate in charge at `now`: a pending change whose deadline
/// has passed counts as promoted even before `poll` commits it.
pub fn effective_delegate(pair: &ExchangePair, now: Timestamp) -> Option<Address> {
    match pair.governance.pending_delegate {
        Some(pending) if now >= pending.veto_deadline => Some(pending.candidate),
        _ => pair.governance.current_delegate,
    }
}

/// Commit a due promotion: the pending candidate becomes the current
/// delegate and the veto slate resets. No-op while the window is open.
pub fn poll(pair: &mut ExchangePair, now: Timestamp) {
    if let Some(pending) = pair.governance.pending_delegate {
        if now >= pending.veto_deadline {
            pair.governance.current_delegate = Some(pending.candidate);
            pair.governance.pending_delegate = None;
            pair.governance.vetoes.clear();
        }
    }
}

fn require_initialized(pair: &ExchangePair) -> Result<(), DexError> {
    if pair.is_initialized() {
        Ok(())
    } else {
        Err(DexError::NotInitialized)
    }
}

// ============ Voting ============

/// Cast or move the caller's single live vote, weighted by their
/// current share balance. When the candidate's tally pulls ahead of
/// the standing delegate's by more than the configured margin and no
/// change is already pending, a veto window opens.
pub fn vote(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    candidate: Address,
) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;

    let weight = pair.balance_of(ctx.sender);
    if weight == 0 {
        return Err(DexError::InsufficientBalance);
    }

    poll(pair, ctx.now);
    pair.governance
        .voters
        .insert(ctx.sender, VoteRecord { candidate, weight });

    let current = pair.governance.current_delegate;
    if pair.governance.pending_delegate.is_none() && current != Some(candidate) {
        let candidate_tally = pair.governance.tally(candidate);
        let incumbent_tally = current.map_or(0, |delegate| pair.governance.tally(delegate));
        let threshold = incumbent_tally.saturating_add(pair.config.vote_margin);
        if candidate_tally > threshold {
            let veto_deadline = ctx.now.saturating_add(pair.config.veto_window);
            pair.governance.pending_delegate = Some(PendingDelegate {
                candidate,
                veto_deadline,
            });
            pair.governance.vetoes.clear();
        }
    }

    Ok(Vec::new())
}

// ============ Veto ============

/// Object to the pending delegate change, weighted by the caller's
/// current share balance. Accumulated veto weight beyond the
/// candidate's supporting tally cancels the change and the standing
/// delegate (possibly none) remains.
pub fn veto(pair: &mut ExchangePair, ctx: &CallCtx) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;

    let candidate = match pair.governance.pending_delegate {
        Some(pending) if ctx.now < pending.veto_deadline => pending.candidate,
        _ => return Err(DexError::Unauthorized),
    };

    let weight = pair.balance_of(ctx.sender);
    if weight == 0 {
        return Err(DexError::InsufficientBalance);
    }

    pair.governance.vetoes.insert(ctx.sender, weight);

    if pair.governance.veto_weight() > pair.governance.tally(candidate) {
        pair.governance.pending_delegate = None;
        pair.governance.vetoes.clear();
    }

    Ok(Vec::new())
}

// ============ Reward Accrual ============

/// Credit path for externally earned rewards on the pooled balance.
/// A zero credit is accepted and changes nothing. Accrual observes
/// the delegate, so a due promotion commits here too.
pub fn receive_reward(
    pair: &mut ExchangePair,
    ctx: &CallCtx,
    amount: u128,
) -> Result<EffectSet, DexError> {
    require_initialized(pair)?;

    let new_pool = pair
        .governance
        .reward_pool
        .checked_add(amount)
        .ok_or(DexError::Overflow)?;

    poll(pair, ctx.now);
    pair.governance.reward_pool = new_pool;

    Ok(vec![Effect::TezReceipt {
        from: ctx.sender,
        amount,
    }])
}
