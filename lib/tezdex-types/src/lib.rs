// ============ TezDex Types ============
// Shared state records for the exchange: the per-token pair, its share
// ledger, and the delegate-governance bookkeeping layered on top.
//
// Records serialize to little-endian bytes (length-prefixed maps) so a
// host can persist a pair and restore it byte-for-byte; where bytes
// live is the host's concern, not ours.

use std::collections::BTreeMap;

use tezdex_math::{Fee, U256, DEFAULT_FEE};

// ============ Identity & Time ============

/// Opaque 32-byte account identity, shared by callers, tokens, and
/// pairs themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Test convenience: an address of one repeated byte.
    pub const fn repeat(byte: u8) -> Address {
        Address([byte; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Seconds from an external monotonic clock, always passed in by the
/// caller; the engine never reads ambient time.
pub type Timestamp = u64;

// ============ Default Config ============

pub const DEFAULT_VETO_WINDOW_SECS: u64 = 7 * 24 * 60 * 60; // one week
pub const DEFAULT_VOTE_MARGIN: u128 = 0;

/// Per-pair parameters, fixed at launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairConfig {
    pub fee: Fee,
    pub veto_window: u64,
    pub vote_margin: u128,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            fee: DEFAULT_FEE,
            veto_window: DEFAULT_VETO_WINDOW_SECS,
            vote_margin: DEFAULT_VOTE_MARGIN,
        }
    }
}

// ============ Share Ledger Records ============

/// One holder's position: share balance plus the allowances they have
/// granted. Accounts are created on first credit and kept at zero
/// balance so allowance state stays addressable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShareAccount {
    pub balance: u128,
    pub allowances: BTreeMap<Address, u128>,
}

// ============ Governance Records ============

/// A voter's single live vote: weight is the share balance snapshotted
/// at vote time. It is not re-derived when shares move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteRecord {
    pub candidate: Address,
    pub weight: u128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingDelegate {
    pub candidate: Address,
    pub veto_deadline: Timestamp,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GovernanceState {
    pub current_delegate: Option<Address>,
    pub pending_delegate: Option<PendingDelegate>,
    pub voters: BTreeMap<Address, VoteRecord>,
    pub vetoes: BTreeMap<Address, u128>,
    pub reward_pool: u128,
}

impl GovernanceState {
    /// Aggregate vote weight behind a candidate, derived by summation.
    pub fn tally(&self, candidate: Address) -> u128 {
        self.voters
            .values()
            .filter(|record| record.candidate == candidate)
            .fold(0u128, |acc, record| acc.saturating_add(record.weight))
    }

    /// Accumulated veto weight against the pending change.
    pub fn veto_weight(&self) -> u128 {
        self.vetoes
            .values()
            .fold(0u128, |acc, weight| acc.saturating_add(*weight))
    }
}

// ============ Exchange Pair ============

/// The authoritative state of one native-asset/token pair. All
/// mutation goes through the engine's operation handlers; the record
/// itself is plain data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangePair {
    pub address: Address,
    pub token_address: Address,
    pub tez_pool: u128,
    pub token_pool: u128,
    /// Cached `tez_pool * token_pool`, recomputed as the final step of
    /// every state-changing operation. 256-bit so extreme pools stay
    /// exact.
    pub invariant: U256,
    pub total_supply: u128,
    pub shares: BTreeMap<Address, ShareAccount>,
    pub governance: GovernanceState,
    pub config: PairConfig,
}

impl ExchangePair {
    pub fn new(address: Address, token_address: Address, config: PairConfig) -> Self {
        Self {
            address,
            token_address,
            tez_pool: 0,
            token_pool: 0,
            invariant: U256::ZERO,
            total_supply: 0,
            shares: BTreeMap::new(),
            governance: GovernanceState::default(),
            config,
        }
    }

    /// A pair with no shares outstanding is uninitialized (or fully
    /// drained, which is the same thing).
    pub fn is_initialized(&self) -> bool {
        self.total_supply > 0
    }

    pub fn balance_of(&self, owner: Address) -> u128 {
        self.shares.get(&owner).map_or(0, |account| account.balance)
    }

    pub fn allowance_of(&self, owner: Address, spender: Address) -> u128 {
        self.shares
            .get(&owner)
            .and_then(|account| account.allowances.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all share balances; equals `total_supply` after every
    /// completed operation.
    pub fn share_sum(&self) -> u128 {
        self.shares
            .values()
            .fold(0u128, |acc, account| acc.saturating_add(account.balance))
    }
}

// ============ Serialization ============

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Some(slice)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_u128(&mut self) -> Option<u128> {
        Some(u128::from_le_bytes(self.take(16)?.try_into().ok()?))
    }

    fn read_address(&mut self) -> Option<Address> {
        Some(Address(self.take(32)?.try_into().ok()?))
    }

    fn finished(&self) -> bool {
        self.pos == self.data.len()
    }
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u128(buf: &mut Vec<u8>, value: u128) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_address(buf: &mut Vec<u8>, address: Address) {
    buf.extend_from_slice(&address.0);
}

fn put_opt_address(buf: &mut Vec<u8>, value: Option<Address>) {
    match value {
        Some(address) => {
            buf.push(1);
            put_address(buf, address);
        }
        None => buf.push(0),
    }
}

impl ExchangePair {
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        put_address(&mut buf, self.address);
        put_address(&mut buf, self.token_address);
        put_u128(&mut buf, self.tez_pool);
        put_u128(&mut buf, self.token_pool);
        buf.extend_from_slice(&self.invariant.to_le_bytes());
        put_u128(&mut buf, self.total_supply);

        // config
        put_u128(&mut buf, self.config.fee.numerator);
        put_u128(&mut buf, self.config.fee.denominator);
        put_u64(&mut buf, self.config.veto_window);
        put_u128(&mut buf, self.config.vote_margin);

        // governance
        put_opt_address(&mut buf, self.governance.current_delegate);
        match self.governance.pending_delegate {
            Some(pending) => {
                buf.push(1);
                put_address(&mut buf, pending.candidate);
                put_u64(&mut buf, pending.veto_deadline);
            }
            None => buf.push(0),
        }
        put_u128(&mut buf, self.governance.reward_pool);

        put_u32(&mut buf, self.governance.voters.len() as u32);
        for (voter, record) in &self.governance.voters {
            put_address(&mut buf, *voter);
            put_address(&mut buf, record.candidate);
            put_u128(&mut buf, record.weight);
        }

        put_u32(&mut buf, self.governance.vetoes.len() as u32);
        for (vetoer, weight) in &self.governance.vetoes {
            put_address(&mut buf, *vetoer);
            put_u128(&mut buf, *weight);
        }

        // share ledger
        put_u32(&mut buf, self.shares.len() as u32);
        for (owner, account) in &self.shares {
            put_address(&mut buf, *owner);
            put_u128(&mut buf, account.balance);
            put_u32(&mut buf, account.allowances.len() as u32);
            for (spender, amount) in &account.allowances {
                put_address(&mut buf, *spender);
                put_u128(&mut buf, *amount);
            }
        }

        buf
    }

    pub fn deserialize(data: &[u8]) -> Option<Self> {
        let mut cur = Cursor::new(data);

        let address = cur.read_address()?;
        let token_address = cur.read_address()?;
        let tez_pool = cur.read_u128()?;
        let token_pool = cur.read_u128()?;
        let invariant = U256::from_le_bytes(cur.take(32)?.try_into().ok()?);
        let total_supply = cur.read_u128()?;

        let config = PairConfig {
            fee: Fee {
                numerator: cur.read_u128()?,
                denominator: cur.read_u128()?,
            },
            veto_window: cur.read_u64()?,
            vote_margin: cur.read_u128()?,
        };

        let current_delegate = match cur.read_u8()? {
            0 => None,
            1 => Some(cur.read_address()?),
            _ => return None,
        };
        let pending_delegate = match cur.read_u8()? {
            0 => None,
            1 => Some(PendingDelegate {
                candidate: cur.read_address()?,
                veto_deadline: cur.read_u64()?,
            }),
            _ => return None,
        };
        let reward_pool = cur.read_u128()?;

        let voter_count = cur.read_u32()?;
        let mut voters = BTreeMap::new();
        for _ in 0..voter_count {
            let voter = cur.read_address()?;
            let candidate = cur.read_address()?;
            let weight = cur.read_u128()?;
            voters.insert(voter, VoteRecord { candidate, weight });
        }

        let veto_count = cur.read_u32()?;
        let mut vetoes = BTreeMap::new();
        for _ in 0..veto_count {
            let vetoer = cur.read_address()?;
            let weight = cur.read_u128()?;
            vetoes.insert(vetoer, weight);
        }

        let share_count = cur.read_u32()?;
        let mut shares = BTreeMap::new();
        for _ in 0..share_count {
            let owner = cur.read_address()?;
            let balance = cur.read_u128()?;
            let allowance_count = cur.read_u32()?;
            let mut allowances = BTreeMap::new();
            for _ in 0..allowance_count {
                let spender = cur.read_address()?;
                let amount = cur.read_u128()?;
                allowances.insert(spender, amount);
            }
            shares.insert(owner, ShareAccount { balance, allowances });
        }

        if !cur.finished() {
            return None;
        }

        Some(Self {
            address,
            token_address,
            tez_pool,
            token_pool,
            invariant,
            total_supply,
            shares,
            governance: GovernanceState {
                current_delegate,
                pending_delegate,
                voters,
                vetoes,
                reward_pool,
            },
            config,
        })
    }
}

// ============ Tests ============
