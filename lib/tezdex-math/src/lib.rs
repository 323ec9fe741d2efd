// ============ TezDex Math Library ============
// Pure integer arithmetic for the constant-product exchange:
// swap quoting, share minting/burning ratios, and the 256-bit
// helpers that keep pool products exact near u128::MAX.
//
// Rounding policy: floor everywhere an amount leaves the pool,
// ceiling where a deposit funds the pool. The pool never loses
// to truncation.

// ============ Error Types ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    InsufficientLiquidity,
    Overflow,
    DivisionByZero,
}

// ============ Swap Fee ============

/// Fee taken from the input amount of every swap, as a ratio.
/// The default matches the reference exchange: 3/1000 (0.3%).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fee {
    pub numerator: u128,
    pub denominator: u128,
}

pub const DEFAULT_FEE: Fee = Fee {
    numerator: 3,
    denominator: 1000,
};

impl Default for Fee {
    fn default() -> Self {
        DEFAULT_FEE
    }
}

impl Fee {
    /// A fee is usable only when it keeps some fraction of the input.
    pub fn is_valid(&self) -> bool {
        self.denominator > 0 && self.numerator < self.denominator
    }

    /// Input amount remaining after the fee is deducted (floored).
    pub fn apply(&self, amount_in: u128) -> Result<u128, MathError> {
        if !self.is_valid() {
            return Err(MathError::DivisionByZero);
        }
        mul_div(amount_in, self.denominator - self.numerator, self.denominator)
    }
}

// ============ Swap Quoting ============

/// Output amount for a swap against constant-product reserves.
///
/// `out = floor(reserve_out * after_fee / (reserve_in + after_fee))`
/// where `after_fee = floor(amount_in * (den - num) / den)`.
///
/// Fails with `InsufficientLiquidity` when either reserve is empty;
/// a zero input quotes to zero output.
pub fn quote_out(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    fee: Fee,
) -> Result<u128, MathError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    let after_fee = fee.apply(amount_in)?;
    let denominator = reserve_in
        .checked_add(after_fee)
        .ok_or(MathError::Overflow)?;
    mul_div(reserve_out, after_fee, denominator)
}

// ============ Liquidity Ratios ============

/// Shares minted for a native-asset deposit. The first deposit defines
/// the share unit: one share per unit of native asset.
pub fn shares_for_deposit(
    total_supply: u128,
    tez_pool: u128,
    tez_in: u128,
) -> Result<u128, MathError> {
    if total_supply == 0 {
        return Ok(tez_in);
    }
    if tez_pool == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    mul_div(total_supply, tez_in, tez_pool)
}

/// Token amount a depositor must fund alongside `tez_in`, rounded up
/// so the deposit can never under-fund the token side.
pub fn tokens_for_deposit(
    token_pool: u128,
    tez_pool: u128,
    tez_in: u128,
) -> Result<u128, MathError> {
    if tez_pool == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    mul_div_ceil(token_pool, tez_in, tez_pool)
}

/// Pro-rata withdrawal for burning `shares` out of `total_supply`.
/// Both sides floor; burning the entire supply drains both pools exactly.
pub fn amounts_for_burn(
    total_supply: u128,
    tez_pool: u128,
    token_pool: u128,
    shares: u128,
) -> Result<(u128, u128), MathError> {
    if total_supply == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    let tez_out = mul_div(tez_pool, shares, total_supply)?;
    let token_out = mul_div(token_pool, shares, total_supply)?;
    Ok((tez_out, token_out))
}

// ============ 256-bit Product Value ============

/// Product of two u128 values held exactly. Field order matters: `hi`
/// before `lo` so the derived ordering is numeric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U256 {
    pub hi: u128,
    pub lo: u128,
}

impl U256 {
    pub const ZERO: U256 = U256 { hi: 0, lo: 0 };

    /// Exact `a * b`.
    pub fn product(a: u128, b: u128) -> U256 {
        let (hi, lo) = wide_mul(a, b);
        U256 { hi, lo }
    }

    /// The value as u128, when it fits.
    pub fn as_u128(&self) -> Option<u128> {
        if self.hi == 0 {
            Some(self.lo)
        } else {
            None
        }
    }

    pub fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[0..16].copy_from_slice(&self.lo.to_le_bytes());
        buf[16..32].copy_from_slice(&self.hi.to_le_bytes());
        buf
    }

    pub fn from_le_bytes(bytes: [u8; 32]) -> U256 {
        let lo = u128::from_le_bytes(bytes[0..16].try_into().unwrap());
        let hi = u128::from_le_bytes(bytes[16..32].try_into().unwrap());
        U256 { hi, lo }
    }
}

// ============ 256-bit Arithmetic Helpers ============

/// Multiply two u128 values, returning (hi, lo) halves of the 256-bit
/// result.
pub fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    let mask: u128 = u64::MAX as u128;
    let a_lo = a & mask;
    let a_hi = a >> 64;
    let b_lo = b & mask;
    let b_hi = b >> 64;

    // Partial products, each u64*u64 fits in u128
    let p0 = a_lo * b_lo;
    let p1 = a_lo * b_hi;
    let p2 = a_hi * b_lo;
    let p3 = a_hi * b_hi;

    let mid = (p0 >> 64) + (p1 & mask) + (p2 & mask);
    let lo = (p0 & mask) | ((mid & mask) << 64);
    let hi = p3 + (p1 >> 64) + (p2 >> 64) + (mid >> 64);

    (hi, lo)
}

/// Compare `a*b` against `c*d` without overflow.
pub fn mul_cmp(a: u128, b: u128, c: u128, d: u128) -> core::cmp::Ordering {
    U256::product(a, b).cmp(&U256::product(c, d))
}

/// Divide the 256-bit value (hi, lo) by `d`, binary-searching the
/// quotient. Caller guarantees `hi < d` so the result fits in u128.
fn wide_div(hi: u128, lo: u128, d: u128) -> u128 {
    if hi == 0 {
        return lo / d;
    }

    let target = U256 { hi, lo };
    let mut low: u128 = 0;
    let mut high: u128 = u128::MAX;

    while low < high {
        // Upper midpoint without overflow
        let diff = high - low;
        let mid = low + diff / 2 + diff % 2;
        if U256::product(mid, d) > target {
            high = mid - 1;
        } else {
            low = mid;
        }
    }
    low
}

/// `floor(a * b / c)` with a 256-bit intermediate.
///
/// Fails with `DivisionByZero` when `c == 0` and with `Overflow` when
/// the quotient does not fit in u128.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    match a.checked_mul(b) {
        Some(product) => Ok(product / c),
        None => {
            let (hi, lo) = wide_mul(a, b);
            if hi >= c {
                // quotient >= 2^128
                return Err(MathError::Overflow);
            }
            Ok(wide_div(hi, lo, c))
        }
    }
}

/// `ceil(a * b / c)` with a 256-bit intermediate.
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    let floor = mul_div(a, b, c)?;
    if U256::product(floor, c) == U256::product(a, b) {
        Ok(floor)
    } else {
        floor.checked_add(1).ok_or(MathError::Overflow)
    }
}

// ============ Tests ============
