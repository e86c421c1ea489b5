//! Decimal amount conversion.
//!
//! User-facing amounts are decimal strings; the chain counts indivisible
//! base units. Conversion is pure integer arithmetic on `u128` with half-up
//! rounding of excess fractional digits.

use crate::error::WalletError;

/// Decimals of the native coin (1 TON = 10^9 nanotons).
pub const NATIVE_DECIMALS: u32 = 9;

fn invalid(input: &str, reason: &str) -> WalletError {
    WalletError::InvalidAmount {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

fn scale_of(decimals: u32) -> Result<u128, WalletError> {
    10u128
        .checked_pow(decimals)
        .ok_or_else(|| invalid("", "decimals out of range"))
}

/// Convert a decimal string to base units.
///
/// Fractional digits beyond `decimals` are rounded half-up. Signs are
/// rejected; amounts are non-negative by construction.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<u128, WalletError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(invalid(amount, "empty amount"));
    }
    if amount.starts_with('+') || amount.starts_with('-') {
        return Err(invalid(amount, "signed amounts are not allowed"));
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid(amount, "no digits"));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid(amount, "not a decimal number"));
    }

    let scale = scale_of(decimals)?;
    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| invalid(amount, "integer part too large"))?
    };

    let decimals = decimals as usize;
    let kept = &frac_part[..frac_part.len().min(decimals)];
    let mut frac_value: u128 = if kept.is_empty() {
        0
    } else {
        kept.parse().map_err(|_| invalid(amount, "fraction too large"))?
    };
    frac_value *= 10u128.pow((decimals - kept.len()) as u32);
    if frac_part.len() > decimals && frac_part.as_bytes()[decimals] >= b'5' {
        frac_value += 1;
    }

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| invalid(amount, "amount overflows"))
}

/// Render base units as a decimal string, trimming trailing zeros.
pub fn from_base_units(amount: u128, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u128.pow(decimals);
    let int_part = amount / scale;
    let frac_part = amount % scale;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:0width$}", width = decimals as usize);
    format!("{int_part}.{}", frac.trim_end_matches('0'))
}
