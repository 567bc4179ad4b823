use crate::error::{LoanError, LoanResult};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

/// Currency precision used by every rounding step.
pub const CENTS: u32 = 2;

/// Rounds to whole cents, half to even. Applied at each intermediate step, never deferred.
pub fn round(amt: Decimal) -> Decimal {
    amt.round_dp(CENTS)
}

/// Monthly fractional rate for an annual percentage, i.e. 6.0 -> 0.005.
pub fn periodic_rate(annual_rate: Decimal) -> Decimal {
    annual_rate / dec!(1200)
}

pub(crate) fn validate_terms(principal: Decimal, annual_rate: Decimal, term: u32) -> LoanResult<()> {
    if principal <= Decimal::ZERO {
        return Err(LoanError::invalid("principal", format!("must be positive, got {principal}")));
    }
    if annual_rate < Decimal::ZERO {
        return Err(LoanError::invalid(
            "annual_rate",
            format!("must not be negative, got {annual_rate}"),
        ));
    }
    if term < 1 {
        return Err(LoanError::invalid("term", "must be at least one period"));
    }
    Ok(())
}

/// Fixed monthly payment that retires `principal` over `term` months, rounded to cents.
pub fn periodic_payment(
    principal: Decimal,   // amount borrowed
    annual_rate: Decimal, // annual rate as a percentage (i.e., 2.5, 7.0)
    term: u32,            // number of monthly payments
) -> LoanResult<Decimal> {
    validate_terms(principal, annual_rate, term)?;

    let rate = periodic_rate(annual_rate);
    let pmt_amount = if rate.is_zero() {
        round(principal / Decimal::from(term))
    } else {
        let factor = (Decimal::ONE + rate)
            .checked_powu(u64::from(term))
            .ok_or_else(|| LoanError::invalid("term", format!("{term} periods overflows the payment factor")))?;
        factor
            .checked_div(factor - Decimal::ONE)
            .and_then(|ratio| ratio.checked_mul(rate))
            .and_then(|ratio| ratio.checked_mul(principal))
            .map(round)
            .ok_or_else(|| LoanError::invalid("annual_rate", format!("{annual_rate}% overflows the payment")))?
    };

    // whole cents only, so a tiny principal spread over many periods has no payment at all
    if pmt_amount <= Decimal::ZERO {
        return Err(LoanError::invalid(
            "principal",
            format!("{principal} is too small to repay in whole cents over {term} periods"),
        ));
    }
    Ok(pmt_amount)
}

/// Preview of everything paid over the nominal term: payment times term.
///
/// This is not reconciled with a built schedule, whose last row is adjusted to the exact
/// remaining balance. Compare with [`AmortizationSchedule::total_paid`](crate::AmortizationSchedule::total_paid).
pub fn total_paid(principal: Decimal, annual_rate: Decimal, term: u32) -> LoanResult<Decimal> {
    periodic_payment(principal, annual_rate, term)?
        .checked_mul(Decimal::from(term))
        .ok_or_else(|| LoanError::invalid("term", format!("{term} payments overflow the total")))
}

/// Preview interest cost: [`total_paid`] less the principal.
pub fn total_interest(principal: Decimal, annual_rate: Decimal, term: u32) -> LoanResult<Decimal> {
    Ok(total_paid(principal, annual_rate, term)? - principal)
}
