use crate::error::{LoanError, LoanResult};
use crate::payment::{periodic_rate, round, validate_terms};
use crate::persist::{ScheduleSink, TableKey};
use chrono::{Local, Months, NaiveDate};
use log::{error, info, trace, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the borrower agreed to: label, amount, annual percentage rate and months.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoanTerms {
    pub label: String,
    pub principal: Decimal,
    pub annual_rate: Decimal,
    pub term: u32,
}

impl LoanTerms {
    pub fn new(label: &str, principal: Decimal, annual_rate: Decimal, term: u32) -> LoanResult<Self> {
        validate_terms(principal, annual_rate, term)?;
        Ok(Self {
            label: label.to_string(),
            principal,
            annual_rate,
            term,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduleRow {
    pub pmt_number: usize,
    pub pmt_date: NaiveDate,
    pub pmt_amount: Decimal,
    pub principal_paid: Decimal,
    pub interest_paid: Decimal,
    pub end_balance: Decimal,
}

impl ScheduleRow {
    pub fn new(
        pmt_number: usize,
        pmt_date: NaiveDate,
        pmt_amount: Decimal,
        principal_paid: Decimal,
        interest_paid: Decimal,
        end_balance: Decimal,
    ) -> Self {
        Self {
            pmt_number,
            pmt_date,
            pmt_amount,
            principal_paid,
            interest_paid,
            end_balance,
        }
    }
}

impl fmt::Display for ScheduleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pmt number {}, date {}, payment ${:.2}, principal paid ${:.2}, interest paid ${:.2}, ending balance ${:.2}",
            self.pmt_number,
            self.pmt_date,
            self.pmt_amount,
            self.principal_paid,
            self.interest_paid,
            self.end_balance
        )
    }
}

/// A lump-sum principal reduction and/or a permanent increase to the periodic payment.
///
/// Missing, unreadable or negative amounts count as zero, so a half-filled form still
/// produces a usable change.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanChange {
    pub lump_sum: Decimal,
    pub extra_payment: Decimal,
}

impl PlanChange {
    pub fn new(lump_sum: Option<Decimal>, extra_payment: Option<Decimal>) -> Self {
        Self {
            lump_sum: non_negative("lump sum", lump_sum),
            extra_payment: non_negative("extra payment", extra_payment),
        }
    }

    /// Builds a change from raw text inputs, e.g. form fields.
    pub fn from_inputs(lump_sum: Option<&str>, extra_payment: Option<&str>) -> Self {
        Self::new(
            parse_amount("lump sum", lump_sum),
            parse_amount("extra payment", extra_payment),
        )
    }

    pub fn is_noop(&self) -> bool {
        self.lump_sum.is_zero() && self.extra_payment.is_zero()
    }
}

fn parse_amount(name: &str, input: Option<&str>) -> Option<Decimal> {
    let text = input?.trim();
    if text.is_empty() {
        return None;
    }
    match Decimal::from_str(text) {
        Ok(amt) => Some(amt),
        Err(e) => {
            warn!("ignoring {} {:?}: {}", name, text, e);
            None
        }
    }
}

fn non_negative(name: &str, amt: Option<Decimal>) -> Decimal {
    match amt {
        Some(amt) if amt < Decimal::ZERO => {
            warn!("ignoring negative {} {}", name, amt);
            Decimal::ZERO
        }
        Some(amt) => amt,
        None => Decimal::ZERO,
    }
}

/// Period-by-period repayment table for a fixed-rate loan.
///
/// The number of rows is found by simulating payments until the balance is gone, so it
/// only matches the nominal term when the payment was derived from it and never changed.
#[derive(Clone, PartialEq, Debug)]
pub struct AmortizationSchedule {
    terms: LoanTerms,
    balance: Decimal,
    pmt_amount: Decimal,
    start_date: NaiveDate,
    scheduled_pmts: Vec<ScheduleRow>,
}

impl AmortizationSchedule {
    /// Builds the table with the first payment due today.
    pub fn new(terms: LoanTerms, pmt_amount: Decimal, sink: &dyn ScheduleSink) -> LoanResult<Self> {
        Self::new_from(terms, pmt_amount, Local::now().date_naive(), sink)
    }

    pub fn new_from(
        terms: LoanTerms,
        pmt_amount: Decimal,
        start_date: NaiveDate,
        sink: &dyn ScheduleSink,
    ) -> LoanResult<Self> {
        validate_terms(terms.principal, terms.annual_rate, terms.term)?;

        let scheduled_pmts = add_scheduled_pmts(terms.principal, terms.annual_rate, pmt_amount, start_date)?;
        let schedule = Self {
            balance: terms.principal,
            terms,
            pmt_amount,
            start_date,
            scheduled_pmts,
        };
        schedule.log_table("");
        schedule.save_table(sink);
        Ok(schedule)
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    /// Opening balance of the current table.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn pmt_amount(&self) -> Decimal {
        self.pmt_amount
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn rows(&self) -> &[ScheduleRow] {
        &self.scheduled_pmts
    }

    pub fn len(&self) -> usize {
        self.scheduled_pmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled_pmts.is_empty()
    }

    /// Row for a 1-based period number.
    pub fn row(&self, pmt_number: usize) -> Option<&ScheduleRow> {
        pmt_number
            .checked_sub(1)
            .and_then(|idx| self.scheduled_pmts.get(idx))
    }

    pub fn key(&self) -> TableKey {
        TableKey::new(&self.terms.label, self.balance, self.pmt_amount)
    }

    /// Sum of the payment column, including the adjusted last payment.
    pub fn total_paid(&self) -> Decimal {
        self.scheduled_pmts.iter().map(|pmt| pmt.pmt_amount).sum()
    }

    pub fn total_interest(&self) -> Decimal {
        self.scheduled_pmts.iter().map(|pmt| pmt.interest_paid).sum()
    }

    /// First period whose principal portion is more than half the payment.
    pub fn more_principal_period(&self) -> LoanResult<usize> {
        let half_pmt = self.pmt_amount / dec!(2);
        self.scheduled_pmts
            .iter()
            .find(|pmt| pmt.principal_paid > half_pmt)
            .map(|pmt| pmt.pmt_number)
            .ok_or(LoanError::QueryNotFound("more principal"))
    }

    /// First period that leaves less than half the originally borrowed principal outstanding.
    pub fn halfway_period(&self) -> LoanResult<usize> {
        let half_principal = self.terms.principal / dec!(2);
        self.scheduled_pmts
            .iter()
            .find(|pmt| pmt.end_balance < half_principal)
            .map(|pmt| pmt.pmt_number)
            .ok_or(LoanError::QueryNotFound("halfway"))
    }

    /// Applies `change` and rebuilds the whole table from the new balance and payment.
    ///
    /// A lump sum that would leave nothing to amortize is ignored. On error the schedule is
    /// left as it was.
    pub fn update_payments(&mut self, change: PlanChange, sink: &dyn ScheduleSink) -> LoanResult<()> {
        let balance = match self.balance.checked_sub(change.lump_sum) {
            Some(balance) if balance > Decimal::ZERO => balance,
            _ => {
                warn!(
                    "ignoring lump sum {} against a balance of {}",
                    change.lump_sum, self.balance
                );
                self.balance
            }
        };
        let pmt_amount = self
            .pmt_amount
            .checked_add(change.extra_payment)
            .ok_or_else(|| LoanError::invalid("extra_payment", format!("{} overflows the payment", change.extra_payment)))?;

        let scheduled_pmts = add_scheduled_pmts(balance, self.terms.annual_rate, pmt_amount, self.start_date)?;
        self.balance = balance;
        self.pmt_amount = pmt_amount;
        self.scheduled_pmts = scheduled_pmts;

        self.log_table("Updated ");
        self.save_table(sink);
        Ok(())
    }

    pub fn show_amortization(&self) {
        for pmt in &self.scheduled_pmts {
            println!("{}", pmt);
        }
    }

    fn log_table(&self, update_text: &str) {
        info!(
            "{}{} - Balance: {} - Interest rate: {} - Duration: {} - Monthly Payments: {}",
            update_text,
            self.terms.label,
            self.balance,
            self.terms.annual_rate,
            self.len(),
            self.pmt_amount
        );
    }

    fn save_table(&self, sink: &dyn ScheduleSink) {
        let key = self.key();
        if let Err(e) = sink.store(&key, &self.scheduled_pmts) {
            error!("could not save amortization table {}: {}", key, e);
        }
    }
}

// split each payment into principal and interest until the balance is paid off
fn add_scheduled_pmts(
    principal: Decimal,
    annual_rate: Decimal,
    pmt_amount: Decimal,
    start_date: NaiveDate,
) -> LoanResult<Vec<ScheduleRow>> {
    if pmt_amount <= Decimal::ZERO {
        return Err(LoanError::invalid("payment", format!("must be positive, got {pmt_amount}")));
    }

    let rate = periodic_rate(annual_rate);
    let mut sched_pmt: Vec<ScheduleRow> = Vec::new();
    let mut balance = principal;

    while balance > pmt_amount {
        let pmt_number = sched_pmt.len() + 1;
        let interest = round(checked_interest(balance, rate)?);
        let principal_paid = round(pmt_amount - interest);
        if principal_paid <= Decimal::ZERO {
            return Err(LoanError::NonAmortizingPayment {
                period: pmt_number,
                payment: pmt_amount,
                interest,
            });
        }
        balance = round(balance - principal_paid);
        trace!(
            "Pmt # {}, principal {}, interest {}, end bal {}",
            pmt_number,
            principal_paid,
            interest,
            balance
        );

        sched_pmt.push(ScheduleRow::new(
            pmt_number,
            due_date(start_date, pmt_number)?,
            pmt_amount,
            principal_paid,
            interest,
            balance,
        ));
    }

    // the last payment clears whatever is left, so it rarely equals the regular payment
    let pmt_number = sched_pmt.len() + 1;
    let interest = round(checked_interest(balance, rate)?);
    let final_pmt = balance
        .checked_add(interest)
        .ok_or_else(|| LoanError::invalid("annual_rate", format!("final payment on {balance} overflows")))?;
    trace!("Final pmt # {}, principal {}, interest {}", pmt_number, balance, interest);
    sched_pmt.push(ScheduleRow::new(
        pmt_number,
        due_date(start_date, pmt_number)?,
        final_pmt,
        balance,
        interest,
        Decimal::ZERO,
    ));

    Ok(sched_pmt)
}

fn checked_interest(balance: Decimal, rate: Decimal) -> LoanResult<Decimal> {
    balance
        .checked_mul(rate)
        .ok_or_else(|| LoanError::invalid("annual_rate", format!("interest on {balance} overflows")))
}

// due dates step whole calendar months from the start date, clamping to the month's end
fn due_date(start_date: NaiveDate, pmt_number: usize) -> LoanResult<NaiveDate> {
    u32::try_from(pmt_number - 1)
        .ok()
        .and_then(|months| start_date.checked_add_months(Months::new(months)))
        .ok_or_else(|| {
            LoanError::invalid(
                "start_date",
                format!("{start_date} plus {pmt_number} months is out of range"),
            )
        })
}
