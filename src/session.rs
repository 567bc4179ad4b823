//! The caller-facing side of the engine: take loan terms, hand back figures.
//!
//! A [`LoanSession`] holds at most one schedule at a time. `calculate` previews the
//! payment and builds the table; `update` re-amortizes it and reports what the new plan
//! saves against the first preview.

use crate::error::{LoanError, LoanResult};
use crate::loan::{AmortizationSchedule, LoanTerms, PlanChange};
use crate::payment::{self, round};
use crate::persist::ScheduleSink;
use chrono::NaiveDate;
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalculationSummary {
    pub periodic_payment: Decimal,
    pub total_paid: Decimal,
    pub total_interest: Decimal,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateSummary {
    pub total_paid: Decimal,
    pub total_interest: Decimal,
    pub amount_saved: Decimal,
}

pub struct LoanSession {
    sink: Box<dyn ScheduleSink>,
    preview: Option<CalculationSummary>,
    schedule: Option<AmortizationSchedule>,
}

impl LoanSession {
    pub fn new(sink: Box<dyn ScheduleSink>) -> Self {
        Self {
            sink,
            preview: None,
            schedule: None,
        }
    }

    /// Previews the loan and builds its schedule starting today.
    pub fn calculate(&mut self, terms: LoanTerms) -> LoanResult<CalculationSummary> {
        self.calculate_from(terms, chrono::Local::now().date_naive())
    }

    pub fn calculate_from(&mut self, terms: LoanTerms, start_date: NaiveDate) -> LoanResult<CalculationSummary> {
        let summary = CalculationSummary {
            periodic_payment: payment::periodic_payment(terms.principal, terms.annual_rate, terms.term)?,
            total_paid: payment::total_paid(terms.principal, terms.annual_rate, terms.term)?,
            total_interest: payment::total_interest(terms.principal, terms.annual_rate, terms.term)?,
        };

        let schedule =
            AmortizationSchedule::new_from(terms, summary.periodic_payment, start_date, self.sink.as_ref())?;
        self.preview = Some(summary);
        self.schedule = Some(schedule);
        Ok(summary)
    }

    /// Re-amortizes the current schedule and compares it with the first preview.
    pub fn update(&mut self, change: PlanChange) -> LoanResult<UpdateSummary> {
        let (Some(preview), Some(schedule)) = (self.preview, self.schedule.as_mut()) else {
            return Err(no_schedule());
        };
        schedule.update_payments(change, self.sink.as_ref())?;

        let total_paid = round(schedule.total_paid());
        Ok(UpdateSummary {
            total_paid,
            total_interest: round(total_paid - schedule.balance()),
            amount_saved: round(preview.total_paid - total_paid),
        })
    }

    pub fn more_principal_period(&self) -> LoanResult<usize> {
        self.schedule()?.more_principal_period()
    }

    pub fn halfway_period(&self) -> LoanResult<usize> {
        self.schedule()?.halfway_period()
    }

    pub fn schedule(&self) -> LoanResult<&AmortizationSchedule> {
        self.schedule.as_ref().ok_or_else(no_schedule)
    }

    pub fn preview(&self) -> Option<&CalculationSummary> {
        self.preview.as_ref()
    }
}

fn no_schedule() -> LoanError {
    LoanError::invalid("schedule", "calculate a loan before updating or querying it")
}
