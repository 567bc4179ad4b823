//! Fixed-rate installment loans: monthly payment, amortization table, and re-amortization
//! after a lump sum or a larger payment.

pub mod config;
pub mod error;
pub mod loan;
pub mod payment;
pub mod persist;
pub mod session;

pub use error::{LoanError, LoanResult, PersistenceError};
pub use loan::{AmortizationSchedule, LoanTerms, PlanChange, ScheduleRow};
pub use session::{CalculationSummary, LoanSession, UpdateSummary};
