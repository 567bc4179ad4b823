use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LoanError {
    #[error("invalid loan terms: {field} {reason}")]
    InvalidLoanTerms { field: &'static str, reason: String },

    #[error("payment of {payment} does not cover interest of {interest} in period {period}")]
    NonAmortizingPayment {
        period: usize,
        payment: Decimal,
        interest: Decimal,
    },

    #[error("no period satisfies the {0} query")]
    QueryNotFound(&'static str),
}

impl LoanError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LoanError::InvalidLoanTerms {
            field,
            reason: reason.into(),
        }
    }
}

pub type LoanResult<T> = Result<T, LoanError>;

/// Failure to write a schedule table. Sinks return it; schedules log it and carry on.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("table i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("table encoding failed: {0}")]
    Csv(#[from] csv::Error),
}
