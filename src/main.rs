use log::{error, info};
use repayment::{
    config::Config, persist::CsvTableSink, LoanResult, LoanSession, LoanTerms, PlanChange,
};
use rust_decimal_macros::dec;
use simple_logger::SimpleLogger;

fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    SimpleLogger::new()
        .with_level(config.log_level)
        .init()
        .unwrap();

    if let Err(e) = run(&config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> LoanResult<()> {
    let mut session = LoanSession::new(Box::new(CsvTableSink::new(&config.tables_dir)));

    let summary = session.calculate(LoanTerms::new("Car", dec!(10000), dec!(6), 36)?)?;
    info!(
        "payment ${}, total paid ${}, total interest ${}",
        summary.periodic_payment, summary.total_paid, summary.total_interest
    );
    session.schedule()?.show_amortization();

    let update = session.update(PlanChange::new(Some(dec!(2000)), Some(dec!(50))))?;
    info!(
        "total paid ${}, total interest ${}, saved ${}",
        update.total_paid, update.total_interest, update.amount_saved
    );
    session.schedule()?.show_amortization();

    info!(
        "More principal: {} - Halfway: {} month(s)",
        session.more_principal_period()?,
        session.halfway_period()?
    );
    Ok(())
}

// verifies that types can implement the gated traits below
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<repayment::ScheduleRow>();
    is_normal::<repayment::AmortizationSchedule>();
}
