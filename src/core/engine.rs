use super::mixed::run_mixed;
use super::types::{
    CompoundResult, FixedResult, PhaseKind, ReinvestmentPolicy, SimulationInput, SimulationResult,
    Strategy, Summary, YearlyData,
};

const MONTHS_PER_YEAR: u32 = 12;
/// Upper bound on the up-front row allocation; longer horizons grow on demand.
const MAX_PREALLOCATED_YEARS: u32 = 1_200;

/// Snaps a monetary figure to two decimals. Non-finite values become zero.
pub fn round(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.is_finite() { rounded } else { 0.0 }
}

/// Runs one projection, selecting the engine from the input's strategy.
pub fn simulate(input: &SimulationInput) -> SimulationResult {
    match input.strategy {
        Strategy::Compound => SimulationResult::Compound(run_compound(
            input.initial_investment,
            input.monthly_contribution,
            input.annual_interest_rate,
            input.years,
        )),
        Strategy::Fixed(policy) => SimulationResult::Fixed(run_fixed(
            input.initial_investment,
            input.annual_interest_rate,
            input.years,
            policy,
        )),
        Strategy::Mixed(plan) => SimulationResult::Mixed(run_mixed(input, &plan)),
    }
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

fn yearly_buffer(years: u32) -> Vec<YearlyData> {
    Vec::with_capacity(years.min(MAX_PREALLOCATED_YEARS) as usize)
}

fn is_year_end(month: u32, months: u32) -> bool {
    month % MONTHS_PER_YEAR == 0 || month == months
}

pub(crate) fn run_compound(
    initial_investment: f64,
    monthly_contribution: f64,
    annual_rate: f64,
    years: u32,
) -> CompoundResult {
    let rate = monthly_rate(annual_rate);
    let months = years.saturating_mul(MONTHS_PER_YEAR);
    let mut yearly_data = yearly_buffer(years);
    let mut balance = initial_investment;

    for month in 1..=months {
        balance += monthly_contribution;
        balance *= 1.0 + rate;

        if is_year_end(month, months) {
            let total_invested = initial_investment + monthly_contribution * f64::from(month);
            yearly_data.push(YearlyData {
                year: month.div_ceil(MONTHS_PER_YEAR),
                total_invested: round(total_invested),
                interest_gains: round(balance - total_invested),
                final_balance: round(balance),
                monthly_income: None,
                split: None,
            });
        }
    }

    let total_invested = initial_investment + monthly_contribution * f64::from(months);
    CompoundResult {
        yearly_data,
        summary: Summary {
            total_invested: round(total_invested),
            total_interest: round(balance - total_invested),
            final_balance: round(balance),
        },
        annual_interest_rate: annual_rate,
    }
}

/// Portion of a month's interest that compounds back into the balance.
fn reinvested_amount(interest: f64, policy: ReinvestmentPolicy) -> f64 {
    match policy {
        ReinvestmentPolicy::Amount(cap) => interest.min(cap),
        ReinvestmentPolicy::Percentage(pct) => interest * (pct / 100.0),
        ReinvestmentPolicy::AboveThreshold(threshold) => (interest - threshold).max(0.0),
    }
}

pub(crate) fn run_fixed(
    initial_investment: f64,
    annual_rate: f64,
    years: u32,
    policy: ReinvestmentPolicy,
) -> FixedResult {
    let rate = monthly_rate(annual_rate);
    let months = years.saturating_mul(MONTHS_PER_YEAR);
    let total_invested = initial_investment;
    let mut yearly_data = yearly_buffer(years);
    let mut balance = initial_investment;
    let mut last_payout = 0.0;

    for month in 1..=months {
        let interest = balance * rate;
        let reinvested = round(reinvested_amount(interest, policy));
        last_payout = interest - reinvested;
        balance += reinvested;

        if is_year_end(month, months) {
            yearly_data.push(YearlyData {
                year: month.div_ceil(MONTHS_PER_YEAR),
                total_invested: round(total_invested),
                interest_gains: round(balance - total_invested),
                final_balance: round(balance),
                monthly_income: Some(round(last_payout)),
                split: None,
            });
        }
    }

    FixedResult {
        yearly_data,
        summary: Summary {
            total_invested: round(total_invested),
            total_interest: round(balance - total_invested),
            final_balance: round(balance),
        },
        monthly_income: round(last_payout),
        reinvestment: policy,
        annual_interest_rate: annual_rate,
    }
}

/// Output of a single phase of a mixed run.
#[derive(Debug, Clone)]
pub(crate) struct PhaseRun {
    pub yearly_data: Vec<YearlyData>,
    pub summary: Summary,
    pub monthly_income: Option<f64>,
}

pub(crate) fn run_phase(
    kind: PhaseKind,
    initial_investment: f64,
    monthly_contribution: f64,
    annual_rate: f64,
    years: u32,
    policy: ReinvestmentPolicy,
) -> PhaseRun {
    match kind {
        PhaseKind::Compound => {
            let result = run_compound(initial_investment, monthly_contribution, annual_rate, years);
            PhaseRun {
                yearly_data: result.yearly_data,
                summary: result.summary,
                monthly_income: None,
            }
        }
        PhaseKind::Fixed => {
            let result = run_fixed(initial_investment, annual_rate, years, policy);
            PhaseRun {
                yearly_data: result.yearly_data,
                summary: result.summary,
                monthly_income: Some(result.monthly_income),
            }
        }
    }
}
