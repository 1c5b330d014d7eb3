use tracing::debug;

use super::engine::{PhaseRun, round, run_phase};
use super::types::{
    EventDetails, EventKind, EventLogItem, MixedPlan, MixedResult, PhaseKind, SimulationInput,
    SplitBalances, SplitOutcome, SplitPlan, Summary, YearlyData,
};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Two-phase run: phase 1 for `plan.switch_year` years, then phase 2 for the
/// rest of the horizon, optionally with the switch balance split between
/// both strategies.
pub(crate) fn run_mixed(input: &SimulationInput, plan: &MixedPlan) -> MixedResult {
    let (phase1_kind, phase2_kind) = plan.order.phases();
    let phase1_years = plan.switch_year;
    let phase2_rate = plan.phase2_rate.unwrap_or(input.annual_interest_rate);
    let phase1_contribution = contribution_for(phase1_kind, input.monthly_contribution);
    let phase2_contribution = contribution_for(phase2_kind, input.monthly_contribution);

    let mut log = EventLog::default();
    log.push(
        0,
        EventDetails::Start {
            amount: round(input.initial_investment),
            strategy: phase1_kind,
        },
    );

    let phase1 = run_phase(
        phase1_kind,
        input.initial_investment,
        phase1_contribution,
        input.annual_interest_rate,
        phase1_years,
        plan.reinvestment,
    );

    let base = MixedBase { input, plan };

    let phase2_years = match input.years.checked_sub(phase1_years) {
        Some(years) if years > 0 => years,
        _ => {
            log.push(
                input.years,
                EventDetails::End {
                    amount: phase1.summary.final_balance,
                },
            );
            return base.finish(
                phase1.yearly_data,
                phase1.summary,
                phase1.monthly_income,
                None,
                log,
            );
        }
    };

    log.push(
        plan.switch_year,
        EventDetails::Switch {
            from_type: phase1_kind,
            to_type: phase2_kind,
        },
    );

    let balance_at_switch = phase1.summary.final_balance;
    let invested_at_switch = phase1.summary.total_invested;

    if let Some(split) = effective_split(plan.split, balance_at_switch) {
        let description_key = match plan.split {
            Some(SplitPlan::Amount(_)) => "eventSplitDescAmount",
            _ => "eventSplitDesc",
        };
        log.push_described(
            plan.switch_year,
            description_key,
            EventDetails::Split {
                migrated_amount: round(split.migrated),
                migrated_percentage: round(split.migrated_percentage),
                to_type: phase2_kind,
                retained_amount: round(split.retained),
                retained_percentage: round(100.0 - split.migrated_percentage),
                from_type: phase1_kind,
            },
        );

        let migrated = run_phase(
            phase2_kind,
            split.migrated,
            phase2_contribution,
            phase2_rate,
            phase2_years,
            plan.reinvestment,
        );
        // The retained leg stays parked in the phase-1 strategy without new deposits.
        let retained = run_phase(
            phase1_kind,
            split.retained,
            0.0,
            input.annual_interest_rate,
            phase2_years,
            plan.reinvestment,
        );

        let mut yearly_data = phase1.yearly_data;
        yearly_data.extend(merge_split_legs(
            &retained,
            &migrated,
            phase1_kind,
            phase2_kind,
            phase1_years,
            invested_at_switch,
            phase2_contribution,
        ));

        let summary = summary_from_last(&yearly_data, phase1.summary);
        let monthly_income = yearly_data.last().and_then(|y| y.monthly_income);
        log.push(
            input.years,
            EventDetails::End {
                amount: summary.final_balance,
            },
        );
        let outcome = SplitOutcome {
            initial_retained_balance: round(split.retained),
            initial_migrated_balance: round(split.migrated),
        };
        return base.finish(yearly_data, summary, monthly_income, Some(outcome), log);
    }

    let phase2 = run_phase(
        phase2_kind,
        balance_at_switch,
        phase2_contribution,
        phase2_rate,
        phase2_years,
        plan.reinvestment,
    );

    let mut yearly_data = phase1.yearly_data;
    yearly_data.extend(phase2.yearly_data.iter().map(|data| {
        let total_invested =
            invested_at_switch + phase2_contribution * MONTHS_PER_YEAR * f64::from(data.year);
        YearlyData {
            year: data.year + phase1_years,
            total_invested: round(total_invested),
            interest_gains: round(data.final_balance - total_invested),
            ..*data
        }
    }));

    let summary = summary_from_last(&yearly_data, phase1.summary);
    log.push(
        input.years,
        EventDetails::End {
            amount: summary.final_balance,
        },
    );
    base.finish(yearly_data, summary, phase2.monthly_income, None, log)
}

/// Contributions only flow into the compound phase.
fn contribution_for(kind: PhaseKind, monthly_contribution: f64) -> f64 {
    match kind {
        PhaseKind::Compound => monthly_contribution,
        PhaseKind::Fixed => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitAmounts {
    migrated: f64,
    retained: f64,
    migrated_percentage: f64,
}

/// Resolves a requested split against the switch balance. Splits that would
/// move nothing or everything are skipped.
fn effective_split(split: Option<SplitPlan>, balance_at_switch: f64) -> Option<SplitAmounts> {
    match split? {
        SplitPlan::Amount(value) => {
            if !(value > 0.0 && value < balance_at_switch) {
                debug!(value, balance_at_switch, "split amount out of bounds, skipping split");
                return None;
            }
            Some(SplitAmounts {
                migrated: value,
                retained: balance_at_switch - value,
                migrated_percentage: value / balance_at_switch * 100.0,
            })
        }
        SplitPlan::Percentage(pct) => {
            if !(pct > 0.0 && pct < 100.0) {
                debug!(pct, "split percentage out of bounds, skipping split");
                return None;
            }
            Some(SplitAmounts {
                migrated: balance_at_switch * (pct / 100.0),
                retained: balance_at_switch * (1.0 - pct / 100.0),
                migrated_percentage: pct,
            })
        }
    }
}

fn merge_split_legs(
    retained: &PhaseRun,
    migrated: &PhaseRun,
    retained_kind: PhaseKind,
    migrated_kind: PhaseKind,
    phase1_years: u32,
    invested_at_switch: f64,
    phase2_contribution: f64,
) -> Vec<YearlyData> {
    retained
        .yearly_data
        .iter()
        .zip(&migrated.yearly_data)
        .enumerate()
        .map(|(idx, (kept, moved))| {
            let elapsed_years = (idx + 1) as f64;
            let final_balance = kept.final_balance + moved.final_balance;
            let total_invested =
                invested_at_switch + phase2_contribution * MONTHS_PER_YEAR * elapsed_years;
            let income = leg_income(kept, retained_kind) + leg_income(moved, migrated_kind);
            YearlyData {
                year: phase1_years + idx as u32 + 1,
                total_invested: round(total_invested),
                interest_gains: round(final_balance - total_invested),
                final_balance: round(final_balance),
                monthly_income: (income > 0.0).then(|| round(income)),
                split: Some(SplitBalances {
                    retained_balance: kept.final_balance,
                    migrated_balance: moved.final_balance,
                }),
            }
        })
        .collect()
}

fn leg_income(data: &YearlyData, kind: PhaseKind) -> f64 {
    match kind {
        PhaseKind::Fixed => data.monthly_income.unwrap_or(0.0),
        PhaseKind::Compound => 0.0,
    }
}

fn summary_from_last(yearly_data: &[YearlyData], fallback: Summary) -> Summary {
    yearly_data
        .last()
        .map(|last| Summary {
            total_invested: last.total_invested,
            total_interest: last.interest_gains,
            final_balance: last.final_balance,
        })
        .unwrap_or(fallback)
}

struct MixedBase<'a> {
    input: &'a SimulationInput,
    plan: &'a MixedPlan,
}

impl MixedBase<'_> {
    fn finish(
        self,
        yearly_data: Vec<YearlyData>,
        summary: Summary,
        monthly_income: Option<f64>,
        split_outcome: Option<SplitOutcome>,
        log: EventLog,
    ) -> MixedResult {
        MixedResult {
            yearly_data,
            summary,
            monthly_income,
            split_outcome,
            annual_interest_rate: self.input.annual_interest_rate,
            annual_interest_rate_phase2: self.plan.phase2_rate,
            plan: *self.plan,
            event_log: log.into_items(),
        }
    }
}

#[derive(Default)]
struct EventLog {
    items: Vec<EventLogItem>,
}

impl EventLog {
    fn push(&mut self, year: u32, details: EventDetails) {
        let (_, _, description_key) = Self::keys(&details);
        self.push_described(year, description_key, details);
    }

    fn push_described(
        &mut self,
        year: u32,
        description_key: &'static str,
        details: EventDetails,
    ) {
        let (kind, title_key, _) = Self::keys(&details);
        self.items.push(EventLogItem {
            year,
            kind,
            title_key,
            description_key,
            description_values: details,
        });
    }

    fn keys(details: &EventDetails) -> (EventKind, &'static str, &'static str) {
        match details {
            EventDetails::Start { .. } => (EventKind::Start, "eventStartTitle", "eventStartDesc"),
            EventDetails::Switch { .. } => {
                (EventKind::Switch, "eventSwitchTitle", "eventSwitchDesc")
            }
            EventDetails::Split { .. } => (EventKind::Split, "eventSplitTitle", "eventSplitDesc"),
            EventDetails::End { .. } => (EventKind::End, "eventEndTitle", "eventEndDesc"),
        }
    }

    fn into_items(self) -> Vec<EventLogItem> {
        self.items
    }
}
