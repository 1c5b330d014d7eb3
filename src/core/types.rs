use serde::Serialize;

/// Strategy discriminant as supplied by callers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentType {
    Compound,
    Fixed,
    Mixed,
}

impl InvestmentType {
    /// Unknown or missing discriminants fall back to compound.
    pub fn from_discriminant(value: Option<&str>) -> Self {
        match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("fixed") => InvestmentType::Fixed,
            Some("mixed") => InvestmentType::Mixed,
            _ => InvestmentType::Compound,
        }
    }
}

/// Strategy a single phase of a mixed run can execute. Phases never nest.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum PhaseKind {
    #[serde(rename = "compoundInterest")]
    Compound,
    #[serde(rename = "fixedIncome")]
    Fixed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedOrder {
    CompoundFirst,
    FixedFirst,
}

impl MixedOrder {
    pub fn phases(self) -> (PhaseKind, PhaseKind) {
        match self {
            MixedOrder::CompoundFirst => (PhaseKind::Compound, PhaseKind::Fixed),
            MixedOrder::FixedFirst => (PhaseKind::Fixed, PhaseKind::Compound),
        }
    }
}

/// How much of each month's fixed-income interest compounds back into the balance.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum ReinvestmentPolicy {
    /// Reinvest up to this many currency units per month.
    Amount(f64),
    /// Reinvest this percentage of the month's interest.
    Percentage(f64),
    /// Reinvest only the interest exceeding this threshold.
    AboveThreshold(f64),
}

impl Default for ReinvestmentPolicy {
    fn default() -> Self {
        ReinvestmentPolicy::Amount(0.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum SplitPlan {
    /// Move this literal amount into the phase-2 strategy.
    Amount(f64),
    /// Move this percentage of the switch balance into the phase-2 strategy.
    Percentage(f64),
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedPlan {
    /// Phase-1 duration in years.
    pub switch_year: u32,
    pub order: MixedOrder,
    /// Falls back to the phase-1 rate when absent.
    pub phase2_rate: Option<f64>,
    pub reinvestment: ReinvestmentPolicy,
    /// `None` means the whole balance moves to phase 2.
    pub split: Option<SplitPlan>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Strategy {
    Compound,
    Fixed(ReinvestmentPolicy),
    Mixed(MixedPlan),
}

impl Strategy {
    pub fn investment_type(&self) -> InvestmentType {
        match self {
            Strategy::Compound => InvestmentType::Compound,
            Strategy::Fixed(_) => InvestmentType::Fixed,
            Strategy::Mixed(_) => InvestmentType::Mixed,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationInput {
    pub initial_investment: f64,
    pub monthly_contribution: f64,
    /// Percent per year; the phase-1 rate for mixed runs.
    pub annual_interest_rate: f64,
    pub years: u32,
    pub strategy: Strategy,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitBalances {
    pub retained_balance: f64,
    pub migrated_balance: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyData {
    pub year: u32,
    pub total_invested: f64,
    pub interest_gains: f64,
    pub final_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(flatten)]
    pub split: Option<SplitBalances>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_invested: f64,
    pub total_interest: f64,
    pub final_balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundResult {
    pub yearly_data: Vec<YearlyData>,
    pub summary: Summary,
    pub annual_interest_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedResult {
    pub yearly_data: Vec<YearlyData>,
    pub summary: Summary,
    /// Payout of the final simulated month.
    pub monthly_income: f64,
    pub reinvestment: ReinvestmentPolicy,
    pub annual_interest_rate: f64,
}

/// Balances right after a split, before either leg has grown.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOutcome {
    pub initial_retained_balance: f64,
    pub initial_migrated_balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedResult {
    pub yearly_data: Vec<YearlyData>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_outcome: Option<SplitOutcome>,
    pub annual_interest_rate: f64,
    pub annual_interest_rate_phase2: Option<f64>,
    pub plan: MixedPlan,
    pub event_log: Vec<EventLogItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "investmentType", rename_all = "lowercase")]
pub enum SimulationResult {
    Compound(CompoundResult),
    Fixed(FixedResult),
    Mixed(MixedResult),
}

impl SimulationResult {
    pub fn investment_type(&self) -> InvestmentType {
        match self {
            SimulationResult::Compound(_) => InvestmentType::Compound,
            SimulationResult::Fixed(_) => InvestmentType::Fixed,
            SimulationResult::Mixed(_) => InvestmentType::Mixed,
        }
    }

    pub fn yearly_data(&self) -> &[YearlyData] {
        match self {
            SimulationResult::Compound(r) => &r.yearly_data,
            SimulationResult::Fixed(r) => &r.yearly_data,
            SimulationResult::Mixed(r) => &r.yearly_data,
        }
    }

    pub fn summary(&self) -> &Summary {
        match self {
            SimulationResult::Compound(r) => &r.summary,
            SimulationResult::Fixed(r) => &r.summary,
            SimulationResult::Mixed(r) => &r.summary,
        }
    }

    pub fn monthly_income(&self) -> Option<f64> {
        match self {
            SimulationResult::Compound(_) => None,
            SimulationResult::Fixed(r) => Some(r.monthly_income),
            SimulationResult::Mixed(r) => r.monthly_income,
        }
    }

    pub fn event_log(&self) -> Option<&[EventLogItem]> {
        match self {
            SimulationResult::Mixed(r) => Some(&r.event_log),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Switch,
    Split,
    End,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventDetails {
    #[serde(rename_all = "camelCase")]
    Start {
        amount: f64,
        #[serde(rename = "type")]
        strategy: PhaseKind,
    },
    #[serde(rename_all = "camelCase")]
    Switch {
        from_type: PhaseKind,
        to_type: PhaseKind,
    },
    #[serde(rename_all = "camelCase")]
    Split {
        migrated_amount: f64,
        migrated_percentage: f64,
        to_type: PhaseKind,
        retained_amount: f64,
        retained_percentage: f64,
        from_type: PhaseKind,
    },
    #[serde(rename_all = "camelCase")]
    End { amount: f64 },
}

/// One milestone of a mixed run, keyed for localized rendering downstream.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogItem {
    pub year: u32,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub title_key: &'static str,
    pub description_key: &'static str,
    pub description_values: EventDetails,
}
