mod engine;
mod mixed;
mod rates;
mod types;

pub use engine::{round, simulate};
pub use rates::{MarketIndicators, RateSource};
pub use types::{
    CompoundResult, EventDetails, EventKind, EventLogItem, FixedResult, InvestmentType, MixedOrder,
    MixedPlan, MixedResult, PhaseKind, ReinvestmentPolicy, SimulationInput, SimulationResult,
    SplitBalances, SplitOutcome, SplitPlan, Strategy, Summary, YearlyData,
};
