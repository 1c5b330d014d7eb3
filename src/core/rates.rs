use serde::Serialize;

use super::engine::round;

/// Reference indicators used when a rate is pegged to the market.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndicators {
    /// CDI, percent per year.
    pub cdi: f64,
    /// IPCA accumulated over 12 months, percent.
    pub ipca: f64,
}

impl Default for MarketIndicators {
    fn default() -> Self {
        Self {
            cdi: 10.65,
            ipca: 4.50,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RateSource {
    /// Annual percent entered directly.
    Manual(f64),
    /// A percentage of the CDI, e.g. 110 for "110% of CDI".
    Cdi { percent_of_cdi: f64 },
    /// Inflation plus a fixed real spread, compounded.
    IpcaPlus { spread: f64 },
}

impl RateSource {
    /// Annual percent rate this source resolves to, rounded to cents.
    pub fn effective_rate(self, market: &MarketIndicators) -> f64 {
        match self {
            RateSource::Manual(rate) => rate,
            RateSource::Cdi { percent_of_cdi } => round(market.cdi * (percent_of_cdi / 100.0)),
            RateSource::IpcaPlus { spread } => {
                let ipca = market.ipca / 100.0;
                let spread = spread / 100.0;
                round(((1.0 + ipca) * (1.0 + spread) - 1.0) * 100.0)
            }
        }
    }
}
