mod error;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    InvestmentType, MarketIndicators, MixedOrder, MixedPlan, RateSource, ReinvestmentPolicy,
    SimulationInput, SplitPlan, Strategy, simulate,
};

pub use error::{ApiError, ApiResult};

const MAX_YEARS: u32 = 100;
const MAX_RATE: f64 = 100.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliInvestmentType {
    Compound,
    Fixed,
    Mixed,
}

impl From<InvestmentType> for CliInvestmentType {
    fn from(value: InvestmentType) -> Self {
        match value {
            InvestmentType::Compound => CliInvestmentType::Compound,
            InvestmentType::Fixed => CliInvestmentType::Fixed,
            InvestmentType::Mixed => CliInvestmentType::Mixed,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliReinvestmentMode {
    Amount,
    Percentage,
    AboveThreshold,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliMixedOrder {
    CompoundFirst,
    FixedFirst,
}

impl From<CliMixedOrder> for MixedOrder {
    fn from(value: CliMixedOrder) -> Self {
        match value {
            CliMixedOrder::CompoundFirst => MixedOrder::CompoundFirst,
            CliMixedOrder::FixedFirst => MixedOrder::FixedFirst,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliSplitMode {
    Amount,
    Percentage,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRateMode {
    Manual,
    Cdi,
    IpcaPlus,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiReinvestmentMode {
    Amount,
    Percentage,
    #[serde(alias = "above-threshold", alias = "aboveThreshold")]
    AboveThreshold,
}

impl From<ApiReinvestmentMode> for CliReinvestmentMode {
    fn from(value: ApiReinvestmentMode) -> Self {
        match value {
            ApiReinvestmentMode::Amount => CliReinvestmentMode::Amount,
            ApiReinvestmentMode::Percentage => CliReinvestmentMode::Percentage,
            ApiReinvestmentMode::AboveThreshold => CliReinvestmentMode::AboveThreshold,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiMixedOrder {
    #[serde(alias = "compound-first", alias = "compoundFirst")]
    CompoundFirst,
    #[serde(alias = "fixed-first", alias = "fixedFirst")]
    FixedFirst,
}

impl From<ApiMixedOrder> for CliMixedOrder {
    fn from(value: ApiMixedOrder) -> Self {
        match value {
            ApiMixedOrder::CompoundFirst => CliMixedOrder::CompoundFirst,
            ApiMixedOrder::FixedFirst => CliMixedOrder::FixedFirst,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiSplitMode {
    Amount,
    Percentage,
}

impl From<ApiSplitMode> for CliSplitMode {
    fn from(value: ApiSplitMode) -> Self {
        match value {
            ApiSplitMode::Amount => CliSplitMode::Amount,
            ApiSplitMode::Percentage => CliSplitMode::Percentage,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiRateMode {
    Manual,
    Cdi,
    #[serde(alias = "ipca-plus", alias = "ipcaPlus")]
    IpcaPlus,
}

impl From<ApiRateMode> for CliRateMode {
    fn from(value: ApiRateMode) -> Self {
        match value {
            ApiRateMode::Manual => CliRateMode::Manual,
            ApiRateMode::Cdi => CliRateMode::Cdi,
            ApiRateMode::IpcaPlus => CliRateMode::IpcaPlus,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_investment: Option<f64>,
    monthly_contribution: Option<f64>,
    annual_interest_rate: Option<f64>,
    annual_interest_rate_phase2: Option<f64>,
    years: Option<u32>,
    investment_type: Option<String>,
    reinvestment_mode: Option<ApiReinvestmentMode>,
    reinvestment_value: Option<f64>,
    reinvestment_percentage: Option<f64>,
    reinvestment_threshold: Option<f64>,
    switch_to_fixed_year: Option<u32>,
    mixed_investment_order: Option<ApiMixedOrder>,
    enable_split: Option<bool>,
    split_mode: Option<ApiSplitMode>,
    split_value: Option<f64>,
    split_percentage: Option<f64>,
    rate_mode: Option<ApiRateMode>,
    rate_mode_phase2: Option<ApiRateMode>,
    cdi_percent: Option<f64>,
    #[serde(alias = "ipcaFixed")]
    ipca_spread: Option<f64>,
    cdi_percent_phase2: Option<f64>,
    #[serde(alias = "ipcaFixedPhase2")]
    ipca_spread_phase2: Option<f64>,
    cdi: Option<f64>,
    ipca: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "invest-sim",
    about = "Month-by-month investment growth simulator (compound, fixed income, two-phase mixed)"
)]
pub struct Cli {
    #[arg(long, default_value_t = 1000.0)]
    initial_investment: f64,
    #[arg(
        long,
        default_value_t = 200.0,
        help = "Monthly deposit; only compound phases receive it"
    )]
    monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Annual interest rate in percent (phase 1 for mixed)"
    )]
    annual_interest_rate: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Phase-2 annual interest rate in percent (mixed only)"
    )]
    annual_interest_rate_phase2: f64,
    #[arg(long, default_value_t = 20, help = "Simulation horizon in years")]
    years: u32,
    #[arg(long, value_enum, default_value_t = CliInvestmentType::Compound)]
    investment_type: CliInvestmentType,
    #[arg(
        long,
        value_enum,
        default_value_t = CliReinvestmentMode::Amount,
        help = "How fixed-income interest is reinvested: fixed amount, percentage, or excess above a threshold"
    )]
    reinvestment_mode: CliReinvestmentMode,
    #[arg(long, default_value_t = 0.0, help = "Monthly amount reinvested")]
    reinvestment_value: f64,
    #[arg(
        long,
        default_value_t = 50.0,
        help = "Share of monthly interest reinvested in percent"
    )]
    reinvestment_percentage: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly payout; interest above it is reinvested"
    )]
    reinvestment_threshold: f64,
    #[arg(long, default_value_t = 10, help = "Phase-1 duration in years (mixed only)")]
    switch_to_fixed_year: u32,
    #[arg(long, value_enum, default_value_t = CliMixedOrder::CompoundFirst)]
    mixed_investment_order: CliMixedOrder,
    #[arg(long, help = "Split the balance between both strategies at the switch")]
    enable_split: bool,
    #[arg(long, value_enum, default_value_t = CliSplitMode::Percentage)]
    split_mode: CliSplitMode,
    #[arg(
        long,
        default_value_t = 10000.0,
        help = "Amount moved to the phase-2 strategy when --split-mode=amount"
    )]
    split_value: f64,
    #[arg(
        long,
        default_value_t = 80.0,
        help = "Percent of the balance moved to the phase-2 strategy when --split-mode=percentage"
    )]
    split_percentage: f64,
    #[arg(long, value_enum, default_value_t = CliRateMode::Manual)]
    rate_mode: CliRateMode,
    #[arg(long, value_enum, default_value_t = CliRateMode::Manual)]
    rate_mode_phase2: CliRateMode,
    #[arg(
        long,
        default_value_t = 100.0,
        help = "Rate as percent of CDI when --rate-mode=cdi"
    )]
    cdi_percent: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Real spread over IPCA in percent when --rate-mode=ipca-plus"
    )]
    ipca_spread: f64,
    #[arg(long, default_value_t = 100.0)]
    cdi_percent_phase2: f64,
    #[arg(long, default_value_t = 6.0)]
    ipca_spread_phase2: f64,
    #[arg(long, default_value_t = 10.65, help = "Current CDI in percent per year")]
    cdi: f64,
    #[arg(long, default_value_t = 4.5, help = "12-month IPCA in percent")]
    ipca: f64,
}

fn require_non_negative(value: f64, field: &'static str) -> ApiResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::validation(field, "must be a finite number >= 0"));
    }
    Ok(())
}

fn require_percentage(value: f64, field: &'static str) -> ApiResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ApiError::validation(field, "must be between 0 and 100"));
    }
    Ok(())
}

fn require_rate(value: f64, field: &'static str) -> ApiResult<()> {
    if !value.is_finite() || !(0.0..=MAX_RATE).contains(&value) {
        return Err(ApiError::validation(
            field,
            format!("must resolve to a rate between 0 and {MAX_RATE}"),
        ));
    }
    Ok(())
}

fn rate_source(mode: CliRateMode, manual: f64, cdi_percent: f64, ipca_spread: f64) -> RateSource {
    match mode {
        CliRateMode::Manual => RateSource::Manual(manual),
        CliRateMode::Cdi => RateSource::Cdi {
            percent_of_cdi: cdi_percent,
        },
        CliRateMode::IpcaPlus => RateSource::IpcaPlus {
            spread: ipca_spread,
        },
    }
}

fn build_inputs(cli: Cli) -> ApiResult<SimulationInput> {
    require_non_negative(cli.initial_investment, "--initial-investment")?;
    require_non_negative(cli.monthly_contribution, "--monthly-contribution")?;
    require_non_negative(cli.reinvestment_value, "--reinvestment-value")?;
    require_percentage(cli.reinvestment_percentage, "--reinvestment-percentage")?;
    require_non_negative(cli.reinvestment_threshold, "--reinvestment-threshold")?;
    require_non_negative(cli.split_value, "--split-value")?;
    require_percentage(cli.split_percentage, "--split-percentage")?;
    require_non_negative(cli.cdi_percent, "--cdi-percent")?;
    require_non_negative(cli.cdi_percent_phase2, "--cdi-percent-phase2")?;
    if !cli.cdi.is_finite() || !cli.ipca.is_finite() {
        return Err(ApiError::validation(
            "--cdi/--ipca",
            "market indicators must be finite",
        ));
    }
    if !cli.ipca_spread.is_finite() || !cli.ipca_spread_phase2.is_finite() {
        return Err(ApiError::validation(
            "--ipca-spread",
            "spreads must be finite",
        ));
    }
    if cli.years == 0 || cli.years > MAX_YEARS {
        return Err(ApiError::validation(
            "--years",
            format!("must be between 1 and {MAX_YEARS}"),
        ));
    }

    let market = MarketIndicators {
        cdi: cli.cdi,
        ipca: cli.ipca,
    };
    let annual_interest_rate = rate_source(
        cli.rate_mode,
        cli.annual_interest_rate,
        cli.cdi_percent,
        cli.ipca_spread,
    )
    .effective_rate(&market);
    require_rate(annual_interest_rate, "--annual-interest-rate")?;

    let reinvestment = match cli.reinvestment_mode {
        CliReinvestmentMode::Amount => ReinvestmentPolicy::Amount(cli.reinvestment_value),
        CliReinvestmentMode::Percentage => {
            ReinvestmentPolicy::Percentage(cli.reinvestment_percentage)
        }
        CliReinvestmentMode::AboveThreshold => {
            ReinvestmentPolicy::AboveThreshold(cli.reinvestment_threshold)
        }
    };

    let mut years = cli.years;
    let mut monthly_contribution = cli.monthly_contribution;
    let strategy = match cli.investment_type {
        CliInvestmentType::Compound => Strategy::Compound,
        CliInvestmentType::Fixed => {
            monthly_contribution = 0.0;
            Strategy::Fixed(reinvestment)
        }
        CliInvestmentType::Mixed => {
            let phase2_rate = rate_source(
                cli.rate_mode_phase2,
                cli.annual_interest_rate_phase2,
                cli.cdi_percent_phase2,
                cli.ipca_spread_phase2,
            )
            .effective_rate(&market);
            require_rate(phase2_rate, "--annual-interest-rate-phase2")?;

            // A mixed run needs at least one year on each side of the switch.
            years = years.max(2);
            let switch_year = cli.switch_to_fixed_year.clamp(1, years - 1);
            if switch_year != cli.switch_to_fixed_year || years != cli.years {
                debug!(
                    requested_years = cli.years,
                    requested_switch = cli.switch_to_fixed_year,
                    years,
                    switch_year,
                    "clamped mixed horizon"
                );
            }

            let split = cli.enable_split.then_some(match cli.split_mode {
                CliSplitMode::Amount => SplitPlan::Amount(cli.split_value),
                CliSplitMode::Percentage => SplitPlan::Percentage(cli.split_percentage),
            });

            Strategy::Mixed(MixedPlan {
                switch_year,
                order: cli.mixed_investment_order.into(),
                phase2_rate: Some(phase2_rate),
                reinvestment,
                split,
            })
        }
    };

    Ok(SimulationInput {
        initial_investment: cli.initial_investment,
        monthly_contribution,
        annual_interest_rate,
        years,
        strategy,
    })
}

/// Parses process arguments, runs one simulation and prints the result as JSON.
pub fn run_cli() -> ApiResult<()> {
    let inputs = build_inputs(Cli::parse())?;
    let result = simulate(&inputs);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "simulation HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/indicators", get(indicators_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
}

async fn health_handler() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn indicators_handler() -> Response {
    json_response(StatusCode::OK, MarketIndicators::default())
}

async fn not_found_handler() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        error::ErrorResponse {
            error: "Not found".to_string(),
        },
    )
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let inputs = match api_request_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(err) => {
            warn!(error = %err, "rejected simulation request");
            return err.into_response();
        }
    };

    debug!(
        investment_type = ?inputs.strategy.investment_type(),
        years = inputs.years,
        "running simulation"
    );
    json_response(StatusCode::OK, simulate(&inputs))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> ApiResult<SimulationInput> {
    let payload = serde_json::from_str::<SimulatePayload>(json)?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> ApiResult<SimulationInput> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.initial_investment {
        cli.initial_investment = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.annual_interest_rate {
        cli.annual_interest_rate = v;
    }
    if let Some(v) = payload.annual_interest_rate_phase2 {
        cli.annual_interest_rate_phase2 = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    // Unknown strategy names run as compound.
    cli.investment_type =
        InvestmentType::from_discriminant(payload.investment_type.as_deref()).into();

    if let Some(v) = payload.reinvestment_mode {
        cli.reinvestment_mode = v.into();
    }
    if let Some(v) = payload.reinvestment_value {
        cli.reinvestment_value = v;
    }
    if let Some(v) = payload.reinvestment_percentage {
        cli.reinvestment_percentage = v;
    }
    if let Some(v) = payload.reinvestment_threshold {
        cli.reinvestment_threshold = v;
    }

    if let Some(v) = payload.switch_to_fixed_year {
        cli.switch_to_fixed_year = v;
    }
    if let Some(v) = payload.mixed_investment_order {
        cli.mixed_investment_order = v.into();
    }
    if let Some(v) = payload.enable_split {
        cli.enable_split = v;
    }
    if let Some(v) = payload.split_mode {
        cli.split_mode = v.into();
    }
    if let Some(v) = payload.split_value {
        cli.split_value = v;
    }
    if let Some(v) = payload.split_percentage {
        cli.split_percentage = v;
    }

    if let Some(v) = payload.rate_mode {
        cli.rate_mode = v.into();
    }
    if let Some(v) = payload.rate_mode_phase2 {
        cli.rate_mode_phase2 = v.into();
    }
    if let Some(v) = payload.cdi_percent {
        cli.cdi_percent = v;
    }
    if let Some(v) = payload.ipca_spread {
        cli.ipca_spread = v;
    }
    if let Some(v) = payload.cdi_percent_phase2 {
        cli.cdi_percent_phase2 = v;
    }
    if let Some(v) = payload.ipca_spread_phase2 {
        cli.ipca_spread_phase2 = v;
    }
    if let Some(v) = payload.cdi {
        cli.cdi = v;
    }
    if let Some(v) = payload.ipca {
        cli.ipca = v;
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    let market = MarketIndicators::default();
    Cli {
        initial_investment: 1_000.0,
        monthly_contribution: 200.0,
        annual_interest_rate: 10.0,
        annual_interest_rate_phase2: 6.0,
        years: 20,
        investment_type: CliInvestmentType::Compound,
        reinvestment_mode: CliReinvestmentMode::Amount,
        reinvestment_value: 0.0,
        reinvestment_percentage: 50.0,
        reinvestment_threshold: 0.0,
        switch_to_fixed_year: 10,
        mixed_investment_order: CliMixedOrder::CompoundFirst,
        enable_split: false,
        split_mode: CliSplitMode::Percentage,
        split_value: 10_000.0,
        split_percentage: 80.0,
        rate_mode: CliRateMode::Manual,
        rate_mode_phase2: CliRateMode::Manual,
        cdi_percent: 100.0,
        ipca_spread: 6.0,
        cdi_percent_phase2: 100.0,
        ipca_spread_phase2: 6.0,
        cdi: market.cdi,
        ipca: market.ipca,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SimulationResult;
    use axum::body::to_bytes;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    fn mixed_plan(inputs: &SimulationInput) -> MixedPlan {
        match inputs.strategy {
            Strategy::Mixed(plan) => plan,
            other => panic!("expected mixed strategy, got {other:?}"),
        }
    }

    #[test]
    fn cli_defaults_match_api_defaults() {
        let parsed = Cli::try_parse_from(["invest-sim"]).expect("defaults parse");
        let from_flags = build_inputs(parsed).expect("valid inputs");
        assert_eq!(from_flags, build_inputs(sample_cli()).expect("valid inputs"));
    }

    #[test]
    fn mixed_run_uses_same_phase2_rate_from_flags_and_json() {
        let parsed = Cli::try_parse_from(["invest-sim", "--investment-type", "mixed"])
            .expect("flags parse");
        let from_flags = build_inputs(parsed).expect("valid inputs");
        let from_json =
            api_request_from_json(r#"{ "investmentType": "mixed" }"#).expect("json should parse");

        assert_eq!(mixed_plan(&from_flags).phase2_rate, Some(6.0));
        assert_eq!(from_flags, from_json);
        assert_eq!(simulate(&from_flags), simulate(&from_json));
    }

    #[test]
    fn build_inputs_defaults_to_compound() {
        let inputs = build_inputs(sample_cli()).expect("valid inputs");
        assert_eq!(inputs.strategy, Strategy::Compound);
        assert_eq!(inputs.years, 20);
        assert_approx(inputs.initial_investment, 1_000.0);
        assert_approx(inputs.monthly_contribution, 200.0);
        assert_approx(inputs.annual_interest_rate, 10.0);
    }

    #[test]
    fn build_inputs_zeroes_contribution_for_fixed_income() {
        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Fixed;
        cli.reinvestment_mode = CliReinvestmentMode::AboveThreshold;
        cli.reinvestment_threshold = 75.0;

        let inputs = build_inputs(cli).expect("valid inputs");
        assert_approx(inputs.monthly_contribution, 0.0);
        assert_eq!(
            inputs.strategy,
            Strategy::Fixed(ReinvestmentPolicy::AboveThreshold(75.0))
        );
    }

    #[test]
    fn build_inputs_clamps_mixed_horizon() {
        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Mixed;
        cli.years = 1;
        cli.switch_to_fixed_year = 10;

        let inputs = build_inputs(cli).expect("valid inputs");
        assert_eq!(inputs.years, 2);
        assert_eq!(mixed_plan(&inputs).switch_year, 1);

        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Mixed;
        cli.years = 15;
        cli.switch_to_fixed_year = 0;
        let inputs = build_inputs(cli).expect("valid inputs");
        assert_eq!(inputs.years, 15);
        assert_eq!(mixed_plan(&inputs).switch_year, 1);

        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Mixed;
        cli.years = 15;
        cli.switch_to_fixed_year = 15;
        let inputs = build_inputs(cli).expect("valid inputs");
        assert_eq!(mixed_plan(&inputs).switch_year, 14);
    }

    #[test]
    fn build_inputs_keeps_only_requested_split() {
        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Mixed;
        let inputs = build_inputs(cli).expect("valid inputs");
        assert_eq!(mixed_plan(&inputs).split, None);

        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Mixed;
        cli.enable_split = true;
        cli.split_mode = CliSplitMode::Amount;
        cli.split_value = 2_500.0;
        let inputs = build_inputs(cli).expect("valid inputs");
        assert_eq!(mixed_plan(&inputs).split, Some(SplitPlan::Amount(2_500.0)));
    }

    #[test]
    fn build_inputs_rejects_negative_amounts() {
        let mut cli = sample_cli();
        cli.initial_investment = -1.0;
        let err = build_inputs(cli).expect_err("must reject negative initial investment");
        assert!(err.to_string().contains("--initial-investment"));

        let mut cli = sample_cli();
        cli.split_value = -10.0;
        let err = build_inputs(cli).expect_err("must reject negative split value");
        assert!(err.to_string().contains("--split-value"));
    }

    #[test]
    fn build_inputs_rejects_non_finite_values() {
        let mut cli = sample_cli();
        cli.monthly_contribution = f64::NAN;
        let err = build_inputs(cli).expect_err("must reject NaN");
        assert!(err.to_string().contains("--monthly-contribution"));

        let mut cli = sample_cli();
        cli.annual_interest_rate = f64::INFINITY;
        let err = build_inputs(cli).expect_err("must reject infinite rate");
        assert!(err.to_string().contains("--annual-interest-rate"));
    }

    #[test]
    fn build_inputs_rejects_out_of_range_years_and_percentages() {
        let mut cli = sample_cli();
        cli.years = 0;
        let err = build_inputs(cli).expect_err("must reject zero years");
        assert!(err.to_string().contains("--years"));

        let mut cli = sample_cli();
        cli.years = MAX_YEARS + 1;
        assert!(build_inputs(cli).is_err());

        let mut cli = sample_cli();
        cli.reinvestment_percentage = 120.0;
        let err = build_inputs(cli).expect_err("must reject > 100%");
        assert!(err.to_string().contains("--reinvestment-percentage"));
    }

    #[test]
    fn build_inputs_resolves_market_linked_rates() {
        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Mixed;
        cli.rate_mode = CliRateMode::Cdi;
        cli.cdi_percent = 110.0;
        cli.rate_mode_phase2 = CliRateMode::IpcaPlus;
        cli.ipca_spread_phase2 = 6.0;

        let inputs = build_inputs(cli).expect("valid inputs");
        assert_approx(inputs.annual_interest_rate, 11.72);
        assert_eq!(mixed_plan(&inputs).phase2_rate, Some(10.77));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "initialInvestment": 5000,
          "monthlyContribution": 300,
          "annualInterestRate": 12,
          "annualInterestRatePhase2": 8,
          "years": 12,
          "investmentType": "mixed",
          "reinvestmentMode": "above_threshold",
          "reinvestmentThreshold": 40,
          "switchToFixedYear": 7,
          "mixedInvestmentOrder": "fixed_first",
          "enableSplit": true,
          "splitMode": "amount",
          "splitValue": 1500
        }"#;
        let inputs = api_request_from_json(json).expect("json should parse");

        assert_approx(inputs.initial_investment, 5_000.0);
        assert_approx(inputs.monthly_contribution, 300.0);
        assert_approx(inputs.annual_interest_rate, 12.0);
        assert_eq!(inputs.years, 12);
        assert_eq!(
            mixed_plan(&inputs),
            MixedPlan {
                switch_year: 7,
                order: MixedOrder::FixedFirst,
                phase2_rate: Some(8.0),
                reinvestment: ReinvestmentPolicy::AboveThreshold(40.0),
                split: Some(SplitPlan::Amount(1_500.0)),
            }
        );
    }

    #[test]
    fn api_request_from_json_accepts_kebab_and_camel_aliases() {
        let json = r#"{
          "investmentType": "Fixed",
          "reinvestmentMode": "aboveThreshold",
          "rateMode": "ipca-plus",
          "ipcaFixed": 5
        }"#;
        let inputs = api_request_from_json(json).expect("json should parse");
        assert_eq!(
            inputs.strategy,
            Strategy::Fixed(ReinvestmentPolicy::AboveThreshold(0.0))
        );
        // (1.045 * 1.05 - 1) * 100
        assert_approx(inputs.annual_interest_rate, 9.73);
    }

    #[test]
    fn unknown_investment_type_runs_as_compound() {
        let inputs = api_request_from_json(r#"{ "investmentType": "crypto" }"#)
            .expect("json should parse");
        assert_eq!(inputs.strategy, Strategy::Compound);

        let inputs = api_request_from_json("{}").expect("json should parse");
        assert_eq!(inputs.strategy, Strategy::Compound);
    }

    #[test]
    fn api_request_from_json_rejects_malformed_payload() {
        let err = api_request_from_json(r#"{ "years": "ten" }"#).expect_err("bad type");
        assert!(matches!(err, ApiError::Json(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Mixed;
        cli.years = 4;
        cli.switch_to_fixed_year = 2;
        cli.enable_split = true;
        cli.split_percentage = 50.0;

        let inputs = build_inputs(cli).expect("valid inputs");
        let result = simulate(&inputs);
        assert!(matches!(result, SimulationResult::Mixed(_)));
        let value = serde_json::to_value(&result).expect("serializes");

        assert_eq!(value["investmentType"], "mixed");
        assert_eq!(value["yearlyData"].as_array().map(Vec::len), Some(4));
        assert!(value["yearlyData"][0].get("retainedBalance").is_none());
        assert!(value["yearlyData"][0].get("monthlyIncome").is_none());
        assert!(value["yearlyData"][3]["retainedBalance"].is_number());
        assert!(value["yearlyData"][3]["migratedBalance"].is_number());
        assert!(value["yearlyData"][3]["monthlyIncome"].is_number());
        assert!(value["summary"]["finalBalance"].is_number());
        assert!(value["splitOutcome"]["initialRetainedBalance"].is_number());
        assert_eq!(value["plan"]["order"], "compound_first");
        assert_eq!(value["plan"]["split"]["mode"], "percentage");

        let events = value["eventLog"].as_array().expect("event log");
        let kinds: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
        assert_eq!(kinds, ["start", "switch", "split", "end"]);
        assert_eq!(events[0]["titleKey"], "eventStartTitle");
        assert_eq!(events[0]["descriptionValues"]["type"], "compoundInterest");
        assert_eq!(events[1]["descriptionValues"]["toType"], "fixedIncome");
        assert_eq!(events[2]["descriptionValues"]["migratedPercentage"], 50.0);
    }

    #[test]
    fn fixed_response_serializes_active_reinvestment_only() {
        let mut cli = sample_cli();
        cli.investment_type = CliInvestmentType::Fixed;
        cli.reinvestment_mode = CliReinvestmentMode::Percentage;
        cli.years = 1;

        let value = serde_json::to_value(simulate(&build_inputs(cli).expect("valid inputs")))
            .expect("serializes");
        assert_eq!(value["investmentType"], "fixed");
        assert_eq!(value["reinvestment"]["mode"], "percentage");
        assert_eq!(value["reinvestment"]["value"], 50.0);
        assert!(value["monthlyIncome"].is_number());
        assert!(value.get("eventLog").is_none());
    }

    #[test]
    fn validation_error_maps_to_bad_request_json() {
        let response = ApiError::validation("--years", "must be between 1 and 100").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
    }

    #[tokio::test]
    async fn simulate_get_decodes_query_string() {
        let uri: axum::http::Uri = "/api/simulate?investmentType=mixed&years=4&switchToFixedYear=2\
            &enableSplit=true&splitMode=amount&splitValue=2500"
            .parse()
            .expect("valid uri");
        let query = Query::<SimulatePayload>::try_from_uri(&uri).expect("query decodes");
        assert_eq!(query.enable_split, Some(true));
        assert_eq!(query.split_mode, Some(ApiSplitMode::Amount));

        let response = simulate_get_handler(query).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");

        assert_eq!(value["investmentType"], "mixed");
        assert_eq!(value["plan"]["split"]["mode"], "amount");
        assert_eq!(value["splitOutcome"]["initialMigratedBalance"], 2500.0);
        let events = value["eventLog"].as_array().expect("event log");
        assert_eq!(events[2]["type"], "split");
        assert_eq!(events[2]["descriptionKey"], "eventSplitDescAmount");
    }

    #[tokio::test]
    async fn simulate_handler_returns_result_or_error_json() {
        let payload = SimulatePayload {
            years: Some(3),
            investment_type: Some("fixed".to_string()),
            ..SimulatePayload::default()
        };
        let response = simulate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["investmentType"], "fixed");
        assert_eq!(value["yearlyData"].as_array().map(Vec::len), Some(3));

        let payload = SimulatePayload {
            initial_investment: Some(-5.0),
            ..SimulatePayload::default()
        };
        let response = simulate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert!(
            value["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("--initial-investment"))
        );
    }
}
