//! Turns a matched event into a concrete trade instruction.
//!
//! Posture resolution is a pure function over the event classification and
//! the top match's realized impact; the async engine wraps it with current
//! price, option chain lookups, and strike/expiry calibration.

pub mod calibrate;
pub mod opportunities;

use std::sync::Arc;

use chrono::Utc;
use event_core::{
    ClassifiedEvent, EngineError, EventMatch, MacroSnapshot, MarketDataProvider, OptionType,
    Sentiment, TradeDirection, TradeIdea, TradeType,
};

pub use calibrate::{next_friday, select_expiry, select_strike};
pub use opportunities::{Horizon, Opportunity, OpportunityBook, Priority};

/// Historical downside move (percent magnitude) above which the default
/// option leans PUT.
const PUT_TRIGGER_PCT: f64 = 3.0;

/// Drawdown magnitude below which a bullish event trades as plain equity.
const LOW_DRAWDOWN_PCT: f64 = 2.0;

const DEFAULT_MIN_EXPIRY_DAYS: i64 = 7;
const DEFAULT_MAX_EXPIRY_DAYS: i64 = 30;

/// Instrument, direction, and option leg resolved before any market lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posture {
    pub trade_type: TradeType,
    pub direction: TradeDirection,
    pub option_type: Option<OptionType>,
    pub explanation: String,
}

/// Inputs to posture resolution, separated out so the decision procedure is
/// trivially deterministic and testable without providers.
#[derive(Debug, Clone, Copy)]
pub struct PostureInputs {
    pub sentiment: Sentiment,
    pub price_change_pct: f64,
    /// Magnitude of the top match's drawdown, percent.
    pub max_drawdown_pct: f64,
    pub is_cpi_week: bool,
    pub curve_inverted: bool,
    pub surprise_positive: bool,
    pub recommendation: Option<TradeDirection>,
}

/// Resolve instrument and direction from the event and its top match.
///
/// Defaults to buying an option, PUT when the historical move was a material
/// drop. Bullish events with shallow drawdowns trade as equity BUY; bearish
/// events carrying a macro risk flag trade as equity SELL. An external
/// recommendation is honored on the option path but never overrides the two
/// equity rules.
pub fn resolve_posture(inputs: PostureInputs) -> Posture {
    let option_type =
        if inputs.price_change_pct < 0.0 && inputs.price_change_pct.abs() > PUT_TRIGGER_PCT {
            OptionType::Put
        } else {
            OptionType::Call
        };

    if inputs.sentiment == Sentiment::Bullish && inputs.max_drawdown_pct < LOW_DRAWDOWN_PCT {
        return Posture {
            trade_type: TradeType::Equity,
            direction: TradeDirection::Buy,
            option_type: None,
            explanation: "Using equity (BUY) due to bullish sentiment with low expected drawdown."
                .to_string(),
        };
    }

    if inputs.sentiment == Sentiment::Bearish
        && (inputs.is_cpi_week || inputs.curve_inverted || inputs.surprise_positive)
    {
        let mut risk_factors = Vec::new();
        if inputs.is_cpi_week {
            risk_factors.push("CPI week");
        }
        if inputs.curve_inverted {
            risk_factors.push("inverted yield curve");
        }
        if inputs.surprise_positive {
            risk_factors.push("positive surprise in bearish context");
        }
        return Posture {
            trade_type: TradeType::Equity,
            direction: TradeDirection::Sell,
            option_type: None,
            explanation: format!(
                "Using equity (SELL) due to bearish sentiment with risk factors: {}.",
                risk_factors.join(", ")
            ),
        };
    }

    let direction = inputs.recommendation.unwrap_or(TradeDirection::Buy);
    let mut explanation = match option_type {
        OptionType::Put => "Using PUT option due to expected significant downside move.".to_string(),
        OptionType::Call => "Using CALL option due to expected upside potential.".to_string(),
    };
    if inputs.recommendation == Some(TradeDirection::Sell) {
        explanation.push_str(" Direction follows the external SELL recommendation.");
    }

    Posture {
        trade_type: TradeType::Option,
        direction,
        option_type: Some(option_type),
        explanation,
    }
}

/// Top match by realized move magnitude, match score as tiebreaker.
/// Matches without an analyzed impact rank as zero-magnitude moves.
pub fn top_match(matches: &[EventMatch]) -> Option<&EventMatch> {
    matches.iter().max_by(|a, b| {
        let move_a = a.impact.price_change_pct().map(f64::abs).unwrap_or(0.0);
        let move_b = b.impact.price_change_pct().map(f64::abs).unwrap_or(0.0);
        move_a
            .total_cmp(&move_b)
            .then_with(|| a.match_score.total_cmp(&b.match_score))
    })
}

pub struct DecisionEngine {
    provider: Arc<dyn MarketDataProvider>,
    min_expiry_days: i64,
    max_expiry_days: i64,
}

impl DecisionEngine {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            min_expiry_days: DEFAULT_MIN_EXPIRY_DAYS,
            max_expiry_days: DEFAULT_MAX_EXPIRY_DAYS,
        }
    }

    pub fn with_expiry_window(mut self, min_days: i64, max_days: i64) -> Self {
        self.min_expiry_days = min_days;
        self.max_expiry_days = max_days;
        self
    }

    /// Generate a trade idea for an event and its historical matches.
    ///
    /// Fails closed: when the current price cannot be retrieved the idea is
    /// still returned, with null strike/expiry and a diagnostic rationale.
    pub async fn generate_trade_idea(
        &self,
        event: &ClassifiedEvent,
        matches: &[EventMatch],
        macro_snapshot: Option<&MacroSnapshot>,
    ) -> Result<TradeIdea, EngineError> {
        let top = top_match(matches).ok_or_else(|| {
            EngineError::InsufficientData("no historical matches to base a trade on".to_string())
        })?;

        let ticker = top.template.affected_ticker.clone();
        let price_change_pct = top.impact.price_change_pct().unwrap_or(0.0);
        let drawdown_magnitude = top
            .impact
            .max_drawdown_pct()
            .map(f64::abs)
            .unwrap_or(5.0);

        let snapshot = macro_snapshot.or(event.macro_snapshot.as_ref());
        let posture = resolve_posture(PostureInputs {
            sentiment: event.sentiment,
            price_change_pct,
            max_drawdown_pct: drawdown_magnitude,
            is_cpi_week: event.tags.is_cpi_week,
            curve_inverted: snapshot.map(|s| s.is_curve_inverted()).unwrap_or(false),
            surprise_positive: event.tags.surprise_positive,
            recommendation: event.recommendation.as_ref().and_then(|r| r.direction()),
        });

        let current_price = match self.provider.current_price(&ticker).await {
            Ok(price) if price > 0.0 => price,
            Ok(_) | Err(_) => {
                log::warn!("no current price for {ticker}, emitting idea without strike/expiry");
                return Ok(TradeIdea {
                    ticker: ticker.clone(),
                    trade_type: posture.trade_type,
                    direction: posture.direction,
                    option_type: posture.option_type,
                    strike: None,
                    expiry: None,
                    rationale: format!("Could not fetch current price for {ticker}."),
                });
            }
        };

        let (strike, expiry) = if posture.trade_type == TradeType::Option {
            let option_type = posture.option_type.unwrap_or(OptionType::Call);
            let expiries = match self.provider.list_expiries(&ticker).await {
                Ok(expiries) => expiries,
                Err(e) => {
                    log::warn!("option chain lookup failed for {ticker}: {e}");
                    Vec::new()
                }
            };
            let today = Utc::now().date_naive();
            (
                Some(select_strike(current_price, option_type, price_change_pct)),
                Some(select_expiry(
                    today,
                    &expiries,
                    self.min_expiry_days,
                    self.max_expiry_days,
                )),
            )
        } else {
            (None, None)
        };

        Ok(TradeIdea {
            ticker: ticker.clone(),
            trade_type: posture.trade_type,
            direction: posture.direction,
            option_type: posture.option_type,
            strike,
            expiry,
            rationale: build_rationale(event, top, &ticker, price_change_pct, &posture),
        })
    }
}

fn build_rationale(
    event: &ClassifiedEvent,
    top: &EventMatch,
    ticker: &str,
    price_change_pct: f64,
    posture: &Posture,
) -> String {
    let direction_word = if price_change_pct < 0.0 { "drop" } else { "gain" };
    let prediction = match posture.option_type {
        Some(OptionType::Put) => "downside risk",
        _ if posture.direction == TradeDirection::Sell => "downside risk",
        _ => "upside potential",
    };

    format!(
        "Event similar to {} on {}, which caused a {:.2}% {} in {}. Match score: {:.2}. \
         Current event classified as {}, {}, affecting {}. Suggests {}. {}",
        top.template.event_summary,
        top.template.event_date,
        price_change_pct.abs(),
        direction_word,
        ticker,
        top.match_score,
        event.event_type,
        event.sentiment.name(),
        event.sector,
        prediction,
        posture.explanation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use event_core::{
        Bar, EventTags, HistoricalTemplate, ImpactStatus, MarketImpact, PriceSummary,
    };
    use std::collections::BTreeMap;

    struct FixedMarket {
        price: Option<f64>,
        expiries: Vec<NaiveDate>,
    }

    #[async_trait]
    impl MarketDataProvider for FixedMarket {
        async fn fetch_series(
            &self,
            _ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, EngineError> {
            Ok(Vec::new())
        }

        async fn current_price(&self, ticker: &str) -> Result<f64, EngineError> {
            self.price
                .ok_or_else(|| EngineError::NoData(format!("no price for {ticker}")))
        }

        async fn list_expiries(&self, _ticker: &str) -> Result<Vec<NaiveDate>, EngineError> {
            Ok(self.expiries.clone())
        }
    }

    fn event(sentiment: Sentiment, tags: EventTags) -> ClassifiedEvent {
        ClassifiedEvent {
            headline: "Surprise guidance update".to_string(),
            event_type: "earnings".to_string(),
            sentiment,
            sector: "Technology".to_string(),
            tags,
            macro_snapshot: None,
            recommendation: None,
        }
    }

    fn matched(ticker: &str, change: f64, drawdown: f64, score: f64) -> EventMatch {
        EventMatch {
            template: HistoricalTemplate {
                event_summary: "Guidance cut".to_string(),
                event_date: NaiveDate::from_ymd_opt(2022, 6, 15).unwrap(),
                affected_ticker: ticker.to_string(),
                event_type: "earnings".to_string(),
                sentiment: Sentiment::Bearish,
                sector: "Technology".to_string(),
            },
            match_score: score,
            impact: ImpactStatus::Analyzed(MarketImpact {
                price_change_pct: change,
                max_drawdown_pct: drawdown,
                date_range: (
                    NaiveDate::from_ymd_opt(2022, 6, 15).unwrap(),
                    NaiveDate::from_ymd_opt(2022, 6, 22).unwrap(),
                ),
                price_data: PriceSummary {
                    start_price: 100.0,
                    end_price: 100.0 + change,
                    highest_price: 105.0,
                    lowest_price: 95.0,
                    trading_days: 7,
                },
            }),
        }
    }

    fn inverted_snapshot() -> MacroSnapshot {
        let mut values = BTreeMap::new();
        values.insert("TenYearYield".to_string(), 4.0);
        values.insert("TwoYearYield".to_string(), 4.8);
        MacroSnapshot {
            values,
            as_of: None,
            fetched_at: Utc::now(),
            sources: BTreeMap::new(),
            live_percentage: 100.0,
        }
    }

    fn base_inputs() -> PostureInputs {
        PostureInputs {
            sentiment: Sentiment::Neutral,
            price_change_pct: 2.0,
            max_drawdown_pct: 4.0,
            is_cpi_week: false,
            curve_inverted: false,
            surprise_positive: false,
            recommendation: None,
        }
    }

    #[test]
    fn posture_is_deterministic() {
        let inputs = PostureInputs {
            sentiment: Sentiment::Bearish,
            price_change_pct: -4.0,
            max_drawdown_pct: 6.0,
            is_cpi_week: true,
            curve_inverted: false,
            surprise_positive: false,
            recommendation: None,
        };
        assert_eq!(resolve_posture(inputs), resolve_posture(inputs));
    }

    #[test]
    fn bullish_low_drawdown_trades_equity_buy() {
        let posture = resolve_posture(PostureInputs {
            sentiment: Sentiment::Bullish,
            max_drawdown_pct: 1.0,
            ..base_inputs()
        });
        assert_eq!(posture.trade_type, TradeType::Equity);
        assert_eq!(posture.direction, TradeDirection::Buy);
        assert_eq!(posture.option_type, None);
    }

    #[test]
    fn bearish_cpi_week_trades_equity_sell() {
        let posture = resolve_posture(PostureInputs {
            sentiment: Sentiment::Bearish,
            price_change_pct: -4.0,
            is_cpi_week: true,
            ..base_inputs()
        });
        assert_eq!(posture.trade_type, TradeType::Equity);
        assert_eq!(posture.direction, TradeDirection::Sell);
        assert!(posture.explanation.contains("CPI week"));
    }

    #[test]
    fn deep_drop_defaults_to_put() {
        let posture = resolve_posture(PostureInputs {
            price_change_pct: -4.0,
            ..base_inputs()
        });
        assert_eq!(posture.trade_type, TradeType::Option);
        assert_eq!(posture.option_type, Some(OptionType::Put));
        assert_eq!(posture.direction, TradeDirection::Buy);
    }

    #[test]
    fn shallow_drop_stays_call() {
        let posture = resolve_posture(PostureInputs {
            price_change_pct: -2.0,
            ..base_inputs()
        });
        assert_eq!(posture.option_type, Some(OptionType::Call));
    }

    #[test]
    fn external_sell_honored_on_option_path() {
        let posture = resolve_posture(PostureInputs {
            recommendation: Some(TradeDirection::Sell),
            ..base_inputs()
        });
        assert_eq!(posture.trade_type, TradeType::Option);
        assert_eq!(posture.direction, TradeDirection::Sell);
    }

    #[test]
    fn external_sell_does_not_override_bullish_equity_rule() {
        let posture = resolve_posture(PostureInputs {
            sentiment: Sentiment::Bullish,
            max_drawdown_pct: 1.0,
            recommendation: Some(TradeDirection::Sell),
            ..base_inputs()
        });
        assert_eq!(posture.trade_type, TradeType::Equity);
        assert_eq!(posture.direction, TradeDirection::Buy);
    }

    #[test]
    fn top_match_prefers_larger_move_then_score() {
        let matches = vec![
            matched("A", -2.0, -3.0, 0.9),
            matched("B", -6.0, -7.0, 0.5),
            matched("C", 6.0, -1.0, 0.8),
        ];
        // C and B tie on magnitude, C wins on score.
        assert_eq!(top_match(&matches).unwrap().template.affected_ticker, "C");
    }

    #[tokio::test]
    async fn bullish_event_emits_equity_buy_idea() {
        let engine = DecisionEngine::new(Arc::new(FixedMarket {
            price: Some(150.0),
            expiries: Vec::new(),
        }));
        let idea = engine
            .generate_trade_idea(
                &event(Sentiment::Bullish, EventTags::default()),
                &[matched("AAPL", 2.0, -1.0, 0.8)],
                None,
            )
            .await
            .unwrap();

        assert_eq!(idea.trade_type, TradeType::Equity);
        assert_eq!(idea.direction, TradeDirection::Buy);
        assert_eq!(idea.strike, None);
        assert_eq!(idea.expiry, None);
        assert!(idea.rationale.contains("Guidance cut"));
    }

    #[tokio::test]
    async fn inverted_curve_triggers_bearish_equity_sell() {
        let engine = DecisionEngine::new(Arc::new(FixedMarket {
            price: Some(150.0),
            expiries: Vec::new(),
        }));
        let idea = engine
            .generate_trade_idea(
                &event(Sentiment::Bearish, EventTags::default()),
                &[matched("AAPL", -4.0, -6.0, 0.8)],
                Some(&inverted_snapshot()),
            )
            .await
            .unwrap();

        assert_eq!(idea.trade_type, TradeType::Equity);
        assert_eq!(idea.direction, TradeDirection::Sell);
        assert!(idea.rationale.contains("inverted yield curve"));
    }

    #[tokio::test]
    async fn option_idea_carries_strike_and_expiry() {
        let expiry = Utc::now().date_naive() + chrono::Duration::days(14);
        let engine = DecisionEngine::new(Arc::new(FixedMarket {
            price: Some(200.0),
            expiries: vec![expiry],
        }));
        let idea = engine
            .generate_trade_idea(
                &event(Sentiment::Neutral, EventTags::default()),
                &[matched("MSFT", -4.0, -6.0, 0.8)],
                None,
            )
            .await
            .unwrap();

        assert_eq!(idea.trade_type, TradeType::Option);
        assert_eq!(idea.option_type, Some(OptionType::Put));
        // 1.2% below 200, rounded to a whole dollar.
        assert_eq!(idea.strike, Some(198.0));
        assert_eq!(idea.expiry, Some(expiry));
    }

    #[tokio::test]
    async fn missing_price_fails_closed() {
        let engine = DecisionEngine::new(Arc::new(FixedMarket {
            price: None,
            expiries: Vec::new(),
        }));
        let idea = engine
            .generate_trade_idea(
                &event(Sentiment::Neutral, EventTags::default()),
                &[matched("MSFT", -4.0, -6.0, 0.8)],
                None,
            )
            .await
            .unwrap();

        assert_eq!(idea.strike, None);
        assert_eq!(idea.expiry, None);
        assert_eq!(idea.option_type, Some(OptionType::Put));
        assert!(idea.rationale.contains("Could not fetch current price"));
    }

    #[tokio::test]
    async fn no_matches_is_an_error() {
        let engine = DecisionEngine::new(Arc::new(FixedMarket {
            price: Some(100.0),
            expiries: Vec::new(),
        }));
        let result = engine
            .generate_trade_idea(&event(Sentiment::Neutral, EventTags::default()), &[], None)
            .await;
        assert!(matches!(result, Err(EngineError::InsufficientData(_))));
    }
}
