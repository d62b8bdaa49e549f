//! Deep-analysis engine and orchestrator.
//!
//! Six independent analyzers (keyword, PPC, inventory, demand, competitor,
//! financial) each consume a minimal projection of product facts and return
//! a structured result. Analyzers are infallible by contract; when a signal
//! is unavailable they degrade to conservative defaults instead of failing
//! the bundle. Results are cached per item in dedicated long-TTL caches so
//! repeated requests cost nothing, and cached products are never mutated to
//! attach them.

use crate::research::cache::FacetCache;
use crate::research::scoring::ScoreModel;
use crate::research::types::{EnrichedProduct, Level, OpportunityFactors};
use crate::types::Asin;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Minimal projection of product facts consumed by every analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFacts {
    pub asin: Asin,
    pub title: String,
    pub category: String,
    pub price: f64,
    pub estimated_monthly_sales: u32,
}

impl ProductFacts {
    /// Project an enriched product, falling back to conservative defaults
    /// where facets are absent.
    pub fn from_product(product: &EnrichedProduct) -> Self {
        Self {
            asin: product.asin.clone(),
            title: product.catalog.title.clone(),
            category: product.catalog.category.clone(),
            price: product.price(),
            estimated_monthly_sales: product
                .rank
                .as_ref()
                .map_or(50, |r| r.estimated_monthly_sales),
        }
    }
}

/// One keyword with its traffic and cost estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordMetrics {
    pub keyword: String,
    pub search_volume: u32,
    pub cpc: f64,
    pub difficulty: u8,
}

/// Keyword landscape around a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    pub primary: Vec<KeywordMetrics>,
    pub long_tail: Vec<KeywordMetrics>,
    pub avg_cpc: f64,
    pub competition: Level,
}

/// Suggested bid interval for one match type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BidRange {
    pub min: f64,
    pub max: f64,
}

/// One phase of a paid-launch plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchPhase {
    pub name: String,
    pub duration_weeks: u8,
    pub budget: f64,
}

/// Paid advertising strategy for a launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpcPlan {
    pub estimated_launch_cost: f64,
    pub break_even_acos: f64,
    pub expected_acos: f64,
    pub exact_bid: BidRange,
    pub phrase_bid: BidRange,
    pub broad_bid: BidRange,
    pub phases: Vec<LaunchPhase>,
}

/// Landed cost components per unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub unit_cost: f64,
    pub shipping: f64,
    pub duties: f64,
    pub fba_fees: f64,
    pub total: f64,
}

/// Risk levels across sourcing dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub supplier: Level,
    pub demand: Level,
    pub seasonality: Level,
    pub overall: Level,
}

/// Sourcing and stocking recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAnalysis {
    pub optimal_order_quantity: u32,
    pub supplier_moq: u32,
    pub lead_time_days: u32,
    pub costs: CostBreakdown,
    pub risk: RiskAssessment,
    pub cash_requirement: f64,
}

/// Addressable market sizing, in USD.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketSize {
    pub tam: f64,
    pub sam: f64,
    pub som: f64,
}

/// Year-over-year growth observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct YearGrowth {
    pub year: u16,
    pub growth: f64,
}

/// Demand growth trend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthTrend {
    pub cagr: f64,
    pub yearly: Vec<YearGrowth>,
}

/// Relative demand for one calendar month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonthlyDemand {
    /// Calendar month, 1 through 12.
    pub month: u8,
    /// Demand index where 100 is the yearly average.
    pub demand_index: f64,
}

/// Market demand picture for a category and price point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandAnalysis {
    pub market_size: MarketSize,
    pub growth: GrowthTrend,
    pub seasonality: Vec<MonthlyDemand>,
    pub drivers: Vec<String>,
}

/// One competing listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    pub price: f64,
    pub rating: f64,
    pub review_count: u32,
    pub market_share_pct: f64,
}

/// Competitive landscape around a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub top_competitors: Vec<Competitor>,
    pub average_price: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub threat_level: Level,
    pub recommended_price: f64,
}

/// Margin structure, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Margins {
    pub gross: f64,
    pub net: f64,
    pub contribution: f64,
}

/// Marketplace fulfillment fees per unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FbaFees {
    pub referral: f64,
    pub fulfillment: f64,
    pub storage: f64,
    pub total: f64,
}

/// Unit economics and return projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialModel {
    pub monthly_revenue: f64,
    pub monthly_profit: f64,
    pub break_even_units: u32,
    /// Months until the initial investment is recovered; `None` when the
    /// product is not profitable at current estimates.
    pub payback_months: Option<f64>,
    pub roi_pct: f64,
    pub margins: Margins,
    pub fba_fees: FbaFees,
    pub initial_investment: f64,
}

/// Aggregate of all six analyzer outputs plus the overall score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepAnalysis {
    pub opportunity_score: u8,
    pub keywords: KeywordAnalysis,
    pub ppc: PpcPlan,
    pub inventory: InventoryAnalysis,
    pub demand: DemandAnalysis,
    pub competitors: CompetitorAnalysis,
    pub financial: FinancialModel,
}

/// Analyzer collaborators behind one seam.
///
/// Implementations must not fail; when a signal is missing they return a
/// conservative default instead.
#[async_trait]
pub trait DeepResearchEngine: Send + Sync {
    async fn keywords(&self, facts: &ProductFacts) -> KeywordAnalysis;
    async fn ppc_plan(&self, facts: &ProductFacts) -> PpcPlan;
    async fn inventory(&self, facts: &ProductFacts) -> InventoryAnalysis;
    async fn demand(&self, facts: &ProductFacts) -> DemandAnalysis;
    async fn competitors(&self, facts: &ProductFacts) -> CompetitorAnalysis;
    async fn financials(&self, facts: &ProductFacts) -> FinancialModel;
}

/// Default engine deriving every analysis from category tables and price
/// arithmetic. Deterministic for a given input.
#[derive(Debug, Default)]
pub struct HeuristicResearch;

impl HeuristicResearch {
    pub fn new() -> Self {
        Self
    }

    fn title_keywords(title: &str) -> Vec<String> {
        title
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| w.len() > 3)
            .take(5)
            .map(str::to_string)
            .collect()
    }

    fn competitor_count(category: &str) -> u32 {
        match category {
            "Electronics" => 150,
            "Kitchen" => 200,
            "Sports" => 180,
            "Home" => 220,
            "Beauty" => 300,
            _ => 100,
        }
    }

    fn competition_level(category: &str) -> Level {
        let count = Self::competitor_count(category);
        if count >= 250 {
            Level::High
        } else if count >= 150 {
            Level::Medium
        } else {
            Level::Low
        }
    }

    fn category_growth_rate(category: &str) -> f64 {
        match category {
            "Electronics" => 8.0,
            "Kitchen" => 12.0,
            "Sports" => 15.0,
            "Home" => 10.0,
            "Beauty" => 18.0,
            _ => 10.0,
        }
    }

    fn category_tam(category: &str) -> f64 {
        match category {
            "Electronics" => 200e9,
            "Kitchen" => 80e9,
            "Sports" => 60e9,
            "Home" => 120e9,
            "Beauty" => 90e9,
            _ => 50e9,
        }
    }

    fn peak_months(category: &str) -> &'static [u8] {
        match category {
            "Electronics" | "Beauty" => &[11, 12],
            "Kitchen" => &[1, 11, 12],
            "Sports" => &[1, 2, 3],
            "Home" => &[5, 6, 11],
            _ => &[11, 12],
        }
    }

    fn seasonality_level(category: &str) -> Level {
        match category {
            "Kitchen" | "Sports" => Level::Medium,
            "Electronics" => Level::High,
            _ => Level::Low,
        }
    }

    fn category_drivers(category: &str) -> Vec<String> {
        let drivers: &[&str] = match category {
            "Electronics" => &["Smart home integration", "Wireless technology"],
            "Kitchen" => &["Meal prep tools", "Eco-friendly materials"],
            "Sports" => &["Home fitness", "Wellness focus"],
            "Home" => &["Smart home", "Minimalism"],
            "Beauty" => &["Clean beauty", "Personalization"],
            _ => &["General market growth"],
        };
        drivers.iter().map(|d| d.to_string()).collect()
    }

    fn overall_risk(risks: [Level; 3]) -> Level {
        if risks.contains(&Level::High) {
            Level::High
        } else if risks.iter().filter(|r| **r == Level::Medium).count() >= 2 {
            Level::Medium
        } else {
            Level::Low
        }
    }
}

#[async_trait]
impl DeepResearchEngine for HeuristicResearch {
    async fn keywords(&self, facts: &ProductFacts) -> KeywordAnalysis {
        let words = Self::title_keywords(&facts.title);
        let base_volume = facts.estimated_monthly_sales.max(10) * 120;
        let base_cpc = (facts.price * 0.03 + 0.5).min(4.0);
        let difficulty = (Self::competitor_count(&facts.category) / 3).min(95) as u8;

        let primary: Vec<KeywordMetrics> = words
            .iter()
            .enumerate()
            .map(|(i, keyword)| KeywordMetrics {
                keyword: keyword.clone(),
                search_volume: base_volume / (i as u32 + 1),
                cpc: base_cpc * (1.0 - i as f64 * 0.1),
                difficulty,
            })
            .collect();

        let long_tail: Vec<KeywordMetrics> = words
            .iter()
            .take(3)
            .map(|keyword| KeywordMetrics {
                keyword: format!("best {} for beginners", keyword),
                search_volume: base_volume / 10,
                cpc: base_cpc * 0.6,
                difficulty: difficulty.saturating_sub(30),
            })
            .collect();

        let avg_cpc = if primary.is_empty() {
            base_cpc
        } else {
            primary.iter().map(|k| k.cpc).sum::<f64>() / primary.len() as f64
        };

        KeywordAnalysis {
            primary,
            long_tail,
            avg_cpc,
            competition: Self::competition_level(&facts.category),
        }
    }

    async fn ppc_plan(&self, facts: &ProductFacts) -> PpcPlan {
        let break_even_acos = 30.0;
        let price_factor = (facts.price / 50.0).clamp(0.5, 2.0);

        PpcPlan {
            estimated_launch_cost: facts.price * 20.0 + 1_500.0,
            break_even_acos,
            expected_acos: break_even_acos + 10.0,
            exact_bid: BidRange {
                min: 0.75 * price_factor,
                max: 1.50 * price_factor,
            },
            phrase_bid: BidRange {
                min: 0.50 * price_factor,
                max: 1.25 * price_factor,
            },
            broad_bid: BidRange {
                min: 0.25 * price_factor,
                max: 0.75 * price_factor,
            },
            phases: vec![
                LaunchPhase {
                    name: "Research & Setup".to_string(),
                    duration_weeks: 2,
                    budget: 500.0,
                },
                LaunchPhase {
                    name: "Launch & Optimize".to_string(),
                    duration_weeks: 4,
                    budget: 1_500.0,
                },
                LaunchPhase {
                    name: "Scale & Expand".to_string(),
                    duration_weeks: 6,
                    budget: 3_000.0,
                },
            ],
        }
    }

    async fn inventory(&self, facts: &ProductFacts) -> InventoryAnalysis {
        let unit_cost = facts.price * 0.3;
        let optimal_order_quantity = (facts.estimated_monthly_sales * 2).clamp(100, 1_000);
        let shipping = unit_cost * 0.1;
        let duties = unit_cost * 0.05;
        let fba_fees = facts.price * 0.15;

        let demand_risk = if facts.estimated_monthly_sales > 500 {
            Level::Low
        } else if facts.estimated_monthly_sales > 100 {
            Level::Medium
        } else {
            Level::High
        };
        let seasonality = Self::seasonality_level(&facts.category);
        let supplier = Level::Medium;

        InventoryAnalysis {
            optimal_order_quantity,
            supplier_moq: optimal_order_quantity * 8 / 10,
            lead_time_days: 40,
            costs: CostBreakdown {
                unit_cost,
                shipping,
                duties,
                fba_fees,
                total: unit_cost + shipping + duties + fba_fees,
            },
            risk: RiskAssessment {
                supplier,
                demand: demand_risk,
                seasonality,
                overall: Self::overall_risk([supplier, demand_risk, seasonality]),
            },
            cash_requirement: optimal_order_quantity as f64 * unit_cost,
        }
    }

    async fn demand(&self, facts: &ProductFacts) -> DemandAnalysis {
        let rate = Self::category_growth_rate(&facts.category);
        let tam = Self::category_tam(&facts.category);
        let peaks = Self::peak_months(&facts.category);

        DemandAnalysis {
            market_size: MarketSize {
                tam,
                sam: tam * 0.1,
                som: tam * 0.01 * 0.1,
            },
            growth: GrowthTrend {
                cagr: rate + 2.0,
                yearly: vec![
                    YearGrowth {
                        year: 2023,
                        growth: rate - 2.0,
                    },
                    YearGrowth {
                        year: 2024,
                        growth: rate,
                    },
                    YearGrowth {
                        year: 2025,
                        growth: rate + 2.0,
                    },
                ],
            },
            seasonality: (1..=12)
                .map(|month| {
                    let base = if peaks.contains(&month) { 115.0 } else { 95.0 };
                    MonthlyDemand {
                        month,
                        demand_index: base + month as f64 * 0.5,
                    }
                })
                .collect(),
            drivers: Self::category_drivers(&facts.category),
        }
    }

    async fn competitors(&self, facts: &ProductFacts) -> CompetitorAnalysis {
        let price = facts.price.max(1.0);
        let top_competitors = vec![
            Competitor {
                name: "Market Leader".to_string(),
                price: price * 1.1,
                rating: 4.3,
                review_count: 1_250,
                market_share_pct: 25.0,
            },
            Competitor {
                name: "Value Brand".to_string(),
                price: price * 0.85,
                rating: 4.0,
                review_count: 800,
                market_share_pct: 18.0,
            },
            Competitor {
                name: "Challenger".to_string(),
                price: price * 0.95,
                rating: 3.9,
                review_count: 240,
                market_share_pct: 12.0,
            },
        ];
        let average_price =
            top_competitors.iter().map(|c| c.price).sum::<f64>() / top_competitors.len() as f64;

        CompetitorAnalysis {
            top_competitors,
            average_price,
            price_min: price * 0.7,
            price_max: price * 1.5,
            threat_level: Self::competition_level(&facts.category),
            recommended_price: price * 0.95,
        }
    }

    async fn financials(&self, facts: &ProductFacts) -> FinancialModel {
        let price = facts.price.max(0.01);
        let sales = facts.estimated_monthly_sales as f64;
        let unit_cost = price * 0.3;

        let referral = price * 0.15;
        let fulfillment = 3.5;
        let storage = 0.3;
        let fba_total = referral + fulfillment + storage;

        let monthly_revenue = price * sales;
        let profit_per_unit = price - unit_cost - fba_total;
        let monthly_profit = profit_per_unit * sales;

        let initial_investment = 10_000.0;
        let fixed_costs = 2_000.0;

        let payback_months = (monthly_profit > 0.0).then(|| initial_investment / monthly_profit);
        let break_even_units = if profit_per_unit > 0.0 {
            (fixed_costs / profit_per_unit).ceil() as u32
        } else {
            0
        };

        FinancialModel {
            monthly_revenue,
            monthly_profit,
            break_even_units,
            payback_months,
            roi_pct: (monthly_profit * 12.0 - initial_investment) / initial_investment * 100.0,
            margins: Margins {
                gross: (price - unit_cost) / price * 100.0,
                net: if monthly_revenue > 0.0 {
                    monthly_profit / monthly_revenue * 100.0
                } else {
                    0.0
                },
                contribution: profit_per_unit / price * 100.0,
            },
            fba_fees: FbaFees {
                referral,
                fulfillment,
                storage,
                total: fba_total,
            },
            initial_investment,
        }
    }
}

/// Fans out to the six analyzers and caches every result per item.
pub struct AnalysisOrchestrator {
    engine: Arc<dyn DeepResearchEngine>,
    score_model: Arc<dyn ScoreModel>,
    ttl: Duration,
    keywords: FacetCache<Arc<KeywordAnalysis>>,
    ppc: FacetCache<Arc<PpcPlan>>,
    inventory: FacetCache<Arc<InventoryAnalysis>>,
    demand: FacetCache<Arc<DemandAnalysis>>,
    competitors: FacetCache<Arc<CompetitorAnalysis>>,
    financials: FacetCache<Arc<FinancialModel>>,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator caching up to `max_entries` results per
    /// analyzer for `ttl`.
    pub fn new(
        engine: Arc<dyn DeepResearchEngine>,
        score_model: Arc<dyn ScoreModel>,
        max_entries: u64,
        ttl: Duration,
    ) -> Self {
        Self {
            engine,
            score_model,
            ttl,
            keywords: FacetCache::new(max_entries, ttl),
            ppc: FacetCache::new(max_entries, ttl),
            inventory: FacetCache::new(max_entries, ttl),
            demand: FacetCache::new(max_entries, ttl),
            competitors: FacetCache::new(max_entries, ttl),
            financials: FacetCache::new(max_entries, ttl),
        }
    }

    pub async fn keyword_analysis(&self, facts: &ProductFacts) -> Arc<KeywordAnalysis> {
        self.keywords
            .get_or_compute(facts.asin.as_str(), self.ttl, async {
                Arc::new(self.engine.keywords(facts).await)
            })
            .await
    }

    pub async fn ppc_plan(&self, facts: &ProductFacts) -> Arc<PpcPlan> {
        self.ppc
            .get_or_compute(facts.asin.as_str(), self.ttl, async {
                Arc::new(self.engine.ppc_plan(facts).await)
            })
            .await
    }

    pub async fn inventory_analysis(&self, facts: &ProductFacts) -> Arc<InventoryAnalysis> {
        self.inventory
            .get_or_compute(facts.asin.as_str(), self.ttl, async {
                Arc::new(self.engine.inventory(facts).await)
            })
            .await
    }

    pub async fn demand_analysis(&self, facts: &ProductFacts) -> Arc<DemandAnalysis> {
        self.demand
            .get_or_compute(facts.asin.as_str(), self.ttl, async {
                Arc::new(self.engine.demand(facts).await)
            })
            .await
    }

    pub async fn competitor_analysis(&self, facts: &ProductFacts) -> Arc<CompetitorAnalysis> {
        self.competitors
            .get_or_compute(facts.asin.as_str(), self.ttl, async {
                Arc::new(self.engine.competitors(facts).await)
            })
            .await
    }

    pub async fn financial_model(&self, facts: &ProductFacts) -> Arc<FinancialModel> {
        self.financials
            .get_or_compute(facts.asin.as_str(), self.ttl, async {
                Arc::new(self.engine.financials(facts).await)
            })
            .await
    }

    /// Run all six analyzers concurrently and combine the overall
    /// opportunity score.
    #[instrument(skip(self, facts), fields(asin = %facts.asin))]
    pub async fn full_bundle(&self, facts: &ProductFacts) -> DeepAnalysis {
        let (keywords, ppc, inventory, demand, competitors, financial) = tokio::join!(
            self.keyword_analysis(facts),
            self.ppc_plan(facts),
            self.inventory_analysis(facts),
            self.demand_analysis(facts),
            self.competitor_analysis(facts),
            self.financial_model(facts),
        );

        let factors = OpportunityFactors {
            demand_growth_rate: demand.growth.cagr,
            competition: competitors.threat_level,
            market_size: demand.market_size.som,
            profit_margin: financial.margins.gross,
            risk: inventory.risk.overall,
        };
        let opportunity_score = self.score_model.opportunity_score(&factors);
        debug!(opportunity_score, "combined deep analysis");

        DeepAnalysis {
            opportunity_score,
            keywords: (*keywords).clone(),
            ppc: (*ppc).clone(),
            inventory: (*inventory).clone(),
            demand: (*demand).clone(),
            competitors: (*competitors).clone(),
            financial: (*financial).clone(),
        }
    }

    /// Drop every cached analysis.
    pub fn clear(&self) {
        self.keywords.clear();
        self.ppc.clear();
        self.inventory.clear();
        self.demand.clear();
        self.competitors.clear();
        self.financials.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::scoring::DefaultScoreModel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn facts() -> ProductFacts {
        ProductFacts {
            asin: Asin::new("B08XYZQ1W2"),
            title: "Stainless Steel Widget Organizer".to_string(),
            category: "Kitchen".to_string(),
            price: 39.99,
            estimated_monthly_sales: 400,
        }
    }

    /// Engine wrapper counting how many analyzer invocations reach it.
    struct CountingEngine {
        inner: HeuristicResearch,
        calls: AtomicUsize,
    }

    impl CountingEngine {
        fn new() -> Self {
            Self {
                inner: HeuristicResearch::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DeepResearchEngine for CountingEngine {
        async fn keywords(&self, facts: &ProductFacts) -> KeywordAnalysis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.keywords(facts).await
        }
        async fn ppc_plan(&self, facts: &ProductFacts) -> PpcPlan {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.ppc_plan(facts).await
        }
        async fn inventory(&self, facts: &ProductFacts) -> InventoryAnalysis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.inventory(facts).await
        }
        async fn demand(&self, facts: &ProductFacts) -> DemandAnalysis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.demand(facts).await
        }
        async fn competitors(&self, facts: &ProductFacts) -> CompetitorAnalysis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.competitors(facts).await
        }
        async fn financials(&self, facts: &ProductFacts) -> FinancialModel {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.financials(facts).await
        }
    }

    fn orchestrator(engine: Arc<CountingEngine>) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(
            engine,
            Arc::new(DefaultScoreModel::default()),
            1_000,
            Duration::from_secs(3_600),
        )
    }

    #[tokio::test]
    async fn test_heuristic_engine_is_deterministic() {
        let engine = HeuristicResearch::new();
        let facts = facts();

        let first = engine.demand(&facts).await;
        let second = engine.demand(&facts).await;
        assert_eq!(first.growth.cagr, second.growth.cagr);
        assert_eq!(first.market_size.som, second.market_size.som);
        assert_eq!(first.seasonality.len(), 12);
    }

    #[tokio::test]
    async fn test_keywords_come_from_title() {
        let engine = HeuristicResearch::new();
        let analysis = engine.keywords(&facts()).await;

        assert!(!analysis.primary.is_empty());
        assert!(analysis
            .primary
            .iter()
            .any(|k| k.keyword == "stainless" || k.keyword == "widget"));
        assert!(analysis.avg_cpc > 0.0);
    }

    #[tokio::test]
    async fn test_unprofitable_product_has_no_payback() {
        let engine = HeuristicResearch::new();
        let mut cheap = facts();
        cheap.price = 4.0;

        let model = engine.financials(&cheap).await;
        assert!(model.monthly_profit < 0.0);
        assert_eq!(model.payback_months, None);
        assert_eq!(model.break_even_units, 0);
    }

    #[tokio::test]
    async fn test_full_bundle_score_in_bounds() {
        let engine = Arc::new(CountingEngine::new());
        let orchestrator = orchestrator(engine);

        let bundle = orchestrator.full_bundle(&facts()).await;
        assert!((1..=10).contains(&bundle.opportunity_score));
        assert_eq!(bundle.demand.seasonality.len(), 12);
        assert_eq!(bundle.competitors.top_competitors.len(), 3);
    }

    #[tokio::test]
    async fn test_repeated_bundles_hit_the_cache() {
        let engine = Arc::new(CountingEngine::new());
        let orchestrator = orchestrator(engine.clone());
        let facts = facts();

        orchestrator.full_bundle(&facts).await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 6);

        orchestrator.full_bundle(&facts).await;
        // All six analyses cached, nothing reached the engine again.
        assert_eq!(engine.calls.load(Ordering::SeqCst), 6);

        orchestrator.clear();
        orchestrator.full_bundle(&facts).await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_facts_projection_uses_fallbacks() {
        use crate::research::types::{CatalogItem, ScoreBundle};
        use chrono::Utc;

        let product = EnrichedProduct {
            asin: Asin::new("B08XYZQ1W2"),
            catalog: CatalogItem {
                asin: Asin::new("B08XYZQ1W2"),
                title: "Widget".to_string(),
                brand: "W".to_string(),
                category: "Kitchen".to_string(),
                subcategory: None,
                image_urls: vec![],
                features: vec![],
                attributes: serde_json::Map::new(),
                sales_rank: None,
            },
            pricing: None,
            rank: None,
            reviews: None,
            scores: ScoreBundle {
                opportunity: 5,
                demand: 5,
                competition: 5,
                feasibility: 5,
            },
            deep_analysis: None,
            last_updated: Utc::now(),
        };

        let facts = ProductFacts::from_product(&product);
        assert_eq!(facts.price, 0.0);
        assert_eq!(facts.estimated_monthly_sales, 50);
    }
}
