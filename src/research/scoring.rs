//! Heuristic scoring for fused products.
//!
//! The numeric weights are business tuning values, so the whole model sits
//! behind a trait and can be swapped or re-weighted without touching the
//! fusion logic.

use crate::research::types::{Level, OpportunityFactors, ProductSignals, ScoreBundle, ScoreWeights};
use tracing::debug;

/// Pluggable scoring collaborator.
///
/// Both methods must return values inside [1, 10] for any input.
pub trait ScoreModel: Send + Sync {
    /// Basic per-product scores computed from fetched facets.
    fn score_product(&self, signals: &ProductSignals) -> ScoreBundle;

    /// Overall opportunity score combining deep-analysis factors.
    fn opportunity_score(&self, factors: &OpportunityFactors) -> u8;
}

/// Default threshold-based scoring model.
pub struct DefaultScoreModel {
    weights: ScoreWeights,
}

impl DefaultScoreModel {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Categories with demanding compliance or supply chains.
    fn is_complex_category(category: &str) -> bool {
        matches!(category, "Electronics" | "Automotive" | "Health")
    }

    fn clamp_band(score: f64) -> u8 {
        score.round().clamp(1.0, 10.0) as u8
    }

    fn opportunity(&self, signals: &ProductSignals) -> u8 {
        let mut score = 5.0;

        // A strong rank means proven sales volume.
        if let Some(rank) = signals.rank {
            if rank < 1_000 {
                score += 3.0;
            } else if rank < 10_000 {
                score += 2.0;
            } else if rank < 100_000 {
                score += 1.0;
            }
        }

        if let Some(rating) = signals.average_rating {
            // A mediocre incumbent rating is room to improve.
            if rating < 4.0 {
                score += 2.0;
            }
        }
        if let Some(reviews) = signals.review_count {
            if reviews < 1_000 {
                score += 1.0;
            }
        }

        if let Some(price) = signals.price {
            // Fulfillment economics favor this band.
            if price > 20.0 && price < 100.0 {
                score += 1.0;
            }
        }

        Self::clamp_band(score)
    }

    fn demand(&self, signals: &ProductSignals) -> u8 {
        let mut score = 5.0;

        if let Some(rank) = signals.rank {
            if rank < 5_000 {
                score += 3.0;
            } else if rank < 50_000 {
                score += 2.0;
            } else if rank < 200_000 {
                score += 1.0;
            }
        }

        if let Some(reviews) = signals.review_count {
            if reviews > 1_000 {
                score += 2.0;
            } else if reviews > 100 {
                score += 1.0;
            }
        }

        Self::clamp_band(score)
    }

    fn competition(&self, signals: &ProductSignals) -> u8 {
        let mut score = 5.0;

        // Few incumbent reviews means a thin moat.
        if let Some(reviews) = signals.review_count {
            if reviews < 100 {
                score += 3.0;
            } else if reviews < 500 {
                score += 2.0;
            } else if reviews < 1_000 {
                score += 1.0;
            }
        }

        if let Some(rating) = signals.average_rating {
            if rating < 4.0 {
                score += 2.0;
            }
        }

        Self::clamp_band(score)
    }

    fn feasibility(&self, signals: &ProductSignals) -> u8 {
        let mut score = 5.0;

        if let Some(price) = signals.price {
            if price > 15.0 && price < 200.0 {
                score += 2.0;
            }
            if price > 25.0 && price < 100.0 {
                score += 1.0;
            }
        }

        if !Self::is_complex_category(&signals.category) {
            score += 2.0;
        }

        Self::clamp_band(score)
    }
}

impl Default for DefaultScoreModel {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

impl ScoreModel for DefaultScoreModel {
    fn score_product(&self, signals: &ProductSignals) -> ScoreBundle {
        let bundle = ScoreBundle {
            opportunity: self.opportunity(signals),
            demand: self.demand(signals),
            competition: self.competition(signals),
            feasibility: self.feasibility(signals),
        };
        debug!(?bundle, category = %signals.category, "scored product");
        bundle
    }

    fn opportunity_score(&self, factors: &OpportunityFactors) -> u8 {
        let w = &self.weights;
        let mut score = w.base;

        score += (factors.demand_growth_rate / w.growth_divisor).min(w.growth_cap);

        score += match factors.competition {
            Level::Low => w.competition_swing,
            Level::Medium => 0.0,
            Level::High => -w.competition_swing,
        };

        score += (factors.market_size / w.market_size_unit).min(w.market_size_cap);
        score += (factors.profit_margin / w.margin_divisor).min(w.margin_cap);

        score += match factors.risk {
            Level::Low => w.risk_swing,
            Level::Medium => 0.0,
            Level::High => -w.risk_swing,
        };

        Self::clamp_band(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(
        price: Option<f64>,
        rank: Option<u32>,
        review_count: Option<u32>,
        average_rating: Option<f64>,
        category: &str,
    ) -> ProductSignals {
        ProductSignals {
            price,
            rank,
            review_count,
            average_rating,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_product_scores_stay_in_bounds() {
        let model = DefaultScoreModel::default();
        let prices = [None, Some(5.0), Some(45.0), Some(500.0)];
        let ranks = [None, Some(10), Some(5_000), Some(90_000), Some(1_000_000)];
        let reviews = [None, Some(10), Some(400), Some(50_000)];
        let ratings = [None, Some(2.5), Some(4.8)];

        for price in prices {
            for rank in ranks {
                for review_count in reviews {
                    for rating in ratings {
                        for category in ["Electronics", "Kitchen", "Unknown"] {
                            let bundle = model.score_product(&signals(
                                price,
                                rank,
                                review_count,
                                rating,
                                category,
                            ));
                            assert!(bundle.in_bounds(), "out of bounds for {:?}", bundle);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_facets_yield_neutral_scores() {
        let model = DefaultScoreModel::default();
        let bundle = model.score_product(&signals(None, None, None, None, "Kitchen"));

        // Without signals only the base and the category adjustment apply.
        assert_eq!(bundle.opportunity, 5);
        assert_eq!(bundle.demand, 5);
        assert_eq!(bundle.competition, 5);
        assert_eq!(bundle.feasibility, 7);
    }

    #[test]
    fn test_strong_product_scores_high_opportunity() {
        let model = DefaultScoreModel::default();
        let bundle = model.score_product(&signals(
            Some(45.0),
            Some(800),
            Some(300),
            Some(3.8),
            "Kitchen",
        ));
        assert!(bundle.opportunity >= 9);
    }

    #[test]
    fn test_opportunity_score_bounds_over_factor_grid() {
        let model = DefaultScoreModel::default();
        let levels = [Level::Low, Level::Medium, Level::High];

        for growth in [-50.0, 0.0, 12.5, 300.0] {
            for competition in levels {
                for market_size in [0.0, 2_000_000.0, 1e12] {
                    for margin in [0.0, 35.0, 400.0] {
                        for risk in levels {
                            let score = model.opportunity_score(&OpportunityFactors {
                                demand_growth_rate: growth,
                                competition,
                                market_size,
                                profit_margin: margin,
                                risk,
                            });
                            assert!((1..=10).contains(&score), "score {} out of range", score);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_competition_and_risk_swing_the_score() {
        let model = DefaultScoreModel::default();
        let base = OpportunityFactors {
            demand_growth_rate: 15.0,
            competition: Level::Medium,
            market_size: 5_000_000.0,
            profit_margin: 40.0,
            risk: Level::Medium,
        };

        let favorable = OpportunityFactors {
            competition: Level::Low,
            risk: Level::Low,
            ..base.clone()
        };
        let hostile = OpportunityFactors {
            competition: Level::High,
            risk: Level::High,
            ..base.clone()
        };

        let mid = model.opportunity_score(&base);
        assert!(model.opportunity_score(&favorable) > mid);
        assert!(model.opportunity_score(&hostile) < mid);
    }

    #[test]
    fn test_custom_weights_change_the_model() {
        let flat = DefaultScoreModel::new(ScoreWeights {
            base: 1.0,
            growth_divisor: 10.0,
            growth_cap: 0.0,
            market_size_unit: 1.0,
            market_size_cap: 0.0,
            margin_divisor: 1.0,
            margin_cap: 0.0,
            competition_swing: 0.0,
            risk_swing: 0.0,
        });

        let score = flat.opportunity_score(&OpportunityFactors {
            demand_growth_rate: 100.0,
            competition: Level::Low,
            market_size: 1e12,
            profit_margin: 90.0,
            risk: Level::Low,
        });
        assert_eq!(score, 1);
    }
}
