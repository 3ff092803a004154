//! Memory-model scheduler in the FSRS family.
//!
//! Each card carries a DSR memory state:
//! - Difficulty (D): intrinsic hardness 1-10
//! - Stability (S): days until recall probability decays to the target retention
//! - Retrievability (R): estimated probability of recall, `e^(-t / S)`

use super::SchedulingResult;
use crate::error::Result;
use crate::types::{CardStatus, Rating, SchedulingState};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Interval fuzz bands: (start day, end day, factor).
const FUZZ_RANGES: [(f64, f64, f64); 3] = [
    (2.5, 7.0, 0.15),
    (7.0, 20.0, 0.1),
    (20.0, f64::INFINITY, 0.05),
];

/// Scheduler with configurable parameters.
#[derive(Debug, Clone)]
pub struct Fsrs {
    pub request_retention: f64,
    /// Upper bound on scheduled intervals, in days.
    pub maximum_interval: u32,
    /// Spread review-state intervals so cards reviewed together drift apart.
    pub enable_fuzz: bool,
    /// FSRS-4.5 parameters (17 weights).
    pub w: [f64; 17],
}

impl Default for Fsrs {
    fn default() -> Self {
        Self {
            request_retention: 0.9,
            maximum_interval: 365,
            enable_fuzz: true,
            w: [
                0.4, 0.6, 2.4, 5.8, // w[0-3]: initial stability for Again, Hard, Good, Easy
                4.93,  // w[4]: initial difficulty base
                0.94,  // w[5]: initial difficulty modifier
                0.86,  // w[6]: difficulty decay
                0.01,  // w[7]: mean reversion weight
                1.49,  // w[8]: stability exp base
                0.14,  // w[9]: stability decay
                0.94,  // w[10]: retrievability effect
                2.18,  // w[11]: forget stability base
                0.05,  // w[12]: difficulty on forget
                0.34,  // w[13]: stability on forget
                1.26,  // w[14]: retrievability on forget
                0.29,  // w[15]: hard penalty
                2.61,  // w[16]: easy bonus
            ],
        }
    }
}

impl Fsrs {
    /// Advance `state` by one review, fuzzing with the thread RNG.
    pub fn schedule(
        &self,
        state: &SchedulingState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> SchedulingResult {
        self.schedule_with_rng(state, rating, now, &mut rand::rng())
    }

    /// Entry point for callers that only have a legacy 0-5 quality score.
    pub fn review_quality(
        &self,
        state: &SchedulingState,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<SchedulingResult> {
        let rating = Rating::from_quality(quality)?;
        Ok(self.schedule(state, rating, now))
    }

    /// Advance `state` by one review using the supplied RNG for fuzz.
    pub fn schedule_with_rng<R: Rng + ?Sized>(
        &self,
        state: &SchedulingState,
        rating: Rating,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> SchedulingResult {
        let rating_value = rating.to_value();
        let elapsed = Self::elapsed_days(state, now);
        let is_first_review = state.status == CardStatus::New || state.stability <= 0.0;

        let (new_stability, new_difficulty) = if is_first_review {
            self.first_review(state, rating)
        } else {
            self.subsequent_review(state, rating_value, elapsed)
        };

        let new_status = Self::determine_status(state.status, rating);
        let lapses = if rating == Rating::Again {
            state.lapses + 1
        } else {
            state.lapses
        };

        let (scheduled_days, next_due) = match new_status {
            CardStatus::Learning | CardStatus::Relearning => {
                let minutes = self.short_term_minutes(new_stability);
                (0, now + Duration::minutes(minutes))
            }
            CardStatus::New | CardStatus::Review => {
                let days = self.next_interval(new_stability, rng);
                (days, now + Duration::days(i64::from(days)))
            }
        };

        SchedulingResult {
            state: SchedulingState {
                card_id: state.card_id,
                due: next_due,
                stability: new_stability,
                difficulty: new_difficulty,
                elapsed_days: elapsed.floor() as u32,
                scheduled_days,
                reps: state.reps + 1,
                lapses,
                status: new_status,
                last_review: Some(now),
            },
            next_due,
        }
    }

    /// Calculate initial stability for a new card based on first rating.
    /// S0(G) = w[G-1] where G is rating 1-4
    fn initial_stability(&self, rating: u8) -> f64 {
        let index = (rating.saturating_sub(1)) as usize;
        self.w[index.min(3)].max(0.1)
    }

    /// Calculate initial difficulty for a new card based on first rating.
    /// D0(G) = w[4] - w[5] * (G - 3)
    fn initial_difficulty(&self, rating: u8) -> f64 {
        let d0 = self.w[4] - self.w[5] * (rating as f64 - 3.0);
        d0.clamp(1.0, 10.0)
    }

    /// Calculate next difficulty using mean reversion.
    /// D' = w[7] * D0(G) + (1 - w[7]) * D
    /// Apply decay: D'' = D' - w[6] * (G - 3)
    fn next_difficulty(&self, current_d: f64, rating: u8) -> f64 {
        let d0 = self.initial_difficulty(rating);
        let d_new = self.w[7] * d0 + (1.0 - self.w[7]) * current_d.clamp(1.0, 10.0);
        let d_decayed = d_new - self.w[6] * (rating as f64 - 3.0);
        d_decayed.clamp(1.0, 10.0)
    }

    /// Estimated recall probability.
    /// R = e^(-t / S)
    pub fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        if stability <= 0.0 {
            return 0.0;
        }
        (-elapsed_days.max(0.0) / stability).exp()
    }

    /// Calculate next stability after successful recall.
    /// S' = S * (e^(w[8]) * (11 - D) * S^(-w[9]) * (e^(w[10]*(1-R)) - 1) + 1) * modifier
    fn next_stability_recall(
        &self,
        stability: f64,
        difficulty: f64,
        retrievability: f64,
        rating: u8,
    ) -> f64 {
        let exp_w8 = self.w[8].exp();
        let d_factor = (11.0 - difficulty).max(0.1);
        let s_decay = stability.powf(-self.w[9]);
        let r_factor = (self.w[10] * (1.0 - retrievability)).exp() - 1.0;

        let growth = exp_w8 * d_factor * s_decay * r_factor + 1.0;

        let modifier = match rating {
            2 => self.w[15], // Hard penalty
            4 => self.w[16], // Easy bonus
            _ => 1.0,
        };

        (stability * growth * modifier).max(0.1)
    }

    /// Calculate next stability after forgetting (lapse).
    /// S' = w[11] * D^(-w[12]) * ((S+1)^w[13] - 1) * e^(w[14]*(1-R))
    fn next_stability_forget(&self, stability: f64, difficulty: f64, retrievability: f64) -> f64 {
        let d_factor = difficulty.max(1.0).powf(-self.w[12]);
        let s_factor = (stability + 1.0).powf(self.w[13]) - 1.0;
        let r_factor = (self.w[14] * (1.0 - retrievability)).exp();

        let new_s = self.w[11] * d_factor * s_factor * r_factor;
        // Never exceed previous stability on lapse
        new_s.max(0.1).min(stability)
    }

    /// Optimal interval from stability.
    /// I = 9 * S * (1/R - 1) where R = request_retention
    fn interval_from_stability(&self, stability: f64) -> f64 {
        let maximum = f64::from(self.maximum_interval);
        if self.request_retention <= 0.0 || self.request_retention >= 1.0 {
            return stability.clamp(1.0, maximum);
        }
        let interval = 9.0 * stability * (1.0 / self.request_retention - 1.0);
        interval.clamp(1.0, maximum)
    }

    /// Whole-day interval for a card entering (or staying in) review.
    fn next_interval<R: Rng + ?Sized>(&self, stability: f64, rng: &mut R) -> u32 {
        let interval = (self.interval_from_stability(stability).round() as u32)
            .clamp(1, self.maximum_interval.max(1));
        if self.enable_fuzz {
            self.apply_fuzz(interval, rng)
        } else {
            interval
        }
    }

    /// Spread an interval uniformly within a band that widens with its length.
    fn apply_fuzz<R: Rng + ?Sized>(&self, interval: u32, rng: &mut R) -> u32 {
        let ivl = f64::from(interval);
        if ivl < 2.5 {
            return interval;
        }

        let delta = FUZZ_RANGES
            .iter()
            .fold(1.0, |acc, &(start, end, factor)| {
                acc + factor * (ivl.min(end) - start).max(0.0)
            });

        let min_ivl = ((ivl - delta).round() as u32).max(2);
        let max_ivl = ((ivl + delta).round() as u32).min(self.maximum_interval);
        if min_ivl >= max_ivl {
            return interval.min(self.maximum_interval);
        }
        rng.random_range(min_ivl..=max_ivl)
    }

    /// Short-term step for learning/relearning cards: 10 minutes to 1 day.
    fn short_term_minutes(&self, stability: f64) -> i64 {
        (stability * 60.0).clamp(10.0, 1440.0).round() as i64
    }

    /// Fractional days since the previous review.
    fn elapsed_days(state: &SchedulingState, now: DateTime<Utc>) -> f64 {
        match state.last_review {
            Some(last) => (now.signed_duration_since(last).num_seconds() as f64 / 86400.0).max(0.0),
            None => 0.0,
        }
    }

    /// Determine new status based on current status and rating.
    fn determine_status(current: CardStatus, rating: Rating) -> CardStatus {
        match (current, rating) {
            (CardStatus::New, Rating::Again | Rating::Hard) => CardStatus::Learning,
            (CardStatus::New, _) => CardStatus::Review,
            (CardStatus::Learning, Rating::Again | Rating::Hard) => CardStatus::Learning,
            (CardStatus::Learning, _) => CardStatus::Review,
            (CardStatus::Review, Rating::Again) => CardStatus::Relearning,
            (CardStatus::Review, _) => CardStatus::Review,
            (CardStatus::Relearning, Rating::Again | Rating::Hard) => CardStatus::Relearning,
            (CardStatus::Relearning, _) => CardStatus::Review,
        }
    }

    /// First review - initialize stability and difficulty.
    fn first_review(&self, state: &SchedulingState, rating: Rating) -> (f64, f64) {
        let rating_value = rating.to_value();
        let mut stability = self.initial_stability(rating_value);
        if rating.is_success() {
            stability = stability.max(state.stability);
        }
        (stability, self.initial_difficulty(rating_value))
    }

    /// Subsequent review - update stability and difficulty.
    fn subsequent_review(&self, state: &SchedulingState, rating: u8, elapsed: f64) -> (f64, f64) {
        let current_s = state.stability;
        let current_d = state.difficulty.clamp(1.0, 10.0);
        let r = self.retrievability(elapsed, current_s);

        let new_d = self.next_difficulty(current_d, rating);
        let new_s = if rating == 1 {
            self.next_stability_forget(current_s, current_d, r)
        } else {
            self.next_stability_recall(current_s, current_d, r, rating)
        };

        (new_s, new_d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 30, 0).unwrap()
    }

    fn no_fuzz() -> Fsrs {
        Fsrs {
            enable_fuzz: false,
            ..Default::default()
        }
    }

    fn review_state(stability: f64, difficulty: f64, elapsed_days: i64) -> SchedulingState {
        let current_time = now();
        SchedulingState {
            status: CardStatus::Review,
            stability,
            difficulty,
            reps: 5,
            scheduled_days: elapsed_days as u32,
            last_review: Some(current_time - Duration::days(elapsed_days)),
            ..SchedulingState::new(1, current_time)
        }
    }

    #[test]
    fn new_card_first_review_good() {
        let fsrs = no_fuzz();
        let state = SchedulingState::new(1, now());
        let result = fsrs.schedule(&state, Rating::Good, now());

        assert_eq!(result.state.status, CardStatus::Review);
        assert!(result.state.stability > 0.0);
        assert_eq!(result.state.reps, 1);
        assert_eq!(result.state.last_review, Some(now()));
        assert!(result.next_due > now());
    }

    #[test]
    fn new_card_first_review_again() {
        let fsrs = no_fuzz();
        let state = SchedulingState::new(1, now());
        let result = fsrs.schedule(&state, Rating::Again, now());

        assert_eq!(result.state.status, CardStatus::Learning);
        assert_eq!(result.state.scheduled_days, 0);
        assert_eq!(result.state.lapses, 1);
        assert!(result.next_due <= now() + Duration::days(1));
    }

    #[test]
    fn new_card_first_review_easy_higher_stability() {
        let fsrs = no_fuzz();
        let state = SchedulingState::new(1, now());

        let good = fsrs.schedule(&state, Rating::Good, now());
        let easy = fsrs.schedule(&state, Rating::Easy, now());

        assert!(easy.state.stability > good.state.stability);
    }

    #[test]
    fn stability_increases_on_successful_recall() {
        let fsrs = no_fuzz();
        let state = review_state(5.0, 5.0, 5);

        let result = fsrs.schedule(&state, Rating::Good, now());
        assert!(result.state.stability > 5.0);
    }

    #[test]
    fn stability_never_drops_on_good_or_easy() {
        let fsrs = Fsrs::default();
        let mut rng = StdRng::seed_from_u64(7);
        for &stability in &[0.1, 0.5, 1.0, 3.0, 21.0, 90.0, 400.0, 5000.0] {
            for &difficulty in &[1.0, 4.0, 7.5, 10.0] {
                for &elapsed in &[0, 1, 10, 100] {
                    let state = review_state(stability, difficulty, elapsed);
                    for rating in [Rating::Good, Rating::Easy] {
                        let result = fsrs.schedule_with_rng(&state, rating, now(), &mut rng);
                        assert!(
                            result.state.stability >= stability,
                            "S={stability} D={difficulty} t={elapsed} {rating:?} -> {}",
                            result.state.stability
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn stability_decreases_on_lapse() {
        let fsrs = no_fuzz();
        let state = review_state(10.0, 5.0, 10);

        let result = fsrs.schedule(&state, Rating::Again, now());
        assert!(result.state.stability < 10.0);
        assert_eq!(result.state.lapses, 1);
        assert_eq!(result.state.scheduled_days, 0);
    }

    #[test]
    fn again_never_moves_to_review() {
        let fsrs = no_fuzz();
        for status in [
            CardStatus::New,
            CardStatus::Learning,
            CardStatus::Review,
            CardStatus::Relearning,
        ] {
            let state = SchedulingState {
                status,
                ..review_state(8.0, 5.0, 3)
            };
            let result = fsrs.schedule(&state, Rating::Again, now());
            assert!(
                matches!(
                    result.state.status,
                    CardStatus::Learning | CardStatus::Relearning
                ),
                "{status:?} -> {:?}",
                result.state.status
            );
        }
    }

    #[test]
    fn difficulty_decreases_on_easy() {
        let fsrs = no_fuzz();
        let state = review_state(5.0, 5.0, 5);

        let result = fsrs.schedule(&state, Rating::Easy, now());
        assert!(result.state.difficulty < 5.0);
    }

    #[test]
    fn difficulty_increases_on_again() {
        let fsrs = no_fuzz();
        let state = review_state(5.0, 5.0, 5);

        let result = fsrs.schedule(&state, Rating::Again, now());
        assert!(result.state.difficulty > 5.0);
    }

    #[test]
    fn difficulty_clamped_to_bounds() {
        let fsrs = no_fuzz();

        let state = review_state(5.0, 10.0, 5);
        let result = fsrs.schedule(&state, Rating::Again, now());
        assert!(result.state.difficulty <= 10.0);

        let state = SchedulingState {
            difficulty: 1.0,
            ..state
        };
        let result = fsrs.schedule(&state, Rating::Easy, now());
        assert!(result.state.difficulty >= 1.0);
    }

    #[test]
    fn interval_respects_maximum() {
        let fsrs = Fsrs::default();
        let state = review_state(50000.0, 5.0, 300);

        let result = fsrs.schedule(&state, Rating::Good, now());
        assert!(result.state.scheduled_days <= 365);
        assert!(result.next_due <= now() + Duration::days(365));
    }

    #[test]
    fn retrievability_formula() {
        let fsrs = Fsrs::default();

        let r = fsrs.retrievability(0.0, 10.0);
        assert!((r - 1.0).abs() < 1e-9);

        let r = fsrs.retrievability(10.0, 10.0);
        assert!((r - (-1.0f64).exp()).abs() < 1e-9);

        assert_eq!(fsrs.retrievability(3.0, 0.0), 0.0);
    }

    #[test]
    fn learning_card_graduates_on_good() {
        let fsrs = no_fuzz();
        let state = SchedulingState {
            status: CardStatus::Learning,
            stability: 1.0,
            reps: 1,
            last_review: Some(now() - Duration::minutes(10)),
            ..SchedulingState::new(1, now())
        };

        let result = fsrs.schedule(&state, Rating::Good, now());
        assert_eq!(result.state.status, CardStatus::Review);
        assert!(result.state.scheduled_days >= 1);
    }

    #[test]
    fn learning_card_stays_on_hard() {
        let fsrs = no_fuzz();
        let state = SchedulingState {
            status: CardStatus::Learning,
            stability: 1.0,
            reps: 1,
            last_review: Some(now() - Duration::minutes(10)),
            ..SchedulingState::new(1, now())
        };

        let result = fsrs.schedule(&state, Rating::Hard, now());
        assert_eq!(result.state.status, CardStatus::Learning);
        assert_eq!(result.state.scheduled_days, 0);
    }

    #[test]
    fn review_card_lapses_on_again() {
        let fsrs = no_fuzz();
        let state = review_state(10.0, 5.0, 10);

        let result = fsrs.schedule(&state, Rating::Again, now());
        assert_eq!(result.state.status, CardStatus::Relearning);
    }

    #[test]
    fn relearning_card_returns_to_review_on_good() {
        let fsrs = no_fuzz();
        let state = SchedulingState {
            status: CardStatus::Relearning,
            ..review_state(3.0, 6.0, 1)
        };

        let result = fsrs.schedule(&state, Rating::Good, now());
        assert_eq!(result.state.status, CardStatus::Review);
    }

    #[test]
    fn hard_penalty_reduces_stability_growth() {
        let fsrs = no_fuzz();
        let state = review_state(10.0, 5.0, 10);

        let good = fsrs.schedule(&state, Rating::Good, now());
        let hard = fsrs.schedule(&state, Rating::Hard, now());

        assert!(hard.state.stability < good.state.stability);
    }

    #[test]
    fn easy_bonus_increases_stability_growth() {
        let fsrs = no_fuzz();
        let state = review_state(10.0, 5.0, 10);

        let good = fsrs.schedule(&state, Rating::Good, now());
        let easy = fsrs.schedule(&state, Rating::Easy, now());

        assert!(easy.state.stability > good.state.stability);
    }

    #[test]
    fn initial_stability_values() {
        let fsrs = Fsrs::default();

        let s_again = fsrs.initial_stability(1);
        let s_hard = fsrs.initial_stability(2);
        let s_good = fsrs.initial_stability(3);
        let s_easy = fsrs.initial_stability(4);

        assert!(s_again < s_hard);
        assert!(s_hard < s_good);
        assert!(s_good < s_easy);
    }

    #[test]
    fn initial_difficulty_values() {
        let fsrs = Fsrs::default();

        let d_again = fsrs.initial_difficulty(1);
        let d_hard = fsrs.initial_difficulty(2);
        let d_good = fsrs.initial_difficulty(3);
        let d_easy = fsrs.initial_difficulty(4);

        assert!(d_again > d_hard);
        assert!(d_hard > d_good);
        assert!(d_good > d_easy);
    }

    #[test]
    fn four_daily_good_reviews_reach_review_with_growing_intervals() {
        let fsrs = no_fuzz();
        let start = now();
        let mut state = SchedulingState::new(42, start);
        let mut previous_days = 0;

        for day in 0..4 {
            let review_time = start + Duration::days(day);
            let result = fsrs.schedule(&state, Rating::Good, review_time);
            state = result.state;

            assert!(
                state.scheduled_days > previous_days,
                "day {day}: {} <= {previous_days}",
                state.scheduled_days
            );
            assert_eq!(state.is_mastered(), state.stability >= 21.0);
            previous_days = state.scheduled_days;
        }

        assert_eq!(state.status, CardStatus::Review);
        assert_eq!(state.reps, 4);
        assert_eq!(state.lapses, 0);
        assert_eq!(state.elapsed_days, 1);
    }

    #[test]
    fn fuzz_stays_within_band() {
        let fsrs = Fsrs::default();
        let mut seen = std::collections::HashSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let fuzzed = fsrs.apply_fuzz(30, &mut rng);
            assert!((27..=33).contains(&fuzzed), "fuzzed to {fuzzed}");
            seen.insert(fuzzed);
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn short_intervals_are_not_fuzzed() {
        let fsrs = Fsrs::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(fsrs.apply_fuzz(1, &mut rng), 1);
        assert_eq!(fsrs.apply_fuzz(2, &mut rng), 2);
    }

    #[test]
    fn same_seed_same_schedule() {
        let fsrs = Fsrs::default();
        let state = review_state(40.0, 5.0, 40);

        let a = fsrs.schedule_with_rng(&state, Rating::Good, now(), &mut StdRng::seed_from_u64(9));
        let b = fsrs.schedule_with_rng(&state, Rating::Good, now(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a.state, b.state);
    }

    #[test]
    fn quality_entry_point_maps_to_ratings() {
        let fsrs = no_fuzz();
        let state = SchedulingState::new(1, now());

        let failed = fsrs.review_quality(&state, 1, now()).unwrap();
        assert_eq!(failed.state.status, CardStatus::Learning);

        let passed = fsrs.review_quality(&state, 3, now()).unwrap();
        assert_eq!(passed.state.status, CardStatus::Review);

        assert!(fsrs.review_quality(&state, 9, now()).is_err());
    }
}
