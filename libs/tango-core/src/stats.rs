//! Study statistics over stored scheduling states and the review log.

use crate::types::{ReviewLogEntry, SchedulingState};
use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Longest window [`daily_stats`] will report, in days.
pub const MAX_DAILY_WINDOW: usize = 365;

/// Overall learning progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewStats {
    pub total_cards: usize,
    /// Cards reviewed at least once.
    pub learned: usize,
    pub mastered: usize,
    pub new_cards: usize,
    pub due_now: usize,
    pub due_today: usize,
    pub due_this_week: usize,
    /// Percentage of cards reviewed at least once, one decimal.
    pub learning_progress: f64,
    /// Mean estimated recall probability over learned cards.
    pub average_retrievability: f64,
}

/// Reviews on a single local day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_reviews: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Percentage of non-Again ratings, one decimal.
    pub accuracy: f64,
    /// Cards whose first successful review fell on this day.
    pub new_cards_learned: usize,
}

/// Consecutive study days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakInfo {
    pub current_streak: usize,
    pub longest_streak: usize,
    pub last_study_date: Option<NaiveDate>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

/// Start of the local day after `now`, as a UTC instant.
fn next_local_midnight<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let tomorrow = now.with_timezone(tz).date_naive() + Duration::days(1);
    tomorrow
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now + Duration::days(1))
}

/// Overview across the catalog ids. Ids without a stored state are new and due.
pub fn overview<Tz: TimeZone>(
    card_ids: &[i64],
    states: &HashMap<i64, SchedulingState>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> OverviewStats {
    let today_end = next_local_midnight(now, tz);
    let week_end = today_end + Duration::days(6);

    let mut learned = 0;
    let mut mastered = 0;
    let mut due_now = 0;
    let mut due_today = 0;
    let mut due_this_week = 0;
    let mut retrievability_sum = 0.0;

    for id in card_ids {
        match states.get(id) {
            Some(state) => {
                if state.reps > 0 {
                    learned += 1;
                    retrievability_sum += state.retrievability(now);
                }
                if state.is_mastered() {
                    mastered += 1;
                }
                if state.is_due(now) {
                    due_now += 1;
                }
                if state.due < today_end {
                    due_today += 1;
                }
                if state.due < week_end {
                    due_this_week += 1;
                }
            }
            None => {
                due_now += 1;
                due_today += 1;
                due_this_week += 1;
            }
        }
    }

    let total_cards = card_ids.len();
    let average_retrievability = if learned == 0 {
        0.0
    } else {
        (retrievability_sum / learned as f64 * 1000.0).round() / 1000.0
    };

    OverviewStats {
        total_cards,
        learned,
        mastered,
        new_cards: total_cards - learned,
        due_now,
        due_today,
        due_this_week,
        learning_progress: percentage(learned, total_cards),
        average_retrievability,
    }
}

/// Per-day review counts for the `days` days ending at `today`, oldest first.
///
/// The window is capped at [`MAX_DAILY_WINDOW`] and stops at the earliest
/// representable date.
pub fn daily_stats<Tz: TimeZone>(
    log: &[ReviewLogEntry],
    days: usize,
    today: NaiveDate,
    tz: &Tz,
) -> Vec<DailyStats> {
    let mut by_date: HashMap<NaiveDate, (usize, usize)> = HashMap::new();
    let mut first_success: HashMap<i64, NaiveDate> = HashMap::new();

    for entry in log {
        let date = entry.reviewed_at.with_timezone(tz).date_naive();
        let counts = by_date.entry(date).or_default();
        counts.0 += 1;
        if entry.rating.is_success() {
            counts.1 += 1;
            first_success
                .entry(entry.card_id)
                .and_modify(|d| *d = (*d).min(date))
                .or_insert(date);
        }
    }

    let mut new_by_date: HashMap<NaiveDate, usize> = HashMap::new();
    for date in first_success.values() {
        *new_by_date.entry(*date).or_default() += 1;
    }

    (0..days.min(MAX_DAILY_WINDOW) as u64)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| {
            let (total, correct) = by_date.get(&date).copied().unwrap_or((0, 0));
            DailyStats {
                date,
                total_reviews: total,
                correct,
                incorrect: total - correct,
                accuracy: percentage(correct, total),
                new_cards_learned: new_by_date.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Current and longest runs of consecutive study days.
///
/// The current streak stays alive until a full day without reviews has
/// passed, so a streak ending yesterday still counts.
pub fn streak<Tz: TimeZone>(log: &[ReviewLogEntry], today: NaiveDate, tz: &Tz) -> StreakInfo {
    let dates: BTreeSet<NaiveDate> = log
        .iter()
        .map(|entry| entry.reviewed_at.with_timezone(tz).date_naive())
        .collect();

    let Some(&last) = dates.iter().next_back() else {
        return StreakInfo {
            current_streak: 0,
            longest_streak: 0,
            last_study_date: None,
        };
    };

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &date in &dates {
        run = match previous {
            Some(p) if date - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    let mut current = 0;
    if today.pred_opt().map_or(true, |yesterday| last >= yesterday) {
        let lookup: HashSet<NaiveDate> = dates.iter().copied().collect();
        let mut day = Some(last);
        while let Some(d) = day.filter(|d| lookup.contains(d)) {
            current += 1;
            day = d.pred_opt();
        }
    }

    StreakInfo {
        current_streak: current,
        longest_streak: longest,
        last_study_date: Some(last),
    }
}
