//! SM-2 scheduling: grade mapping, next-review computation and the
//! due-first ordering of a card pool.

use crate::card::{FlashCard, MIN_EFACTOR};
use anyhow::{Result, bail};
use chrono::{DateTime, Duration, Utc};

/// Longest interval a card can be scheduled for, in days (about 100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Recall quality on the 0-5 SM-2 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;

    /// Qualities below this are lapses
    pub const PASSING: u8 = 3;

    /// Fails on anything outside 0..=5
    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            bail!("Quality must be between 0 and {}, got {}", Self::MAX, value);
        }
        Ok(Self(value))
    }

    /// Clamp an arbitrary integer into 0..=5
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_lapse(&self) -> bool {
        self.0 < Self::PASSING
    }
}

/// Coarse recall feedback offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    /// No recall at all
    Forgot,
    /// Recalled with real difficulty (still scheduled as a lapse)
    Hard,
    /// Recalled correctly
    Good,
    /// Recalled instantly
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Forgot, Grade::Hard, Grade::Good, Grade::Easy];

    /// Parse a grade name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "forgot" => Some(Grade::Forgot),
            "hard" => Some(Grade::Hard),
            "good" => Some(Grade::Good),
            "easy" => Some(Grade::Easy),
            _ => None,
        }
    }

    /// Map to the SM-2 quality scale
    pub fn quality(&self) -> Quality {
        match self {
            Grade::Forgot => Quality(0),
            Grade::Hard => Quality(2),
            Grade::Good => Quality(3),
            Grade::Easy => Quality(5),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::Forgot => "forgot",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

/// Map a grade name to a quality; unrecognised names count as "good"
pub fn grade_to_quality(name: &str) -> Quality {
    Grade::parse(name).unwrap_or(Grade::Good).quality()
}

/// Compute the card's next scheduling state after being graded at `now`
pub fn compute_next_review(card: &FlashCard, quality: Quality, now: DateTime<Utc>) -> FlashCard {
    let lapse = (Quality::MAX - quality.value()) as f64;

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let efactor = (card.efactor + (0.1 - lapse * (0.08 + lapse * 0.02))).max(MIN_EFACTOR);

    let (repetitions, interval) = if quality.is_lapse() {
        (0, 1)
    } else {
        let repetitions = card.repetitions + 1;
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => (card.interval as f64 * efactor)
                .round()
                .clamp(1.0, MAX_INTERVAL_DAYS as f64) as u32,
        };
        (repetitions, interval)
    };

    FlashCard {
        repetitions,
        interval,
        efactor,
        last_studied: Some(now),
        next_study: Some(now + Duration::days(interval as i64)),
        ..card.clone()
    }
}

/// Intervals each grade would produce, in `Grade::ALL` order
pub fn preview_intervals(card: &FlashCard) -> [u32; 4] {
    let now = Utc::now();
    Grade::ALL.map(|grade| compute_next_review(card, grade.quality(), now).interval)
}

/// Order cards so the ones most in need of review come first
///
/// Never-studied cards lead, then due cards, then cards not yet due; within
/// each studied group earlier `next_study` wins. Studied cards without a
/// `next_study` are not due and go last. The sort is stable and the
/// input is left untouched.
pub fn prioritize(cards: &[FlashCard], now: DateTime<Utc>) -> Vec<FlashCard> {
    let mut ordered = cards.to_vec();
    ordered.sort_by_key(|card| priority_key(card, now));
    ordered
}

fn priority_key(card: &FlashCard, now: DateTime<Utc>) -> (u8, Option<DateTime<Utc>>) {
    if card.is_new() {
        return (0, None);
    }
    match card.next_study {
        Some(next) if next <= now => (1, Some(next)),
        Some(next) => (2, Some(next)),
        None => (3, None),
    }
}

/// Format an interval for display ("1d", "3w", "4mo")
pub fn format_interval(days: u32) -> String {
    match days {
        0..=13 => format!("{}d", days),
        14..=59 => format!("{}w", days / 7),
        60..=364 => format!("{}mo", days / 30),
        _ => format!("{:.1}y", days as f64 / 365.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_card() -> FlashCard {
        FlashCard::new("chemistry/H2O", "H2O", "water")
    }

    fn studied_card(repetitions: u32, interval: u32, efactor: f64) -> FlashCard {
        let now = Utc::now();
        FlashCard {
            repetitions,
            interval,
            efactor,
            last_studied: Some(now - Duration::days(interval as i64)),
            next_study: Some(now),
            ..new_card()
        }
    }

    fn quality(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    #[test]
    fn test_grade_mapping() {
        assert_eq!(grade_to_quality("forgot").value(), 0);
        assert_eq!(grade_to_quality("hard").value(), 2);
        assert_eq!(grade_to_quality("good").value(), 3);
        assert_eq!(grade_to_quality("easy").value(), 5);
        assert_eq!(grade_to_quality("EASY").value(), 5);
    }

    #[test]
    fn test_grade_mapping_defaults_to_good() {
        assert_eq!(grade_to_quality("medium").value(), 3);
        assert_eq!(grade_to_quality("").value(), 3);
    }

    #[test]
    fn test_hard_is_a_lapse() {
        assert!(Grade::Hard.quality().is_lapse());
        assert!(Grade::Forgot.quality().is_lapse());
        assert!(!Grade::Good.quality().is_lapse());

        let card = studied_card(4, 20, 2.5);
        let updated = compute_next_review(&card, Grade::Hard.quality(), Utc::now());
        assert_eq!(updated.repetitions, 0);
        assert_eq!(updated.interval, 1);
    }

    #[test]
    fn test_quality_rejects_out_of_range() {
        assert!(Quality::new(5).is_ok());
        assert!(Quality::new(6).is_err());
        assert_eq!(Quality::clamped(-3).value(), 0);
        assert_eq!(Quality::clamped(9).value(), 5);
        assert_eq!(Quality::clamped(4).value(), 4);
    }

    #[test]
    fn test_success_progression() {
        let now = Utc::now();
        for q in 3..=5 {
            let first = compute_next_review(&new_card(), quality(q), now);
            assert_eq!(first.repetitions, 1);
            assert_eq!(first.interval, 1);

            let second = compute_next_review(&first, quality(q), now);
            assert_eq!(second.repetitions, 2);
            assert_eq!(second.interval, 6);

            let third = compute_next_review(&second, quality(q), now);
            assert_eq!(third.repetitions, 3);
            assert_eq!(third.interval, (6.0 * third.efactor).round() as u32);
        }
    }

    #[test]
    fn test_lapse_resets_regardless_of_history() {
        let now = Utc::now();
        for q in 0..=2 {
            for (reps, interval) in [(0, 0), (1, 1), (2, 6), (7, 120)] {
                let card = studied_card(reps, interval, 2.2);
                let updated = compute_next_review(&card, quality(q), now);
                assert_eq!(updated.repetitions, 0);
                assert_eq!(updated.interval, 1);
            }
        }
    }

    #[test]
    fn test_efactor_never_below_floor() {
        let now = Utc::now();
        for q in 0..=5 {
            for efactor in [1.3, 1.35, 1.5, 2.0, 2.5, 3.1] {
                let updated = compute_next_review(&studied_card(3, 10, efactor), quality(q), now);
                assert!(updated.efactor >= MIN_EFACTOR, "q={} ef={}", q, efactor);
            }
        }

        let mut card = new_card();
        for _ in 0..20 {
            card = compute_next_review(&card, quality(0), now);
        }
        assert_eq!(card.efactor, MIN_EFACTOR);
    }

    #[test]
    fn test_next_study_is_interval_days_after_last_studied() {
        let now = Utc::now();
        for q in 0..=5 {
            let updated = compute_next_review(&studied_card(5, 30, 2.1), quality(q), now);
            assert_eq!(updated.last_studied, Some(now));
            assert_eq!(
                updated.next_study.unwrap() - updated.last_studied.unwrap(),
                Duration::days(updated.interval as i64)
            );
        }
    }

    #[test]
    fn test_easy_easy_good_scenario() {
        let now = Utc::now();
        let card = new_card();

        let first = compute_next_review(&card, grade_to_quality("easy"), now);
        assert_eq!(first.repetitions, 1);
        assert_eq!(first.interval, 1);
        assert!((first.efactor - 2.6).abs() < 1e-9);
        assert_eq!(first.next_study, Some(now + Duration::days(1)));

        let second = compute_next_review(&first, grade_to_quality("easy"), now);
        assert_eq!(second.repetitions, 2);
        assert_eq!(second.interval, 6);
        assert!((second.efactor - 2.7).abs() < 1e-9);

        let third = compute_next_review(&second, grade_to_quality("good"), now);
        assert_eq!(third.repetitions, 3);
        assert!((third.efactor - 2.56).abs() < 1e-9);
        assert_eq!(third.interval, (6.0 * third.efactor).round() as u32);
        assert_eq!(third.interval, 15);
    }

    #[test]
    fn test_only_scheduling_fields_change() {
        let card = new_card();
        let updated = compute_next_review(&card, quality(4), Utc::now());
        assert_eq!(updated.id, card.id);
        assert_eq!(updated.front, card.front);
        assert_eq!(updated.back, card.back);
        assert!(card.is_new());
    }

    #[test]
    fn test_deterministic_but_not_idempotent() {
        let now = Utc::now();
        let card = studied_card(2, 6, 2.5);
        let a = compute_next_review(&card, quality(4), now);
        let b = compute_next_review(&card, quality(4), now);
        assert_eq!(a, b);

        let again = compute_next_review(&a, quality(4), now);
        assert_ne!(again, a);
    }

    #[test]
    fn test_preview_intervals() {
        let card = studied_card(2, 6, 2.5);
        let [forgot, hard, good, easy] = preview_intervals(&card);
        assert_eq!(forgot, 1);
        assert_eq!(hard, 1);
        assert_eq!(good, (6.0_f64 * 2.36).round() as u32);
        assert_eq!(easy, (6.0_f64 * 2.6).round() as u32);
    }

    fn labelled(id: &str, next_study: Option<DateTime<Utc>>) -> FlashCard {
        FlashCard {
            last_studied: next_study.map(|n| n - Duration::days(1)),
            next_study,
            ..FlashCard::new(id, id, id)
        }
    }

    fn ids(cards: &[FlashCard]) -> Vec<&str> {
        cards.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_prioritize_new_then_due_then_later() {
        let now = Utc::now();
        let a = labelled("A", None);
        let b = labelled("B", Some(now - Duration::days(1)));
        let c = labelled("C", Some(now + Duration::days(1)));

        let orders = [
            vec![a.clone(), b.clone(), c.clone()],
            vec![c.clone(), b.clone(), a.clone()],
            vec![b.clone(), c.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
        ];
        for input in orders {
            assert_eq!(ids(&prioritize(&input, now)), ["A", "B", "C"]);
        }
    }

    #[test]
    fn test_prioritize_earlier_next_study_first_and_stable() {
        let now = Utc::now();
        let cards = vec![
            labelled("late", Some(now + Duration::days(9))),
            labelled("new1", None),
            labelled("overdue", Some(now - Duration::days(5))),
            labelled("soon", Some(now + Duration::days(2))),
            labelled("new2", None),
            labelled("due", Some(now - Duration::days(1))),
        ];

        let ordered = prioritize(&cards, now);
        assert_eq!(
            ids(&ordered),
            ["new1", "new2", "overdue", "due", "soon", "late"]
        );
        // input untouched
        assert_eq!(cards[0].id, "late");
    }

    #[test]
    fn test_repeated_easy_grades_stay_bounded() {
        let now = Utc::now();
        let mut card = new_card();
        for _ in 0..50 {
            card = compute_next_review(&card, grade_to_quality("easy"), now);
            assert!(card.interval <= MAX_INTERVAL_DAYS);
            assert_eq!(
                card.next_study.unwrap() - now,
                Duration::days(card.interval as i64)
            );
        }
        assert_eq!(card.interval, MAX_INTERVAL_DAYS);
        assert_eq!(card.repetitions, 50);

        // previews of a card at the cap do not overflow either
        assert_eq!(preview_intervals(&card)[3], MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_prioritize_studied_without_next_study_last() {
        let now = Utc::now();
        let undated = FlashCard {
            last_studied: Some(now - Duration::days(3)),
            next_study: None,
            ..FlashCard::new("undated", "undated", "undated")
        };
        let cards = vec![
            undated,
            labelled("later", Some(now + Duration::days(4))),
            labelled("due", Some(now - Duration::days(1))),
            labelled("new", None),
        ];

        assert_eq!(
            ids(&prioritize(&cards, now)),
            ["new", "due", "later", "undated"]
        );
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(15), "2w");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(730), "2.0y");
    }
}
