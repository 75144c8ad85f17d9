use crate::card::{FlashCard, Subject};
use crate::scheduler::{Grade, compute_next_review, prioritize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a session orders its pool of cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StudyOrder {
    /// Uniform random permutation
    #[default]
    Random,
    /// New cards, then due cards, then by next study date
    DueFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Completed,
    /// Nothing was selected to study
    Empty,
}

/// Result of grading the current card
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    /// Updated card, to be persisted by the caller
    pub card: FlashCard,
    pub grade: Grade,
    /// True only for the grade that completed the session
    pub finished: bool,
}

/// A single study pass over a fixed pool of cards
#[derive(Debug)]
pub struct Session {
    pool: Vec<FlashCard>,
    current_idx: usize,
    graded: HashSet<String>,
    state: SessionState,
}

impl Session {
    /// Build a session from the cards of the selected subjects
    ///
    /// `shuffle` is only called for `StudyOrder::Random`.
    pub fn start<F>(
        subjects: &[Subject],
        selected: &HashSet<String>,
        order: StudyOrder,
        now: DateTime<Utc>,
        shuffle: F,
    ) -> Self
    where
        F: FnOnce(&mut [FlashCard]),
    {
        let mut seen = HashSet::new();
        let pool: Vec<FlashCard> = subjects
            .iter()
            .filter(|subject| selected.contains(&subject.id))
            .flat_map(|subject| subject.cards.iter())
            .filter(|card| seen.insert(card.id.clone()))
            .cloned()
            .collect();

        Self::from_pool(pool, order, now, shuffle)
    }

    /// Build a session over an explicit pool of cards
    pub fn from_pool<F>(
        mut pool: Vec<FlashCard>,
        order: StudyOrder,
        now: DateTime<Utc>,
        shuffle: F,
    ) -> Self
    where
        F: FnOnce(&mut [FlashCard]),
    {
        match order {
            StudyOrder::Random => shuffle(&mut pool),
            StudyOrder::DueFirst => pool = prioritize(&pool, now),
        }

        let state = if pool.is_empty() {
            SessionState::Empty
        } else {
            SessionState::InProgress
        };

        tracing::debug!(cards = pool.len(), ?order, "session started");

        Self {
            pool,
            current_idx: 0,
            graded: HashSet::new(),
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state != SessionState::InProgress
    }

    /// The card awaiting a grade, if any
    pub fn current(&self) -> Option<&FlashCard> {
        match self.state {
            SessionState::InProgress => self.pool.get(self.current_idx),
            _ => None,
        }
    }

    /// Grade the current card and advance
    ///
    /// Returns `None` without touching any state when there is no current card.
    pub fn grade(&mut self, grade: Grade, now: DateTime<Utc>) -> Option<GradeOutcome> {
        let card = self.current()?;
        let updated = compute_next_review(card, grade.quality(), now);

        tracing::debug!(
            card = %updated.id,
            grade = grade.label(),
            interval = updated.interval,
            efactor = updated.efactor,
            "card graded"
        );

        self.graded.insert(updated.id.clone());
        self.current_idx += 1;

        let finished = self.current_idx >= self.pool.len();
        if finished {
            self.state = SessionState::Completed;
        }

        Some(GradeOutcome {
            card: updated,
            grade,
            finished,
        })
    }

    pub fn total(&self) -> usize {
        self.pool.len()
    }

    /// Cards not yet graded in this session
    pub fn remaining(&self) -> usize {
        self.pool.len() - self.graded.len()
    }

    /// 1-based position of the current card
    pub fn position(&self) -> usize {
        (self.current_idx + 1).min(self.pool.len())
    }

    pub fn graded(&self) -> usize {
        self.graded.len()
    }

    pub fn is_graded(&self, id: &str) -> bool {
        self.graded.contains(id)
    }

    /// Ungraded cards in study order
    pub fn upcoming(&self) -> &[FlashCard] {
        &self.pool[self.current_idx.min(self.pool.len())..]
    }
}
