use chrono::{DateTime, Utc};

/// Easiness factor given to a card that has never been graded
pub const DEFAULT_EFACTOR: f64 = 2.5;

/// Lower bound for the easiness factor
pub const MIN_EFACTOR: f64 = 1.3;

/// A single flashcard with its scheduling state
///
/// Cards are values: grading produces a new card instead of mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashCard {
    pub id: String,
    pub front: String,
    pub back: String,
    /// Consecutive successful recalls since the last lapse
    pub repetitions: u32,
    /// Days until the next review (0 until first graded)
    pub interval: u32,
    pub efactor: f64,
    pub last_studied: Option<DateTime<Utc>>,
    pub next_study: Option<DateTime<Utc>>,
}

impl FlashCard {
    /// Create a card that has never been studied
    pub fn new(id: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front: front.into(),
            back: back.into(),
            repetitions: 0,
            interval: 0,
            efactor: DEFAULT_EFACTOR,
            last_studied: None,
            next_study: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.last_studied.is_none()
    }

    /// Never-studied cards are always due; a studied card without a
    /// `next_study` never is
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match (self.last_studied, self.next_study) {
            (None, _) => true,
            (Some(_), Some(next)) => next <= now,
            (Some(_), None) => false,
        }
    }
}

/// Icon shown next to a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectIcon {
    Languages,
    Flask,
    Calculator,
    #[default]
    Book,
}

impl SubjectIcon {
    /// Unknown names fall back to the book icon
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "languages" | "language" => SubjectIcon::Languages,
            "flask" | "science" => SubjectIcon::Flask,
            "calculator" | "math" => SubjectIcon::Calculator,
            _ => SubjectIcon::Book,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectIcon::Languages => "languages",
            SubjectIcon::Flask => "flask",
            SubjectIcon::Calculator => "calculator",
            SubjectIcon::Book => "book",
        }
    }

    /// Glyph used in the terminal UI
    pub fn glyph(&self) -> &'static str {
        match self {
            SubjectIcon::Languages => "文",
            SubjectIcon::Flask => "⚗",
            SubjectIcon::Calculator => "∑",
            SubjectIcon::Book => "▤",
        }
    }
}

/// A named group of flashcards
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Colour name or `#rrggbb`
    pub color: String,
    pub icon: SubjectIcon,
    pub cards: Vec<FlashCard>,
}

impl Subject {
    pub fn due_count(&self, now: DateTime<Utc>) -> usize {
        self.cards.iter().filter(|c| c.is_due(now)).count()
    }
}
