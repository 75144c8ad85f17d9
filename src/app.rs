use crate::card::{FlashCard, Subject};
use crate::config::Config;
use crate::scheduler::{Grade, preview_intervals};
use crate::session::{Session, SessionState};
use crate::storage::Storage;
use crate::subject::{list_subject_files, load_subject};
use crate::ui;
use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::seq::SliceRandom;
use ratatui::{DefaultTerminal, Frame};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Application state phases
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    SubjectSelection,
    Studying,
    Summary,
    /// The selected subjects had no cards
    Empty,
}

/// Study session statistics
struct SessionStats {
    reviewed: usize,
    lapses: usize,
    start_time: Instant,
    end_time: Option<Instant>,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            reviewed: 0,
            lapses: 0,
            start_time: Instant::now(),
            end_time: None,
        }
    }
}

/// Main application state
pub struct App {
    config: Config,
    storage: Storage,
    phase: Phase,
    // Subject selection state
    subjects: Vec<Subject>,
    selected: HashSet<String>,
    cursor: usize,
    message: Option<&'static str>,
    // Study state
    session: Option<Session>,
    flipped: bool,
    stats: SessionStats,
    should_exit: bool,
}

impl App {
    /// Create a new application
    pub fn new(config: Config) -> Result<Self> {
        let storage = Storage::open(&config.db_path)?;

        Ok(Self {
            config,
            storage,
            phase: Phase::SubjectSelection,
            subjects: Vec::new(),
            selected: HashSet::new(),
            cursor: 0,
            message: None,
            session: None,
            flipped: false,
            stats: SessionStats::new(),
            should_exit: false,
        })
    }

    /// Run the application
    pub fn run(mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.load_subjects()?;

        while !self.should_exit {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }

        Ok(())
    }

    /// Sync subject files into the database and reload subjects with their schedules
    fn load_subjects(&mut self) -> Result<()> {
        let files = list_subject_files(&self.config.subjects_dir)?;
        let mut active = HashSet::new();

        for path in files {
            let subject = load_subject(&path)?;
            self.storage
                .sync_subject(&subject)
                .with_context(|| format!("Failed to store subject from {}", path.display()))?;
            active.insert(subject.id);
        }

        self.storage.delete_orphaned_subjects(&active)?;
        self.subjects = self.storage.load_subjects()?;

        for stats in self.storage.subject_stats(Utc::now())? {
            tracing::info!(
                subject = %stats.id,
                due = stats.due_cards,
                total = stats.total_cards,
                "subject loaded"
            );
        }

        self.selected.retain(|id| active.contains(id));
        self.cursor = self.cursor.min(self.subjects.len().saturating_sub(1));

        Ok(())
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        match self.phase {
            Phase::SubjectSelection => ui::render_subject_selection(
                frame,
                &self.subjects,
                &self.selected,
                self.cursor,
                self.message,
                Utc::now(),
            ),
            Phase::Studying => {
                if let Some(session) = &self.session
                    && let Some(card) = session.current()
                {
                    let previews = self.config.show_intervals.then(|| preview_intervals(card));
                    ui::render_study(
                        frame,
                        &ui::StudyView {
                            card,
                            position: session.position(),
                            total: session.total(),
                            remaining: session.remaining(),
                            flipped: self.flipped,
                            previews,
                        },
                    );
                }
            }
            Phase::Summary => {
                let elapsed = self
                    .stats
                    .end_time
                    .map(|end| end.duration_since(self.stats.start_time))
                    .unwrap_or_else(|| self.stats.start_time.elapsed());
                ui::render_summary(
                    frame,
                    self.stats.reviewed,
                    self.stats.lapses,
                    elapsed.as_secs(),
                );
            }
            Phase::Empty => ui::render_empty(frame),
        }
    }

    /// Handle input events
    fn handle_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(250))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            self.handle_key(key)?;
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Ctrl+C quits from anywhere
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_exit = true;
            return Ok(());
        }

        match self.phase {
            Phase::SubjectSelection => self.handle_subject_selection(key)?,
            Phase::Studying => self.handle_studying(key)?,
            Phase::Summary => self.handle_summary(key)?,
            Phase::Empty => self.back_to_subjects()?,
        }
        Ok(())
    }

    /// Handle subject selection input
    fn handle_subject_selection(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.subjects.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Enter => self.start_studying(),
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_exit = true;
            }
            _ => {}
        }
        Ok(())
    }

    fn toggle_selected(&mut self) {
        self.message = None;
        if let Some(subject) = self.subjects.get(self.cursor)
            && !self.selected.remove(&subject.id)
        {
            self.selected.insert(subject.id.clone());
        }
    }

    /// Start studying the selected subjects
    fn start_studying(&mut self) {
        if self.selected.is_empty() {
            self.message = Some("No subjects selected. Select at least one subject to study.");
            return;
        }

        let session = Session::start(
            &self.subjects,
            &self.selected,
            self.config.order,
            Utc::now(),
            |cards: &mut [FlashCard]| cards.shuffle(&mut rand::rng()),
        );

        tracing::info!(
            subjects = self.selected.len(),
            cards = session.total(),
            order = ?self.config.order,
            "study session started"
        );

        self.message = None;
        self.flipped = false;
        self.stats = SessionStats::new();
        self.phase = if session.state() == SessionState::Empty {
            Phase::Empty
        } else {
            Phase::Studying
        };
        self.session = Some(session);
    }

    /// Handle studying input
    fn handle_studying(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                tracing::info!(graded = self.stats.reviewed, "study session abandoned");
                self.back_to_subjects()?;
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.flipped = !self.flipped;
            }
            KeyCode::Char(c) if self.flipped => {
                if let Some(i) = ui::GRADE_KEYS.iter().position(|k| *k == c) {
                    self.grade_current(Grade::ALL[i])?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Grade the current card, persist it and advance the session
    fn grade_current(&mut self, grade: Grade) -> Result<()> {
        let now = Utc::now();
        let Some(outcome) = self.session.as_mut().and_then(|s| s.grade(grade, now)) else {
            return Ok(());
        };

        self.storage.save_card(&outcome.card)?;
        self.storage
            .record_review(&outcome.card.id, grade.quality().value(), now)?;
        self.replace_card(&outcome.card);

        self.stats.reviewed += 1;
        if grade.quality().is_lapse() {
            self.stats.lapses += 1;
        }
        self.flipped = false;

        if outcome.finished {
            self.stats.end_time = Some(Instant::now());
            tracing::info!(
                reviewed = self.stats.reviewed,
                lapses = self.stats.lapses,
                "study session complete"
            );
            self.phase = Phase::Summary;
        }

        Ok(())
    }

    /// Keep the in-memory subjects in step with what was persisted
    fn replace_card(&mut self, updated: &FlashCard) {
        for card in self
            .subjects
            .iter_mut()
            .flat_map(|s| s.cards.iter_mut())
            .filter(|c| c.id == updated.id)
        {
            *card = updated.clone();
        }
    }

    /// Handle summary input
    fn handle_summary(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('q') {
            self.should_exit = true;
            Ok(())
        } else {
            self.back_to_subjects()
        }
    }

    fn back_to_subjects(&mut self) -> Result<()> {
        self.session = None;
        self.flipped = false;
        self.phase = Phase::SubjectSelection;
        self.load_subjects()
    }
}
