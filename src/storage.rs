use crate::card::{FlashCard, Subject, SubjectIcon};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use std::collections::HashSet;
use std::path::Path;

/// Due and total card counts for one subject
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectStats {
    pub id: String,
    pub name: String,
    pub total_cards: usize,
    pub due_cards: usize,
}

/// A logged grading event
#[derive(Debug, Clone)]
pub struct Review {
    pub card_id: String,
    pub quality: u8,
    pub reviewed_at: DateTime<Utc>,
}

pub struct Storage {
    conn: Connection,
}

const CARD_COLUMNS: &str =
    "id, front, back, repetitions, interval, efactor, last_studied, next_study";

impl Storage {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let storage = Storage { conn };
        storage.init_schema()?;

        Ok(storage)
    }

    /// In-memory database, used by tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let storage = Storage {
            conn: Connection::open_in_memory()?,
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS subjects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                color TEXT NOT NULL,
                icon TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                subject_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                repetitions INTEGER NOT NULL DEFAULT 0,
                interval INTEGER NOT NULL DEFAULT 0,
                efactor REAL NOT NULL DEFAULT 2.5,
                last_studied TEXT,
                next_study TEXT,
                FOREIGN KEY (subject_id) REFERENCES subjects(id)
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                card_id TEXT NOT NULL,
                quality INTEGER NOT NULL,
                reviewed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cards_subject ON cards(subject_id);
            CREATE INDEX IF NOT EXISTS idx_cards_next_study ON cards(next_study);
            CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_id);
            ",
        )?;

        Ok(())
    }

    /// Upsert a subject and its cards' content, keeping existing scheduling state
    /// Cards that are no longer part of the subject are deleted
    pub fn sync_subject(&mut self, subject: &Subject) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO subjects (id, name, description, color, icon)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = ?2, description = ?3, color = ?4, icon = ?5",
            params![
                subject.id,
                subject.name,
                subject.description,
                subject.color,
                subject.icon.as_str()
            ],
        )?;

        let mut keep = HashSet::new();
        for (position, card) in subject.cards.iter().enumerate() {
            keep.insert(card.id.as_str());
            tx.execute(
                "INSERT INTO cards (id, subject_id, position, front, back,
                                    repetitions, interval, efactor)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    subject_id = ?2, position = ?3, front = ?4, back = ?5",
                params![
                    card.id,
                    subject.id,
                    position as i64,
                    card.front,
                    card.back,
                    card.repetitions,
                    card.interval,
                    card.efactor
                ],
            )?;
        }

        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM cards WHERE subject_id = ?1")?;
            stmt.query_map(params![subject.id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut removed = 0;
        for id in existing.iter().filter(|id| !keep.contains(id.as_str())) {
            tx.execute("DELETE FROM reviews WHERE card_id = ?1", params![id])?;
            tx.execute("DELETE FROM cards WHERE id = ?1", params![id])?;
            removed += 1;
        }

        tx.commit()?;

        tracing::debug!(
            subject = %subject.id,
            cards = subject.cards.len(),
            removed,
            "subject synced"
        );

        Ok(())
    }

    /// Delete subjects (and their cards) whose id is not in `active`
    pub fn delete_orphaned_subjects(&mut self, active: &HashSet<String>) -> Result<usize> {
        let ids: Vec<String> = {
            let mut stmt = self.conn.prepare("SELECT id FROM subjects")?;
            stmt.query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };

        let tx = self.conn.transaction()?;
        let mut deleted = 0;
        for id in ids.iter().filter(|id| !active.contains(*id)) {
            tx.execute(
                "DELETE FROM reviews WHERE card_id IN (SELECT id FROM cards WHERE subject_id = ?1)",
                params![id],
            )?;
            tx.execute("DELETE FROM cards WHERE subject_id = ?1", params![id])?;
            tx.execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
            tracing::info!(subject = %id, "removed subject without a file");
            deleted += 1;
        }
        tx.commit()?;

        Ok(deleted)
    }

    /// Load all subjects with their cards' current scheduling state
    pub fn load_subjects(&self) -> Result<Vec<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, color, icon FROM subjects ORDER BY name, id")?;

        let mut subjects = stmt
            .query_map([], |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    color: row.get(3)?,
                    icon: SubjectIcon::parse(&row.get::<_, String>(4)?),
                    cards: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for subject in &mut subjects {
            subject.cards = self.get_cards_for_subject(&subject.id)?;
        }

        Ok(subjects)
    }

    /// Get all cards for a subject in authored order
    pub fn get_cards_for_subject(&self, subject_id: &str) -> Result<Vec<FlashCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cards WHERE subject_id = ?1 ORDER BY position",
            CARD_COLUMNS
        ))?;

        let cards = stmt
            .query_map(params![subject_id], card_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(cards)
    }

    /// Get a card by ID
    pub fn get_card(&self, id: &str) -> Result<Option<FlashCard>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS))?;

        match stmt.query_row(params![id], card_from_row) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a graded card's scheduling state (last write wins)
    pub fn save_card(&self, card: &FlashCard) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE cards SET
                repetitions = ?1,
                interval = ?2,
                efactor = ?3,
                last_studied = ?4,
                next_study = ?5
             WHERE id = ?6",
            params![
                card.repetitions,
                card.interval,
                card.efactor,
                card.last_studied.map(timestamp),
                card.next_study.map(timestamp),
                card.id
            ],
        )?;

        if updated == 0 {
            tracing::warn!(card = %card.id, "graded card no longer exists");
        }

        Ok(())
    }

    /// Append a grading event to the review log
    pub fn record_review(&self, card_id: &str, quality: u8, reviewed_at: DateTime<Utc>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO reviews (card_id, quality, reviewed_at) VALUES (?1, ?2, ?3)",
            params![card_id, quality, timestamp(reviewed_at)],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Get the review log for a card, oldest first
    pub fn get_reviews_for_card(&self, card_id: &str) -> Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(
            "SELECT card_id, quality, reviewed_at
             FROM reviews WHERE card_id = ?1 ORDER BY reviewed_at ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(params![card_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u8>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(card_id, quality, reviewed_at)| {
                let reviewed_at = reviewed_at
                    .parse()
                    .with_context(|| format!("Invalid review timestamp: {}", reviewed_at))?;
                Ok(Review {
                    card_id,
                    quality,
                    reviewed_at,
                })
            })
            .collect()
    }

    /// Get all subjects with card counts
    pub fn subject_stats(&self, now: DateTime<Utc>) -> Result<Vec<SubjectStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.name, COUNT(c.id),
                    COALESCE(SUM(CASE WHEN c.id IS NOT NULL
                                       AND (c.last_studied IS NULL OR c.next_study <= ?1)
                                      THEN 1 ELSE 0 END), 0)
             FROM subjects s LEFT JOIN cards c ON c.subject_id = s.id
             GROUP BY s.id ORDER BY s.name, s.id",
        )?;

        let stats = stmt
            .query_map(params![timestamp(now)], |row| {
                Ok(SubjectStats {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    total_cards: row.get::<_, i64>(2)? as usize,
                    due_cards: row.get::<_, i64>(3)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stats)
    }
}

/// Fixed-width UTC timestamps so that text comparison in SQL orders correctly
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn card_from_row(row: &Row) -> rusqlite::Result<FlashCard> {
    Ok(FlashCard {
        id: row.get(0)?,
        front: row.get(1)?,
        back: row.get(2)?,
        repetitions: row.get(3)?,
        interval: row.get(4)?,
        efactor: row.get(5)?,
        last_studied: row.get::<_, Option<String>>(6)?.and_then(|s| s.parse().ok()),
        next_study: row.get::<_, Option<String>>(7)?.and_then(|s| s.parse().ok()),
    })
}
