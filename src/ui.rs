use crate::card::{FlashCard, Subject};
use crate::scheduler::{Grade, format_interval};
use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Gauge, Paragraph, Wrap},
};
use std::collections::HashSet;

/// Keys that grade a card, in `Grade::ALL` order
pub const GRADE_KEYS: [char; 4] = ['1', '2', '3', '4'];

/// UI state for the study screen
pub struct StudyView<'a> {
    pub card: &'a FlashCard,
    /// 1-based position in the session
    pub position: usize,
    pub total: usize,
    /// Cards not yet graded, including the current one
    pub remaining: usize,
    pub flipped: bool,
    /// Interval each grade would schedule, when enabled
    pub previews: Option<[u32; 4]>,
}

fn subject_color(subject: &Subject) -> Color {
    subject.color.parse().unwrap_or(Color::Cyan)
}

/// Render subject selection screen
pub fn render_subject_selection(
    frame: &mut Frame,
    subjects: &[Subject],
    selected: &HashSet<String>,
    cursor: usize,
    message: Option<&str>,
    now: DateTime<Utc>,
) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(2),
        Constraint::Length(
            u16::try_from(subjects.len().max(1))
                .unwrap_or(u16::MAX)
                .saturating_add(1),
        ),
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .split(area);

    let title = Paragraph::new("Select subjects to study")
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center);
    frame.render_widget(title, chunks[1]);

    let mut lines: Vec<Line> = Vec::new();

    if subjects.is_empty() {
        lines.push(Line::from(Span::styled(
            "No subjects yet. Add .tsv files to your subjects directory.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (i, subject) in subjects.iter().enumerate() {
        let pointer = if i == cursor { "> " } else { "  " };
        let mark = if selected.contains(&subject.id) {
            "[x] "
        } else {
            "[ ] "
        };
        let style = if i == cursor {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{}{}", pointer, mark), style),
            Span::styled(
                format!("{} ", subject.icon.glyph()),
                Style::default().fg(subject_color(subject)),
            ),
            Span::styled(
                format!(
                    "{} ({} due / {} cards)",
                    subject.name,
                    subject.due_count(now),
                    subject.cards.len()
                ),
                style,
            ),
        ]));
    }

    let list = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(list, chunks[2]);

    let hint = if selected.is_empty() {
        "space: select   enter: start   q: quit".to_string()
    } else {
        format!(
            "space: select   enter: start studying ({})   q: quit",
            selected.len()
        )
    };
    let hint = Paragraph::new(hint)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(hint, chunks[3]);

    if let Some(msg) = message {
        let message = Paragraph::new(msg)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        frame.render_widget(message, chunks[4]);
    }
}

/// Render the current card
pub fn render_study(frame: &mut Frame, view: &StudyView) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1), // Card X of Y
        Constraint::Length(1), // Progress
        Constraint::Length(1), // Spacer
        Constraint::Length(7), // Card
        Constraint::Length(1), // Spacer
        Constraint::Length(1), // Grades or flip hint
        Constraint::Fill(1),
    ])
    .split(area);

    let [_, card_column, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Max(60),
        Constraint::Fill(1),
    ])
    .areas(chunks[4]);

    let counter = format!(
        "Card {} of {} ({} left)",
        view.position, view.total, view.remaining
    );
    let counter = Paragraph::new(counter)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(counter, chunks[1]);

    let ratio = if view.total > 0 {
        view.position as f64 / view.total as f64
    } else {
        0.0
    };
    let progress = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.clamp(0.0, 1.0))
        .label("");
    let [_, progress_column, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Max(60),
        Constraint::Fill(1),
    ])
    .areas(chunks[2]);
    frame.render_widget(progress, progress_column);

    let (side, text) = if view.flipped {
        ("back", view.card.back.as_str())
    } else {
        ("front", view.card.front.as_str())
    };
    let card = Paragraph::new(text)
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::bordered()
                .title(side)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(card, card_column);

    let footer = if view.flipped {
        render_grades(view.previews)
    } else {
        Line::from(Span::styled(
            "space: show answer   esc: end session",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center),
        chunks[6],
    );
}

fn grade_color(grade: Grade) -> Color {
    match grade {
        Grade::Forgot => Color::Red,
        Grade::Hard => Color::Yellow,
        Grade::Good => Color::Green,
        Grade::Easy => Color::Cyan,
    }
}

/// Grade bar: "1 forgot (1d)   2 hard (1d)   ..."
fn render_grades(previews: Option<[u32; 4]>) -> Line<'static> {
    let mut spans = Vec::new();

    for (i, grade) in Grade::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        spans.push(Span::styled(
            format!("{} ", GRADE_KEYS[i]),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::styled(
            grade.label(),
            Style::default().fg(grade_color(*grade)),
        ));
        if let Some(previews) = previews {
            spans.push(Span::styled(
                format!(" ({})", format_interval(previews[i])),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    Line::from(spans)
}

/// Render session summary
pub fn render_summary(frame: &mut Frame, reviewed: usize, lapses: usize, total_time_secs: u64) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(7),
        Constraint::Fill(1),
    ])
    .split(area);

    let recalled = reviewed - lapses.min(reviewed);
    let accuracy = if reviewed > 0 {
        (recalled as f64 / reviewed as f64) * 100.0
    } else {
        0.0
    };

    let lines = vec![
        Line::from(Span::styled(
            "Session Complete",
            Style::default().fg(Color::Green),
        )),
        Line::from(""),
        Line::from(format!("Cards reviewed: {}", reviewed)),
        Line::from(format!("Recalled: {} ({:.0}%)", recalled, accuracy)),
        Line::from(format!("Time: {}s", total_time_secs)),
        Line::from(""),
        Line::from(Span::styled(
            "Press q to quit or any other key to return to the subjects",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let summary = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(summary, chunks[1]);
}

/// Render the screen for a session with no cards
pub fn render_empty(frame: &mut Frame) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(4),
        Constraint::Fill(1),
    ])
    .split(area);

    let lines = vec![
        Line::from(Span::styled(
            "No cards to study",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to go back to the subjects",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        chunks[1],
    );
}
