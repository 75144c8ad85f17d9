//! Flashcards grouped into subjects, scheduled with SM-2.
//!
//! [`scheduler`] and [`session`] hold the scheduling engine and perform no
//! I/O; [`storage`], [`subject`], [`app`] and [`ui`] are the terminal app
//! built around them.

pub mod app;
pub mod card;
pub mod config;
pub mod logging;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod subject;
pub mod ui;
