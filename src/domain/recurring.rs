//! Recurring billing templates.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;
use crate::domain::transaction::Transaction;

/// Clones `template` into a fresh transaction every `interval`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringTemplate {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub template: Transaction,
    pub interval: TimeInterval,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end: RecurrenceEnd,
    #[serde(default)]
    pub next_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: RecurrenceStatus,
    #[serde(default)]
    pub generated_count: u32,
    #[serde(default)]
    pub last_generated: Option<NaiveDate>,
    #[serde(default)]
    pub auto_post: bool,
}

impl RecurringTemplate {
    pub fn new(
        name: impl Into<String>,
        template: Transaction,
        interval: TimeInterval,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            template,
            interval,
            start_date,
            end: RecurrenceEnd::Never,
            next_date: Some(start_date),
            status: RecurrenceStatus::Active,
            generated_count: 0,
            last_generated: None,
            auto_post: false,
        }
    }

    pub fn with_end(mut self, end: RecurrenceEnd) -> Self {
        self.end = end;
        self
    }

    pub fn with_auto_post(mut self, auto_post: bool) -> Self {
        self.auto_post = auto_post;
        self
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, RecurrenceStatus::Active)
    }

    /// Whether occurrence number `index` (zero-based) on `candidate` is within the series end.
    pub fn allows(&self, index: u32, candidate: NaiveDate) -> bool {
        if candidate < self.start_date {
            return false;
        }
        match self.end {
            RecurrenceEnd::Never => true,
            RecurrenceEnd::OnDate(end_date) => candidate <= end_date,
            RecurrenceEnd::AfterOccurrences(limit) => index < limit,
        }
    }
}

impl Identifiable for RecurringTemplate {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for RecurringTemplate {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RecurrenceEnd {
    #[default]
    Never,
    OnDate(NaiveDate),
    AfterOccurrences(u32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RecurrenceStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

impl fmt::Display for RecurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecurrenceStatus::Active => "Active",
            RecurrenceStatus::Paused => "Paused",
            RecurrenceStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}
