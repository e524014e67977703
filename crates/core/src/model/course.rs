use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, ModuleId};
use crate::model::module::Module;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("module {0} appears more than once")]
    DuplicateModuleId(ModuleId),

    #[error("lesson {lesson} appears more than once in module {module}")]
    DuplicateLessonId { module: ModuleId, lesson: LessonId },

    #[error("module {0} has too many lessons")]
    TooManyLessons(ModuleId),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CourseStatus {
    Completed,
    InProgress,
    Paused,
}

impl CourseStatus {
    pub const ALL: [CourseStatus; 3] = [Self::Completed, Self::InProgress, Self::Paused];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::Completed => "completed",
            CourseStatus::InProgress => "in-progress",
            CourseStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown course status: {raw}")]
pub struct ParseStatusError {
    raw: String,
}

impl FromStr for CourseStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == trimmed)
            .ok_or_else(|| ParseStatusError {
                raw: trimmed.to_owned(),
            })
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Lesson totals summed across a course's modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseProgress {
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub percent: u8,
}

impl CourseProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_lessons == self.total_lessons
    }
}

/// Rounds `completed / total` to a whole percent, `0` when `total` is zero.
pub(crate) fn rounded_percent(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let percent = (completed * 200 + total) / (total * 2);
    u8::try_from(percent).unwrap_or(100)
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A trackable learning unit composed of modules.
///
/// Fields stay private; lesson and status transitions go through
/// [`crate::progress`] so counters and dates stay consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    id: CourseId,
    title: String,
    description: String,
    status: CourseStatus,
    start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
    modules: Vec<Module>,
}

impl Course {
    /// Creates a new in-progress course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is blank, or
    /// `CourseError::DuplicateModuleId` if two modules share an id.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: impl Into<String>,
        start_date: NaiveDate,
        modules: Vec<Module>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(modules.len());
        for module in &modules {
            if !seen.insert(module.id()) {
                return Err(CourseError::DuplicateModuleId(module.id()));
            }
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description: description.into().trim().to_owned(),
            status: CourseStatus::InProgress,
            start_date,
            end_date: None,
            modules,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.status
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id() == id)
    }

    /// Sums lesson counters across all modules.
    #[must_use]
    pub fn progress(&self) -> CourseProgress {
        let (total_lessons, completed_lessons) =
            self.modules.iter().fold((0_u32, 0_u32), |(total, done), m| {
                (
                    total.saturating_add(m.total_lessons()),
                    done.saturating_add(m.completed_lessons()),
                )
            });

        CourseProgress {
            total_lessons,
            completed_lessons,
            percent: rounded_percent(completed_lessons, total_lessons),
        }
    }

    pub(crate) fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id() == id)
    }

    pub(crate) fn set_status(&mut self, status: CourseStatus) {
        self.status = status;
    }

    pub(crate) fn set_end_date(&mut self, end_date: Option<NaiveDate>) {
        self.end_date = end_date;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
