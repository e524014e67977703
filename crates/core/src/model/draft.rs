use chrono::NaiveDate;

use crate::model::course::{Course, CourseError};
use crate::model::ids::{CourseId, ModuleId};
use crate::model::lesson::Lesson;
use crate::model::module::Module;

/// Lessons every new course starts with, grouped by module.
const STARTER_CURRICULUM: &[(&str, &[(&str, &str)])] = &[
    (
        "Module 1",
        &[
            ("1.1", "Introduction"),
            ("1.2", "Basic Concepts"),
            ("1.3", "Setting Up"),
            ("1.4", "First Project"),
        ],
    ),
    (
        "Module 2",
        &[
            ("2.1", "Advanced Concepts"),
            ("2.2", "Working with State"),
            ("2.3", "Navigation"),
            ("2.4", "Theming"),
            ("2.5", "Performance"),
        ],
    ),
];

/// Builds the starter modules, numbered from 1.
///
/// # Errors
///
/// Returns `CourseError` only if the curriculum table itself is inconsistent.
pub fn starter_modules() -> Result<Vec<Module>, CourseError> {
    STARTER_CURRICULUM
        .iter()
        .zip(1_u64..)
        .map(|((title, lessons), id)| {
            let lessons = lessons
                .iter()
                .map(|(lesson_id, lesson_title)| Lesson::new(*lesson_id, *lesson_title))
                .collect();
            Module::new(ModuleId::new(id), *title, lessons)
        })
        .collect()
}

/// User input for a new course.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    /// Defaults to today when unset.
    pub start_date: Option<NaiveDate>,
}

impl CourseDraft {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Turns the draft into an in-progress course with the starter modules.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is blank.
    pub fn into_course(self, id: CourseId, today: NaiveDate) -> Result<Course, CourseError> {
        if self.title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        let start_date = self.start_date.unwrap_or(today);
        Course::new(id, self.title, self.description, start_date, starter_modules()?)
    }
}
