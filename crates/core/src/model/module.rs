use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::course::CourseError;
use crate::model::ids::{LessonId, ModuleId};
use crate::model::lesson::Lesson;

/// A named group of lessons with its own completion aggregate.
///
/// `total_lessons` is fixed when the module is built and trusted afterwards;
/// `completed_lessons` and `completed` are kept in step by the progress engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    module_id: ModuleId,
    title: String,
    total_lessons: u32,
    completed_lessons: u32,
    lessons: Vec<Lesson>,
    completed: bool,
}

impl Module {
    /// Creates a module and derives its counters from `lessons`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::DuplicateLessonId` if two lessons share an id,
    /// or `CourseError::TooManyLessons` if the count does not fit in a `u32`.
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        lessons: Vec<Lesson>,
    ) -> Result<Self, CourseError> {
        let mut seen = HashSet::with_capacity(lessons.len());
        for lesson in &lessons {
            if !seen.insert(lesson.id()) {
                return Err(CourseError::DuplicateLessonId {
                    module: id,
                    lesson: lesson.id().clone(),
                });
            }
        }

        let total_lessons =
            u32::try_from(lessons.len()).map_err(|_| CourseError::TooManyLessons(id))?;
        let completed_lessons = u32::try_from(lessons.iter().filter(|l| l.is_completed()).count())
            .map_err(|_| CourseError::TooManyLessons(id))?;

        Ok(Self {
            module_id: id,
            title: title.into().trim().to_owned(),
            total_lessons,
            completed_lessons,
            lessons,
            completed: completed_lessons == total_lessons,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn total_lessons(&self) -> u32 {
        self.total_lessons
    }

    #[must_use]
    pub fn completed_lessons(&self) -> u32 {
        self.completed_lessons
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id() == id)
    }

    /// Completed share of this module's lessons, rounded to a whole percent.
    #[must_use]
    pub fn percent_complete(&self) -> u8 {
        super::course::rounded_percent(self.completed_lessons, self.total_lessons)
    }

    pub(crate) fn lesson_mut(&mut self, id: &LessonId) -> Option<&mut Lesson> {
        self.lessons.iter_mut().find(|l| l.id() == id)
    }

    pub(crate) fn set_completed_lessons(&mut self, completed_lessons: u32) {
        self.completed_lessons = completed_lessons;
        self.completed = self.completed_lessons == self.total_lessons;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_counters_from_lessons() {
        let done: Lesson = serde_json::from_value(serde_json::json!({
            "lessonId": "1.1", "title": "Intro", "completed": true
        }))
        .unwrap();
        let module = Module::new(
            ModuleId::new(1),
            " Module 1 ",
            vec![done, Lesson::new("1.2", "Basics")],
        )
        .unwrap();

        assert_eq!(module.title(), "Module 1");
        assert_eq!(module.total_lessons(), 2);
        assert_eq!(module.completed_lessons(), 1);
        assert!(!module.is_completed());
        assert_eq!(module.percent_complete(), 50);
    }

    #[test]
    fn new_rejects_duplicate_lesson_ids() {
        let err = Module::new(
            ModuleId::new(3),
            "Dupes",
            vec![Lesson::new("3.1", "A"), Lesson::new("3.1", "B")],
        )
        .unwrap_err();

        assert_eq!(
            err,
            CourseError::DuplicateLessonId {
                module: ModuleId::new(3),
                lesson: LessonId::new("3.1"),
            }
        );
    }

    #[test]
    fn empty_module_counts_as_completed() {
        let module = Module::new(ModuleId::new(1), "Empty", Vec::new()).unwrap();
        assert!(module.is_completed());
        assert_eq!(module.percent_complete(), 0);
    }

    #[test]
    fn deserialization_trusts_total_lessons() {
        let module: Module = serde_json::from_value(serde_json::json!({
            "moduleId": 2,
            "title": "Authored",
            "totalLessons": 5,
            "completedLessons": 0,
            "lessons": [{ "lessonId": "2.1", "title": "Only one so far", "completed": false }],
            "completed": false
        }))
        .unwrap();
        assert_eq!(module.total_lessons(), 5);
        assert_eq!(module.lessons().len(), 1);
    }
}
