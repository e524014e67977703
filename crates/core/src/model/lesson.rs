use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;

/// Smallest completable unit of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    lesson_id: LessonId,
    title: String,
    completed: bool,
}

impl Lesson {
    /// Creates an incomplete lesson.
    #[must_use]
    pub fn new(id: impl Into<LessonId>, title: impl Into<String>) -> Self {
        Self {
            lesson_id: id.into(),
            title: title.into(),
            completed: false,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lesson_starts_incomplete() {
        let lesson = Lesson::new("1.1", "Introduction");
        assert_eq!(lesson.id().as_str(), "1.1");
        assert_eq!(lesson.title(), "Introduction");
        assert!(!lesson.is_completed());
    }

    #[test]
    fn uses_camel_case_keys() {
        let json = serde_json::json!({ "lessonId": "2.1", "title": "State", "completed": true });
        let lesson: Lesson = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(lesson.id(), &LessonId::new("2.1"));
        assert!(lesson.is_completed());
        assert_eq!(serde_json::to_value(&lesson).unwrap(), json);
    }
}
