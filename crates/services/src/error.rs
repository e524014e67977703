//! Shared error types for the services crate.

use thiserror::Error;

use progress_core::model::{CourseError, CourseId};
use progress_core::progress::ProgressError;
use storage::repository::StorageError;

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

impl CourseServiceError {
    /// True when a course, module or lesson id did not resolve.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CourseServiceError::CourseNotFound(_) | CourseServiceError::Progress(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::{LessonId, ModuleId};

    #[test]
    fn not_found_covers_course_module_and_lesson() {
        assert!(CourseServiceError::CourseNotFound(CourseId::new(1)).is_not_found());
        assert!(
            CourseServiceError::from(ProgressError::LessonNotFound {
                module: ModuleId::new(1),
                lesson: LessonId::new("1.9"),
            })
            .is_not_found()
        );
        assert!(!CourseServiceError::from(CourseError::EmptyTitle).is_not_found());
        assert!(
            !CourseServiceError::from(StorageError::Connection("down".into())).is_not_found()
        );
    }
}
