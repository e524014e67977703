//! Completion aggregation: how lesson toggles roll up into module counters and
//! course status, and how manual status changes move the end date.
//!
//! Everything here is synchronous and operates on a borrowed [`Course`]; the
//! caller supplies "today" so results are deterministic.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{Course, CourseId, CourseStatus, LessonId, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("module {module} not found in course {course}")]
    ModuleNotFound { course: CourseId, module: ModuleId },

    #[error("lesson {lesson} not found in module {module}")]
    LessonNotFound { module: ModuleId, lesson: LessonId },
}

/// What a lesson toggle changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonTransition {
    /// The lesson already had the requested value.
    Unchanged,
    Updated {
        module_completed: bool,
        /// The course status moved to `completed` because of this toggle.
        course_promoted: bool,
    },
}

impl LessonTransition {
    #[must_use]
    pub fn is_changed(self) -> bool {
        matches!(self, LessonTransition::Updated { .. })
    }

    #[must_use]
    pub fn course_promoted(self) -> bool {
        matches!(
            self,
            LessonTransition::Updated {
                course_promoted: true,
                ..
            }
        )
    }
}

/// Sets a lesson's completion flag and updates the aggregates.
///
/// When every lesson in the course ends up completed the status becomes
/// `completed` and a missing end date is set to `today`, even if the stored
/// status already read `completed`. Unchecking a lesson
/// never moves the status away from `completed`.
///
/// # Errors
///
/// Returns `ProgressError` if the module or lesson does not exist; the course
/// is left untouched in that case.
pub fn set_lesson_completion(
    course: &mut Course,
    module_id: ModuleId,
    lesson_id: &LessonId,
    completed: bool,
    today: NaiveDate,
) -> Result<LessonTransition, ProgressError> {
    let course_id = course.id();
    let module_completed = {
        let module = course
            .module_mut(module_id)
            .ok_or(ProgressError::ModuleNotFound {
                course: course_id,
                module: module_id,
            })?;
        let total = module.total_lessons();
        let current = module.completed_lessons();

        let lesson = module
            .lesson_mut(lesson_id)
            .ok_or_else(|| ProgressError::LessonNotFound {
                module: module_id,
                lesson: lesson_id.clone(),
            })?;
        if lesson.is_completed() == completed {
            return Ok(LessonTransition::Unchanged);
        }
        lesson.set_completed(completed);

        // Counter stays within 0..=total.
        let next = if completed {
            current.saturating_add(1).min(total)
        } else {
            current.saturating_sub(1)
        };
        module.set_completed_lessons(next);
        module.is_completed()
    };

    let course_complete = course.progress().is_complete();
    let course_promoted = course_complete && course.status() != CourseStatus::Completed;
    if course_complete {
        course.set_status(CourseStatus::Completed);
        if course.end_date().is_none() {
            course.set_end_date(Some(today));
        }
    }

    Ok(LessonTransition::Updated {
        module_completed,
        course_promoted,
    })
}

/// Manually sets the course status.
///
/// Module completion is not consulted. Moving to `completed` stamps a missing
/// end date with `today`; moving to `in-progress` clears it; `paused` keeps it.
pub fn set_course_status(course: &mut Course, status: CourseStatus, today: NaiveDate) {
    match status {
        CourseStatus::Completed => {
            if course.end_date().is_none() {
                course.set_end_date(Some(today));
            }
        }
        CourseStatus::InProgress => course.set_end_date(None),
        CourseStatus::Paused => {}
    }
    course.set_status(status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lesson, Module};
    use crate::time::fixed_today;

    fn two_lesson_course() -> Course {
        let module = Module::new(
            ModuleId::new(1),
            "Module 1",
            vec![Lesson::new("1.1", "Intro"), Lesson::new("1.2", "Basics")],
        )
        .unwrap();
        Course::new(CourseId::new(1), "Rust", "", fixed_today(), vec![module]).unwrap()
    }

    fn two_module_course() -> Course {
        let first = Module::new(
            ModuleId::new(1),
            "Module 1",
            vec![Lesson::new("1.1", "Intro"), Lesson::new("1.2", "Basics")],
        )
        .unwrap();
        let second = Module::new(
            ModuleId::new(2),
            "Module 2",
            vec![Lesson::new("2.1", "State"), Lesson::new("2.2", "Theming")],
        )
        .unwrap();
        Course::new(CourseId::new(2), "Go", "", fixed_today(), vec![first, second]).unwrap()
    }

    fn all_lessons(course: &Course) -> Vec<(ModuleId, LessonId)> {
        course
            .modules()
            .iter()
            .flat_map(|m| m.lessons().iter().map(move |l| (m.id(), l.id().clone())))
            .collect()
    }

    fn permutations(items: &[(ModuleId, LessonId)]) -> Vec<Vec<(ModuleId, LessonId)>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn completing_lessons_in_turn_promotes_course() {
        let mut course = two_lesson_course();
        let today = fixed_today();

        let first =
            set_lesson_completion(&mut course, ModuleId::new(1), &"1.1".into(), true, today)
                .unwrap();
        let module = course.module(ModuleId::new(1)).unwrap();
        assert_eq!(module.completed_lessons(), 1);
        assert!(!module.is_completed());
        assert_eq!(course.status(), CourseStatus::InProgress);
        assert!(!first.course_promoted());

        let second =
            set_lesson_completion(&mut course, ModuleId::new(1), &"1.2".into(), true, today)
                .unwrap();
        let module = course.module(ModuleId::new(1)).unwrap();
        assert_eq!(module.completed_lessons(), 2);
        assert!(module.is_completed());
        assert_eq!(course.status(), CourseStatus::Completed);
        assert_eq!(course.end_date(), Some(today));
        assert_eq!(
            second,
            LessonTransition::Updated {
                module_completed: true,
                course_promoted: true,
            }
        );
    }

    #[test]
    fn repeated_value_is_a_no_op() {
        let mut course = two_lesson_course();
        let before = course.clone();

        let transition =
            set_lesson_completion(&mut course, ModuleId::new(1), &"1.1".into(), false, fixed_today())
                .unwrap();

        assert_eq!(transition, LessonTransition::Unchanged);
        assert_eq!(course, before);
    }

    #[test]
    fn toggling_twice_restores_counters() {
        let base = two_module_course();
        for (module_id, lesson_id) in all_lessons(&base) {
            let mut course = base.clone();
            set_lesson_completion(&mut course, module_id, &lesson_id, true, fixed_today()).unwrap();
            set_lesson_completion(&mut course, module_id, &lesson_id, false, fixed_today())
                .unwrap();
            assert_eq!(course, base, "round trip on {module_id}/{lesson_id}");
        }
    }

    #[test]
    fn counters_stay_within_bounds() {
        let mut course = two_module_course();
        let lessons = all_lessons(&course);
        // Deterministic mixed sequence of set/unset requests.
        for step in 0..64_usize {
            let (module_id, lesson_id) = &lessons[(step * 7 + 3) % lessons.len()];
            let completed = step % 3 != 0;
            set_lesson_completion(&mut course, *module_id, lesson_id, completed, fixed_today())
                .unwrap();

            for module in course.modules() {
                let actual = module.lessons().iter().filter(|l| l.is_completed()).count();
                assert!(module.completed_lessons() <= module.total_lessons());
                assert_eq!(module.completed_lessons() as usize, actual);
                assert_eq!(
                    module.is_completed(),
                    module.completed_lessons() == module.total_lessons()
                );
            }
        }
    }

    #[test]
    fn promotion_happens_once_in_any_order() {
        let base = two_module_course();
        for order in permutations(&all_lessons(&base)) {
            let mut course = base.clone();
            let mut promotions = 0;
            for (index, (module_id, lesson_id)) in order.iter().enumerate() {
                let transition =
                    set_lesson_completion(&mut course, *module_id, lesson_id, true, fixed_today())
                        .unwrap();
                if transition.course_promoted() {
                    promotions += 1;
                    assert_eq!(index, order.len() - 1, "promoted early in {order:?}");
                }
            }
            assert_eq!(promotions, 1);
            assert_eq!(course.status(), CourseStatus::Completed);
        }
    }

    #[test]
    fn unchecking_lesson_keeps_completed_status() {
        // Completion is sticky: unchecking a lesson leaves status and end date alone.
        let mut course = two_lesson_course();
        let today = fixed_today();
        for lesson in ["1.1", "1.2"] {
            set_lesson_completion(&mut course, ModuleId::new(1), &lesson.into(), true, today)
                .unwrap();
        }
        assert_eq!(course.status(), CourseStatus::Completed);

        let transition =
            set_lesson_completion(&mut course, ModuleId::new(1), &"1.2".into(), false, today)
                .unwrap();

        assert!(transition.is_changed());
        assert!(!transition.course_promoted());
        let module = course.module(ModuleId::new(1)).unwrap();
        assert_eq!(module.completed_lessons(), 1);
        assert!(!module.is_completed());
        assert_eq!(course.status(), CourseStatus::Completed);
        assert_eq!(course.end_date(), Some(today));
    }

    #[test]
    fn finishing_a_paused_course_promotes_it() {
        let mut course = two_lesson_course();
        set_course_status(&mut course, CourseStatus::Paused, fixed_today());
        for lesson in ["1.1", "1.2"] {
            set_lesson_completion(&mut course, ModuleId::new(1), &lesson.into(), true, fixed_today())
                .unwrap();
        }
        assert_eq!(course.status(), CourseStatus::Completed);
    }

    #[test]
    fn finishing_stored_completed_course_stamps_missing_end_date() {
        let mut course: Course = serde_json::from_value(serde_json::json!({
            "id": 4,
            "title": "Legacy",
            "description": "",
            "status": "completed",
            "startDate": "2023-01-01",
            "modules": [{
                "moduleId": 1,
                "title": "Module 1",
                "totalLessons": 2,
                "completedLessons": 0,
                "lessons": [
                    { "lessonId": "1.1", "title": "Intro", "completed": false },
                    { "lessonId": "1.2", "title": "Basics", "completed": false }
                ],
                "completed": false
            }]
        }))
        .unwrap();
        assert_eq!(course.end_date(), None);

        let today = fixed_today();
        set_lesson_completion(&mut course, ModuleId::new(1), &"1.1".into(), true, today).unwrap();
        assert_eq!(course.end_date(), None);

        let last =
            set_lesson_completion(&mut course, ModuleId::new(1), &"1.2".into(), true, today)
                .unwrap();
        assert!(!last.course_promoted());
        assert_eq!(course.status(), CourseStatus::Completed);
        assert_eq!(course.end_date(), Some(today));
    }

    #[test]
    fn unknown_module_or_lesson_is_not_found() {
        let mut course = two_lesson_course();
        let before = course.clone();

        let err =
            set_lesson_completion(&mut course, ModuleId::new(9), &"1.1".into(), true, fixed_today())
                .unwrap_err();
        assert_eq!(
            err,
            ProgressError::ModuleNotFound {
                course: CourseId::new(1),
                module: ModuleId::new(9),
            }
        );

        let err =
            set_lesson_completion(&mut course, ModuleId::new(1), &"9.9".into(), true, fixed_today())
                .unwrap_err();
        assert_eq!(
            err,
            ProgressError::LessonNotFound {
                module: ModuleId::new(1),
                lesson: LessonId::new("9.9"),
            }
        );
        assert_eq!(course, before);
    }

    #[test]
    fn completed_status_sets_end_date_once() {
        let mut course = two_lesson_course();
        let today = fixed_today();
        set_course_status(&mut course, CourseStatus::Completed, today);
        assert_eq!(course.status(), CourseStatus::Completed);
        assert_eq!(course.end_date(), Some(today));

        let later = today.succ_opt().unwrap();
        set_course_status(&mut course, CourseStatus::Completed, later);
        assert_eq!(course.end_date(), Some(today));
    }

    #[test]
    fn in_progress_clears_end_date_and_paused_keeps_it() {
        let mut course = two_lesson_course();
        let today = fixed_today();

        set_course_status(&mut course, CourseStatus::Completed, today);
        set_course_status(&mut course, CourseStatus::Paused, today);
        assert_eq!(course.status(), CourseStatus::Paused);
        assert_eq!(course.end_date(), Some(today));

        set_course_status(&mut course, CourseStatus::InProgress, today);
        assert_eq!(course.status(), CourseStatus::InProgress);
        assert_eq!(course.end_date(), None);
    }

    #[test]
    fn status_override_ignores_module_state() {
        let mut course = two_lesson_course();
        set_course_status(&mut course, CourseStatus::Completed, fixed_today());
        assert_eq!(course.status(), CourseStatus::Completed);
        assert_eq!(course.progress().completed_lessons, 0);

        for lesson in ["1.1", "1.2"] {
            set_lesson_completion(&mut course, ModuleId::new(1), &lesson.into(), true, fixed_today())
                .unwrap();
        }
        set_course_status(&mut course, CourseStatus::InProgress, fixed_today());
        assert_eq!(course.status(), CourseStatus::InProgress);
        assert!(course.progress().is_complete());
    }
}
