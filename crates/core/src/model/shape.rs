//! Structural validation of persisted course data.
//!
//! Stored blobs are checked once at the storage boundary before they become
//! typed entities. Anything that fails is reported as a [`ShapeError`].

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::model::collection::Collection;
use crate::model::course::{Course, CourseStatus};
use crate::model::ids::{CourseId, LessonId, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShapeError {
    #[error("stored data is not valid JSON: {0}")]
    Json(String),

    #[error("stored data is not an array of courses")]
    NotAnArray,

    #[error("course at index {index} has an invalid `{field}` field")]
    InvalidField { index: usize, field: &'static str },

    #[error("course id {0} appears more than once")]
    DuplicateCourseId(CourseId),

    #[error("module {module} appears more than once in course {course}")]
    DuplicateModuleId { course: CourseId, module: ModuleId },

    #[error("lesson {lesson} appears more than once in module {module} of course {course}")]
    DuplicateLessonId {
        course: CourseId,
        module: ModuleId,
        lesson: LessonId,
    },

    #[error("course at index {index} could not be decoded: {message}")]
    Decode { index: usize, message: String },
}

/// Returns the name of the first top-level course field that does not match
/// the expected shape.
fn first_invalid_field(value: &Value) -> Option<&'static str> {
    let Some(obj) = value.as_object() else {
        return Some("course");
    };

    let is_string = |key: &str| obj.get(key).is_some_and(Value::is_string);

    if !obj.get("id").is_some_and(Value::is_u64) {
        return Some("id");
    }
    if !is_string("title") {
        return Some("title");
    }
    if !is_string("description") {
        return Some("description");
    }
    let status_ok = obj
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| CourseStatus::ALL.iter().any(|status| status.as_str() == s));
    if !status_ok {
        return Some("status");
    }
    if !is_string("startDate") {
        return Some("startDate");
    }
    if !obj
        .get("endDate")
        .is_none_or(|v| v.is_null() || v.is_string())
    {
        return Some("endDate");
    }
    if !obj.get("modules").is_some_and(Value::is_array) {
        return Some("modules");
    }
    None
}

/// True iff `value` structurally matches the course shape.
#[must_use]
pub fn is_valid_course(value: &Value) -> bool {
    first_invalid_field(value).is_none()
}

/// Checks a single course value, reporting the offending field.
///
/// # Errors
///
/// Returns `ShapeError::InvalidField` naming the first mismatching field.
pub fn check_course_shape(value: &Value, index: usize) -> Result<(), ShapeError> {
    match first_invalid_field(value) {
        Some(field) => Err(ShapeError::InvalidField { index, field }),
        None => Ok(()),
    }
}

/// Rejects repeated module ids within a course and repeated lesson ids within
/// a module.
fn check_unique_ids(course: &Course) -> Result<(), ShapeError> {
    let mut modules = HashSet::with_capacity(course.modules().len());
    for module in course.modules() {
        if !modules.insert(module.id()) {
            return Err(ShapeError::DuplicateModuleId {
                course: course.id(),
                module: module.id(),
            });
        }

        let mut lessons = HashSet::with_capacity(module.lessons().len());
        for lesson in module.lessons() {
            if !lessons.insert(lesson.id()) {
                return Err(ShapeError::DuplicateLessonId {
                    course: course.id(),
                    module: module.id(),
                    lesson: lesson.id().clone(),
                });
            }
        }
    }
    Ok(())
}

/// Parses a stored blob into a typed collection.
///
/// # Errors
///
/// Returns `ShapeError` if the blob is not JSON, is not an array, contains a
/// course with the wrong shape or a repeated course, module or lesson id, or
/// fails typed decoding (e.g. a malformed date or module).
pub fn parse_collection(raw: &str) -> Result<Collection, ShapeError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| ShapeError::Json(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(ShapeError::NotAnArray);
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut courses = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        check_course_shape(&item, index)?;
        let course: Course = serde_json::from_value(item).map_err(|e| ShapeError::Decode {
            index,
            message: e.to_string(),
        })?;
        if !seen.insert(course.id()) {
            return Err(ShapeError::DuplicateCourseId(course.id()));
        }
        check_unique_ids(&course)?;
        courses.push(course);
    }

    Ok(courses.into_iter().collect())
}
