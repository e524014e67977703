mod collection;
mod course;
mod draft;
mod ids;
mod lesson;
mod module;
pub mod shape;

pub use ids::{CourseId, LessonId, ModuleId, ParseIdError};

pub use collection::Collection;
pub use course::{Course, CourseError, CourseProgress, CourseStatus, ParseStatusError};
pub use draft::{CourseDraft, starter_modules};
pub use lesson::Lesson;
pub use module::Module;
pub use shape::{ShapeError, is_valid_course, parse_collection};
