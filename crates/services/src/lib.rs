#![forbid(unsafe_code)]

pub mod course_service;
pub mod error;

pub use progress_core::Clock;

pub use course_service::{CourseService, DEFAULT_STORAGE_KEY};
pub use error::CourseServiceError;
