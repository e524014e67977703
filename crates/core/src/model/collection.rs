use serde::{Deserialize, Serialize};

use crate::model::course::Course;
use crate::model::ids::CourseId;

/// The full set of courses, persisted as one JSON array.
///
/// Ids are unique; insertion order is kept so a reload serializes identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    courses: Vec<Course>,
}

impl Collection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: CourseId) -> bool {
        self.find(id).is_some()
    }

    #[must_use]
    pub fn find(&self, id: CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| c.id() == id)
    }

    pub fn find_mut(&mut self, id: CourseId) -> Option<&mut Course> {
        self.courses.iter_mut().find(|c| c.id() == id)
    }

    /// Replaces the course with the same id, or appends it.
    ///
    /// Returns `true` when an existing course was replaced.
    pub fn upsert(&mut self, course: Course) -> bool {
        match self.find_mut(course.id()) {
            Some(existing) => {
                *existing = course;
                true
            }
            None => {
                self.courses.push(course);
                false
            }
        }
    }

    pub fn remove(&mut self, id: CourseId) -> Option<Course> {
        let index = self.courses.iter().position(|c| c.id() == id)?;
        Some(self.courses.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Course> {
        self.courses.iter()
    }
}

impl FromIterator<Course> for Collection {
    fn from_iter<I: IntoIterator<Item = Course>>(iter: I) -> Self {
        let mut collection = Collection::new();
        for course in iter {
            collection.upsert(course);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Course;
    type IntoIter = std::slice::Iter<'a, Course>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_today;

    fn course(id: u64, title: &str) -> Course {
        Course::new(CourseId::new(id), title, "", fixed_today(), Vec::new()).unwrap()
    }

    #[test]
    fn upsert_appends_then_replaces() {
        let mut collection = Collection::new();
        assert!(!collection.upsert(course(1, "Rust")));
        assert!(!collection.upsert(course(2, "Go")));
        assert!(collection.upsert(course(1, "Rust 2nd edition")));

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.courses()[0].title(), "Rust 2nd edition");
        assert_eq!(collection.courses()[1].title(), "Go");
    }

    #[test]
    fn remove_returns_removed_course() {
        let mut collection: Collection = [course(1, "Rust"), course(2, "Go")].into_iter().collect();
        let removed = collection.remove(CourseId::new(1)).unwrap();

        assert_eq!(removed.title(), "Rust");
        assert!(!collection.contains(CourseId::new(1)));
        assert!(collection.remove(CourseId::new(1)).is_none());
    }

    #[test]
    fn serializes_as_plain_array() {
        let collection: Collection = [course(4, "Rust")].into_iter().collect();
        let json = serde_json::to_value(&collection).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["id"], 4);
    }
}
