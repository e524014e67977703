use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use tokio::sync::Mutex;

use progress_core::model::{
    Collection, Course, CourseDraft, CourseId, CourseStatus, LessonId, ModuleId, parse_collection,
};
use progress_core::progress;
use storage::repository::{KeyValueStore, StorageError};

use crate::Clock;
use crate::error::CourseServiceError;

/// Storage key holding the serialized course collection.
pub const DEFAULT_STORAGE_KEY: &str = "courseProgressData";

/// Largest id handed out to new courses; stays exact in JSON consumers that
/// read numbers as doubles.
const MAX_COURSE_ID: u64 = (1 << 53) - 1;

/// Reads and writes the whole course collection through a key-value store.
///
/// Every mutation is a read-modify-write of the entire blob. Mutations are
/// serialized through an async mutex shared by all clones of the service, so
/// two concurrent toggles cannot overwrite each other's write.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl CourseService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            clock,
            store,
            key: DEFAULT_STORAGE_KEY.to_owned(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Use a different storage key than [`DEFAULT_STORAGE_KEY`].
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Load every stored course.
    ///
    /// Missing, unreadable or malformed data yields an empty collection; the
    /// failure is logged and never returned.
    pub async fn load_all(&self) -> Collection {
        match self.read_collection().await {
            Ok(collection) => collection,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to read course data");
                Collection::new()
            }
        }
    }

    /// Fetch a single course by id.
    ///
    /// Returns `None` when the course does not exist or nothing can be loaded.
    pub async fn find_course(&self, course_id: CourseId) -> Option<Course> {
        self.load_all().await.find(course_id).cloned()
    }

    /// Serialize and persist the whole collection, replacing prior content.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Persistence` if the write fails.
    pub async fn save_all(&self, collection: &Collection) -> Result<(), CourseServiceError> {
        let _guard = self.write_lock.lock().await;
        self.persist(collection).await
    }

    /// Replace the course with the same id, or append it.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Persistence` if storage access fails.
    pub async fn upsert(&self, course: Course) -> Result<Collection, CourseServiceError> {
        self.mutate(|collection, _| {
            let course_id = course.id();
            let replaced = collection.upsert(course);
            tracing::debug!(%course_id, replaced, "upserted course");
            Ok(collection.clone())
        })
        .await
    }

    /// Add a fully-built course. Same semantics as [`Self::upsert`].
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Persistence` if storage access fails.
    pub async fn add_course(&self, course: Course) -> Result<Collection, CourseServiceError> {
        self.upsert(course).await
    }

    /// Build a course from the starter curriculum and persist it.
    ///
    /// The course gets a random id not already in the collection.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` if the draft is invalid.
    /// Returns `CourseServiceError::Persistence` if storage access fails.
    pub async fn create_course(&self, draft: CourseDraft) -> Result<Course, CourseServiceError> {
        self.mutate(|collection, today| {
            let id = unused_course_id(collection);
            let course = draft.into_course(id, today)?;
            collection.upsert(course.clone());
            tracing::info!(course_id = %id, title = course.title(), "created course");
            Ok(course)
        })
        .await
    }

    /// Remove a course from the collection.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` if the id does not exist.
    /// Returns `CourseServiceError::Persistence` if storage access fails.
    pub async fn remove_course(
        &self,
        course_id: CourseId,
    ) -> Result<Collection, CourseServiceError> {
        self.mutate(|collection, _| {
            collection
                .remove(course_id)
                .ok_or(CourseServiceError::CourseNotFound(course_id))?;
            tracing::info!(%course_id, "removed course");
            Ok(collection.clone())
        })
        .await
    }

    /// Set a lesson's completion flag and persist the updated aggregates.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` or
    /// `CourseServiceError::Progress` if an id does not resolve; nothing is
    /// written in that case.
    /// Returns `CourseServiceError::Persistence` if storage access fails.
    pub async fn mark_lesson_completed(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
        lesson_id: &LessonId,
        completed: bool,
    ) -> Result<Course, CourseServiceError> {
        self.mutate(|collection, today| {
            let course = collection
                .find_mut(course_id)
                .ok_or(CourseServiceError::CourseNotFound(course_id))?;
            let transition =
                progress::set_lesson_completion(course, module_id, lesson_id, completed, today)?;
            tracing::debug!(
                %course_id,
                %module_id,
                %lesson_id,
                completed,
                ?transition,
                "updated lesson"
            );
            if transition.course_promoted() {
                tracing::info!(%course_id, "all lessons completed; course marked completed");
            }
            Ok(course.clone())
        })
        .await
    }

    /// Manually set a course's status.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` if the course does not
    /// exist. Returns `CourseServiceError::Persistence` if storage access fails.
    pub async fn set_course_status(
        &self,
        course_id: CourseId,
        status: CourseStatus,
    ) -> Result<Course, CourseServiceError> {
        self.mutate(|collection, today| {
            let course = collection
                .find_mut(course_id)
                .ok_or(CourseServiceError::CourseNotFound(course_id))?;
            progress::set_course_status(course, status, today);
            tracing::debug!(%course_id, %status, "updated course status");
            Ok(course.clone())
        })
        .await
    }

    /// Runs `apply` against a freshly loaded collection under the write lock,
    /// persisting only when it succeeds.
    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Collection, NaiveDate) -> Result<T, CourseServiceError>,
    ) -> Result<T, CourseServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.read_collection().await?;
        let out = apply(&mut collection, self.clock.today())?;
        self.persist(&collection).await?;
        Ok(out)
    }

    /// Reads the stored collection. Invalid data is replaced by an empty
    /// collection; only storage failures are returned.
    async fn read_collection(&self) -> Result<Collection, StorageError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Collection::new());
        };

        match parse_collection(&raw) {
            Ok(collection) => Ok(collection),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "invalid course data; starting empty");
                Ok(Collection::new())
            }
        }
    }

    async fn persist(&self, collection: &Collection) -> Result<(), CourseServiceError> {
        let raw = serde_json::to_string(collection)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if let Err(err) = self.store.set(&self.key, &raw).await {
            tracing::error!(key = %self.key, error = %err, "failed to save course data");
            return Err(err.into());
        }
        Ok(())
    }
}

fn unused_course_id(collection: &Collection) -> CourseId {
    let mut rng = rand::rng();
    loop {
        let id = CourseId::new(rng.random_range(1..=MAX_COURSE_ID));
        if !collection.contains(id) {
            return id;
        }
    }
}
