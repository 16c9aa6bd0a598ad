//! Classroom persistence: students, class sessions, and activities.
//!
//! Two backends share one document model ([`ClassroomData`]): an in-memory
//! store for tests and simulation, and a JSON file store with atomic writes.

pub mod error;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod types;

pub use {
    error::{Error, Result},
    store::ClassroomStore,
    store_file::FileStore,
    store_memory::InMemoryStore,
    types::{
        Activity, ActivityGrade, ActivitySubmission, ClassSession, ClassroomData, ExamGrade,
        Participation, Resource, Student,
    },
};
