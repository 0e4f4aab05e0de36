//! Durable wallet state stores
//!
//! Both stores persist JSON documents through [`json_file::JsonFile`] and
//! serialize writers across processes with [`file_lock`] markers.

pub mod counter_store;
pub mod file_lock;
pub mod json_file;
pub mod proof_store;

pub use counter_store::{CounterMap, CounterStore};
pub use file_lock::{lock_path_for, with_lock, FileLock, LockHandle};
pub use json_file::JsonFile;
pub use proof_store::{ProofFile, ProofStore};
