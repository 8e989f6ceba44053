//! Persistence for upload records.
//!
//! `UploadRepository` is the seam the pipeline and resolver depend on. Hash uniqueness is
//! enforced here, never by callers: concurrent inserts of the same content converge on a
//! single record and every loser is told which record won.

pub mod uploads;

pub use uploads::{InsertOutcome, MemoryUploadRepository, PgUploadRepository, UploadRepository};
