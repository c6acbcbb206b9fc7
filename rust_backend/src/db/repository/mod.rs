//! Repository trait definitions for reading LMT recordings.
//!
//! The store is split into focused traits, one per group of tables, so that
//! implementations and test doubles stay small.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`frames`]: Recording timeline and cage sensors (`FRAME`)
//! - [`animals`]: Animals and detections (`ANIMAL`, `DETECTION`)
//! - [`events`]: Behavioural event intervals (`EVENT`)
//!
//! # Convenience Trait Bound
//!
//! For code that needs every capability, use the [`FullRepository`] bound:
//!
//! ```ignore
//! async fn summary<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let last = repo.last_frame().await?;
//!     let animals = repo.list_animals().await?;
//!     Ok(())
//! }
//! ```

pub mod animals;
pub mod error;
pub mod events;
pub mod frames;

pub use error::{RepositoryError, RepositoryResult};

pub use animals::AnimalRepository;
pub use events::EventRepository;
pub use frames::FrameRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type implementing the three
/// repository traits.
pub trait FullRepository: FrameRepository + AnimalRepository + EventRepository {}

impl<T> FullRepository for T where T: FrameRepository + AnimalRepository + EventRepository {}
