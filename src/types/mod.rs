//! Data types returned by the Fishchi service.

pub mod library;
pub mod profile;

pub use library::{Author, Note, Project, Source};
pub use profile::UserProfile;
