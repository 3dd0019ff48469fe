//! Domain logic - pure release rules independent of git and the file system layout

pub mod contributors;
pub mod descriptor;
pub mod note;
pub mod version;

pub use contributors::Contributors;
pub use descriptor::{GitCoordinates, ModDescriptor};
pub use note::ChangeNote;
pub use version::{HostVersion, Version, VersionBump};
