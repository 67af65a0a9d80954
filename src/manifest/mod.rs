//! Project file mutation
//!
//! This module provides functionality to:
//! - Discover package versions given through MSBuild properties
//! - Rewrite a `PackageReference` version in a specific file
//! - Patch central versions in `Directory.Packages.props`
//!
//! All edits keep the rest of the file byte for byte and only write when the
//! content actually changes.

mod central;
mod reference;
mod variables;
mod writer;
mod xml;

pub use central::{find_central_file, update_central_version, CENTRAL_FILE_NAME};
pub use reference::update_package_reference;
pub use variables::{
    scan_order, ElementKind, PackageVariableInfo, PackageVariableService, BUILD_PROPS_FILE_NAME,
};
pub use writer::{read_manifest, write_manifest, UpdateOutcome};
