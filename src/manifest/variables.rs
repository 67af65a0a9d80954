//! Package versions given through MSBuild properties
//!
//! A reference such as `<PackageReference Include="Serilog" Version="$(SerilogVersion)" />`
//! is resolved against `<PropertyGroup>` definitions found in:
//! - the project file itself
//! - `Directory.Build.props` and `Directory.Packages.props` in each parent
//!   directory, nearest first
//!
//! The first definition in that order wins. Discovery results are cached per
//! project path until `clear_cache` is called.

use super::central::CENTRAL_FILE_NAME;
use super::reference::update_package_reference;
use super::writer::{apply_splice, read_manifest, UpdateOutcome};
use super::xml;
use crate::error::ManifestError;
use dashmap::DashMap;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

pub const BUILD_PROPS_FILE_NAME: &str = "Directory.Build.props";

static PROPERTY_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\(([A-Za-z_][A-Za-z0-9_.\-]*)\)$").unwrap());

/// The element a package version is declared on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    PackageReference,
    PackageVersion,
    GlobalPackageReference,
}

impl ElementKind {
    fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "PackageReference" => Some(ElementKind::PackageReference),
            "PackageVersion" => Some(ElementKind::PackageVersion),
            "GlobalPackageReference" => Some(ElementKind::GlobalPackageReference),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Where a package's version text lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVariableInfo {
    pub package_name: String,
    /// Property name for `$(Name)` references, `None` for literal versions
    pub variable_name: Option<String>,
    pub current_value: String,
    /// File defining the property, `None` if no definition was found
    pub defining_file: Option<PathBuf>,
    pub referencing_file: PathBuf,
    pub kind: ElementKind,
}

impl PackageVariableInfo {
    /// A reference that carries its version inline
    pub fn literal(
        package_name: impl Into<String>,
        current_value: impl Into<String>,
        referencing_file: impl Into<PathBuf>,
        kind: ElementKind,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            variable_name: None,
            current_value: current_value.into(),
            defining_file: None,
            referencing_file: referencing_file.into(),
            kind,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.variable_name.is_some()
    }
}

struct Reference {
    package: String,
    variable: String,
    file: PathBuf,
    kind: ElementKind,
}

#[derive(Default)]
struct Scan {
    // keyed by lower-cased property name
    properties: HashMap<String, (String, PathBuf)>,
    references: Vec<Reference>,
}

impl Scan {
    fn visit(&mut self, content: &str, path: &Path) -> Result<(), ManifestError> {
        xml::with_document(content, path, |doc| {
            for node in doc.descendants() {
                if xml::is_element(&node, "PropertyGroup") {
                    for property in node.children().filter(|c| c.is_element()) {
                        let name = property.tag_name().name().to_lowercase();
                        let value = property.text().unwrap_or("").trim().to_string();
                        self.properties
                            .entry(name)
                            .or_insert_with(|| (value, path.to_path_buf()));
                    }
                    continue;
                }

                let kind = xml::package_element_name(&node).and_then(ElementKind::from_element_name);
                let Some(kind) = kind else {
                    continue;
                };
                let (Some(package), Some(version)) =
                    (xml::package_identity(&node), xml::attribute(&node, "Version"))
                else {
                    continue;
                };
                if let Some(caps) = PROPERTY_ONLY_RE.captures(version.trim()) {
                    self.references.push(Reference {
                        package: package.to_string(),
                        variable: caps[1].to_string(),
                        file: path.to_path_buf(),
                        kind,
                    });
                }
            }
            Ok(())
        })
    }
}

/// Files scanned for `manifest`, in precedence order
pub fn scan_order(manifest: &Path) -> Vec<PathBuf> {
    let mut files = vec![manifest.to_path_buf()];
    if let Some(parent) = manifest.parent() {
        for dir in parent.ancestors() {
            for name in [BUILD_PROPS_FILE_NAME, CENTRAL_FILE_NAME] {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    files.push(candidate);
                }
            }
        }
    }
    files
}

/// Discovers and rewrites property-backed package versions
#[derive(Default)]
pub struct PackageVariableService {
    cache: DashMap<PathBuf, Arc<HashMap<String, PackageVariableInfo>>>,
}

impl PackageVariableService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map lower-cased package names to their `$(Name)` version definitions
    pub fn discover(
        &self,
        manifest: &Path,
    ) -> Result<Arc<HashMap<String, PackageVariableInfo>>, ManifestError> {
        if let Some(cached) = self.cache.get(manifest) {
            return Ok(Arc::clone(cached.value()));
        }

        let mut scan = Scan::default();
        for (index, file) in scan_order(manifest).into_iter().enumerate() {
            let result = read_manifest(&file).and_then(|content| scan.visit(&content, &file));
            match result {
                Ok(()) => {}
                Err(e) if index == 0 => return Err(e),
                Err(e) => tracing::warn!("Skipping {}: {}", file.display(), e),
            }
        }

        let mut found = HashMap::new();
        for reference in scan.references {
            let key = reference.package.to_lowercase();
            if found.contains_key(&key) {
                continue;
            }
            let definition = scan.properties.get(&reference.variable.to_lowercase());
            let info = PackageVariableInfo {
                current_value: definition
                    .map(|(value, _)| value.clone())
                    .unwrap_or_else(|| format!("$({})", reference.variable)),
                defining_file: definition.map(|(_, file)| file.clone()),
                package_name: reference.package,
                variable_name: Some(reference.variable),
                referencing_file: reference.file,
                kind: reference.kind,
            };
            found.insert(key, info);
        }

        tracing::debug!(
            "Found {} variable-backed package versions for {}",
            found.len(),
            manifest.display()
        );
        let found = Arc::new(found);
        self.cache.insert(manifest.to_path_buf(), Arc::clone(&found));
        Ok(found)
    }

    /// Look up a single package, ignoring case
    pub fn lookup(
        &self,
        manifest: &Path,
        package: &str,
    ) -> Result<Option<PackageVariableInfo>, ManifestError> {
        Ok(self.discover(manifest)?.get(&package.to_lowercase()).cloned())
    }

    /// Apply `new_version` to wherever `info` says the version text lives
    pub fn update(
        &self,
        info: &PackageVariableInfo,
        new_version: &str,
    ) -> Result<UpdateOutcome, ManifestError> {
        let outcome = match &info.variable_name {
            None => update_package_reference(&info.referencing_file, &info.package_name, new_version)?,
            Some(variable) => {
                let file = info
                    .defining_file
                    .as_deref()
                    .ok_or_else(|| ManifestError::PropertyNotFound {
                        variable: variable.clone(),
                        path: info.referencing_file.clone(),
                    })?;
                update_property(file, variable, new_version)?
            }
        };
        if matches!(outcome, UpdateOutcome::Updated { .. }) {
            self.clear_cache();
        }
        Ok(outcome)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Rewrite the first `PropertyGroup` definition of `variable` in `file`
fn update_property(
    file: &Path,
    variable: &str,
    new_version: &str,
) -> Result<UpdateOutcome, ManifestError> {
    let content = read_manifest(file)?;
    let text = xml::body(&content);
    let splice = xml::with_document(&content, file, |doc| {
        let property = doc
            .descendants()
            .filter(|n| xml::is_element(n, "PropertyGroup"))
            .flat_map(|group| group.children())
            .find(|n| xml::is_element(n, variable))
            .ok_or_else(|| ManifestError::PropertyNotFound {
                variable: variable.to_string(),
                path: file.to_path_buf(),
            })?;

        let current = property.text().unwrap_or("");
        if current.contains("$(") {
            return Ok(Err(current.trim().to_string()));
        }
        Ok(Ok(xml::element_text_splice(text, &property, new_version)))
    })?;

    match splice {
        Ok(splice) => apply_splice(file, &content, &splice),
        Err(nested) => Ok(UpdateOutcome::Skipped {
            path: file.to_path_buf(),
            reason: format!("property '{}' is defined through '{}'", variable, nested),
        }),
    }
}
