//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ValidationError: bad input to an operation (missing bounds, bad version text)
//! - BuildToolError: the external `dotnet` tool could not run or exited non-zero
//! - GraphError: dependency graph generation and parsing
//! - RegistryError: issues with package feed communication
//! - ManifestError: issues reading or rewriting project files
//! - ResolveError: version resolution failures

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// External build tool errors
    #[error(transparent)]
    BuildTool(#[from] BuildToolError),

    /// Dependency graph errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Package feed related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Version resolution errors
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A blocking worker panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),
}

/// Errors raised when an operation receives input it cannot work with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The dependency has no referenced (resolved) version to start from
    #[error("package '{package}' has no referenced version")]
    MissingReferencedVersion { package: String },

    /// The dependency has no declared version range
    #[error("package '{package}' has no version range")]
    MissingVersionRange { package: String },

    /// The version range has no lower bound
    #[error("version range '{range}' of package '{package}' has no minimum version")]
    MissingMinimumVersion { package: String, range: String },

    /// Text that is not a valid NuGet version
    #[error("invalid version '{value}'")]
    InvalidVersion { value: String },

    /// Text that is not a valid NuGet version range
    #[error("invalid version range '{value}': {message}")]
    InvalidVersionRange { value: String, message: String },

    /// The given project path cannot be analyzed
    #[error("invalid project '{path}': {message}")]
    InvalidProject { path: PathBuf, message: String },
}

/// Errors related to running the external build tool
#[derive(Error, Debug)]
pub enum BuildToolError {
    /// The program could not be started at all
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited unsuccessfully (exit code -1 means it hung)
    #[error(
        "'{command}' failed with exit code {exit_code}\n\nOutput:\n{stdout}\n\nErrors:\n{stderr}"
    )]
    CommandFailed {
        command: String,
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
}

/// Errors related to generating and loading the dependency graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// The build tool refused to produce a graph for the project
    #[error("unable to process the project '{project}'. Is it a valid SDK-style project?\n{source}")]
    Build {
        project: PathBuf,
        #[source]
        source: BuildToolError,
    },

    /// The graph or lock document is malformed
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The graph or lock document could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to package feed communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in the feed
    #[error("package '{package}' not found in {registry}")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry}")]
    RateLimitExceeded { registry: String },

    /// Invalid response from the feed
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// The source URI does not name a feed this tool can query
    #[error("unsupported package source '{source_uri}'")]
    UnsupportedSource { source_uri: String },
}

/// Errors related to reading and rewriting manifest files
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not well-formed XML
    #[error("failed to parse XML in {path}: {message}")]
    XmlParseError { path: PathBuf, message: String },

    /// No reference element for the package exists in the file
    #[error("package '{package}' not found in {path}")]
    PackageNotFound { package: String, path: PathBuf },

    /// The reference element carries no Version attribute
    #[error("package '{package}' in {path} has no Version attribute")]
    MissingVersionAttribute { package: String, path: PathBuf },

    /// The property a reference points at is not defined where it was discovered
    #[error("property '{variable}' is not defined in {path}")]
    PropertyNotFound { variable: String, path: PathBuf },
}

/// Errors related to resolving the latest allowed version
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The request itself was invalid
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A feed failed with a non-network error
    #[error("feed query for '{package}' failed: {message}")]
    Feed { package: String, message: String },
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Returns true for transport-level failures that should not abort resolution.
    ///
    /// A missing package is treated the same way: the feed simply knows no
    /// versions of it.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            RegistryError::NetworkError { .. }
                | RegistryError::Timeout { .. }
                | RegistryError::RateLimitExceeded { .. }
                | RegistryError::PackageNotFound { .. }
        )
    }
}

impl ManifestError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new XmlParseError
    pub fn xml_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::XmlParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ManifestError::PackageNotFound {
            package: package.into(),
            path: path.into(),
        }
    }
}

impl GraphError {
    /// Creates a new Parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GraphError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}
