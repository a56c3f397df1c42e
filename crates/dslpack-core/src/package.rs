use std::fmt;
use std::path::PathBuf;

use crate::document::PackageRecord;
use crate::error::WorkshopError;

pub const MANIFEST_FILE_NAME: &str = "workshop.json";
pub const APP_MARKER_FILE: &str = "app.json";

const ADDRESS_SEGMENTS: usize = 3;

/// A parsed `<host>/<org>/<repo>[/<subpath...>][@<version-or-ref>]` coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCoordinate {
    pub address: String,
    pub subpath: String,
    pub version: Option<String>,
}

impl PackageCoordinate {
    pub fn parse(spec: &str) -> Result<Self, WorkshopError> {
        let trimmed = spec.trim();
        let (location, version) = match trimmed.split_once('@') {
            Some((location, version)) => {
                let version = version.trim();
                if version.is_empty() {
                    return Err(WorkshopError::malformed(
                        spec,
                        "version after '@' must not be empty",
                    ));
                }
                if version.starts_with('-') {
                    return Err(WorkshopError::malformed(
                        spec,
                        format!("version reference '{version}' must not start with '-'"),
                    ));
                }
                if version.contains('@') || version.chars().any(char::is_whitespace) {
                    return Err(WorkshopError::malformed(
                        spec,
                        format!("invalid version reference '{version}'"),
                    ));
                }
                (location, Some(version.to_string()))
            }
            None => (trimmed, None),
        };

        let segments = location.split('/').collect::<Vec<_>>();
        if segments.len() < ADDRESS_SEGMENTS {
            return Err(WorkshopError::malformed(
                spec,
                format!(
                    "expected <host>/<org>/<repo>[/<subpath>], got {} segment(s)",
                    segments.len()
                ),
            ));
        }
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(WorkshopError::malformed(spec, "empty path segment"));
        }
        if segments.iter().any(|segment| *segment == "." || *segment == "..") {
            return Err(WorkshopError::malformed(
                spec,
                "relative path segments are not allowed",
            ));
        }

        Ok(Self {
            address: segments[..ADDRESS_SEGMENTS].join("/"),
            subpath: segments[ADDRESS_SEGMENTS..].join("/"),
            version,
        })
    }

    pub fn host(&self) -> &str {
        self.address
            .split_once('/')
            .map(|(host, _)| host)
            .unwrap_or(&self.address)
    }

    /// Address plus subpath, without version. Replace directives are keyed by this.
    pub fn logical_path(&self) -> String {
        join_logical_path(&self.address, &self.subpath)
    }

    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }

    pub fn default_alias(&self) -> String {
        let logical = self.logical_path();
        let without_host = logical
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(&logical);
        format!("@{without_host}")
    }
}

impl fmt::Display for PackageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.logical_path(), version),
            None => f.write_str(&self.logical_path()),
        }
    }
}

/// One resolved, versioned dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    spec: String,
    alias: String,
    address: String,
    subpath: String,
    version: String,
    unique_id: String,
    pub indirect: bool,
    pub replaced: bool,
    pub local_path: Option<PathBuf>,
}

impl Package {
    /// Builds a package from a pinned coordinate. `alias` falls back to the
    /// coordinate's default alias when absent or blank.
    pub fn new(
        spec: &str,
        coordinate: PackageCoordinate,
        alias: Option<&str>,
    ) -> Result<Self, WorkshopError> {
        let Some(version) = coordinate.version.clone() else {
            return Err(WorkshopError::malformed(
                spec,
                "package version must be resolved before it is recorded",
            ));
        };

        let alias = match alias.map(str::trim) {
            Some(alias) if !alias.is_empty() => {
                validate_alias(spec, alias)?;
                alias.to_string()
            }
            _ => coordinate.default_alias(),
        };

        let logical = coordinate.logical_path();
        Ok(Self {
            spec: spec.trim().to_string(),
            alias,
            unique_id: format!("{logical}@{version}"),
            address: coordinate.address,
            subpath: coordinate.subpath,
            version,
            indirect: false,
            replaced: false,
            local_path: None,
        })
    }

    pub fn from_record(record: &PackageRecord) -> Result<Self, WorkshopError> {
        let location = format!(
            "{}@{}",
            join_logical_path(&record.address, &record.subpath),
            record.version
        );
        let coordinate = PackageCoordinate::parse(&location)?;
        if coordinate.address != record.address {
            return Err(WorkshopError::malformed(
                &record.spec,
                format!("address '{}' must be <host>/<org>/<repo>", record.address),
            ));
        }

        let mut package = Self::new(&record.spec, coordinate, Some(&record.alias))?;
        package.indirect = record.indirect;
        Ok(package)
    }

    pub fn to_record(&self) -> PackageRecord {
        PackageRecord {
            spec: self.spec.clone(),
            alias: self.alias.clone(),
            address: self.address.clone(),
            subpath: self.subpath.clone(),
            version: self.version.clone(),
            indirect: self.indirect,
        }
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn host(&self) -> &str {
        self.address
            .split_once('/')
            .map(|(host, _)| host)
            .unwrap_or(&self.address)
    }

    pub fn logical_path(&self) -> String {
        join_logical_path(&self.address, &self.subpath)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_id)
    }
}

fn join_logical_path(address: &str, subpath: &str) -> String {
    if subpath.is_empty() {
        address.to_string()
    } else {
        format!("{address}/{subpath}")
    }
}

fn validate_alias(spec: &str, alias: &str) -> Result<(), WorkshopError> {
    if alias.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(WorkshopError::malformed(
            spec,
            format!("alias '{alias}' must not contain whitespace"),
        ));
    }
    Ok(())
}
