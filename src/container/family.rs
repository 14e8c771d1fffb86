//! Container family discovery
//!
//! A container directory is classified by a discriminating file name:
//! `LEAD*` for the early family, `METADATA.DIM` for the later one. The
//! constituent files are then matched case-insensitively by prefix.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;

use crate::container::types::ContainerKind;
use crate::dimap::DOCUMENT_FILE;
use crate::errors::{SpotError, SpotResult};

/// Constituent files of an early-family container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapFiles {
    pub volume: PathBuf,
    pub null_volume: PathBuf,
    pub leader: PathBuf,
    pub imagery: PathBuf,
    pub trailer: PathBuf,
}

/// Constituent files of a later-family container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimapFiles {
    pub document: PathBuf,
    /// `IMAGERY.<ext>`, when present
    pub imagery: Option<PathBuf>,
}

fn pattern(source: &str) -> SpotResult<Regex> {
    Regex::new(source).map_err(|e| SpotError::GenericError(format!("Invalid file pattern {}: {}", source, e)))
}

/// Names of the regular files in `dir`, sorted
fn file_names(dir: &Path) -> SpotResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// First file of `names` matching `(?i)^<prefix>[^.]*(\.DAT)?$`
fn find_cap_file(dir: &Path, names: &[String], prefix: &str) -> SpotResult<PathBuf> {
    let re = pattern(&format!(r"(?i)^{}[^.]*(\.dat)?$", prefix))?;
    names
        .iter()
        .find(|n| re.is_match(n))
        .map(|n| dir.join(n))
        .ok_or_else(|| SpotError::MissingFile(format!("{}* in {}", prefix, dir.display())))
}

/// Classifies a container directory by its discriminating file name
pub fn discover_kind(dir: &Path) -> SpotResult<ContainerKind> {
    if !dir.is_dir() {
        return Err(SpotError::MissingFile(dir.display().to_string()));
    }
    let names = file_names(dir)?;
    let leader = pattern(r"(?i)^LEAD")?;
    let document = pattern(&format!(r"(?i)^{}$", regex::escape(DOCUMENT_FILE)))?;

    let kind = if names.iter().any(|n| leader.is_match(n)) {
        ContainerKind::Cap
    } else if names.iter().any(|n| document.is_match(n)) {
        ContainerKind::Dimap
    } else {
        return Err(SpotError::MissingDiscriminator(dir.to_path_buf()));
    };
    debug!("{} holds a {} container", dir.display(), kind);
    Ok(kind)
}

/// Discovers the family of `dir` and checks it against the declared one
///
/// Runs before any data file is opened.
pub fn check_family(dir: &Path, declared: Option<ContainerKind>) -> SpotResult<ContainerKind> {
    let discovered = discover_kind(dir)?;
    match declared {
        Some(declared) if declared != discovered => Err(SpotError::FamilyMismatch {
            declared: declared.name().to_string(),
            discovered: discovered.name().to_string(),
        }),
        _ => Ok(discovered),
    }
}

/// Resolves the five files of an early-family container
pub fn resolve_cap_files(dir: &Path) -> SpotResult<CapFiles> {
    let names = file_names(dir)?;
    Ok(CapFiles {
        volume: find_cap_file(dir, &names, "VOL")?,
        null_volume: find_cap_file(dir, &names, "NUL")?,
        leader: find_cap_file(dir, &names, "LEAD")?,
        imagery: find_cap_file(dir, &names, "IMAG")?,
        trailer: find_cap_file(dir, &names, "TRAI")?,
    })
}

const IMAGERY_PATTERN: &str = r"(?i)^IMAGERY\.[A-Z0-9]+$";

/// Checks a raster reference of a later-family document
///
/// Only a bare `IMAGERY.<ext>` file name inside the container is accepted.
pub fn check_imagery_reference(href: &str) -> SpotResult<()> {
    let bare = Path::new(href).file_name().and_then(|n| n.to_str()) == Some(href);
    if bare && pattern(IMAGERY_PATTERN)?.is_match(href) {
        Ok(())
    } else {
        Err(SpotError::InconsistentLayout(format!(
            "raster reference '{}' is not an IMAGERY file of the container",
            href
        )))
    }
}

/// Resolves the document and raster file of a later-family container
pub fn resolve_dimap_files(dir: &Path) -> SpotResult<DimapFiles> {
    let names = file_names(dir)?;
    let document = pattern(&format!(r"(?i)^{}$", regex::escape(DOCUMENT_FILE)))?;
    let imagery = pattern(IMAGERY_PATTERN)?;
    let document = names
        .iter()
        .find(|n| document.is_match(n))
        .map(|n| dir.join(n))
        .ok_or_else(|| SpotError::MissingFile(format!("{} in {}", DOCUMENT_FILE, dir.display())))?;
    Ok(DimapFiles { document, imagery: names.iter().find(|n| imagery.is_match(n)).map(|n| dir.join(n)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            File::create(dir.join(name)).unwrap();
        }
    }

    #[test]
    fn test_discovers_families() {
        let cap = tempfile::tempdir().unwrap();
        touch(cap.path(), &["lead_01.dat"]);
        assert_eq!(discover_kind(cap.path()).unwrap(), ContainerKind::Cap);

        let dimap = tempfile::tempdir().unwrap();
        touch(dimap.path(), &["METADATA.DIM", "IMAGERY.BIL"]);
        assert_eq!(discover_kind(dimap.path()).unwrap(), ContainerKind::Dimap);

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(discover_kind(empty.path()), Err(SpotError::MissingDiscriminator(_))));
    }

    #[test]
    fn test_declared_family_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["METADATA.DIM"]);
        match check_family(dir.path(), Some(ContainerKind::Cap)) {
            Err(SpotError::FamilyMismatch { declared, discovered }) => {
                assert_eq!(declared, "SPOT1A4");
                assert_eq!(discovered, "SPOT5");
            }
            other => panic!("expected a family mismatch, got {:?}", other),
        }
        assert_eq!(check_family(dir.path(), None).unwrap(), ContainerKind::Dimap);
    }

    #[test]
    fn test_cap_files_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["VOLD_01.DAT", "null_01.dat", "LEAD_01", "IMAG_01.DAT", "TRAI_01.DAT", "IMAG_01.TXT"]);
        let files = resolve_cap_files(dir.path()).unwrap();
        assert_eq!(files.null_volume, dir.path().join("null_01.dat"));
        assert_eq!(files.leader, dir.path().join("LEAD_01"));
        assert_eq!(files.imagery, dir.path().join("IMAG_01.DAT"));

        std::fs::remove_file(dir.path().join("TRAI_01.DAT")).unwrap();
        assert!(matches!(resolve_cap_files(dir.path()), Err(SpotError::MissingFile(_))));
    }

    #[test]
    fn test_imagery_reference_stays_inside_container() {
        assert!(check_imagery_reference("IMAGERY.BIL").is_ok());
        assert!(check_imagery_reference("imagery.tif").is_ok());
        for href in ["../victim.BIL", "/tmp/IMAGERY.BIL", "sub/IMAGERY.BIL", "DATA.BIL", "..", ""] {
            assert!(
                matches!(check_imagery_reference(href), Err(SpotError::InconsistentLayout(_))),
                "{} accepted",
                href
            );
        }
    }
}
