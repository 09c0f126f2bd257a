//! Dependency resolution
//!
//! Maps one external reference to a concrete location. Resolution is pure:
//! the caller supplies the origin of the referencing file and a probe for
//! file existence, and decides what to do with the answer. Whether the
//! reference is already satisfied by a loaded file is checked by the caller
//! against the registry first.
//!
//! Standalone origin, first hit wins:
//!
//! 1. `<dir>/<reference>`
//! 2. `<dir>/<base name of reference>`
//!
//! Bundle origin, first hit wins:
//!
//! 1. a directory entry of the owning bundle with the same base name
//! 2. `<bundle>/<reference>`
//! 3. `<bundle>/<base name>`
//! 4. `<bundle dir>/<reference>`
//! 5. `<bundle dir>/<base name>`
//!
//! Candidates 2 and 3 cover callers that extracted the bundle into a
//! directory named like the bundle file.

use std::path::{Path, PathBuf};

use ubundle_formats::bundle::{DirectoryEntry, file_name_of};

/// Where the referencing file lives
#[derive(Debug, Clone, Copy)]
pub enum ResolveOrigin<'a> {
    /// A file on disk
    Standalone {
        /// Directory containing the referencing file
        directory: &'a Path,
    },
    /// An entry of a bundle
    Bundle {
        /// Path of the bundle file
        bundle_path: &'a Path,
        /// The bundle's directory entries
        directory: &'a [DirectoryEntry],
    },
}

/// Where a reference resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Directory entry of the owning bundle
    BundleEntry(usize),
    /// File on disk
    File(PathBuf),
}

/// Resolve `reference` from `origin`.
///
/// Returns `None` for empty references and when no candidate exists. Entry
/// names are compared case-sensitively.
pub fn resolve_reference<F>(
    reference: &str,
    origin: &ResolveOrigin<'_>,
    exists: F,
) -> Option<Resolution>
where
    F: Fn(&Path) -> bool,
{
    if reference.is_empty() {
        return None;
    }
    let file_name = file_name_of(reference);

    let candidates: Vec<PathBuf> = match *origin {
        ResolveOrigin::Standalone { directory } => {
            vec![directory.join(reference), directory.join(file_name)]
        }
        ResolveOrigin::Bundle {
            bundle_path,
            directory,
        } => {
            if let Some(index) = directory
                .iter()
                .position(|entry| entry.file_name() == file_name)
            {
                return Some(Resolution::BundleEntry(index));
            }

            let mut candidates = vec![bundle_path.join(reference), bundle_path.join(file_name)];
            if let Some(bundle_dir) = bundle_path.parent() {
                candidates.push(bundle_dir.join(reference));
                candidates.push(bundle_dir.join(file_name));
            }
            candidates
        }
    };

    candidates
        .into_iter()
        .find(|candidate| exists(candidate))
        .map(Resolution::File)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashSet;

    fn existing(paths: &[&str]) -> impl Fn(&Path) -> bool {
        let set: HashSet<PathBuf> = paths.iter().map(PathBuf::from).collect();
        move |path: &Path| set.contains(path)
    }

    #[test]
    fn test_standalone_direct_path() {
        let origin = ResolveOrigin::Standalone {
            directory: Path::new("game/Data"),
        };
        let exists = existing(&["game/Data/sub/level1", "game/Data/level1"]);
        assert_eq!(
            resolve_reference("sub/level1", &origin, exists),
            Some(Resolution::File(PathBuf::from("game/Data/sub/level1")))
        );
    }

    #[test]
    fn test_standalone_base_name_fallback() {
        let origin = ResolveOrigin::Standalone {
            directory: Path::new("game/Data"),
        };
        let exists = existing(&["game/Data/sharedassets0.assets"]);
        assert_eq!(
            resolve_reference("Library/sharedassets0.assets", &origin, exists),
            Some(Resolution::File(PathBuf::from(
                "game/Data/sharedassets0.assets"
            )))
        );
    }

    #[test]
    fn test_standalone_backslash_reference() {
        let origin = ResolveOrigin::Standalone {
            directory: Path::new("game/Data"),
        };
        let exists = existing(&["game/Data/globalgamemanagers"]);
        assert_eq!(
            resolve_reference("Resources\\globalgamemanagers", &origin, exists),
            Some(Resolution::File(PathBuf::from("game/Data/globalgamemanagers")))
        );
    }

    #[test]
    fn test_unresolved_and_empty() {
        let origin = ResolveOrigin::Standalone {
            directory: Path::new("game/Data"),
        };
        assert_eq!(resolve_reference("missing.assets", &origin, |_| false), None);

        let probed = RefCell::new(0);
        let result = resolve_reference("", &origin, |_| {
            *probed.borrow_mut() += 1;
            true
        });
        assert_eq!(result, None);
        assert_eq!(*probed.borrow(), 0);
    }

    #[test]
    fn test_bundle_entry_preferred() {
        let directory = vec![
            DirectoryEntry::new("CAB-aaaa", 0, 10, 4),
            DirectoryEntry::new("archive:/CAB-bbbb/CAB-bbbb", 10, 10, 4),
        ];
        let origin = ResolveOrigin::Bundle {
            bundle_path: Path::new("bundles/characters.bundle"),
            directory: &directory,
        };
        // a file on disk with the same name loses to the entry
        let exists = existing(&["bundles/CAB-bbbb"]);
        assert_eq!(
            resolve_reference("archive:/CAB-bbbb/CAB-bbbb", &origin, exists),
            Some(Resolution::BundleEntry(1))
        );
    }

    #[test]
    fn test_bundle_entry_match_is_case_sensitive() {
        let directory = vec![DirectoryEntry::new("CAB-aaaa", 0, 10, 4)];
        let origin = ResolveOrigin::Bundle {
            bundle_path: Path::new("bundles/characters.bundle"),
            directory: &directory,
        };
        assert_eq!(resolve_reference("cab-aaaa", &origin, |_| false), None);
    }

    #[test]
    fn test_bundle_candidate_order() {
        let origin = ResolveOrigin::Bundle {
            bundle_path: Path::new("bundles/characters.bundle"),
            directory: &[],
        };

        let probes = RefCell::new(Vec::new());
        let result = resolve_reference("shared/common.assets", &origin, |path| {
            probes.borrow_mut().push(path.to_path_buf());
            false
        });
        assert_eq!(result, None);
        assert_eq!(
            probes.into_inner(),
            vec![
                PathBuf::from("bundles/characters.bundle/shared/common.assets"),
                PathBuf::from("bundles/characters.bundle/common.assets"),
                PathBuf::from("bundles/shared/common.assets"),
                PathBuf::from("bundles/common.assets"),
            ]
        );
    }

    #[test]
    fn test_bundle_containing_directory_fallback() {
        let origin = ResolveOrigin::Bundle {
            bundle_path: Path::new("bundles/characters.bundle"),
            directory: &[],
        };
        let exists = existing(&["bundles/common.assets"]);
        assert_eq!(
            resolve_reference("shared/common.assets", &origin, exists),
            Some(Resolution::File(PathBuf::from("bundles/common.assets")))
        );
    }
}
