//! Partitioning of the build listing into local, online, and file artifacts.

use super::descriptor::{ArtifactDescriptor, ArtifactListing};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The three disjoint artifact buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedArtifacts {
    /// Entries built by this project or not identified by a module
    /// coordinate.
    pub local: Vec<ArtifactDescriptor>,
    /// Entries resolved from an external repository.
    pub online: Vec<ArtifactDescriptor>,
    /// Loose jars from the local library directories.
    pub files: Vec<PathBuf>,
}

impl ClassifiedArtifacts {
    /// Total number of artifacts across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len() + self.online.len() + self.files.len()
    }

    /// Whether every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `listing` into artifact buckets.
///
/// * file artifacts: `.jar` classpath entries under `<project_root>/<dir>`
///   for any of `local_lib_dirs` that no descriptor claims;
/// * local artifacts: descriptors whose file lives under `project_root`, or
///   whose component is not a module coordinate;
/// * online artifacts: every other descriptor.
///
/// Input order is preserved within each bucket and duplicate classpath
/// entries are collapsed.
#[must_use]
pub fn classify(
    listing: ArtifactListing,
    project_root: &Path,
    local_lib_dirs: &[String],
) -> ClassifiedArtifacts {
    let lib_dirs: Vec<PathBuf> = local_lib_dirs
        .iter()
        .map(|dir| project_root.join(dir))
        .collect();
    let claimed: HashSet<&Path> = listing
        .artifacts
        .iter()
        .map(|descriptor| descriptor.file.as_path())
        .collect();

    let mut seen = HashSet::new();
    let files = listing
        .classpath
        .iter()
        .filter(|path| is_jar(path))
        .filter(|path| lib_dirs.iter().any(|dir| path.starts_with(dir)))
        .filter(|path| !claimed.contains(path.as_path()))
        .filter(|path| seen.insert(path.as_path()))
        .cloned()
        .collect();

    let (local, online): (Vec<_>, Vec<_>) = listing
        .artifacts
        .into_iter()
        .partition(|descriptor| !descriptor.module || descriptor.file.starts_with(project_root));

    ClassifiedArtifacts {
        local,
        online,
        files,
    }
}

fn is_jar(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(".jar"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const ROOT: &str = "/work/client";

    fn descriptor(name: &str, file: &str, module: bool) -> ArtifactDescriptor {
        ArtifactDescriptor {
            group: "net.example".to_owned(),
            name: name.to_owned(),
            version: "1.0".to_owned(),
            classifier: None,
            file: PathBuf::from(file),
            module,
        }
    }

    #[fixture]
    fn lib_dirs() -> Vec<String> {
        vec!["libs".to_owned(), "lib".to_owned()]
    }

    #[rstest]
    fn empty_listing_yields_empty_buckets(lib_dirs: Vec<String>) {
        let classified = classify(ArtifactListing::default(), Path::new(ROOT), &lib_dirs);
        assert!(classified.is_empty());
    }

    #[rstest]
    fn partitions_every_descriptor_exactly_once(lib_dirs: Vec<String>) {
        let listing = ArtifactListing {
            classpath: vec![
                PathBuf::from("/work/client/libs/patch.jar"),
                PathBuf::from("/work/client/lib/extra.jar"),
                PathBuf::from("/work/client/libs/readme.txt"),
                PathBuf::from("/work/client/build/client.jar"),
                PathBuf::from("/home/u/.m2/gson-2.10.jar"),
            ],
            artifacts: vec![
                descriptor("client", "/work/client/build/client.jar", true),
                descriptor("gson", "/home/u/.m2/gson-2.10.jar", true),
                descriptor("flat", "/opt/flat.jar", false),
            ],
        };

        let classified = classify(listing, Path::new(ROOT), &lib_dirs);

        let local: Vec<&str> = classified.local.iter().map(|d| d.name.as_str()).collect();
        let online: Vec<&str> = classified.online.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(local, vec!["client", "flat"]);
        assert_eq!(online, vec!["gson"]);
        assert_eq!(
            classified.files,
            vec![
                PathBuf::from("/work/client/libs/patch.jar"),
                PathBuf::from("/work/client/lib/extra.jar"),
            ]
        );
        assert_eq!(classified.len(), 5);
    }

    #[rstest]
    fn descriptor_files_are_not_duplicated_as_file_artifacts(lib_dirs: Vec<String>) {
        let listing = ArtifactListing {
            classpath: vec![PathBuf::from("/work/client/libs/own.jar")],
            artifacts: vec![descriptor("own", "/work/client/libs/own.jar", true)],
        };

        let classified = classify(listing, Path::new(ROOT), &lib_dirs);

        assert!(classified.files.is_empty());
        assert_eq!(classified.local.len(), 1);
    }

    #[rstest]
    fn duplicate_classpath_entries_collapse(lib_dirs: Vec<String>) {
        let jar = PathBuf::from("/work/client/libs/patch.jar");
        let listing = ArtifactListing {
            classpath: vec![jar.clone(), jar.clone()],
            artifacts: vec![],
        };

        let classified = classify(listing, Path::new(ROOT), &lib_dirs);

        assert_eq!(classified.files, vec![jar]);
    }

    #[rstest]
    fn sibling_directory_with_shared_prefix_is_not_local(lib_dirs: Vec<String>) {
        let listing = ArtifactListing {
            classpath: vec![PathBuf::from("/work/client/libsextra/x.jar")],
            artifacts: vec![descriptor("dep", "/work/client-other/dep.jar", true)],
        };

        let classified = classify(listing, Path::new(ROOT), &lib_dirs);

        assert!(classified.files.is_empty());
        assert_eq!(classified.online.len(), 1);
    }
}
