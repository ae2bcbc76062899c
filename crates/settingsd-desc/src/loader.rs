//! On-disk description artifact loading.
//!
//! The original service ships these as BSON; this port models them as
//! JSON files of the same shape so the loader stays dependency-free (no
//! crate in this workspace's corpus pulls in a BSON parser).

use crate::dimension::{DimensionKeyInfo, DimensionKind};
use crate::error::{DescError, DescResult};
use crate::model::DescriptionItem;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

fn read_to_string(path: &Path) -> DescResult<String> {
    std::fs::read_to_string(path).map_err(|source| DescError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load a base or override description file: a JSON array of
/// [`DescriptionItem`].
pub fn load_description_file(path: &Path) -> DescResult<Vec<DescriptionItem>> {
    let raw = read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| DescError::MalformedArtifact {
        artifact: path.display().to_string(),
        detail: e.to_string(),
    })
}

/// Load the exception app list: a JSON array of app id strings permitted to
/// see [`crate::model::DbType::E`] keys.
pub fn load_exception_app_list(path: &Path) -> DescResult<HashSet<String>> {
    let raw = read_to_string(path)?;
    let list: Vec<String> = serde_json::from_str(&raw).map_err(|e| DescError::MalformedArtifact {
        artifact: path.display().to_string(),
        detail: e.to_string(),
    })?;
    Ok(list.into_iter().collect())
}

#[derive(Debug, Deserialize)]
struct RawDimensionEntry {
    name: String,
    #[serde(default)]
    depends_on: Option<String>,
}

/// Load `dimensionFormat.json`: an ordered JSON array of dimension key
/// declarations, each either independent or dependent on a named parent.
pub fn load_dimension_format(path: &Path) -> DescResult<Vec<DimensionKeyInfo>> {
    let raw = read_to_string(path)?;
    let entries: Vec<RawDimensionEntry> =
        serde_json::from_str(&raw).map_err(|e| DescError::MalformedArtifact {
            artifact: path.display().to_string(),
            detail: e.to_string(),
        })?;
    Ok(entries
        .into_iter()
        .map(|entry| DimensionKeyInfo {
            name: entry.name,
            kind: match entry.depends_on {
                Some(parent) => DimensionKind::Dependent { parent },
                None => DimensionKind::Independent,
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile_like::TempPath {
        tempfile_like::TempPath::write(contents)
    }

    // Minimal self-contained temp-file helper so this crate doesn't need to
    // pull in `tempfile` for three loader tests.
    mod tempfile_like {
        use std::io::Write;
        use std::path::{Path, PathBuf};

        pub struct TempPath(PathBuf);

        impl TempPath {
            pub fn write(contents: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("settingsd-desc-loader-test-{}", uuid_like()));
                let mut file = std::fs::File::create(&path).expect("create temp file");
                file.write_all(contents.as_bytes()).expect("write temp file");
                Self(path)
            }

            pub fn path(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }

        fn uuid_like() -> u64 {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
        }
    }

    #[test]
    fn loads_exception_app_list() {
        let temp = write_temp(r#"["com.example.allowed", "com.example.other"]"#);
        let list = load_exception_app_list(temp.path()).unwrap();
        assert!(list.contains("com.example.allowed"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn loads_dimension_format_with_dependency() {
        let temp = write_temp(
            r#"[{"name": "input"}, {"name": "pictureMode", "depends_on": "input"}]"#,
        );
        let declarations = load_dimension_format(temp.path()).unwrap();
        assert_eq!(declarations.len(), 2);
        assert!(matches!(declarations[0].kind, DimensionKind::Independent));
        assert!(matches!(&declarations[1].kind, DimensionKind::Dependent { parent } if parent == "input"));
    }

    #[test]
    fn malformed_artifact_is_reported() {
        let temp = write_temp("not json");
        let err = load_exception_app_list(temp.path()).unwrap_err();
        assert!(matches!(err, DescError::MalformedArtifact { .. }));
    }
}
