//! Game-relative path handling
//!
//! Models refer to each other by game paths such as
//! `models/players/_humanoid/_humanoid`, relative to a mod folder inside the
//! game's `GameData` directory (`.../GameData/base/`).

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Directory that holds `base` and the mod folders.
pub const GAME_DATA_DIR: &str = "gamedata";

/// Split a full path into its mod folder and the game path inside it.
///
/// `/jka/GameData/base/models/a.glm` splits into `/jka/GameData/base` and
/// `models/a.glm`. Paths outside a game data tree return an empty prefix.
#[must_use]
pub fn split_prefix(path: &Path) -> (PathBuf, PathBuf) {
    let components: Vec<Component<'_>> = path.components().collect();
    let game_data = components.iter().position(|component| {
        matches!(component, Component::Normal(name) if name.eq_ignore_ascii_case(GAME_DATA_DIR))
    });

    match game_data {
        // the mod folder and at least one entry below it
        Some(index) if index + 2 < components.len() => (
            components[..=index + 1].iter().collect(),
            components[index + 2..].iter().collect(),
        ),
        _ => (PathBuf::new(), normalize(path)),
    }
}

/// The game path of a file below `prefix`, with forward slashes.
///
/// Falls back to the full path if the file is not below the prefix.
#[must_use]
pub fn rel_path(full_path: &Path, prefix: &Path) -> String {
    match full_path.strip_prefix(prefix) {
        Ok(relative) => relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => {
            tracing::warn!(
                "{} does not start with {}",
                full_path.display(),
                prefix.display()
            );
            full_path.display().to_string()
        }
    }
}

/// Resolve a game path against a mod folder.
///
/// An empty prefix leaves the path as given.
#[must_use]
pub fn abs_path(relative: &str, prefix: &Path) -> PathBuf {
    if prefix.as_os_str().is_empty() {
        return PathBuf::from(relative);
    }
    let mut path = prefix.to_path_buf();
    path.extend(relative.split(['/', '\\']).filter(|part| !part.is_empty()));
    normalize(&path)
}

/// Strip the extension of the last path element.
#[must_use]
pub fn remove_extension(path: &str) -> &str {
    let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

/// Locate a file by game path, trying each extension in turn when the path
/// as given does not exist.
#[must_use]
pub fn find_file(relative: &str, prefix: &Path, extensions: &[&str]) -> Option<PathBuf> {
    let path = abs_path(relative, prefix);
    if path.is_file() {
        return Some(path);
    }

    let stem = path.with_extension("");
    extensions
        .iter()
        .map(|extension| stem.with_extension(extension))
        .find(|candidate| candidate.is_file())
}

/// Directory containing a game path, resolved against a mod folder.
#[must_use]
pub fn path_to_file(relative: &str, prefix: &Path) -> PathBuf {
    let path = abs_path(relative, prefix);
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Remove `.` and resolvable `..` components without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                if matches!(last, Some(Component::Normal(_))) {
                    out.pop();
                } else if !matches!(last, Some(Component::RootDir | Component::Prefix(_))) {
                    out.push(OsStr::new(".."));
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
