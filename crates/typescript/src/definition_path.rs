//! Location of the generated `.d.ts` file

use std::path::{Component, Path, PathBuf};

/// Path of the type definition file for `file`.
///
/// Without an output folder the definition sits next to the source. With
/// one, the source path relative to `cwd` is mirrored under
/// `cwd/output_folder`. Separators are always forward slashes.
pub fn type_definition_path(file: &Path, output_folder: Option<&Path>, cwd: &Path) -> String {
    let path = match output_folder {
        Some(folder) => {
            let absolute = cwd.join(file);
            let relative = pathdiff::diff_paths(&absolute, cwd).unwrap_or(absolute);
            normalize(&cwd.join(folder).join(relative))
        }
        None => file.to_path_buf(),
    };

    format!("{}.d.ts", slash(&path))
}

fn slash(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Resolve `.` and `..` without touching the file system
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
