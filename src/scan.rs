//! Directory listing and image-name matching.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;

/// Lists the regular files directly inside `folder` whose extension equals
/// `extension` (given with or without the leading dot). Names are sorted.
pub fn list_executables(folder: &Path, extension: &str) -> io::Result<Vec<String>> {
    let wanted = extension.trim_start_matches('.');
    let mut names = Vec::new();

    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        // DirEntry::file_type does not follow symlinks; metadata does
        let is_file = match fs::metadata(entry.path()) {
            Ok(meta) => meta.is_file(),
            Err(_) => continue,
        };
        if !is_file {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(OsStr::to_str) != Some(wanted) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(OsStr::to_str) {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// Joins names so that every entry is followed by a newline.
pub fn format_listing(names: &[String]) -> String {
    let mut out = String::new();
    for name in names {
        out.push_str(name);
        out.push('\n');
    }
    out
}

/// Printable listing of the folder, or an empty string if it cannot be read.
pub fn executables_in_folder(folder: &Path, extension: &str) -> String {
    match list_executables(folder, extension) {
        Ok(names) => format_listing(&names),
        Err(e) => {
            log::debug!("Failed to list {}: {}", folder.display(), e);
            String::new()
        }
    }
}

/// Image names compare ASCII case-insensitively, like `_stricmp`.
pub fn image_name_matches(image: &str, wanted: &str) -> bool {
    image.eq_ignore_ascii_case(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_with(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    #[test]
    fn lists_only_matching_extension() {
        let dir = folder_with(&["a.exe", "b.txt"]);
        let names = list_executables(dir.path(), "exe").unwrap();
        assert_eq!(names, vec!["a.exe".to_string()]);
        assert_eq!(format_listing(&names), "a.exe\n");
    }

    #[test]
    fn accepts_dotted_extension() {
        let dir = folder_with(&["kernel.exe", "hook.dll"]);
        let names = list_executables(dir.path(), ".exe").unwrap();
        assert_eq!(names, vec!["kernel.exe".to_string()]);
    }

    #[test]
    fn skips_directories_and_nested_files() {
        let dir = folder_with(&["top.exe"]);
        fs::create_dir(dir.path().join("sub.exe")).unwrap();
        fs::write(dir.path().join("sub.exe").join("deep.exe"), b"").unwrap();

        let names = list_executables(dir.path(), "exe").unwrap();
        assert_eq!(names, vec!["top.exe".to_string()]);
    }

    #[test]
    fn names_are_sorted() {
        let dir = folder_with(&["Student.exe", "Broadcast.exe", "Agent.exe"]);
        let listing = executables_in_folder(dir.path(), "exe");
        assert_eq!(listing, "Agent.exe\nBroadcast.exe\nStudent.exe\n");
    }

    #[test]
    fn missing_folder_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(list_executables(&missing, "exe").is_err());
        assert_eq!(executables_in_folder(&missing, "exe"), "");
    }

    #[test]
    fn empty_listing_is_empty_string() {
        assert_eq!(format_listing(&[]), "");
    }

    #[test]
    fn image_names_ignore_ascii_case() {
        assert!(image_name_matches("A.EXE", "a.exe"));
        assert!(image_name_matches("Kernel.exe", "kernel.EXE"));
        assert!(!image_name_matches("a.exe.bak", "a.exe"));
        assert!(!image_name_matches("ba.exe", "a.exe"));
    }
}
