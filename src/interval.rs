//! Poll interval persisted as a single integer in a text file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

#[derive(Clone, Debug)]
pub struct IntervalStore {
    path: PathBuf,
}

impl IntervalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current interval in seconds. A missing or unparsable file reads as 0.
    pub fn read_secs(&self) -> u64 {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_interval(&content),
            Err(e) => {
                log::trace!("Interval file {} unreadable: {}", self.path.display(), e);
                0
            }
        }
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs())
    }

    pub fn write_secs(&self, secs: u64) -> Result<()> {
        fs::write(&self.path, secs.to_string()).with_context(|| {
            format!(
                "Unable to open the file {}. Ensure it exists and is not in use by another application",
                self.path.display()
            )
        })
    }
}

/// Reads the leading unsigned integer, skipping leading whitespace. One
/// explicit `+` sign is allowed before the digits.
pub fn parse_interval(content: &str) -> u64 {
    let trimmed = content.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = unsigned
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Validates an interval typed or picked by the user. Only positive values are
/// accepted.
pub fn parse_interval_input(input: &str) -> Option<u64> {
    let value = parse_interval(input);
    (value > 0).then_some(value)
}

/// Checks what the user left in the interval file after editing it by hand.
/// A positive value is rewritten in canonical form; anything else is replaced
/// by `previous` and reported as an error.
pub fn apply_edited_interval(store: &IntervalStore, previous: u64) -> Result<u64> {
    let content = fs::read_to_string(store.path()).unwrap_or_default();
    match parse_interval_input(&content) {
        Some(secs) => {
            store.write_secs(secs)?;
            Ok(secs)
        }
        None => {
            store.write_secs(previous)?;
            bail!(
                "\"{}\" is not a valid interval. Enter a whole number of seconds greater than 0. \
                 The interval stays at {}s.",
                content.trim(),
                previous
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_integer() {
        assert_eq!(parse_interval("5"), 5);
        assert_eq!(parse_interval(" 7\n"), 7);
        assert_eq!(parse_interval("12abc"), 12);
        assert_eq!(parse_interval("+5"), 5);
        assert_eq!(parse_interval(" +8\n"), 8);
    }

    #[test]
    fn garbage_reads_as_zero() {
        assert_eq!(parse_interval(""), 0);
        assert_eq!(parse_interval("abc"), 0);
        assert_eq!(parse_interval("-3"), 0);
        assert_eq!(parse_interval("+"), 0);
        assert_eq!(parse_interval("++5"), 0);
        assert_eq!(parse_interval("+ 5"), 0);
        assert_eq!(parse_interval("99999999999999999999999"), 0);
    }

    #[test]
    fn user_input_must_be_positive() {
        assert_eq!(parse_interval_input("5"), Some(5));
        assert_eq!(parse_interval_input("30"), Some(30));
        assert_eq!(parse_interval_input("0"), None);
        assert_eq!(parse_interval_input("-1"), None);
        assert_eq!(parse_interval_input("x"), None);
    }

    #[test]
    fn missing_file_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntervalStore::new(dir.path().join("interval.txt"));
        assert_eq!(store.read_secs(), 0);
        assert_eq!(store.read(), Duration::ZERO);
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntervalStore::new(dir.path().join("interval.txt"));
        store.write_secs(5).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "5");
        assert_eq!(store.read(), Duration::from_secs(5));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntervalStore::new(dir.path().join("nope").join("interval.txt"));
        assert!(store.write_secs(3).is_err());
    }

    #[test]
    fn hand_edit_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntervalStore::new(dir.path().join("interval.txt"));
        fs::write(store.path(), " 15 seconds\r\n").unwrap();

        assert_eq!(apply_edited_interval(&store, 5).unwrap(), 15);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "15");
    }

    #[test]
    fn invalid_hand_edit_restores_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntervalStore::new(dir.path().join("interval.txt"));

        for bad in ["0", "-4", "soon", ""] {
            fs::write(store.path(), bad).unwrap();
            let err = apply_edited_interval(&store, 5).unwrap_err();
            assert!(err.to_string().contains("stays at 5s"));
            assert_eq!(store.read_secs(), 5);
        }
    }
}
