//! File-backed authoritative data source for the daemon.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use hivecache::Error;
use tracing::info;

/// In-memory key/value source loaded from a tab-separated file.
///
/// One `key<TAB>value` pair per line; malformed lines are skipped.
/// With no file configured, a small built-in sample set is served so a
/// fresh cluster can be exercised without any setup.
pub struct FileSource {
    entries: HashMap<String, String>,
}

impl FileSource {
    /// Load the source, or fall back to the built-in sample data.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let entries = match path {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening data file {}", path.display()))?;
                let mut entries = HashMap::new();
                for line in BufReader::new(file).lines() {
                    let line = line.context("reading data file")?;
                    if let Some((key, value)) = line.split_once('\t') {
                        entries.insert(key.to_string(), value.to_string());
                    }
                }
                info!("loaded {} keys from {}", entries.len(), path.display());
                entries
            }
            None => {
                info!("no data file configured, serving built-in sample data");
                HashMap::from([
                    ("Tom".to_string(), "630".to_string()),
                    ("Jack".to_string(), "589".to_string()),
                    ("Sam".to_string(), "567".to_string()),
                ])
            }
        };

        Ok(Self { entries })
    }

    /// Authoritative lookup; this is the slow path behind every cache
    /// miss, so it logs each invocation.
    pub fn get(&self, key: &str) -> hivecache::Result<Vec<u8>> {
        info!("[source] lookup for {:?}", key);
        self.entries
            .get(key)
            .map(|value| value.clone().into_bytes())
            .ok_or_else(|| Error::Loader(format!("{} not exist", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_source_builtin_sample() {
        let source = FileSource::load(None).unwrap();

        assert_eq!(source.get("Tom").unwrap(), b"630".to_vec());
        assert!(matches!(
            source.get("Unknown"),
            Err(Error::Loader(msg)) if msg == "Unknown not exist"
        ));
    }

    #[test]
    fn test_source_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alpha\t1").unwrap();
        writeln!(file, "malformed line without tab").unwrap();
        writeln!(file, "beta\t2").unwrap();
        file.flush().unwrap();

        let source = FileSource::load(Some(file.path())).unwrap();

        assert_eq!(source.get("alpha").unwrap(), b"1".to_vec());
        assert_eq!(source.get("beta").unwrap(), b"2".to_vec());
        assert!(source.get("malformed line without tab").is_err());
    }
}
