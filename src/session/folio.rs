//! Archive folio files
//!
//! A folio is a small text file that ties together the archives recorded
//! by one session: who created it, when, and one `Archive:` line per
//! monitored host. The logger backend writes it; [`Folio::load`] reads it
//! back for inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RecordError, Result, ResultExt};

/// First line of every folio
pub const FOLIO_MAGIC: &str = "PCPFolio";

/// Folio format version written by this crate
pub const FOLIO_VERSION: u32 = 1;

/// Extension used for the replay configuration named in a folio
pub const REPLAY_CONFIG_EXTENSION: &str = "config";

/// One archive listed in a folio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioArchive {
    /// Host the archive is recorded from
    pub host: String,
    /// Archive base name (path without the archive suffixes)
    pub base: PathBuf,
}

/// Parsed contents of a folio file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folio {
    /// Format version
    pub version: u32,
    /// Free-form creation line
    pub created: Option<String>,
    /// Tool or person that created the folio
    pub creator: String,
    /// Configuration the creator replays the folio with
    pub replay_config: Option<PathBuf>,
    /// Archives, in the order hosts were added
    pub archives: Vec<FolioArchive>,
}

impl Folio {
    /// Render the folio header
    pub fn header(creator: &str, replay_config: Option<&Path>, created: DateTime<Utc>) -> String {
        let mut text = String::new();
        text.push_str(FOLIO_MAGIC);
        text.push('\n');
        text.push_str(&format!("Version: {}\n", FOLIO_VERSION));
        text.push_str("# use pmafm(1) to process this PCP archive folio\n#\n");
        text.push_str(&format!("Created: at {}\n", created.to_rfc2822()));
        text.push_str(&format!("Creator: {}\n", creator));
        if let Some(config) = replay_config {
            text.push_str(&format!("Replay: {}\n", config.display()));
        }
        text.push_str("#\t\tHost\t\t\tBasename\n#\n");
        text
    }

    /// Render one archive line
    pub fn archive_line(host: &str, base: &Path) -> String {
        format!("Archive:\t{}\t\t\t{}\n", host, base.display())
    }

    /// Parse folio text
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        match lines.next() {
            Some(FOLIO_MAGIC) => {}
            Some(other) => {
                return Err(RecordError::Folio(format!(
                    "bad magic {:?}, expected {:?}",
                    other, FOLIO_MAGIC
                )))
            }
            None => return Err(RecordError::Folio("empty folio".to_string())),
        }

        let mut folio = Folio {
            version: 0,
            created: None,
            creator: String::new(),
            replay_config: None,
            archives: Vec::new(),
        };

        for line in lines {
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(RecordError::Folio(format!("malformed line {:?}", line)));
            };
            let value = value.trim();

            match key {
                "Version" => {
                    folio.version = value.parse().map_err(|_| {
                        RecordError::Folio(format!("bad version {:?}", value))
                    })?;
                }
                "Created" => folio.created = Some(value.to_string()),
                "Creator" => folio.creator = value.to_string(),
                "Replay" => folio.replay_config = Some(PathBuf::from(value)),
                "Archive" => {
                    let (host, base) = value
                        .split_once(char::is_whitespace)
                        .map(|(h, b)| (h, b.trim()))
                        .filter(|(_, b)| !b.is_empty())
                        .ok_or_else(|| {
                            RecordError::Folio(format!("archive line without basename {:?}", line))
                        })?;
                    folio.archives.push(FolioArchive {
                        host: host.to_string(),
                        base: PathBuf::from(base),
                    });
                }
                other => tracing::debug!("Ignoring unknown folio key {:?}", other),
            }
        }

        if folio.version != FOLIO_VERSION {
            return Err(RecordError::Folio(format!(
                "unsupported folio version {}",
                folio.version
            )));
        }

        Ok(folio)
    }

    /// Load and parse a folio file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read folio {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to parse folio {}", path.display()))
    }

    /// Hosts listed in the folio
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.archives.iter().map(|a| a.host.as_str())
    }
}

/// Replay configuration path for a folio: `<folio>.config`
pub fn replay_config_path(folio: &Path) -> PathBuf {
    folio.with_extension(REPLAY_CONFIG_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(replay: bool) -> String {
        let replay_config = PathBuf::from("/tmp/run.config");
        let mut text = Folio::header(
            "pmchart",
            replay.then_some(replay_config.as_path()),
            Utc::now(),
        );
        text.push_str(&Folio::archive_line("hostA", Path::new("/tmp/run-hostA")));
        text.push_str(&Folio::archive_line("hostB", Path::new("/tmp/run-hostB")));
        text
    }

    #[test]
    fn test_parse_written_folio() {
        let folio = Folio::parse(&sample(false)).unwrap();
        assert_eq!(folio.version, FOLIO_VERSION);
        assert_eq!(folio.creator, "pmchart");
        assert!(folio.created.is_some());
        assert!(folio.replay_config.is_none());
        assert_eq!(folio.hosts().collect::<Vec<_>>(), vec!["hostA", "hostB"]);
        assert_eq!(folio.archives[1].base, PathBuf::from("/tmp/run-hostB"));
    }

    #[test]
    fn test_parse_replay_line() {
        let folio = Folio::parse(&sample(true)).unwrap();
        assert_eq!(folio.replay_config, Some(PathBuf::from("/tmp/run.config")));
    }

    #[test]
    fn test_creator_with_spaces_survives() {
        let text = Folio::header("load test, night run", None, Utc::now());
        let folio = Folio::parse(&text).unwrap();
        assert_eq!(folio.creator, "load test, night run");
    }

    #[test]
    fn test_rejects_bad_magic() {
        let err = Folio::parse("NotAFolio\nVersion: 1\n").unwrap_err();
        assert!(err.to_string().contains("bad magic"));
        assert!(Folio::parse("").is_err());
    }

    #[test]
    fn test_rejects_archive_without_base() {
        let text = format!("{}\nVersion: 1\nArchive: lonely\n", FOLIO_MAGIC);
        assert!(Folio::parse(&text).is_err());
    }

    #[test]
    fn test_replay_config_path() {
        assert_eq!(
            replay_config_path(Path::new("/data/run.folio")),
            PathBuf::from("/data/run.config")
        );
        assert_eq!(
            replay_config_path(Path::new("/data/run")),
            PathBuf::from("/data/run.config")
        );
    }
}
