use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfError {
    #[error("cannot read system config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The system-wide declaration of which orders belong to which base chain.
///
/// Parsed from lines of the form `KEY="name1 name2 ..."`. The first
/// assignment of each key wins; a key that never appears yields an empty
/// list. Scanning stops early once all four lists are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemConf {
    pub filter_input: Vec<String>,
    pub filter_forward: Vec<String>,
    pub filter_output: Vec<String>,
    pub raw_output: Vec<String>,
}

impl SystemConf {
    /// Read and parse the system configuration file.
    ///
    /// A missing or unreadable file is a configuration error and always
    /// fatal, unlike order files.
    pub fn parse(path: &Path) -> Result<Self, ConfError> {
        let content = fs::read_to_string(path).map_err(|source| ConfError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut conf = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if conf.filter_input.is_empty() {
                if let Some(names) = grab_quoted_list("FILTER_INPUT=", line) {
                    conf.filter_input = names;
                    continue;
                }
            }
            if conf.filter_forward.is_empty() {
                if let Some(names) = grab_quoted_list("FILTER_FORWARD=", line) {
                    conf.filter_forward = names;
                    continue;
                }
            }
            if conf.filter_output.is_empty() {
                if let Some(names) = grab_quoted_list("FILTER_OUTPUT=", line) {
                    conf.filter_output = names;
                    continue;
                }
            }
            if conf.raw_output.is_empty() {
                if let Some(names) = grab_quoted_list("RAW_OUTPUT=", line) {
                    conf.raw_output = names;
                }
            }

            if conf.is_fully_populated() {
                break;
            }
        }

        Ok(conf)
    }

    fn is_fully_populated(&self) -> bool {
        !self.filter_input.is_empty()
            && !self.filter_forward.is_empty()
            && !self.filter_output.is_empty()
            && !self.raw_output.is_empty()
    }
}

/// Extract the whitespace-separated names between the first pair of
/// double quotes after `key`. An empty list is reported as `None` so a
/// later line may still populate the key.
fn grab_quoted_list(key: &str, line: &str) -> Option<Vec<String>> {
    let rest = line.strip_prefix(key)?;
    let inner = rest.split('"').nth(1)?;
    let names: Vec<String> = inner.split_whitespace().map(String::from).collect();
    if names.is_empty() { None } else { Some(names) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn conf_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp conf");
        file.write_all(content.as_bytes()).expect("write conf");
        file
    }

    #[test]
    fn parses_all_four_lists() {
        let file = conf_file(
            r#"
# orders applied at boot
FILTER_INPUT="ssh web"
FILTER_FORWARD="nat"
FILTER_OUTPUT="dns ntp web"
RAW_OUTPUT="notrack"
"#,
        );

        let conf = SystemConf::parse(file.path()).expect("parse conf");
        assert_eq!(conf.filter_input, vec!["ssh", "web"]);
        assert_eq!(conf.filter_forward, vec!["nat"]);
        assert_eq!(conf.filter_output, vec!["dns", "ntp", "web"]);
        assert_eq!(conf.raw_output, vec!["notrack"]);
    }

    #[test]
    fn first_assignment_wins() {
        let file = conf_file(
            "FILTER_INPUT=\"ssh\"\nFILTER_INPUT=\"web\"\n",
        );

        let conf = SystemConf::parse(file.path()).expect("parse conf");
        assert_eq!(conf.filter_input, vec!["ssh"]);
    }

    #[test]
    fn missing_keys_yield_empty_lists() {
        let file = conf_file("FILTER_OUTPUT=\"dns\"\n");

        let conf = SystemConf::parse(file.path()).expect("parse conf");
        assert!(conf.filter_input.is_empty());
        assert!(conf.filter_forward.is_empty());
        assert_eq!(conf.filter_output, vec!["dns"]);
        assert!(conf.raw_output.is_empty());
    }

    #[test]
    fn unknown_lines_and_comments_are_ignored() {
        let file = conf_file(
            "# comment\nSOMETHING_ELSE=\"x\"\nnot a config line\nFILTER_FORWARD=\"nat\"\n",
        );

        let conf = SystemConf::parse(file.path()).expect("parse conf");
        assert_eq!(conf.filter_forward, vec!["nat"]);
        assert!(conf.filter_input.is_empty());
    }

    #[test]
    fn empty_quotes_leave_key_open_for_later_lines() {
        let file = conf_file("FILTER_INPUT=\"\"\nFILTER_INPUT=\"ssh\"\n");

        let conf = SystemConf::parse(file.path()).expect("parse conf");
        assert_eq!(conf.filter_input, vec!["ssh"]);
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = SystemConf::parse(Path::new("/nonexistent/system.conf"));
        assert!(err.is_err());
    }
}
