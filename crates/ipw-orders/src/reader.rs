use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the caller-supplied source address block.
pub const SRC_PLACEHOLDER: &str = "__ipwaiter_src";
/// Placeholder replaced by the caller-supplied destination address block.
pub const DST_PLACEHOLDER: &str = "__ipwaiter_dst";

const DEFAULT_ADDRESS_BLOCK: &str = "192.168.1.0/24";

/// Optional source/destination overrides for placeholder substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderOpts {
    pub src: Option<String>,
    pub dst: Option<String>,
}

/// Reads one order file into `(table, rule tokens)` pairs.
///
/// Orders are read fresh from disk on every call, never cached. An
/// unreadable file yields an empty sequence rather than an error: the
/// reader is also used during best-effort teardown, where the file may
/// already be gone.
pub struct OrderReader {
    path: PathBuf,
    opts: OrderOpts,
}

impl OrderReader {
    pub fn new(path: impl Into<PathBuf>, opts: OrderOpts) -> Self {
        Self {
            path: path.into(),
            opts,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the order into `(table, tokens)` pairs, in file order.
    ///
    /// Rule order is significant: it determines match precedence once the
    /// rules land in a kernel chain. The table token is lower-cased but
    /// not validated; filtering by table is the orchestrator's job.
    pub fn lines(&self) -> Vec<(String, Vec<String>)> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            tracing::debug!(path = %self.path.display(), "unreadable order, treated as empty");
            return Vec::new();
        };

        content
            .lines()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// Raw file content, or the empty string if unreadable.
    pub fn as_string(&self) -> String {
        fs::read_to_string(&self.path).unwrap_or_default()
    }

    fn parse_line(&self, line: &str) -> Option<(String, Vec<String>)> {
        let mut line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        // Strip trailing in-line comments.
        if let Some(idx) = line.find('#') {
            line = line[..idx].trim_end();
        }

        let (table, rest) = line.split_once(char::is_whitespace)?;
        let rest = rest
            .replace(SRC_PLACEHOLDER, self.src())
            .replace(DST_PLACEHOLDER, self.dst());

        let Some(tokens) = shlex::split(&rest) else {
            tracing::debug!(path = %self.path.display(), line, "dropping untokenizable rule line");
            return None;
        };

        Some((table.to_ascii_lowercase(), tokens))
    }

    fn src(&self) -> &str {
        self.opts.src.as_deref().unwrap_or(DEFAULT_ADDRESS_BLOCK)
    }

    fn dst(&self) -> &str {
        self.opts.dst.as_deref().unwrap_or(DEFAULT_ADDRESS_BLOCK)
    }
}
