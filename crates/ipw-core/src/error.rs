use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaiterError {
    #[error("invalid order directory: {0}")]
    InvalidOrderDir(PathBuf),

    #[error("invalid chain category: {0}")]
    InvalidCategory(String),

    #[error("invalid order name: {0}")]
    InvalidOrderName(String),

    #[error("no order named '{0}' in any order directory")]
    UnknownOrder(String),

    #[error("failed to {op} chain {chain} in table {table}")]
    Chain {
        op: &'static str,
        table: String,
        chain: String,
    },

    #[error("failed to add rule to chain {chain} in table {table}: {rule}")]
    Rule {
        table: String,
        chain: String,
        rule: String,
    },

    #[error("failed to {op} chain {target} {preposition} {parent} in table {table}")]
    Link {
        op: &'static str,
        preposition: &'static str,
        table: String,
        parent: String,
        target: String,
    },

    #[error(transparent)]
    SystemConf(#[from] ipw_orders::ConfError),
}

impl WaiterError {
    pub(crate) fn link(table: &str, parent: &str, target: &str) -> Self {
        Self::Link {
            op: "link",
            preposition: "to",
            table: table.to_string(),
            parent: parent.to_string(),
            target: target.to_string(),
        }
    }

    pub(crate) fn unlink(table: &str, parent: &str, target: &str) -> Self {
        Self::Link {
            op: "unlink",
            preposition: "from",
            table: table.to_string(),
            parent: parent.to_string(),
            target: target.to_string(),
        }
    }

    pub(crate) fn chain(op: &'static str, table: &str, chain: &str) -> Self {
        Self::Chain {
            op,
            table: table.to_string(),
            chain: chain.to_string(),
        }
    }
}
