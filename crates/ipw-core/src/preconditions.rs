use std::path::PathBuf;
use std::sync::LazyLock;

use ipw_iptables::Firewall;
use regex::Regex;

use crate::error::WaiterError;

static ORDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("order name pattern"));

/// Pre-flight checks shared by every orchestrator operation: base chain
/// existence, chain-category validation, and order-name resolution.
pub struct Preconditions<'a, F: Firewall> {
    firewall: &'a F,
    order_dirs: &'a [PathBuf],
    raw: bool,
}

impl<'a, F: Firewall> Preconditions<'a, F> {
    pub fn new(firewall: &'a F, order_dirs: &'a [PathBuf], raw: bool) -> Self {
        Self {
            firewall,
            order_dirs,
            raw,
        }
    }

    /// Base chains for the current mode, as (table, chain) pairs.
    fn base_chains(&self) -> &'static [(&'static str, &'static str)] {
        if self.raw {
            &[("raw", "output_orders")]
        } else {
            &[
                ("filter", "input_orders"),
                ("filter", "forward_orders"),
                ("filter", "output_orders"),
            ]
        }
    }

    /// Idempotently create the base chains for the current mode.
    ///
    /// Existence is checked first so a repeated run never trips over a
    /// duplicate-create failure. A failed create is only debug-logged
    /// here; the first operation that needs the chain will surface it.
    pub fn ensure_base_chains(&self) {
        for (table, chain) in self.base_chains() {
            if !self.firewall.exists(table, chain) && !self.firewall.create(table, chain) {
                tracing::debug!(table, chain, "failed to create base chain");
            }
        }
    }

    /// Map a category name onto its base chain.
    ///
    /// Matching is case-insensitive. Raw mode permits only `output`;
    /// non-raw mode permits `input`, `forward` and `output`.
    pub fn validate_category(&self, category: &str) -> Result<String, WaiterError> {
        let upper = category.to_uppercase();
        let allowed: &[&str] = if self.raw {
            &["OUTPUT"]
        } else {
            &["INPUT", "FORWARD", "OUTPUT"]
        };

        if allowed.contains(&upper.as_str()) {
            Ok(format!("{}_orders", category.to_lowercase()))
        } else {
            Err(WaiterError::InvalidCategory(category.to_string()))
        }
    }

    /// Resolve an order name to the first `<name>.order` file across the
    /// order directories, in precedence order.
    pub fn resolve_order(&self, name: &str) -> Result<PathBuf, WaiterError> {
        if !ORDER_NAME.is_match(name) {
            return Err(WaiterError::InvalidOrderName(name.to_string()));
        }

        ipw_orders::find_order(self.order_dirs, name)
            .ok_or_else(|| WaiterError::UnknownOrder(name.to_string()))
    }
}

/// Every explicitly configured order directory must exist.
pub fn validate_order_dirs(dirs: &[PathBuf]) -> Result<(), WaiterError> {
    for dir in dirs {
        if !dir.is_dir() {
            return Err(WaiterError::InvalidOrderDir(dir.clone()));
        }
    }
    Ok(())
}
