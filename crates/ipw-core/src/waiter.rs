use std::path::PathBuf;

use ipw_iptables::Firewall;
use ipw_orders::{OrderOpts, OrderReader, SystemConf, discover_orders};

use crate::error::WaiterError;
use crate::preconditions::{Preconditions, validate_order_dirs};

/// How an operation reacts to validation and backend failures.
///
/// Direct user requests run `Strict`: the first failure is fatal. Bulk
/// operations run `BestEffort`: a failing order is skipped with a debug
/// log so one bad entry cannot abort a whole hire or fire pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Strict,
    BestEffort,
}

impl ExecMode {
    pub fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// All four base chains, across both modes.
const BASE_CHAINS: [(&str, &str); 4] = [
    ("filter", "input_orders"),
    ("filter", "forward_orders"),
    ("filter", "output_orders"),
    ("raw", "output_orders"),
];

/// The category/raw combinations a full teardown has to visit.
const ALL_CATEGORIES: [(&str, bool); 4] = [
    ("input", false),
    ("forward", false),
    ("output", false),
    ("output", true),
];

/// The orchestrator: reconciles orders against the live firewall through
/// idempotent create/link/unlink/delete steps.
///
/// No installed-state record is kept anywhere; every decision re-derives
/// the current state by querying the backend. That makes each operation
/// safe to repeat: once converged, `add` and `hire` are no-ops.
pub struct Waiter<'a, F: Firewall> {
    firewall: &'a F,
    order_dirs: Vec<PathBuf>,
    system_conf: PathBuf,
}

impl<'a, F: Firewall> Waiter<'a, F> {
    pub fn new(
        firewall: &'a F,
        order_dirs: Vec<PathBuf>,
        system_conf: PathBuf,
    ) -> Result<Self, WaiterError> {
        validate_order_dirs(&order_dirs)?;
        Ok(Self {
            firewall,
            order_dirs,
            system_conf,
        })
    }

    /// Add each named order to a chain category.
    ///
    /// Three idempotency levels make repeated calls converge instead of
    /// accumulating state: the per-order chain is only created when
    /// absent, each rule is checked before it is appended, and the jump
    /// from the base chain is checked before it is installed.
    pub fn add(
        &self,
        category: &str,
        names: &[String],
        raw: bool,
        opts: &OrderOpts,
        mode: ExecMode,
    ) -> Result<(), WaiterError> {
        let pre = Preconditions::new(self.firewall, &self.order_dirs, raw);
        pre.ensure_base_chains();

        let parent = match pre.validate_category(category) {
            Ok(parent) => parent,
            Err(err) if mode.is_strict() => return Err(err),
            Err(err) => {
                tracing::debug!(category, %err, "skipping category");
                return Ok(());
            }
        };

        let table = table_for(raw);
        for name in names {
            let path = match pre.resolve_order(name) {
                Ok(path) => path,
                Err(err) if mode.is_strict() => return Err(err),
                Err(err) => {
                    tracing::debug!(order = %name, %err, "skipping order");
                    continue;
                }
            };

            match self.place_order(name, table, &parent, &path, raw, opts) {
                Ok(()) => {}
                Err(err) if mode.is_strict() => return Err(err),
                Err(err) => tracing::debug!(order = %name, %err, "order left incomplete"),
            }
        }

        Ok(())
    }

    /// Walk one order from Absent towards Linked.
    fn place_order(
        &self,
        name: &str,
        table: &str,
        parent: &str,
        path: &std::path::Path,
        raw: bool,
        opts: &OrderOpts,
    ) -> Result<(), WaiterError> {
        let chain = order_chain(name);

        if !self.firewall.exists(table, &chain) {
            println!("ipwaiter is placing order: {name}");
            if !self.firewall.create(table, &chain) {
                return Err(WaiterError::chain("create", table, &chain));
            }
        }

        let reader = OrderReader::new(path, opts.clone());
        for (rule_table, tokens) in reader.lines() {
            if rule_table != table {
                continue;
            }
            if self.firewall.check_add(table, &chain, &tokens) {
                continue;
            }
            if !self.firewall.add(table, &chain, &tokens) {
                return Err(WaiterError::Rule {
                    table: table.to_string(),
                    chain: chain.clone(),
                    rule: tokens.join(" "),
                });
            }
        }

        if self.firewall.check_link(table, parent, &chain) {
            println!("ipwaiter has already placed order: {name}");
            return Ok(());
        }
        if !self.firewall.link(table, parent, &chain) {
            return Err(WaiterError::link(table, parent, &chain));
        }

        println!("ipwaiter has placed order: {name}");
        Ok(())
    }

    /// Remove each named order from a chain category.
    ///
    /// Without `destroy`, the per-order chain is only detached and kept
    /// around with its rules, so a later add just has to re-link it. With
    /// `destroy`, the chain is flushed and deleted as well.
    pub fn delete(
        &self,
        category: &str,
        names: &[String],
        raw: bool,
        mode: ExecMode,
        destroy: bool,
    ) -> Result<(), WaiterError> {
        let pre = Preconditions::new(self.firewall, &self.order_dirs, raw);
        pre.ensure_base_chains();

        let parent = match pre.validate_category(category) {
            Ok(parent) => parent,
            Err(err) if mode.is_strict() => return Err(err),
            Err(err) => {
                tracing::debug!(category, %err, "skipping category");
                return Ok(());
            }
        };

        let table = table_for(raw);
        for name in names {
            if let Err(err) = pre.resolve_order(name) {
                if mode.is_strict() {
                    return Err(err);
                }
                tracing::debug!(order = %name, %err, "skipping order");
                continue;
            }

            match self.remove_order(name, table, &parent, destroy) {
                Ok(()) => {}
                Err(err) if mode.is_strict() => return Err(err),
                Err(err) => tracing::debug!(order = %name, %err, "order left partially removed"),
            }
        }

        Ok(())
    }

    /// Walk one order back from Linked, optionally to Destroyed.
    fn remove_order(
        &self,
        name: &str,
        table: &str,
        parent: &str,
        destroy: bool,
    ) -> Result<(), WaiterError> {
        let chain = order_chain(name);

        // Both guards mean the same thing: this order was never placed in
        // this category, so there is nothing to undo here.
        if !self.firewall.exists(table, &chain)
            || !self.firewall.check_link(table, parent, &chain)
        {
            println!("ipwaiter has never placed order: {name}");
            return Ok(());
        }

        println!("ipwaiter is removing order: {name}");

        if !self.firewall.unlink(table, parent, &chain) {
            return Err(WaiterError::unlink(table, parent, &chain));
        }

        if destroy {
            if !self.firewall.flush(table, &chain) {
                return Err(WaiterError::chain("flush", table, &chain));
            }
            if !self.firewall.delete(table, &chain) {
                return Err(WaiterError::chain("delete", table, &chain));
            }
        }

        println!("ipwaiter has removed order: {name}");
        Ok(())
    }

    /// Apply every order listed in the system configuration.
    ///
    /// Meant to run unconditionally at startup: every step is idempotent,
    /// so hiring an already-hired system converges without duplicates.
    /// A missing or unreadable system config is always fatal.
    pub fn hire(&self, opts: &OrderOpts, mode: ExecMode) -> Result<(), WaiterError> {
        let conf = SystemConf::parse(&self.system_conf)?;

        if !conf.filter_input.is_empty() {
            self.add("input", &conf.filter_input, false, opts, mode)?;
        }
        if !conf.filter_forward.is_empty() {
            self.add("forward", &conf.filter_forward, false, opts, mode)?;
        }
        if !conf.filter_output.is_empty() {
            self.add("output", &conf.filter_output, false, opts, mode)?;
        }
        if !conf.raw_output.is_empty() {
            self.add("output", &conf.raw_output, true, opts, mode)?;
        }

        Ok(())
    }

    /// Detach everything this tool manages; with `destroy`, erase it.
    ///
    /// Flushing a base chain drops every jump in it, which is why the
    /// per-order chains only need to be resolved when `destroy` asks for
    /// them to be flushed and deleted individually.
    pub fn fire(&self, destroy: bool, mode: ExecMode) -> Result<(), WaiterError> {
        if destroy {
            let names = discover_orders(&self.order_dirs);
            for (category, raw) in ALL_CATEGORIES {
                self.delete(category, &names, raw, mode, true)?;
            }
        }

        for (table, chain) in BASE_CHAINS {
            if !self.firewall.flush(table, chain) {
                if mode.is_strict() {
                    return Err(WaiterError::chain("flush", table, chain));
                }
                tracing::debug!(table, chain, "base chain not flushed");
            }
            if destroy && !self.firewall.delete(table, chain) {
                if mode.is_strict() {
                    return Err(WaiterError::chain("delete", table, chain));
                }
                tracing::debug!(table, chain, "base chain not deleted");
            }
        }

        Ok(())
    }

    /// Refresh: `fire` without destroy, then `hire`.
    ///
    /// Per-order chains survive the fire, so the hire only re-verifies
    /// rules and re-installs jumps. Known limitation: between the base
    /// chain flush and the re-link there is a window with no active
    /// order rules; there is no staging chain or atomic swap.
    pub fn rehire(&self, opts: &OrderOpts, mode: ExecMode) -> Result<(), WaiterError> {
        self.fire(false, mode)?;
        self.hire(opts, mode)
    }

    pub fn order_dirs(&self) -> &[PathBuf] {
        &self.order_dirs
    }
}

fn table_for(raw: bool) -> &'static str {
    if raw { "raw" } else { "filter" }
}

fn order_chain(name: &str) -> String {
    format!("order_{name}")
}
