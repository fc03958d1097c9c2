use std::process::{Command, Stdio};

use crate::firewall::Firewall;

/// Firewall backend that drives the `iptables(8)` binary.
///
/// Commands run synchronously with stdout and stderr discarded; the exit
/// status is the whole result. iptables exits non-zero for "chain does not
/// exist" and "rule not found" as well as for real failures, so a `false`
/// here is deliberately not an error.
pub struct Iptables {
    program: String,
}

impl Iptables {
    pub fn new() -> Self {
        Self::with_program("iptables")
    }

    /// Use a different executable, e.g. `ip6tables`.
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> bool {
        tracing::debug!(program = %self.program, ?args, "run firewall command");
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn run_rule(&self, table: &str, flag: &str, chain: &str, rule: &[String]) -> bool {
        let mut args = vec!["-t", table, flag, chain];
        args.extend(rule.iter().map(String::as_str));
        self.run(&args)
    }
}

impl Default for Iptables {
    fn default() -> Self {
        Self::new()
    }
}

impl Firewall for Iptables {
    fn exists(&self, table: &str, chain: &str) -> bool {
        self.run(&["-t", table, "-L", chain])
    }

    fn create(&self, table: &str, chain: &str) -> bool {
        self.run(&["-t", table, "-N", chain])
    }

    fn flush(&self, table: &str, chain: &str) -> bool {
        self.run(&["-t", table, "-F", chain])
    }

    fn delete(&self, table: &str, chain: &str) -> bool {
        self.run(&["-t", table, "-X", chain])
    }

    fn add(&self, table: &str, chain: &str, rule: &[String]) -> bool {
        self.run_rule(table, "-A", chain, rule)
    }

    fn check_add(&self, table: &str, chain: &str, rule: &[String]) -> bool {
        self.run_rule(table, "-C", chain, rule)
    }

    fn link(&self, table: &str, parent: &str, target: &str) -> bool {
        self.run(&["-t", table, "-A", parent, "-j", target])
    }

    fn unlink(&self, table: &str, parent: &str, target: &str) -> bool {
        self.run(&["-t", table, "-D", parent, "-j", target])
    }

    fn check_link(&self, table: &str, parent: &str, target: &str) -> bool {
        self.run(&["-t", table, "-C", parent, "-j", target])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `true` and `false` accept arbitrary arguments, which makes them a
    // convenient stand-in for exit-status handling.
    #[test]
    fn exit_status_maps_to_bool() {
        let ok = Iptables::with_program("true");
        assert!(ok.exists("filter", "INPUT"));

        let fail = Iptables::with_program("false");
        assert!(!fail.exists("filter", "INPUT"));
    }

    #[test]
    fn missing_program_is_false_not_panic() {
        let gone = Iptables::with_program("ipwaiter-no-such-binary");
        assert!(!gone.create("filter", "order_test"));
    }
}
