use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::firewall::Firewall;

type Rule = Vec<String>;
type ChainKey = (String, String);

/// In-memory firewall used by tests.
///
/// Models tables, chains and ordered rule lists the way iptables does,
/// including the failure modes the engine relies on: creating an existing
/// chain fails, deleting a chain fails while it has rules or while another
/// chain in the same table still jumps to it, rule operations against a
/// missing chain fail. A jump is stored as an ordinary `-j <target>` rule
/// in the parent chain, which is exactly what `iptables -A parent -j
/// target` does.
///
/// Every mutating call is appended to a mutation log, whether it succeeds
/// or not, so tests can assert that an operation attempted no mutation.
#[derive(Debug, Default)]
pub struct MemoryFirewall {
    chains: RefCell<BTreeMap<ChainKey, Vec<Rule>>>,
    mutations: RefCell<Vec<String>>,
}

impl MemoryFirewall {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(table: &str, chain: &str) -> ChainKey {
        (table.to_string(), chain.to_string())
    }

    fn record(&self, mutation: String) {
        self.mutations.borrow_mut().push(mutation);
    }

    fn jump_rule(target: &str) -> Rule {
        vec!["-j".to_string(), target.to_string()]
    }

    /// Chains currently present, as (table, chain) pairs.
    pub fn chains(&self) -> Vec<ChainKey> {
        self.chains.borrow().keys().cloned().collect()
    }

    /// Rules of one chain, or None if the chain does not exist.
    pub fn rules(&self, table: &str, chain: &str) -> Option<Vec<Rule>> {
        self.chains.borrow().get(&Self::key(table, chain)).cloned()
    }

    /// Full state snapshot, for whole-firewall equality assertions.
    pub fn snapshot(&self) -> BTreeMap<ChainKey, Vec<Rule>> {
        self.chains.borrow().clone()
    }

    /// Mutating calls attempted so far, in order.
    pub fn mutation_log(&self) -> Vec<String> {
        self.mutations.borrow().clone()
    }
}

impl Firewall for MemoryFirewall {
    fn exists(&self, table: &str, chain: &str) -> bool {
        self.chains.borrow().contains_key(&Self::key(table, chain))
    }

    fn create(&self, table: &str, chain: &str) -> bool {
        self.record(format!("create {table}/{chain}"));
        let mut chains = self.chains.borrow_mut();
        let key = Self::key(table, chain);
        if chains.contains_key(&key) {
            return false;
        }
        chains.insert(key, Vec::new());
        true
    }

    fn flush(&self, table: &str, chain: &str) -> bool {
        self.record(format!("flush {table}/{chain}"));
        let mut chains = self.chains.borrow_mut();
        match chains.get_mut(&Self::key(table, chain)) {
            Some(rules) => {
                rules.clear();
                true
            }
            None => false,
        }
    }

    fn delete(&self, table: &str, chain: &str) -> bool {
        self.record(format!("delete {table}/{chain}"));
        let mut chains = self.chains.borrow_mut();
        let key = Self::key(table, chain);
        match chains.get(&key) {
            Some(rules) if rules.is_empty() => {
                // iptables -X also refuses while the chain is still the
                // target of a jump somewhere in the same table.
                let jump = Self::jump_rule(chain);
                let referenced = chains.iter().any(|((t, c), rules)| {
                    t == table && c != chain && rules.contains(&jump)
                });
                if referenced {
                    return false;
                }
                chains.remove(&key);
                true
            }
            _ => false,
        }
    }

    fn add(&self, table: &str, chain: &str, rule: &[String]) -> bool {
        self.record(format!("add {table}/{chain} {}", rule.join(" ")));
        let mut chains = self.chains.borrow_mut();
        match chains.get_mut(&Self::key(table, chain)) {
            Some(rules) => {
                rules.push(rule.to_vec());
                true
            }
            None => false,
        }
    }

    fn check_add(&self, table: &str, chain: &str, rule: &[String]) -> bool {
        self.chains
            .borrow()
            .get(&Self::key(table, chain))
            .is_some_and(|rules| rules.iter().any(|r| r == rule))
    }

    fn link(&self, table: &str, parent: &str, target: &str) -> bool {
        self.add(table, parent, &Self::jump_rule(target))
    }

    fn unlink(&self, table: &str, parent: &str, target: &str) -> bool {
        self.record(format!("unlink {table}/{parent} -> {target}"));
        let mut chains = self.chains.borrow_mut();
        let jump = Self::jump_rule(target);
        match chains.get_mut(&Self::key(table, parent)) {
            Some(rules) => match rules.iter().position(|r| *r == jump) {
                Some(idx) => {
                    rules.remove(idx);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    fn check_link(&self, table: &str, parent: &str, target: &str) -> bool {
        self.check_add(table, parent, &Self::jump_rule(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn create_is_not_idempotent() {
        let fw = MemoryFirewall::new();
        assert!(fw.create("filter", "order_ssh"));
        assert!(!fw.create("filter", "order_ssh"));
    }

    #[test]
    fn delete_refuses_non_empty_chain() {
        let fw = MemoryFirewall::new();
        fw.create("filter", "order_ssh");
        fw.add("filter", "order_ssh", &rule(&["-j", "ACCEPT"]));

        assert!(!fw.delete("filter", "order_ssh"));
        fw.flush("filter", "order_ssh");
        assert!(fw.delete("filter", "order_ssh"));
        assert!(!fw.exists("filter", "order_ssh"));
    }

    #[test]
    fn delete_refuses_chain_still_jumped_to() {
        let fw = MemoryFirewall::new();
        fw.create("filter", "input_orders");
        fw.create("filter", "order_ssh");
        fw.link("filter", "input_orders", "order_ssh");

        assert!(!fw.delete("filter", "order_ssh"));
        fw.unlink("filter", "input_orders", "order_ssh");
        assert!(fw.delete("filter", "order_ssh"));
    }

    #[test]
    fn reference_check_is_per_table() {
        let fw = MemoryFirewall::new();
        fw.create("filter", "output_orders");
        fw.create("raw", "output_orders");
        fw.create("raw", "order_notrack");
        fw.link("raw", "output_orders", "order_notrack");

        // A same-named jump in another table does not pin the chain.
        fw.create("filter", "order_notrack");
        assert!(fw.delete("filter", "order_notrack"));
        assert!(!fw.delete("raw", "order_notrack"));
    }

    #[test]
    fn link_is_a_jump_rule_in_the_parent() {
        let fw = MemoryFirewall::new();
        fw.create("filter", "input_orders");
        fw.create("filter", "order_ssh");

        assert!(!fw.check_link("filter", "input_orders", "order_ssh"));
        assert!(fw.link("filter", "input_orders", "order_ssh"));
        assert!(fw.check_link("filter", "input_orders", "order_ssh"));
        assert_eq!(
            fw.rules("filter", "input_orders").unwrap(),
            vec![rule(&["-j", "order_ssh"])]
        );

        assert!(fw.unlink("filter", "input_orders", "order_ssh"));
        assert!(!fw.unlink("filter", "input_orders", "order_ssh"));
    }

    #[test]
    fn check_add_matches_exact_rule() {
        let fw = MemoryFirewall::new();
        fw.create("filter", "order_web");
        let r = rule(&["-p", "tcp", "--dport", "80", "-j", "ACCEPT"]);
        assert!(!fw.check_add("filter", "order_web", &r));
        fw.add("filter", "order_web", &r);
        assert!(fw.check_add("filter", "order_web", &r));
    }

    #[test]
    fn queries_do_not_touch_the_mutation_log() {
        let fw = MemoryFirewall::new();
        fw.create("filter", "order_web");
        let before = fw.mutation_log().len();

        fw.exists("filter", "order_web");
        fw.check_add("filter", "order_web", &rule(&["-j", "ACCEPT"]));
        fw.check_link("filter", "input_orders", "order_web");

        assert_eq!(fw.mutation_log().len(), before);
    }
}
