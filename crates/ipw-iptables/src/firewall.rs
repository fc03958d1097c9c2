/// Narrow interface over the kernel packet filter.
///
/// Every operation reports success as a plain boolean. A `false` from a
/// mutating call is not an error by itself; the caller decides whether it
/// is fatal. The live firewall is the only source of truth: the `check_*`
/// and `exists` queries are how callers re-derive state, there is no
/// installed-state record anywhere else.
pub trait Firewall {
    /// True iff `chain` exists in `table`.
    fn exists(&self, table: &str, chain: &str) -> bool;

    /// Create `chain` in `table`. Fails if the chain already exists.
    fn create(&self, table: &str, chain: &str) -> bool;

    /// Remove every rule from `chain`.
    fn flush(&self, table: &str, chain: &str) -> bool;

    /// Delete `chain` from `table`. Fails while the chain has rules.
    fn delete(&self, table: &str, chain: &str) -> bool;

    /// Append `rule` to `chain`.
    fn add(&self, table: &str, chain: &str, rule: &[String]) -> bool;

    /// True iff an equivalent `rule` is already present in `chain`.
    fn check_add(&self, table: &str, chain: &str, rule: &[String]) -> bool;

    /// Install a jump from `parent` to `target`.
    fn link(&self, table: &str, parent: &str, target: &str) -> bool;

    /// Remove the jump from `parent` to `target`.
    fn unlink(&self, table: &str, parent: &str, target: &str) -> bool;

    /// True iff the jump from `parent` to `target` already exists.
    fn check_link(&self, table: &str, parent: &str, target: &str) -> bool;
}
