use std::path::{Path, PathBuf};

use crate::reader::{OrderOpts, OrderReader};

const ORDER_EXTENSION: &str = "order";

/// Discover every order name reachable through the search path.
///
/// Directories are consulted in precedence order; the first directory
/// containing `<name>.order` shadows later ones, matching resolution.
/// Missing or unreadable directories are skipped.
pub fn discover_orders(dirs: &[PathBuf]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        let mut found: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_order_file(path))
            .filter_map(|path| path.file_stem()?.to_str().map(String::from))
            .collect();
        found.sort();

        for name in found {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names
}

/// Print every discoverable order with its content; returns the count.
pub fn list_orders(dirs: &[PathBuf]) -> usize {
    let names = discover_orders(dirs);
    let mut counter = 0;

    for name in &names {
        let Some(path) = find_order(dirs, name) else {
            continue;
        };
        let content = OrderReader::new(&path, OrderOpts::default()).as_string();
        if content.is_empty() {
            continue;
        }
        counter += 1;
        println!("From order: {name}");
        println!("============================");
        println!("{content}");
    }

    println!("Total order count: {counter}");
    counter
}

/// First `<name>.order` file across the search path, if any.
pub fn find_order(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(format!("{name}.{ORDER_EXTENSION}")))
        .find(|candidate| candidate.is_file())
}

fn is_order_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(ORDER_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dir_with_orders(orders: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("create temp dir");
        for (name, content) in orders {
            fs::write(dir.path().join(format!("{name}.order")), content).expect("write order");
        }
        dir
    }

    #[test]
    fn discovers_only_order_files() {
        let dir = dir_with_orders(&[("ssh", "filter -j ACCEPT\n")]);
        fs::write(dir.path().join("notes.txt"), "not an order").unwrap();

        let names = discover_orders(&[dir.path().to_path_buf()]);
        assert_eq!(names, vec!["ssh"]);
    }

    #[test]
    fn higher_precedence_directory_shadows_duplicates() {
        let high = dir_with_orders(&[("ssh", "high\n"), ("web", "w\n")]);
        let low = dir_with_orders(&[("ssh", "low\n"), ("dns", "d\n")]);
        let dirs = vec![high.path().to_path_buf(), low.path().to_path_buf()];

        let names = discover_orders(&dirs);
        assert_eq!(names, vec!["ssh", "web", "dns"]);

        let resolved = find_order(&dirs, "ssh").expect("resolve ssh");
        assert!(resolved.starts_with(high.path()));
    }

    #[test]
    fn missing_directories_are_skipped() {
        let dir = dir_with_orders(&[("ssh", "s\n")]);
        let dirs = vec![PathBuf::from("/nonexistent/orders"), dir.path().to_path_buf()];

        assert_eq!(discover_orders(&dirs), vec!["ssh"]);
    }

    #[test]
    fn find_order_returns_none_when_absent() {
        let dir = dir_with_orders(&[]);
        assert!(find_order(&[dir.path().to_path_buf()], "ghost").is_none());
    }
}
