use std::path::PathBuf;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use ipw_core::{ExecMode, Waiter};
use ipw_iptables::Iptables;
use ipw_orders::OrderOpts;

const SYSTEM_ORDER_DIR: &str = "/etc/ipwaiter/orders";
const DEFAULT_SYSTEM_CONF: &str = "/etc/ipwaiter/system.conf";

#[derive(Parser)]
#[command(name = "ipwaiter")]
#[command(version, about = "Declarative iptables chain management", long_about = None)]
struct Cli {
    /// Operate on the raw table (output category only)
    #[arg(short = 'R', long, global = true)]
    raw: bool,

    /// Extra order directory; may be repeated, later ones take precedence
    #[arg(short = 'd', long = "dir", global = true, value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// System configuration file
    #[arg(long, global = true, default_value = DEFAULT_SYSTEM_CONF, value_name = "FILE")]
    conf: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an order to a chain category
    Add {
        /// Order name (resolved to <name>.order in the search path)
        order: String,
        /// Chain category: input, forward or output
        chain: String,
        /// Source address block for __ipwaiter_src
        #[arg(long, value_name = "CIDR")]
        src: Option<String>,
        /// Destination address block for __ipwaiter_dst
        #[arg(long, value_name = "CIDR")]
        dst: Option<String>,
    },
    /// Delete an order from a chain category
    Delete {
        /// Order name
        order: String,
        /// Chain category: input, forward or output
        chain: String,
        /// Also flush and remove the per-order chain
        #[arg(long)]
        destroy: bool,
    },
    /// Apply every order listed in the system configuration
    Hire {
        #[arg(long, value_name = "CIDR")]
        src: Option<String>,
        #[arg(long, value_name = "CIDR")]
        dst: Option<String>,
    },
    /// Detach every managed order and flush the base chains
    Fire {
        /// Also remove every per-order chain and the base chains
        #[arg(long)]
        destroy: bool,
    },
    /// Fire (without destroy) and hire again
    Rehire {
        #[arg(long, value_name = "CIDR")]
        src: Option<String>,
        #[arg(long, value_name = "CIDR")]
        dst: Option<String>,
    },
    /// Show every order in the search path
    List,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let firewall = Iptables::new();
    let dirs = order_search_path(cli.dirs);
    let waiter = Waiter::new(&firewall, dirs, cli.conf)?;

    match cli.command {
        Commands::Add {
            order,
            chain,
            src,
            dst,
        } => {
            let opts = OrderOpts { src, dst };
            waiter.add(&chain, &[order], cli.raw, &opts, ExecMode::Strict)?;
        }
        Commands::Delete {
            order,
            chain,
            destroy,
        } => {
            waiter.delete(&chain, &[order], cli.raw, ExecMode::Strict, destroy)?;
        }
        Commands::Hire { src, dst } => {
            let opts = OrderOpts { src, dst };
            waiter.hire(&opts, ExecMode::BestEffort)?;
        }
        Commands::Fire { destroy } => {
            waiter.fire(destroy, ExecMode::BestEffort)?;
        }
        Commands::Rehire { src, dst } => {
            let opts = OrderOpts { src, dst };
            waiter.rehire(&opts, ExecMode::BestEffort)?;
        }
        Commands::List => {
            ipw_orders::list_orders(waiter.order_dirs());
        }
    }

    Ok(())
}

/// Assemble the order search path, highest precedence first: directories
/// given on the command line (reversed, so the last `-d` wins), then the
/// user orders directory, then the system-wide one. The default
/// directories are only consulted when they exist; explicit ones are
/// validated by the waiter.
fn order_search_path(explicit: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = explicit.into_iter().rev().collect();

    if let Some(project) = ProjectDirs::from("", "", "ipwaiter") {
        let user = project.config_dir().join("orders");
        if user.is_dir() {
            dirs.push(user);
        }
    }

    let system = PathBuf::from(SYSTEM_ORDER_DIR);
    if system.is_dir() {
        dirs.push(system);
    }

    tracing::debug!(?dirs, "order search path");
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dirs_are_reversed_for_precedence() {
        let dirs = order_search_path(vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]);
        assert!(dirs.len() >= 2);
        assert_eq!(dirs[0], PathBuf::from("/tmp/b"));
        assert_eq!(dirs[1], PathBuf::from("/tmp/a"));
    }
}
