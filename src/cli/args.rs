//! CLI argument definitions using clap
//!
//! Commands:
//! - nanopivot load [--config <path>] [--export <path>]
//! - nanopivot query --measure <name>... [--group-by <level>...] [--filter <level=value>...]
//! - nanopivot members --hierarchy <path> [--parent <value>...]
//! - nanopivot export --out <path>
//! - nanopivot inspect --input <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NanoPivot - an in-memory multidimensional analysis engine
#[derive(Parser, Debug)]
#[command(name = "nanopivot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the sample data and print datastore statistics
    Load {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the loaded snapshot to this path
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print the store structure and contents to stderr even when the
        /// configuration turns it off
        #[arg(long)]
        structure: bool,
    },

    /// Run one aggregation query and print the result
    Query {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Query a snapshot image instead of the sample data
        #[arg(long)]
        image: Option<PathBuf>,

        /// Measure to compute (repeatable)
        #[arg(long = "measure", required = true)]
        measures: Vec<String>,

        /// Level to group by, as level[@hierarchy[@dimension]] (repeatable)
        #[arg(long = "group-by")]
        group_by: Vec<String>,

        /// Member filter as level=value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Print raw values instead of formatted labels
        #[arg(long)]
        raw: bool,
    },

    /// List the members of a hierarchy level
    Members {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Hierarchy as hierarchy[@dimension]
        #[arg(long)]
        hierarchy: String,

        /// Parent member on the path from the top level (repeatable)
        #[arg(long = "parent")]
        parents: Vec<String>,
    },

    /// Load the sample data and write it as a snapshot image
    Export {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Image path; defaults to the configured snapshot_path
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a snapshot image and print its statistics
    Inspect {
        /// Image path
        #[arg(long)]
        input: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "nanopivot",
            "query",
            "--measure",
            "Order Count",
            "--group-by",
            "subCategory@Category@Product",
            "--filter",
            "country=France",
        ])
        .unwrap();
        match cli.command {
            Command::Query {
                measures,
                group_by,
                filters,
                raw,
                ..
            } => {
                assert_eq!(measures, vec!["Order Count".to_string()]);
                assert_eq!(group_by, vec!["subCategory@Category@Product".to_string()]);
                assert_eq!(filters, vec!["country=France".to_string()]);
                assert!(!raw);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_query_requires_measure() {
        assert!(Cli::try_parse_from(["nanopivot", "query"]).is_err());
    }
}
