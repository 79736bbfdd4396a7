//! Operator command line
//!
//! A thin diagnostic front end over the library: list a cluster's nodes,
//! audit server versions, or run a bundled script on one node.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use valkey_cluster_pools::utils::RespValue;

/// Inspect named Valkey/Redis clusters
#[derive(Parser, Debug, Clone)]
#[command(name = "valkey-cluster-pools")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Cluster definitions (JSON, or YAML for .yaml/.yml)
    #[arg(short = 'c', long = "config", default_value = "clusters.yaml")]
    pub config: PathBuf,

    /// Debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Errors only
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List a cluster's nodes and their pools
    Nodes(ClusterArg),

    /// Check every node's server version
    Versions {
        #[command(flatten)]
        cluster: ClusterArg,

        /// Minimum version; any node below it fails the check
        #[arg(long = "required", default_value = "2.8.0")]
        required: String,

        /// Recommended version; nodes below it are reported (default 3.0.4)
        #[arg(long = "recommended")]
        recommended: Option<String>,

        /// Label shown in messages, e.g. the subsystem using the cluster
        #[arg(long = "label")]
        label: Option<String>,
    },

    /// Run a script from <scripts-root>/scripts/ on one node
    Eval {
        #[command(flatten)]
        cluster: ClusterArg,

        /// Script path relative to the scripts directory
        script: String,

        /// Node id to run on
        #[arg(short = 'n', long = "node", default_value = "0")]
        node: String,

        /// Directory containing `scripts/`
        #[arg(long = "scripts-root", default_value = ".")]
        scripts_root: PathBuf,

        /// KEYS entries (repeatable)
        #[arg(short = 'k', long = "key", action = clap::ArgAction::Append)]
        keys: Vec<String>,

        /// ARGV entries (repeatable)
        #[arg(short = 'a', long = "arg", action = clap::ArgAction::Append)]
        args: Vec<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ClusterArg {
    /// Cluster name; unknown names use "default"
    #[arg(long = "cluster", default_value = "default")]
    pub name: String,
}

impl CliArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Print a RESP reply the way valkey-cli does
pub fn print_reply(reply: &RespValue, indent: usize) {
    let prefix = "  ".repeat(indent);
    match reply {
        RespValue::Array(items) if items.is_empty() => println!("{}(empty array)", prefix),
        RespValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    RespValue::Array(_) => {
                        println!("{}{})", prefix, i + 1);
                        print_reply(item, indent + 1);
                    }
                    _ => println!("{}{}) {}", prefix, i + 1, scalar(item)),
                }
            }
        }
        _ => println!("{}{}", prefix, scalar(reply)),
    }
}

fn scalar(reply: &RespValue) -> String {
    match reply {
        RespValue::SimpleString(s) => s.clone(),
        RespValue::Error(e) => format!("(error) {}", e),
        RespValue::Integer(n) => format!("(integer) {}", n),
        RespValue::BulkString(data) => match std::str::from_utf8(data) {
            Ok(s) => format!("\"{}\"", s),
            Err(_) => format!("(binary) {} bytes", data.len()),
        },
        RespValue::Null => "(nil)".to_string(),
        RespValue::Array(items) => format!("({} items)", items.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        let args = CliArgs::try_parse_from([
            "valkey-cluster-pools",
            "--config",
            "c.json",
            "versions",
            "--cluster",
            "metrics",
            "--required",
            "3.0.0",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("c.json"));
        match args.command {
            Command::Versions {
                cluster, required, ..
            } => {
                assert_eq!(cluster.name, "metrics");
                assert_eq!(required, "3.0.0");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_eval_repeated_keys() {
        let args = CliArgs::try_parse_from([
            "valkey-cluster-pools",
            "eval",
            "tsdb/incr.lua",
            "-k",
            "a",
            "-k",
            "b",
            "--arg",
            "1",
        ])
        .unwrap();
        match args.command {
            Command::Eval {
                script, keys, args, node, ..
            } => {
                assert_eq!(script, "tsdb/incr.lua");
                assert_eq!(keys, vec!["a", "b"]);
                assert_eq!(args, vec!["1"]);
                assert_eq!(node, "0");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_scalar_formatting() {
        assert_eq!(scalar(&RespValue::Integer(3)), "(integer) 3");
        assert_eq!(scalar(&RespValue::BulkString(b"x".to_vec())), "\"x\"");
        assert_eq!(scalar(&RespValue::Null), "(nil)");
    }
}
