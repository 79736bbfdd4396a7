//! valkey-cluster-pools - inspect named Valkey/Redis clusters
//!
//! Resolves clusters through the same pool registry and cluster manager the
//! library exposes, so what it reports is what an application would see.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use valkey_cluster_pools::backends::Backends;
use valkey_cluster_pools::config::FileConfigProvider;
use valkey_cluster_pools::script::DirectoryScriptSource;
use valkey_cluster_pools::version::Version;

mod cli;

use cli::{CliArgs, Command};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

fn parse_version(text: &str) -> Result<Version> {
    text.parse::<Version>()
        .with_context(|| format!("bad version argument {:?}", text))
}

fn run() -> Result<()> {
    let args = CliArgs::parse_args();
    setup_logging(args.verbose, args.quiet);

    let provider = Arc::new(FileConfigProvider::new(&args.config));
    info!("Reading clusters from {:?}", args.config);

    match args.command {
        Command::Nodes(cluster) => {
            let backends = Backends::new(provider, Arc::new(DirectoryScriptSource::new(".")));
            let client = backends.get_cluster(&cluster.name)?;

            println!(
                "Cluster {} ({} nodes)",
                client.name().unwrap_or(&cluster.name),
                client.len()
            );
            for host in client.hosts() {
                let stats = client
                    .pool(&host.id)
                    .map(|pool| pool.stats())
                    .unwrap_or_default();
                println!(
                    "  {:>4}  {:<28} idle={} open={} max={}",
                    host.id, host.key.to_string(), stats.idle, stats.open, stats.max
                );
            }
        }

        Command::Versions {
            cluster,
            required,
            recommended,
            label,
        } => {
            let required = parse_version(&required)?;
            let recommended = recommended.as_deref().map(parse_version).transpose()?;

            let backends = Backends::new(provider, Arc::new(DirectoryScriptSource::new(".")));
            let client = backends.get_cluster(&cluster.name)?;
            let warning =
                backends.check_cluster_versions(&client, required, recommended, label.as_deref())?;

            match warning {
                Some(warning) => println!("{}", warning.message),
                None => println!("All {} nodes meet the recommended version", client.len()),
            }
        }

        Command::Eval {
            cluster,
            script,
            node,
            scripts_root,
            keys,
            args: script_args,
        } => {
            let backends = Backends::new(provider, Arc::new(DirectoryScriptSource::new(scripts_root)));
            let client = backends.get_cluster(&cluster.name)?;
            let script = backends.load_script(&script)?;

            let mut conn = client.connection(&node)?;
            let reply = script
                .invoke(&mut conn, &keys, &script_args)
                .with_context(|| format!("{} on node {}", script.name(), node))?;
            cli::print_reply(&reply, 0);
        }
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
