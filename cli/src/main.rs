//! `ocpapi` - command-line access to the Open Catalyst API.
//!
//! Every subcommand prints pretty JSON on stdout. Logs go to stderr and are
//! filtered with `RUST_LOG` (default `info`).
//!
//! ```text
//! ocpapi bulks
//! ocpapi slabs mp-30
//! ocpapi find-sites '*CO' mp-30 --model equiformer_v2_153M_s2ef_all_md --miller 1,1,1
//! ocpapi results <system-id> --field energy --config-id 0
//! ```

mod settings;

use std::io;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ocpapi_client::Client;
use ocpapi_client::retry::retry_api_calls;
use ocpapi_config::OcpConfig;
use ocpapi_types::{MillerIndices, Model};
use ocpapi_workflows::{
    AdslabFilter, FindBindingSites, KeepAllSlabs, KeepSlabsWithMillerIndices, Lifetime,
    WaitOptions, find_adsorbate_binding_sites, get_adsorbate_slab_relaxation_results,
    wait_for_adsorbate_slab_relaxations,
};

use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "ocpapi", version, about = "Client for the Open Catalyst API")]
struct Cli {
    /// Base URL of the API (overrides OCPAPI_BASE_URL and the config file).
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List supported bulk materials.
    Bulks,
    /// List supported adsorbates (SMILES).
    Adsorbates,
    /// List slabs of a bulk.
    Slabs { bulk: String },
    /// Generate adsorbate placements on one slab of a bulk.
    Configs {
        adsorbate: String,
        bulk: String,
        /// Index into the bulk's slab list.
        #[arg(long, default_value_t = 0)]
        slab_index: usize,
    },
    /// Show the original request of a relaxation system.
    Request { system_id: String },
    /// Fetch relaxation results, including configs the server omitted.
    Results {
        system_id: String,
        #[arg(long = "config-id")]
        config_ids: Vec<i64>,
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Wait until every relaxation in a system has finished.
    Wait {
        system_id: String,
        #[arg(long)]
        check_immediately: bool,
    },
    /// Delete an ephemeral relaxation system.
    Delete { system_id: String },
    /// Relax an adsorbate on every (or selected) surface of a bulk.
    FindSites {
        adsorbate: String,
        bulk: String,
        #[arg(long)]
        model: Model,
        /// Only relax slabs with these Miller indices, e.g. `--miller 1,1,1`.
        #[arg(long = "miller", value_parser = parse_millers)]
        millers: Vec<MillerIndices>,
        #[arg(long, default_value_t = Lifetime::Save)]
        lifetime: Lifetime,
    },
}

fn parse_millers(raw: &str) -> Result<MillerIndices, String> {
    let parts = raw
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid Miller index '{raw}': {e}"))?;
    match parts.as_slice() {
        [h, k, l] => Ok((*h, *k, *l)),
        _ => Err(format!(
            "expected three comma-separated integers, got '{raw}'"
        )),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout carries JSON output only.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

fn load_config() -> Option<OcpConfig> {
    match OcpConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %err.path().display(), "Ignoring unusable config: {err}");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config();
    let settings = Settings::resolve(
        cli.base_url.as_deref(),
        ocpapi_config::env_base_url(),
        config.as_ref(),
    );
    tracing::debug!(base_url = %settings.base_url, "Resolved settings");
    let client = Client::new(&settings.base_url);

    run(cli.command, &client, &settings).await
}

async fn run(command: Command, client: &Client, settings: &Settings) -> Result<()> {
    let retry = &settings.retry;

    match command {
        Command::Bulks => {
            let bulks = retry_api_calls(retry, || client.get_bulks()).await?;
            print_json(&bulks)
        }
        Command::Adsorbates => {
            let adsorbates = retry_api_calls(retry, || client.get_adsorbates()).await?;
            print_json(&adsorbates)
        }
        Command::Slabs { bulk } => {
            let slabs = retry_api_calls(retry, || client.get_slabs(&bulk)).await?;
            print_json(&slabs)
        }
        Command::Configs {
            adsorbate,
            bulk,
            slab_index,
        } => {
            let slabs = retry_api_calls(retry, || client.get_slabs(&bulk)).await?;
            let Some(slab) = slabs.slabs.get(slab_index) else {
                bail!(
                    "slab index {slab_index} out of range; bulk {bulk} has {} slabs",
                    slabs.slabs.len()
                );
            };
            let configs = retry_api_calls(retry, || {
                client.get_adsorbate_slab_configs(&adsorbate, slab)
            })
            .await?;
            print_json(&configs)
        }
        Command::Request { system_id } => {
            let request = retry_api_calls(retry, || {
                client.get_adsorbate_slab_relaxations_request(&system_id)
            })
            .await?;
            print_json(&request)
        }
        Command::Results {
            system_id,
            config_ids,
            fields,
        } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            let configs = get_adsorbate_slab_relaxation_results(
                client,
                &system_id,
                &config_ids,
                &fields,
                retry,
            )
            .await?;
            print_json(&configs)
        }
        Command::Wait {
            system_id,
            check_immediately,
        } => {
            let options = WaitOptions {
                check_immediately,
                ..settings.wait.clone()
            };
            let statuses =
                wait_for_adsorbate_slab_relaxations(client, &system_id, &options).await?;
            print_json(&statuses)
        }
        Command::Delete { system_id } => {
            retry_api_calls(retry, || {
                client.delete_adsorbate_slab_relaxations(&system_id)
            })
            .await?;
            tracing::info!(system_id = %system_id, "Deleted relaxations");
            Ok(())
        }
        Command::FindSites {
            adsorbate,
            bulk,
            model,
            millers,
            lifetime,
        } => {
            let miller_filter = KeepSlabsWithMillerIndices::new(millers.iter().copied());
            let filter: &dyn AdslabFilter = if millers.is_empty() {
                &KeepAllSlabs
            } else {
                &miller_filter
            };
            let request = FindBindingSites::new(&adsorbate, &bulk, model)
                .with_filter(filter)
                .with_lifetime(lifetime)
                .with_retry(retry.clone())
                .with_wait(settings.wait.clone());

            let sites = find_adsorbate_binding_sites(client, &request)
                .await
                .with_context(|| format!("binding site search for {adsorbate} on {bulk} failed"))?;
            print_json(&sites)
        }
    }
}
