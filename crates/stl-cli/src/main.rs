use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use stl_directory::{
    load_layered_yaml, load_settlement_config, secrets::resolve_secrets, LoadedSettlementConfig,
    Profile,
};
use stl_ledger::{JsonRpcGateway, LedgerSession};
use stl_reconcile::{fetch_and_reconcile_outcome, ReconcileOutcome};
use stl_schemas::{LedgerAddress, SettlementReport};

#[derive(Parser)]
#[command(name = "stl")]
#[command(about = "Settlement reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML layers in merge order. Optional for the demo profile.
    #[arg(long = "config")]
    config_paths: Vec<String>,

    /// demo | operator
    #[arg(long, default_value = "demo")]
    profile: String,
}

impl ConfigArgs {
    fn load(&self) -> Result<LoadedSettlementConfig> {
        let profile: Profile = self.profile.parse()?;
        let path_refs: Vec<&str> = self.config_paths.iter().map(|s| s.as_str()).collect();
        load_settlement_config(profile, &path_refs)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List the hub and the partner directory
    Partners {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Fetch the hub history once and print the settlement report
    Report {
        #[command(flatten)]
        config: ConfigArgs,

        /// Partner key to include (repeatable). Omit for all partners.
        #[arg(long = "partner")]
        partners: Vec<String>,

        /// History entries to fetch. Defaults to ledger.history_limit.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        limit: Option<u32>,

        /// Print the report as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Native balance of the hub and every partner, or of one address
    Balance {
        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long)]
        address: Option<String>,
    },

    /// Raw account state of one address
    AccountInfo {
        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long, required = true)]
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if missing.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Partners { config } => {
            let cfg = config.load()?;
            let hub = cfg.directory.hub();
            println!("profile={}", cfg.profile.as_str());
            println!("config_hash={}", cfg.loaded.config_hash);
            println!("hub key={} label={} address={}", hub.key, hub.label, hub.address);
            for p in cfg.directory.partners() {
                println!(
                    "partner key={} display_name={} address={} category={}",
                    p.key, p.display_name, p.address, p.category
                );
            }
        }

        Commands::Report {
            config,
            partners,
            limit,
            json,
        } => {
            let cfg = config.load()?;
            let gateway = build_gateway(&cfg)?;
            let limit = limit.unwrap_or(cfg.settings.ledger.history_limit);

            let outcome =
                fetch_and_reconcile_outcome(&gateway, &cfg.directory, &partners, limit).await;
            let report = outcome.report();

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report_table(&report);
            }

            // Empty report already printed; exit non-zero.
            if let ReconcileOutcome::FetchFailed { error } = outcome {
                bail!("FETCH_FAILED: {error}");
            }
        }

        Commands::Balance { config, address } => {
            let cfg = config.load()?;
            let gateway = build_gateway(&cfg)?;

            let targets: Vec<(String, LedgerAddress)> = match address {
                Some(a) => vec![(a.clone(), parse_address(&a)?)],
                None => {
                    let hub = cfg.directory.hub();
                    std::iter::once((hub.key.clone(), hub.address.clone()))
                        .chain(
                            cfg.directory
                                .partners()
                                .iter()
                                .map(|p| (p.key.clone(), p.address.clone())),
                        )
                        .collect()
                }
            };

            let session = LedgerSession::open(&gateway)
                .await
                .context("ledger connect failed")?;
            for (name, addr) in &targets {
                match session.account_balance(addr).await {
                    Ok(balance) => println!("{name} address={addr} balance={balance}"),
                    Err(e) => println!("{name} address={addr} error={e}"),
                }
            }
            session.close().await;
        }

        Commands::AccountInfo { config, address } => {
            let cfg = config.load()?;
            let gateway = build_gateway(&cfg)?;
            let addr = parse_address(&address)?;

            let session = LedgerSession::open(&gateway)
                .await
                .context("ledger connect failed")?;
            let info = session.account_info(&addr).await;
            session.close().await;
            let info = info.with_context(|| format!("account_info failed for {addr}"))?;

            println!("address={}", info.address);
            if let Some(name) = cfg.directory.display_name_for(info.address.as_str()) {
                println!("display_name={name}");
            }
            println!("balance={}", info.balance);
            println!("balance_drops={}", info.balance_drops);
            println!("owner_count={}", info.owner_count);
            println!("sequence={}", info.sequence);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout is reserved for command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn build_gateway(cfg: &LoadedSettlementConfig) -> Result<JsonRpcGateway> {
    let secrets = resolve_secrets(&cfg.settings.ledger, cfg.profile)?;
    let gateway = JsonRpcGateway::new(
        cfg.settings.ledger.rpc_url.clone(),
        Duration::from_secs(cfg.settings.ledger.request_timeout_secs),
    )
    .context("ledger gateway init failed")?
    .with_auth_token(secrets.rpc_auth_token);
    Ok(gateway)
}

fn parse_address(raw: &str) -> Result<LedgerAddress> {
    LedgerAddress::parse(raw).with_context(|| format!("invalid address '{raw}'"))
}

fn print_report_table(report: &SettlementReport) {
    println!(
        "{:<24}  {:<20}  {:>14}  {:<4}  {:<7}  {}",
        "TIMESTAMP", "PARTNER", "AMOUNT", "CUR", "STATUS", "TX"
    );
    for p in &report.payments {
        println!(
            "{:<24}  {:<20}  {:>14}  {:<4}  {:<7}  {}",
            p.timestamp,
            p.partner,
            p.amount,
            p.currency,
            p.status.as_str(),
            p.tx_hash
        );
    }

    println!();
    println!(
        "{:<20}  {:>6}  {:>6}  {:>14}  {:>12}  {:>7}",
        "PARTNER", "TOTAL", "OK", "AMOUNT", "AVG", "RATE%"
    );
    for s in &report.stats {
        println!(
            "{:<20}  {:>6}  {:>6}  {:>14}  {:>12}  {:>7}",
            s.partner,
            s.total_transactions,
            s.successful_transactions,
            s.total_amount,
            s.avg_amount,
            s.success_rate
        );
    }
}
