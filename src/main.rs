use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};

use terminus_metrics::alert::WebhookNotifier;
use terminus_metrics::api::exports::ExportCache;
use terminus_metrics::api::state::AppState;
use terminus_metrics::config::{AppConfig, LoggingConfig};
use terminus_metrics::report::{self, export, text};
use terminus_metrics::session::Session;
use terminus_metrics::terminus::sites::performance_sites;
use terminus_metrics::terminus::{MetricsPeriod, MetricsQuery, OutputFormat, Terminus};

const PREREQUISITES: &str = "\
Prerequisites:
  - The terminus CLI must be installed and on your PATH
    (or set `terminus.binary` in terminus-metrics.toml).
  - You must be logged in. If you get an authentication error, log back in with:
      terminus auth:login --email=<loginemail>

Steps:
  1. Run `terminus-metrics report`.
  2. Enter the site name, environment and period (day, week or month) when prompted.
  3. Choose whether to save the output as an HTML file.
  4. Read the results in the terminal and/or the saved file.

Set METRICS_WEBHOOK_URL (or `alerting.webhook_url`) to post traffic spike alerts.";

#[derive(Parser)]
#[command(
    name = "terminus-metrics",
    about = "Pantheon site metrics: cache efficiency reports, traffic spike alerts and a local dashboard",
    version,
    long_about = None,
    after_long_help = PREREQUISITES
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch metrics for one site environment and print the report
    Report(ReportArgs),

    /// Serve the interactive dashboard on a local port
    Dashboard {
        /// Bind address (defaults to `dashboard.bind` from the config)
        #[arg(long)]
        bind: Option<String>,

        /// Post an alert to the configured webhook when a spike is found
        #[arg(long)]
        notify: bool,
    },

    /// List sites on Performance plans
    Sites {
        /// List every site, not only Performance plans
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args)]
struct ReportArgs {
    /// Site name (prompted for when omitted)
    #[arg(long)]
    site: Option<String>,

    /// Environment, e.g. dev, test or live (prompted for when omitted)
    #[arg(long)]
    env: Option<String>,

    /// Aggregation period (prompted for when omitted)
    #[arg(long, value_enum)]
    period: Option<MetricsPeriod>,

    /// Output format requested from terminus
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Save the report as HTML to this file
    #[arg(long)]
    html: Option<PathBuf>,

    /// Save the parsed table as CSV to this file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Post an alert to the configured webhook when a spike is found
    #[arg(long)]
    notify: bool,

    /// Never prompt; missing site or environment is an error
    #[arg(long)]
    no_prompt: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Report(args) => run_report(&config, args).await,
        Commands::Dashboard { bind, notify } => {
            let bind = bind.unwrap_or_else(|| config.dashboard.bind.clone());
            let notifier = if notify {
                Some(
                    WebhookNotifier::from_config(&config.alerting)
                        .context("--notify needs a usable webhook URL")?,
                )
            } else {
                None
            };
            let state = AppState {
                terminus: Terminus::from_config(&config.terminus),
                policy: config.policy.clone(),
                notifier,
                exports: ExportCache::default(),
            };

            println!("Dashboard running at http://{}/", bind);
            terminus_metrics::serve(&bind, state).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sites { all } => {
            let terminus = Terminus::from_config(&config.terminus);
            let mut sites = terminus.site_list().await.context("could not list sites")?;
            if !all {
                sites = performance_sites(sites);
            }

            if sites.is_empty() {
                println!("No sites found.");
            } else {
                println!("{:<30} | {:<25} | Framework", "Name", "Plan");
                println!("{:-<30}-|-{:-<25}-|-{:-<12}", "", "", "");
                for site in sites {
                    println!("{:<30} | {:<25} | {}", site.name, site.plan, site.framework);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_report(config: &AppConfig, args: ReportArgs) -> Result<ExitCode> {
    let site = match args.site {
        Some(site) => site,
        None if args.no_prompt => bail!("--site is required with --no-prompt"),
        None => prompt_text("Enter the site name")?,
    };
    let env = match args.env {
        Some(env) => env,
        None if args.no_prompt => bail!("--env is required with --no-prompt"),
        None => prompt_text("Enter the environment name (e.g. dev, test, live)")?,
    };
    let period = match args.period {
        Some(period) => period,
        None if args.no_prompt => MetricsPeriod::Day,
        None => prompt_period()?,
    };
    let html_path = match args.html {
        Some(path) => Some(path),
        None if args.no_prompt => None,
        None => prompt_html_path(&site, &env)?,
    };

    println!("{}", report::BANNER);

    let mut query = MetricsQuery::new(site, env, period);
    query.format = args.format;
    let terminus = Terminus::from_config(&config.terminus);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("Fetching metrics for {}...", query.site_env()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let fetched = Session::fetch(&terminus, query, &config.policy).await;
    spinner.finish_and_clear();

    let session = match fetched {
        Ok(session) => session,
        Err(e) => {
            eprintln!("An error occurred: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    print!("{}", text::render_text(&session));

    if let Some(path) = html_path {
        match export::write_html(&session, &path) {
            Ok(()) => println!("Output saved as HTML file: {}", path.display()),
            Err(e) => eprintln!("Could not save HTML report: {}", e),
        }
    }

    if let Some(path) = args.csv {
        save_csv(&session, &path);
    }

    if args.notify {
        send_spike_alert(config, &session).await;
    }

    Ok(ExitCode::SUCCESS)
}

fn prompt_text(prompt: &str) -> Result<String> {
    let value: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(value)
}

fn prompt_period() -> Result<MetricsPeriod> {
    let labels: Vec<&str> = MetricsPeriod::ALL.iter().map(MetricsPeriod::as_str).collect();
    let choice = Select::new()
        .with_prompt("Select the period")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(MetricsPeriod::ALL[choice])
}

fn prompt_html_path(site: &str, env: &str) -> Result<Option<PathBuf>> {
    let save = Confirm::new()
        .with_prompt("Would you like to save the output as an HTML file?")
        .default(false)
        .interact()?;
    if !save {
        return Ok(None);
    }
    let name: String = Input::new()
        .with_prompt("Enter the filename")
        .default(format!("{}_{}_metrics.html", site.trim(), env.trim()))
        .interact_text()?;
    Ok(Some(PathBuf::from(name)))
}

fn save_csv(session: &Session, path: &Path) {
    let Some(table) = &session.table else {
        eprintln!("No table to export as CSV.");
        return;
    };
    match export::write_csv(table, path) {
        Ok(()) => println!("Table saved as CSV file: {}", path.display()),
        Err(e) => eprintln!("Could not save CSV: {}", e),
    }
}

async fn send_spike_alert(config: &AppConfig, session: &Session) {
    let Some(spike) = &session.spike else {
        tracing::info!("no traffic spike, nothing to send");
        return;
    };
    let notifier = match WebhookNotifier::from_config(&config.alerting) {
        Ok(notifier) => notifier,
        Err(e) => {
            eprintln!("Spike alert not sent: {}", e);
            return;
        }
    };
    match notifier.notify_spike(spike).await {
        Ok(()) => println!("Spike alert sent."),
        Err(e) => eprintln!("Spike alert not sent: {}", e),
    }
}
