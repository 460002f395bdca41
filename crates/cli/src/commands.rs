//! CLI commands

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use paydash_core::{PaydashConfig, Role, StateDir};
use paydash_http::ApiClient;
use paydash_http::types::{AnalyticsScope, DateRange, ForecastModel, ForecastQuery, Metric};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use crate::context;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Log in to the admin portal
        #[arg(long)]
        admin: bool,
    },

    /// Create a merchant account and store the session
    Register {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Forget the stored session
    Logout,

    /// Check the stored session against the API
    Session,

    /// Exchange the stored refresh token for a new pair
    Refresh,

    /// Merchant operations
    Merchants {
        #[command(subcommand)]
        command: MerchantCommands,
    },

    /// Analytics queries
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },

    /// Show platform alerts (admin)
    Alerts,

    /// Show the slowest transactions in a window (admin)
    Slowest {
        #[command(flatten)]
        range: RangeArgs,

        /// Number of transactions
        #[arg(long, default_value = "10")]
        top: u32,
    },

    /// Configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args)]
pub struct CredentialArgs {
    #[arg(short, long)]
    username: String,

    #[arg(short, long, env = "PAYDASH_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
pub enum MerchantCommands {
    /// List merchants
    List {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Show one merchant
    Show { id: String },

    /// Create a merchant
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        webhook_url: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Headline value of a metric
    Kpi {
        #[command(flatten)]
        target: MetricArgs,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Daily values of a metric
    Chart {
        #[command(flatten)]
        target: MetricArgs,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Predicted values of a metric
    Forecast {
        #[command(flatten)]
        target: MetricArgs,

        #[command(flatten)]
        forecast: ForecastArgs,
    },

    /// KPI, chart and optionally forecast in one go
    Series {
        #[command(flatten)]
        target: MetricArgs,

        #[command(flatten)]
        range: RangeArgs,

        /// Include a forecast
        #[arg(long)]
        with_forecast: bool,

        #[command(flatten)]
        forecast: ForecastArgs,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Output file path (defaults to the active config path)
        output: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Args)]
pub struct MetricArgs {
    /// Metric name, e.g. gmv, service-fee, cr, p95-confirmation-time
    metric: Metric,

    /// Read a single merchant instead of the whole platform
    #[arg(long)]
    merchant: Option<String>,
}

impl MetricArgs {
    fn scope(&self) -> AnalyticsScope {
        self.merchant
            .clone()
            .map_or(AnalyticsScope::Platform, AnalyticsScope::Merchant)
    }
}

#[derive(Args)]
pub struct RangeArgs {
    /// Window start (RFC 3339); defaults to `--days` before the end
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Window end (RFC 3339); defaults to now
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Window length in days when `--start` is not given
    #[arg(long, default_value = "7")]
    days: u32,
}

impl RangeArgs {
    fn to_range(&self) -> Result<DateRange> {
        let end = self.end.unwrap_or_else(Utc::now);
        let start = self
            .start
            .unwrap_or_else(|| end - Duration::days(i64::from(self.days)));
        match DateRange::new(start, end) {
            Some(range) => Ok(range),
            None => bail!("--start must not be after --end"),
        }
    }
}

#[derive(Args)]
pub struct ForecastArgs {
    /// holt_winters, sarima or prophet
    #[arg(long, default_value = "prophet")]
    model: ForecastModel,

    /// Days to predict
    #[arg(long, default_value = "7")]
    horizon: u32,
}

impl ForecastArgs {
    const fn to_query(&self) -> ForecastQuery {
        ForecastQuery {
            model: self.model,
            horizon: self.horizon,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Commands {
    pub async fn execute(self, state_dir: StateDir, config_path: PathBuf) -> Result<()> {
        let client = || context::build_client(&state_dir, &config_path);

        match self {
            Self::Login { credentials, admin } => {
                let role = if admin { Role::Admin } else { Role::Merchant };
                client()?
                    .login(role, credentials.username, credentials.password)
                    .await
                    .context("Login failed")?;
                print_json(&json!({"status": "logged in", "role": role}))
            }
            Self::Register { credentials } => {
                client()?
                    .register(credentials.username, credentials.password)
                    .await
                    .context("Registration failed")?;
                print_json(&json!({"status": "registered", "role": Role::Merchant}))
            }
            Self::Logout => {
                client()?.logout().await?;
                print_json(&json!({"status": "logged out"}))
            }
            Self::Session => {
                let client = client()?;
                match client.verify_session().await? {
                    Some(info) => {
                        let role = client.session().role().await?;
                        print_json(&json!({"id": info.id, "username": info.username, "role": role}))
                    }
                    None => bail!("Not logged in"),
                }
            }
            Self::Refresh => {
                client()?
                    .refresh_session()
                    .await
                    .context("Token refresh failed")?;
                print_json(&json!({"status": "refreshed"}))
            }
            Self::Merchants { command } => command.execute(&client()?).await,
            Self::Analytics { command } => command.execute(&client()?).await,
            Self::Alerts => print_json(&client()?.alerts().await?),
            Self::Slowest { range, top } => {
                let transactions = client()?
                    .slowest_transactions(&range.to_range()?, top)
                    .await?;
                print_json(&transactions)
            }
            Self::Config { command } => command.execute(&config_path),
        }
    }
}

impl MerchantCommands {
    async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            Self::List { page, limit } => print_json(&client.list_merchants(page, limit).await?),
            Self::Show { id } => print_json(&client.merchant(&id).await?),
            Self::Create { name, webhook_url } => {
                let merchant = client.create_merchant(name, webhook_url).await?;
                info!(id = %merchant.id, "Merchant created");
                print_json(&merchant)
            }
        }
    }
}

impl AnalyticsCommands {
    async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            Self::Kpi { target, range } => {
                let kpi = client
                    .kpi(&target.scope(), target.metric, &range.to_range()?)
                    .await?;
                print_json(&json!({"metric": target.metric.to_string(), "kpi": kpi}))
            }
            Self::Chart { target, range } => print_json(
                &client
                    .chart(&target.scope(), target.metric, &range.to_range()?)
                    .await?,
            ),
            Self::Forecast { target, forecast } => print_json(
                &client
                    .forecast(&target.scope(), target.metric, forecast.to_query())
                    .await?,
            ),
            Self::Series {
                target,
                range,
                with_forecast,
                forecast,
            } => {
                let series = client
                    .metric_series(
                        &target.scope(),
                        target.metric,
                        &range.to_range()?,
                        with_forecast.then(|| forecast.to_query()),
                    )
                    .await?;
                print_json(&series)
            }
        }
    }
}

impl ConfigCommands {
    fn execute(self, config_path: &std::path::Path) -> Result<()> {
        match self {
            Self::Init { output, force } => {
                let path = output.unwrap_or_else(|| config_path.to_path_buf());
                if path.exists() && !force {
                    bail!(
                        "Configuration already exists at {} (use --force to replace)",
                        path.display()
                    );
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, PaydashConfig::default().to_toml()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote default configuration to {}", path.display());
                print_json(&json!({"written": path}))
            }
            Self::Show => {
                let config = PaydashConfig::load(Some(config_path))?;
                print!("{}", config.to_toml()?);
                Ok(())
            }
        }
    }
}
