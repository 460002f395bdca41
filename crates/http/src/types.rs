//! Wire types of the payment portal API

use crate::client::error::ClientError;
use crate::client::merchant::merchant_path;
use chrono::{DateTime, SecondsFormat, Utc};
use paydash_core::Credentials;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Response wrapper used by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

/// Access/refresh pair returned by login, register and refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

impl From<TokenPair> for Credentials {
    fn from(pair: TokenPair) -> Self {
        Self::new(pair.access_token, pair.refresh_token)
    }
}

/// Login and register body
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Identity behind the current access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    pub balance: f64,
    pub withdrawable_balance: f64,
    pub secret_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
}

/// One page of `GET /merchant`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantPage {
    pub result: Vec<Merchant>,
    pub pagination: Pagination,
}

/// Body of `POST /merchant`; a missing webhook is sent as `null`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMerchantRequest {
    pub name: String,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub service_fee: f64,
    pub hash: String,
    /// Seconds between submission and confirmation
    pub confirmation_time: f64,
    pub merchant_id: String,
    pub created_at: DateTime<Utc>,
}

// Analytics

/// Analytics metric and the endpoint family that serves it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Gmv,
    ServiceFee,
    ConversionRate,
    AverageConfirmationTime,
    P95ConfirmationTime,
    DirectDepositShare,
    /// Platform scope only
    ActiveMerchants,
    /// Merchant scope only
    AverageOrderValue,
    /// Merchant scope only
    RepeatCustomerRate,
}

impl Metric {
    pub const ALL: [Self; 9] = [
        Self::Gmv,
        Self::ServiceFee,
        Self::ConversionRate,
        Self::AverageConfirmationTime,
        Self::P95ConfirmationTime,
        Self::DirectDepositShare,
        Self::ActiveMerchants,
        Self::AverageOrderValue,
        Self::RepeatCustomerRate,
    ];

    /// URL segment, e.g. `service-fee`
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Gmv => "gmv",
            Self::ServiceFee => "service-fee",
            Self::ConversionRate => "cr",
            Self::AverageConfirmationTime => "average-confirmation-time",
            Self::P95ConfirmationTime => "p95-confirmation-time",
            Self::DirectDepositShare => "direct-deposit-share",
            Self::ActiveMerchants => "active-merchants",
            Self::AverageOrderValue => "aov",
            Self::RepeatCustomerRate => "repeat-customer-rate",
        }
    }

    /// Name of the value field in chart and forecast rows
    pub const fn value_field(self) -> &'static str {
        match self {
            Self::Gmv => "gmv",
            Self::ServiceFee => "serviceFee",
            Self::ConversionRate => "conversionRate",
            Self::AverageConfirmationTime => "averageConfirmationTime",
            Self::P95ConfirmationTime => "p95ConfirmationTime",
            Self::DirectDepositShare => "directDepositShare",
            Self::ActiveMerchants => "activeMerchants",
            Self::AverageOrderValue => "averageOrderValue",
            Self::RepeatCustomerRate => "repeatCustomerRate",
        }
    }

    pub const fn supports(self, scope: &AnalyticsScope) -> bool {
        match (self, scope) {
            (Self::ActiveMerchants, AnalyticsScope::Merchant(_)) => false,
            (Self::AverageOrderValue | Self::RepeatCustomerRate, AnalyticsScope::Platform) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.path_segment() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|m| m.path_segment()).collect();
                format!("unknown metric '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Whose numbers an analytics call reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsScope {
    /// Whole platform, admin only (`/admin/...`)
    Platform,
    /// A single merchant (`/merchant/:id/...`)
    Merchant(String),
}

impl AnalyticsScope {
    pub fn prefix(&self) -> Result<String, ClientError> {
        match self {
            Self::Platform => Ok("/admin".to_string()),
            Self::Merchant(id) => merchant_path(id),
        }
    }
}

/// Forecasting model run by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    HoltWinters,
    Sarima,
    #[default]
    Prophet,
}

impl ForecastModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HoltWinters => "holt_winters",
            Self::Sarima => "sarima",
            Self::Prophet => "prophet",
        }
    }
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "holt_winters" | "holt-winters" => Ok(Self::HoltWinters),
            "sarima" => Ok(Self::Sarima),
            "prophet" => Ok(Self::Prophet),
            other => Err(format!(
                "unknown forecast model '{other}' (expected holt_winters, sarima or prophet)"
            )),
        }
    }
}

/// Forecast request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastQuery {
    pub model: ForecastModel,
    /// Number of days to predict
    pub horizon: u32,
}

impl Default for ForecastQuery {
    fn default() -> Self {
        Self {
            model: ForecastModel::default(),
            horizon: 7,
        }
    }
}

/// Inclusive reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Returns `None` when `start` is after `end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The window ending now and starting `days` days ago
    pub fn last_days(days: u32) -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::days(i64::from(days)),
            end,
        }
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `startDate`/`endDate` query values, millisecond UTC timestamps
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            (
                "startDate",
                self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            ("endDate", self.end.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ]
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::last_days(7)
    }
}

/// One dated value of a chart or forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: String,
    pub value: f64,
}

/// KPI plus history, and the forecast when one was requested and available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: String,
    pub kpi: f64,
    pub points: Vec<ChartPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Vec<ChartPoint>>,
}
