//! Analytics API client methods

use super::{ApiClient, ClientError, RequestDescriptor};
use crate::types::{
    AnalyticsScope, ChartPoint, DateRange, ForecastQuery, Metric, MetricSeries, Transaction,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Chart or forecast row: `{ "date": ..., "<metric field>": number }`
#[derive(Deserialize)]
struct MetricRow {
    date: String,
    #[serde(flatten)]
    values: Map<String, Value>,
}

fn into_points(rows: Vec<MetricRow>, metric: Metric) -> Result<Vec<ChartPoint>, ClientError> {
    let field = metric.value_field();
    rows.into_iter()
        .map(|row| {
            let value = row
                .values
                .get(field)
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    ClientError::UnexpectedResponse(format!(
                        "{metric} row for {} has no numeric '{field}'",
                        row.date
                    ))
                })?;
            Ok(ChartPoint {
                date: row.date,
                value,
            })
        })
        .collect()
}

fn metric_path(
    scope: &AnalyticsScope,
    metric: Metric,
    suffix: &str,
) -> Result<String, ClientError> {
    if !metric.supports(scope) {
        return Err(ClientError::BadRequest(format!(
            "metric '{metric}' is not available for {}",
            match scope {
                AnalyticsScope::Platform => "the platform".to_string(),
                AnalyticsScope::Merchant(id) => format!("merchant {id}"),
            }
        )));
    }
    Ok(format!("{}/{}{suffix}", scope.prefix()?, metric.path_segment()))
}

fn with_range(request: RequestDescriptor, range: &DateRange) -> RequestDescriptor {
    range
        .query_pairs()
        .into_iter()
        .fold(request, |request, (key, value)| request.query(key, value))
}

impl ApiClient {
    /// Headline number of a metric over `range`
    pub async fn kpi(
        &self,
        scope: &AnalyticsScope,
        metric: Metric,
        range: &DateRange,
    ) -> Result<f64, ClientError> {
        let path = metric_path(scope, metric, "")?;
        self.request(with_range(RequestDescriptor::get(path), range))
            .await
    }

    /// Daily values of a metric over `range`
    pub async fn chart(
        &self,
        scope: &AnalyticsScope,
        metric: Metric,
        range: &DateRange,
    ) -> Result<Vec<ChartPoint>, ClientError> {
        let path = metric_path(scope, metric, "/chart")?;
        let rows: Vec<MetricRow> = self
            .request(with_range(RequestDescriptor::get(path), range))
            .await?;
        into_points(rows, metric)
    }

    /// Predicted values of a metric
    pub async fn forecast(
        &self,
        scope: &AnalyticsScope,
        metric: Metric,
        query: ForecastQuery,
    ) -> Result<Vec<ChartPoint>, ClientError> {
        let path = metric_path(scope, metric, "/forecast")?;
        let request = RequestDescriptor::get(path)
            .query("model", query.model)
            .query("horizon", query.horizon);
        let rows: Vec<MetricRow> = self.request(request).await?;
        into_points(rows, metric)
    }

    /// KPI and chart of a metric, plus its forecast when asked for
    ///
    /// A failed forecast is logged and left out; KPI and chart failures are
    /// returned.
    pub async fn metric_series(
        &self,
        scope: &AnalyticsScope,
        metric: Metric,
        range: &DateRange,
        forecast: Option<ForecastQuery>,
    ) -> Result<MetricSeries, ClientError> {
        let kpi = self.kpi(scope, metric, range).await?;
        let points = self.chart(scope, metric, range).await?;

        let forecast = match forecast {
            Some(query) => match self.forecast(scope, metric, query).await {
                Ok(points) => Some(points),
                Err(e) => {
                    warn!(%metric, "Failed to fetch forecast: {e}");
                    None
                }
            },
            None => None,
        };

        Ok(MetricSeries {
            metric: metric.to_string(),
            kpi,
            points,
            forecast,
        })
    }

    /// Platform alerts (admin)
    pub async fn alerts(&self) -> Result<Vec<String>, ClientError> {
        self.request(RequestDescriptor::get("/admin/alerts")).await
    }

    /// The `top` slowest confirmed transactions in `range` (admin)
    pub async fn slowest_transactions(
        &self,
        range: &DateRange,
        top: u32,
    ) -> Result<Vec<Transaction>, ClientError> {
        let request = with_range(RequestDescriptor::get("/admin/slowest-transactions"), range)
            .query("top", top);
        self.request(request).await
    }
}
