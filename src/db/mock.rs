//! Mock query backend.
//!
//! Produces deterministic synthetic results keyed off coarse text patterns
//! in the SQL. Nothing is parsed: rules are evaluated top to bottom against
//! the case-folded text and the first match wins.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::time::Duration;
use tracing::debug;

use super::{QueryBackend, QueryMode, RawColumn, RawQueryResult, Row};
use crate::config::LatencyRange;
use crate::error::{AdapterError, Result};

/// Fixed sales dataset behind the product/sales and aggregate rules.
/// Listed grouped by product; the generator orders it by date.
const SALES_FIXTURE: [(&str, i64, (i32, u32, u32)); 6] = [
    ("Product A", 100, (2024, 1, 1)),
    ("Product A", 120, (2024, 1, 4)),
    ("Product B", 200, (2024, 1, 2)),
    ("Product B", 180, (2024, 1, 5)),
    ("Product C", 150, (2024, 1, 3)),
    ("Product C", 220, (2024, 1, 6)),
];

/// The mock datasets, one per rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockRule {
    /// Connectivity probe: `select 1` or the greeting phrase.
    Greeting,
    /// Time series over three products.
    ProductSales,
    /// Single-row totals over the sales dataset.
    Aggregate,
    /// Non-empty filler.
    Fallback,
}

struct RuleEntry {
    rule: MockRule,
    matches: fn(&str) -> bool,
}

/// Priority-ordered rule table.
const RULES: &[RuleEntry] = &[
    RuleEntry {
        rule: MockRule::Greeting,
        matches: |q| q.contains("hello flight sql") || q.contains("select 1"),
    },
    RuleEntry {
        rule: MockRule::ProductSales,
        matches: |q| q.contains("product") && q.contains("sales"),
    },
    RuleEntry {
        rule: MockRule::Aggregate,
        matches: |q| q.contains("sum") || q.contains("count"),
    },
    RuleEntry {
        rule: MockRule::Fallback,
        matches: |_| true,
    },
];

impl MockRule {
    /// Picks the first rule matching the SQL text.
    pub fn select(sql: &str) -> Self {
        let query = sql.trim().to_lowercase();
        RULES
            .iter()
            .find(|entry| (entry.matches)(&query))
            .map(|entry| entry.rule)
            .unwrap_or(MockRule::Fallback)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::ProductSales => "product_sales",
            Self::Aggregate => "aggregate",
            Self::Fallback => "fallback",
        }
    }

    /// Builds the dataset. `now` only feeds the "today" fields.
    pub fn generate(self, now: DateTime<Utc>) -> RawQueryResult {
        let today = now.format("%Y-%m-%d").to_string();
        match self {
            Self::Greeting => RawQueryResult::new(
                vec![
                    RawColumn::typed("id", "INTEGER"),
                    RawColumn::typed("message", "VARCHAR"),
                    RawColumn::typed("today", "DATE"),
                    RawColumn::typed("status", "VARCHAR"),
                ],
                vec![Row::new()
                    .with("id", 1)
                    .with("message", "Hello Flight SQL (Mock)")
                    .with("today", today)
                    .with("status", "Mock Success")],
            )
            .with_declared_row_count(1),
            Self::ProductSales => {
                let mut records: Vec<(&str, i64, DateTime<Utc>)> = SALES_FIXTURE
                    .iter()
                    .map(|&(product, sales, ymd)| (product, sales, fixture_date(ymd)))
                    .collect();
                records.sort_by_key(|&(_, _, date)| date);

                let rows: Vec<Row> = records
                    .into_iter()
                    .map(|(product, sales, date)| {
                        Row::new()
                            .with("product", product)
                            .with("sales", sales)
                            .with("order_date", date)
                    })
                    .collect();
                let count = rows.len();
                RawQueryResult::new(
                    vec![
                        RawColumn::typed("product", "VARCHAR"),
                        RawColumn::typed("sales", "INTEGER"),
                        RawColumn::typed("order_date", "TIMESTAMP"),
                    ],
                    rows,
                )
                .with_declared_row_count(count)
            }
            Self::Aggregate => {
                let total: i64 = SALES_FIXTURE.iter().map(|&(_, sales, _)| sales).sum();
                let count = SALES_FIXTURE.len() as i64;
                let avg = (total as f64 / count as f64 * 100.0).round() / 100.0;
                RawQueryResult::new(
                    vec![
                        RawColumn::typed("total_sales", "INTEGER"),
                        RawColumn::typed("num_records", "INTEGER"),
                        RawColumn::typed("avg_sales", "DOUBLE"),
                    ],
                    vec![Row::new()
                        .with("total_sales", total)
                        .with("num_records", count)
                        .with("avg_sales", avg)],
                )
                .with_declared_row_count(1)
            }
            Self::Fallback => RawQueryResult::new(
                vec![
                    RawColumn::typed("col1", "VARCHAR"),
                    RawColumn::typed("col2", "INTEGER"),
                    RawColumn::typed("col3", "DATE"),
                ],
                vec![Row::new()
                    .with("col1", "Mock Data")
                    .with("col2", 123)
                    .with("col3", today)],
            )
            .with_declared_row_count(1),
        }
    }
}

fn fixture_date((year, month, day): (i32, u32, u32)) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_default()
}

/// Checks that every row carries exactly the declared columns, in order.
fn check_shape(rule: MockRule, result: &RawQueryResult) -> Result<()> {
    for (index, row) in result.rows.iter().enumerate() {
        let keys = row.keys();
        let declared = result.columns.iter().map(|c| c.name.as_str());
        if !keys.eq(declared) {
            return Err(AdapterError::mock(format!(
                "{} row {index} does not match its declared columns",
                rule.name()
            )));
        }
    }
    if let Some(count) = result.declared_row_count {
        if count != result.rows.len() {
            return Err(AdapterError::mock(format!(
                "{} declares {count} rows but produced {}",
                rule.name(),
                result.rows.len()
            )));
        }
    }
    Ok(())
}

impl MockRule {
    /// Generates this rule's dataset and validates it.
    pub fn build(self, now: DateTime<Utc>) -> Result<RawQueryResult> {
        let result = self.generate(now);
        check_shape(self, &result)?;
        Ok(result)
    }
}

/// Generates the dataset for `sql` and validates it.
pub fn generate_mock_result(sql: &str, now: DateTime<Utc>) -> Result<RawQueryResult> {
    MockRule::select(sql).build(now)
}

/// A backend that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    latency: LatencyRange,
}

impl MockBackend {
    pub fn new(latency: LatencyRange) -> Self {
        Self { latency }
    }

    fn pick_delay(&self) -> Duration {
        let (lo, hi) = if self.latency.min_ms <= self.latency.max_ms {
            (self.latency.min_ms, self.latency.max_ms)
        } else {
            (self.latency.max_ms, self.latency.min_ms)
        };
        if lo == hi {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rand::random_range(lo..=hi))
    }
}

#[async_trait]
impl QueryBackend for MockBackend {
    fn mode(&self) -> QueryMode {
        QueryMode::Mock
    }

    async fn fetch(&self, sql: &str) -> Result<RawQueryResult> {
        let delay = self.pick_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let rule = MockRule::select(sql);
        debug!(rule = rule.name(), delay_ms = delay.as_millis() as u64, "Generating mock result");
        rule.build(Utc::now())
    }
}
