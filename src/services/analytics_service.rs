//! Analytics service layer
//!
//! 单链接的点击聚合：按日、按月、来源排行、设备分布，以及 CSV/JSON 导出。
//! 分桶依据是事件时间，乱序到达的事件不影响结果。

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use strum::{AsRefStr, EnumString};

use crate::errors::{Result, TrelayError};
use crate::services::LifecycleManager;
use crate::storage::backend::{Bucket, LabelRow};
use crate::storage::{
    ClickStats, DailyClicks, DeviceClicks, Link, MonthlyClicks, ReferrerClicks, SeaOrmStorage,
};

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 365;
pub const DEFAULT_MONTHS: u32 = 12;
pub const MAX_MONTHS: u32 = 24;
pub const DEFAULT_REFERRER_LIMIT: u32 = 10;
pub const MAX_REFERRER_LIMIT: u32 = 100;

/// None 或 0 取默认值，超出上限截断
fn clamp_param(value: Option<u32>, default: u32, max: u32) -> u32 {
    match value {
        None | Some(0) => default,
        Some(v) => v.min(max),
    }
}

fn clicks(row: &LabelRow) -> u64 {
    row.clicks.max(0) as u64
}

/// 最近 `days` 天窗口的起点（UTC 当日零点往前推）
fn daily_window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let today = now.date_naive();
    today
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// 最近 `months` 个自然月窗口的起点（当月 1 日往前推）
fn monthly_window_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    first
        .checked_sub_months(Months::new(months.saturating_sub(1)))
        .unwrap_or(first)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        raw.trim().parse().map_err(|_| {
            TrelayError::validation(
                "export",
                format!("unsupported export format '{}', expected csv or json", raw.trim()),
            )
        })
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    /// 附件扩展名
    pub fn extension(&self) -> &str {
        self.as_ref()
    }
}

/// CSV 导出行：section 为 total/day/month/referrer/device
#[derive(Debug, Serialize)]
struct StatsCsvRow<'a> {
    section: &'a str,
    label: &'a str,
    clicks: u64,
}

pub struct AnalyticsService {
    storage: Arc<SeaOrmStorage>,
    lifecycle: Arc<LifecycleManager>,
}

impl AnalyticsService {
    pub fn new(storage: Arc<SeaOrmStorage>, lifecycle: Arc<LifecycleManager>) -> Self {
        Self { storage, lifecycle }
    }

    /// 统计对象：未被永久删除的链接（软删除的历史仍可查看）
    pub async fn find_link(&self, slug: &str, domain: Option<&str>) -> Result<Link> {
        self.lifecycle.find(slug, domain).await
    }

    pub async fn aggregate_daily(&self, link_id: i64, days: Option<u32>) -> Result<Vec<DailyClicks>> {
        let days = clamp_param(days, DEFAULT_DAYS, MAX_DAYS);
        let since = daily_window_start(Utc::now(), days);
        let rows = self
            .storage
            .clicks_by_bucket(link_id, since, Bucket::Day)
            .await?;
        Ok(rows
            .iter()
            .map(|row| DailyClicks {
                date: row.label.clone(),
                clicks: clicks(row),
            })
            .collect())
    }

    pub async fn aggregate_monthly(
        &self,
        link_id: i64,
        months: Option<u32>,
    ) -> Result<Vec<MonthlyClicks>> {
        let months = clamp_param(months, DEFAULT_MONTHS, MAX_MONTHS);
        let since = monthly_window_start(Utc::now(), months);
        let rows = self
            .storage
            .clicks_by_bucket(link_id, since, Bucket::Month)
            .await?;
        Ok(rows
            .iter()
            .map(|row| MonthlyClicks {
                month: row.label.clone(),
                clicks: clicks(row),
            })
            .collect())
    }

    pub async fn aggregate_referrers(
        &self,
        link_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<ReferrerClicks>> {
        let limit = clamp_param(limit, DEFAULT_REFERRER_LIMIT, MAX_REFERRER_LIMIT);
        let rows = self
            .storage
            .clicks_by_referrer(link_id, u64::from(limit))
            .await?;
        Ok(rows
            .iter()
            .map(|row| ReferrerClicks {
                referrer: row.label.clone(),
                clicks: clicks(row),
            })
            .collect())
    }

    pub async fn device_breakdown(&self, link_id: i64) -> Result<Vec<DeviceClicks>> {
        let rows = self.storage.clicks_by_device(link_id).await?;
        Ok(rows
            .iter()
            .map(|row| DeviceClicks {
                device_type: row.label.clone(),
                clicks: clicks(row),
            })
            .collect())
    }

    /// 汇总统计；total_clicks 取链接的 click_count
    pub async fn stats(&self, link: &Link) -> Result<ClickStats> {
        let (clicks_by_day, clicks_by_month, top_referrers, device_stats) = tokio::try_join!(
            self.aggregate_daily(link.id, None),
            self.aggregate_monthly(link.id, None),
            self.aggregate_referrers(link.id, None),
            self.device_breakdown(link.id),
        )?;

        Ok(ClickStats {
            total_clicks: link.click_count,
            clicks_by_day,
            clicks_by_month,
            top_referrers,
            device_stats,
        })
    }

    /// 导出统计为 CSV 或 JSON 文本
    pub fn export(stats: &ClickStats, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(stats)?),
            ExportFormat::Csv => Self::export_csv(stats),
        }
    }

    fn export_csv(stats: &ClickStats) -> Result<String> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());

        let mut write = |section: &str, label: &str, clicks: u64| {
            writer
                .serialize(StatsCsvRow {
                    section,
                    label,
                    clicks,
                })
                .map_err(|e| TrelayError::serialization(format!("CSV write failed: {}", e)))
        };

        write("total", "all", stats.total_clicks)?;
        for d in &stats.clicks_by_day {
            write("day", &d.date, d.clicks)?;
        }
        for m in &stats.clicks_by_month {
            write("month", &m.month, m.clicks)?;
        }
        for r in &stats.top_referrers {
            write("referrer", &r.referrer, r.clicks)?;
        }
        for d in &stats.device_stats {
            write("device", &d.device_type, d.clicks)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| TrelayError::serialization(format!("CSV flush failed: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| TrelayError::serialization(format!("CSV is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clamp_param() {
        assert_eq!(clamp_param(None, 30, 365), 30);
        assert_eq!(clamp_param(Some(0), 30, 365), 30);
        assert_eq!(clamp_param(Some(7), 30, 365), 7);
        assert_eq!(clamp_param(Some(9999), 30, 365), 365);
    }

    #[test]
    fn test_window_starts() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 18, 30, 0).unwrap();
        assert_eq!(
            daily_window_start(now, 1),
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            daily_window_start(now, 30),
            Utc.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).unwrap()
        );
        assert_eq!(
            monthly_window_start(now, 3),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::parse("CSV").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("json").unwrap(), ExportFormat::Json);
        assert_eq!(
            ExportFormat::parse("xml").unwrap_err().field(),
            Some("export")
        );
    }

    #[test]
    fn test_export_csv() {
        let stats = ClickStats {
            total_clicks: 3,
            clicks_by_day: vec![DailyClicks {
                date: "2026-03-15".into(),
                clicks: 3,
            }],
            clicks_by_month: vec![],
            top_referrers: vec![ReferrerClicks {
                referrer: "direct".into(),
                clicks: 3,
            }],
            device_stats: vec![],
        };
        let csv = AnalyticsService::export(&stats, ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "section,label,clicks");
        assert_eq!(lines[1], "total,all,3");
        assert_eq!(lines[2], "day,2026-03-15,3");
        assert_eq!(lines[3], "referrer,direct,3");
    }
}
