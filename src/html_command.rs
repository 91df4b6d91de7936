use anyhow::{Context, Result};
use log::{info, warn};

use crate::report::{display_path, ReportOutcome, ReportWriter};
use crate::summary::{summarize_hours, EmployeeSummary};
use crate::time_entry_api::{fetch_time_entries, TimeEntryRepository};

/// 従業員ごとの作業時間をHTMLのテーブルで出力するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct HtmlArgs {
    #[clap(long = "no-wait", help = "Exit without waiting for Enter")]
    pub no_wait: bool,
}

pub struct HtmlCommand<'a, R: TimeEntryRepository, W: ReportWriter<EmployeeSummary>> {
    repository: &'a R,
    writer: &'a W,
}

impl<'a, R: TimeEntryRepository, W: ReportWriter<EmployeeSummary>> HtmlCommand<'a, R, W> {
    /// 新しい`HtmlCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイムエントリーの取得元
    /// * `writer` - 集計結果の書き出し先
    pub fn new(repository: &'a R, writer: &'a W) -> Self {
        Self { repository, writer }
    }

    /// `html`サブコマンドの処理を行う。
    ///
    /// タイムエントリーを取得できない場合、または論理削除を除いて1件も残らない場合は何も書き出さない。
    pub async fn run(&self) -> Result<ReportOutcome> {
        info!("Fetching employee time entries...");
        let time_entries = match fetch_time_entries(self.repository).await {
            Some(time_entries) if !time_entries.is_empty() => time_entries,
            _ => {
                warn!("No time entries found or failed to fetch data.");
                return Ok(ReportOutcome::NoData);
            }
        };

        info!("Processing data and generating HTML...");
        let summaries = summarize_hours(&time_entries);
        if summaries.is_empty() {
            warn!("No active employee summaries to display after filtering.");
            return Ok(ReportOutcome::NoActiveEntries);
        }

        let path = self
            .writer
            .write_report(&summaries)
            .context("Failed to generate HTML report")?;
        info!(
            "HTML report generated successfully at: {}",
            display_path(&path).display()
        );
        info!("Please open this file in your web browser to view the table.");

        Ok(ReportOutcome::Written(path))
    }
}
