use anyhow::{Context, Result};
use log::{info, warn};

use crate::report::{display_path, ReportOutcome, ReportWriter};
use crate::summary::{summarize_shares, EmployeeShare};
use crate::time_entry_api::{fetch_time_entries, TimeEntryRepository};

pub struct PieChartCommand<'a, R: TimeEntryRepository, W: ReportWriter<EmployeeShare>> {
    repository: &'a R,
    writer: &'a W,
}

impl<'a, R: TimeEntryRepository, W: ReportWriter<EmployeeShare>> PieChartCommand<'a, R, W> {
    /// 新しい`PieChartCommand`を返す。
    pub fn new(repository: &'a R, writer: &'a W) -> Self {
        Self { repository, writer }
    }

    /// `pie-chart`サブコマンドの処理を行う。
    ///
    /// 有効なエントリーの合計時間が0以下の場合は割合を計算できないため、画像を作成しない。
    pub async fn run(&self) -> Result<ReportOutcome> {
        info!("Fetching employee time entries for pie chart...");
        let time_entries = match fetch_time_entries(self.repository).await {
            Some(time_entries) if !time_entries.is_empty() => time_entries,
            _ => {
                warn!("No time entries found or failed to fetch data.");
                return Ok(ReportOutcome::NoData);
            }
        };

        info!("Processing data for pie chart...");
        let Some(shares) = summarize_shares(&time_entries) else {
            warn!("Overall total time worked is zero or negative, cannot generate pie chart.");
            return Ok(ReportOutcome::NonPositiveTotal);
        };

        info!("Generating pie chart image...");
        let path = self
            .writer
            .write_report(&shares)
            .context("Failed to generate pie chart")?;
        info!(
            "Pie chart generated successfully at: {}",
            display_path(&path).display()
        );

        Ok(ReportOutcome::Written(path))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use anyhow::anyhow;
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    use super::PieChartCommand;
    use crate::pie_chart::PieChartWriter;
    use crate::report::{MockReportWriter, ReportOutcome};
    use crate::summary::EmployeeShare;
    use crate::time_entry::TimeEntry;
    use crate::time_entry_api::MockTimeEntryRepository;

    fn worked(name: &str, hours: i64, deleted: bool) -> TimeEntry {
        let start = Utc.with_ymd_and_hms(2022, 2, 22, 0, 0, 0).unwrap();
        TimeEntry {
            id: format!("{}-{}", name, hours),
            employee_name: name.to_string(),
            start,
            end: start + Duration::hours(hours),
            notes: None,
            deleted_on: deleted.then(|| Utc.with_ymd_and_hms(2022, 2, 26, 0, 0, 0).unwrap()),
        }
    }

    fn repository_returning(time_entries: Vec<TimeEntry>) -> MockTimeEntryRepository {
        let mut repository = MockTimeEntryRepository::new();
        repository
            .expect_read_time_entries()
            .times(1)
            .returning(move || Ok(time_entries.clone()));
        repository
    }

    #[tokio::test]
    async fn test_pie_chart_command_writes_shares() {
        let repository = repository_returning(vec![
            worked("Alice", 25, false),
            worked("Bob", 75, false),
            worked("Carol", 5, true),
        ]);
        let mut writer = MockReportWriter::<EmployeeShare>::new();
        writer
            .expect_write_report()
            .withf(|rows: &[EmployeeShare]| {
                rows.len() == 2
                    && rows[0].name == "Bob"
                    && (rows[0].percentage_of_total - 75.0).abs() < 1e-9
                    && rows[1].name == "Alice"
                    && (rows[1].percentage_of_total - 25.0).abs() < 1e-9
            })
            .times(1)
            .returning(|_| Ok(PathBuf::from("EmployeeTimePieChart.png")));

        let outcome = PieChartCommand::new(&repository, &writer).run().await.unwrap();

        assert_eq!(
            outcome,
            ReportOutcome::Written(PathBuf::from("EmployeeTimePieChart.png"))
        );
    }

    #[rstest]
    #[case::only_deleted(vec![worked("Alice", 2, true)])]
    #[case::negative_total(vec![worked("Alice", -2, false)])]
    #[tokio::test]
    async fn test_pie_chart_command_non_positive_total(#[case] time_entries: Vec<TimeEntry>) {
        let repository = repository_returning(time_entries);
        let mut writer = MockReportWriter::<EmployeeShare>::new();
        writer.expect_write_report().times(0);

        let outcome = PieChartCommand::new(&repository, &writer).run().await.unwrap();

        assert_eq!(outcome, ReportOutcome::NonPositiveTotal);
    }

    /// 取得に失敗した場合は既存のファイルを上書きしないことを確認する。
    #[tokio::test]
    async fn test_pie_chart_command_fetch_error_keeps_file() {
        let mut repository = MockTimeEntryRepository::new();
        repository
            .expect_read_time_entries()
            .times(1)
            .returning(|| Err(anyhow!("Request returned an error status")));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EmployeeTimePieChart.png");
        fs::write(&path, b"previous").unwrap();
        let writer = PieChartWriter::new(&path);

        let outcome = PieChartCommand::new(&repository, &writer).run().await.unwrap();

        assert_eq!(outcome, ReportOutcome::NoData);
        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_pie_chart_command_writes_png() {
        let repository = repository_returning(vec![worked("Alice", 2, false)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EmployeeTimePieChart.png");
        let writer = PieChartWriter::new(&path);

        let outcome = PieChartCommand::new(&repository, &writer).run().await.unwrap();

        assert_eq!(outcome, ReportOutcome::Written(path.clone()));
        assert!(image::open(&path).is_ok());
    }
}
