use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::report::{write_atomically, ReportWriter};
use crate::summary::EmployeeSummary;

/// HTMLレポートの出力先。
pub const HTML_REPORT_PATH: &str = "EmployeeTimeReport.html";

/// この時間未満の従業員は強調表示する。
pub const LOW_HOURS_THRESHOLD: f64 = 100.0;

const STYLE: &str = "\
        body { font-family: 'Inter', sans-serif; margin: 20px; background-color: #f4f7f6; color: #333; }
        h1 { color: #2c3e50; text-align: center; margin-bottom: 30px; }
        table { width: 80%; margin: 0 auto; border-collapse: collapse; box-shadow: 0 4px 8px rgba(0,0,0,0.1); border-radius: 8px; overflow: hidden; }
        th, td { padding: 12px 15px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background-color: #4CAF50; color: white; font-weight: bold; }
        tr:nth-child(even) { background-color: #f2f2f2; }
        tr:hover { background-color: #e9e9e9; }
        .low-hours { background-color: #ffdddd; color: #cc0000; font-weight: bold; }
        .low-hours:hover { background-color: #ffcccc; }
";

/// 集計結果をHTMLのテーブルとしてファイルに書き出す。
pub struct HtmlReportWriter {
    path: PathBuf,
}

impl HtmlReportWriter {
    /// 新しい`HtmlReportWriter`を返す。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReportWriter<EmployeeSummary> for HtmlReportWriter {
    fn write_report(&self, rows: &[EmployeeSummary]) -> Result<PathBuf> {
        let html = render_html(rows).context("Failed to render HTML report")?;
        write_atomically(&self.path, html.as_bytes())
            .with_context(|| format!("Failed to write HTML report: {}", self.path.display()))?;

        Ok(self.path.clone())
    }
}

/// 集計結果から外部リソースに依存しないHTML文書を作成する。
pub fn render_html(summaries: &[EmployeeSummary]) -> Result<String> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "    <meta charset=\"UTF-8\">")?;
    writeln!(
        html,
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    )?;
    writeln!(html, "    <title>Employee Time Report</title>")?;
    writeln!(html, "    <style>")?;
    write!(html, "{}", STYLE)?;
    writeln!(html, "    </style>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "    <h1>Employee Time Report</h1>")?;
    writeln!(html, "    <table>")?;
    writeln!(html, "        <thead>")?;
    writeln!(html, "            <tr>")?;
    writeln!(html, "                <th>Employee Name</th>")?;
    writeln!(html, "                <th>Total Time Worked (Hours)</th>")?;
    writeln!(html, "            </tr>")?;
    writeln!(html, "        </thead>")?;
    writeln!(html, "        <tbody>")?;

    for summary in summaries {
        let row_class = if summary.total_hours < LOW_HOURS_THRESHOLD {
            " class=\"low-hours\""
        } else {
            ""
        };
        writeln!(html, "            <tr{}>", row_class)?;
        writeln!(html, "                <td>{}</td>", escape_html(&summary.name))?;
        writeln!(html, "                <td>{:.2}</td>", summary.total_hours)?;
        writeln!(html, "            </tr>")?;
    }

    writeln!(html, "        </tbody>")?;
    writeln!(html, "    </table>")?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;

    Ok(html)
}

/// HTMLの特殊文字をエスケープする。
fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
