use std::io::{self, BufRead};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use reqwest::Client;

mod html_command;
mod html_report;
mod logger;
mod pie_chart;
mod pie_chart_command;
mod report;
mod summary;
mod time_entry;
mod time_entry_api;

use html_command::{HtmlArgs, HtmlCommand};
use html_report::{HtmlReportWriter, HTML_REPORT_PATH};
use pie_chart::{PieChartWriter, PIE_CHART_PATH};
use pie_chart_command::PieChartCommand;
use time_entry_api::{TimeEntryClient, DEFAULT_API_URL};

/// 従業員ごとの作業時間を集計してレポートを作成するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ TIME_ENTRIES_API_CODE=... cargo run -- html
/// $ TIME_ENTRIES_API_CODE=... cargo run -- pie-chart
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        long = "api-url",
        env = "TIME_ENTRIES_API_URL",
        default_value = DEFAULT_API_URL,
        help = "Endpoint returning the time entries"
    )]
    api_url: String,

    #[clap(
        long = "api-code",
        env = "TIME_ENTRIES_API_CODE",
        hide_env_values = true,
        help = "Access key sent as the `code` query parameter"
    )]
    api_code: String,

    #[clap(short = 'v', long = "verbose", help = "Show debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Write the hours per employee to EmployeeTimeReport.html
    Html(HtmlArgs),
    /// Draw the share of hours per employee to EmployeeTimePieChart.png
    PieChart,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    logger::init(args.verbose)?;

    let client = TimeEntryClient::new(Client::new(), args.api_url, args.api_code);

    let exit_code = match args.subcommand {
        SubCommands::Html(html) => {
            let writer = HtmlReportWriter::new(HTML_REPORT_PATH);
            let result = HtmlCommand::new(&client, &writer).run().await;
            let exit_code = report_failure(result);
            if !html.no_wait {
                wait_for_enter().context("Failed to read from stdin")?;
            }
            exit_code
        }
        SubCommands::PieChart => {
            let writer = PieChartWriter::new(PIE_CHART_PATH);
            let result = PieChartCommand::new(&client, &writer).run().await;
            report_failure(result)
        }
    };

    Ok(exit_code)
}

/// 書き出しに失敗した場合はヒントとともに報告し、終了コードを返す。
fn report_failure<T>(result: Result<T>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            warn!("Please ensure you have write permissions to the output directory.");
            ExitCode::FAILURE
        }
    }
}

fn wait_for_enter() -> io::Result<()> {
    info!("Press Enter to exit.");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
