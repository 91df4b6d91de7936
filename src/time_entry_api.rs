use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, error, info, warn};
#[cfg(test)]
use mockall::automock;
use reqwest::{header::ACCEPT, Client};
use serde::Deserialize;
use serde_json::Value;

use crate::time_entry::TimeEntry;

/// 接続先が指定されない場合に利用するエンドポイント。
pub const DEFAULT_API_URL: &str = "https://rc-vault-fap-live-1.azurewebsites.net/api/gettimeentries";

/// APIのレスポンスをデシリアライズするための構造体。
///
/// フィールド名は大文字小文字を区別しないため、キーを小文字に揃えてから読み込む。
#[derive(Debug, Deserialize)]
struct ApiTimeEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "employeename", default)]
    employee_name: Option<String>,
    #[serde(rename = "startimeutc")]
    start: String,
    #[serde(rename = "endtimeutc")]
    end: String,
    #[serde(rename = "entrynotes", default)]
    notes: Option<String>,
    #[serde(rename = "deletedon", default)]
    deleted_on: Option<String>,
}

impl ApiTimeEntry {
    fn into_time_entry(self) -> Result<TimeEntry> {
        let deleted_on = self
            .deleted_on
            .as_deref()
            .map(parse_utc)
            .transpose()
            .context("Failed to parse DeletedOn")?;

        Ok(TimeEntry {
            start: parse_utc(&self.start).context("Failed to parse StarTimeUtc")?,
            end: parse_utc(&self.end).context("Failed to parse EndTimeUtc")?,
            id: self.id.unwrap_or_default(),
            employee_name: self.employee_name.unwrap_or_default(),
            notes: self.notes,
            deleted_on,
        })
    }
}

/// タイムエントリーを取得するためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TimeEntryRepository {
    /// 全てのタイムエントリーを取得する。
    ///
    /// 通信エラー、成功以外のステータス、不正なJSONはいずれもエラーとして返す。
    async fn read_time_entries(&self) -> Result<Vec<TimeEntry>>;
}

/// タイムエントリーAPIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TimeEntryClient::new(Client::new(), DEFAULT_API_URL, "access-code");
/// let time_entries = client.read_time_entries().await.unwrap();
/// ```
pub struct TimeEntryClient {
    client: Client,
    api_url: String,
    access_code: String,
}

impl TimeEntryClient {
    /// 新しい`TimeEntryClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `client` - 通信に利用するHTTPクライアント
    /// * `api_url` - タイムエントリーを返すエンドポイント
    /// * `access_code` - `code`クエリパラメータとして送るアクセスキー
    pub fn new(client: Client, api_url: impl Into<String>, access_code: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            access_code: access_code.into(),
        }
    }
}

#[async_trait]
impl TimeEntryRepository for TimeEntryClient {
    async fn read_time_entries(&self) -> Result<Vec<TimeEntry>> {
        let body = self
            .client
            .get(&self.api_url)
            .header(ACCEPT, "application/json")
            .query(&[("code", &self.access_code)])
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .text()
            .await
            .context("Failed to read response body")?;

        let records: Vec<Value> =
            serde_json::from_str(&body).context("Failed to deserialize response")?;
        debug!("length of time entries: {}", records.len());

        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                serde_json::from_value::<ApiTimeEntry>(lowercase_keys(record))
                    .context("Failed to deserialize time entry")
                    .and_then(ApiTimeEntry::into_time_entry)
                    .with_context(|| format!("Invalid time entry at index {}", index))
            })
            .collect()
    }
}

/// タイムエントリーを取得し、失敗した場合は内容を報告して`None`を返す。
///
/// 部分的な結果は返さない。
pub async fn fetch_time_entries<R: TimeEntryRepository>(
    repository: &R,
) -> Option<Vec<TimeEntry>> {
    match repository.read_time_entries().await {
        Ok(time_entries) => {
            info!("Time entries retrieved successfully.");
            Some(time_entries)
        }
        Err(err) => {
            error!("Failed to fetch time entries: {:#}", err);
            if let Some(hint) = failure_hint(&err) {
                warn!("{}", hint);
            }
            None
        }
    }
}

/// エラーの原因に応じた利用者向けのヒントを返す。
pub fn failure_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
            if http.is_status() {
                return Some("Please check the API endpoint and access code.");
            }
            return Some("Please check your internet connection or the API endpoint.");
        }
        if cause.downcast_ref::<serde_json::Error>().is_some() {
            return Some("The API response might not be in the expected JSON format.");
        }
        None
    })
}

/// JSONオブジェクトのキーを小文字に揃える。
fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), value))
                .collect(),
        ),
        other => other,
    }
}

/// 日時文字列をUTCとしてパースする。
///
/// オフセット付きのRFC3339に加え、オフセットなしの日時はUTCとみなす。
fn parse_utc(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.to_utc());
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .with_context(|| format!("Failed to parse datetime: {}", s))?;

    Ok(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockito::{Matcher, Server};
    use reqwest::Client;
    use rstest::rstest;

    use super::{
        failure_hint, fetch_time_entries, parse_utc, MockTimeEntryRepository, TimeEntryClient,
        TimeEntryRepository,
    };

    const PATH: &str = "/api/gettimeentries";

    async fn client_for(server: &Server) -> TimeEntryClient {
        TimeEntryClient::new(
            Client::new(),
            format!("{}{}", server.url(), PATH),
            "test-code",
        )
    }

    #[rstest]
    #[case::rfc3339("2022-02-22T10:00:00Z", Utc.with_ymd_and_hms(2022, 2, 22, 10, 0, 0).unwrap())]
    #[case::offset("2022-02-22T12:00:00+02:00", Utc.with_ymd_and_hms(2022, 2, 22, 10, 0, 0).unwrap())]
    #[case::naive("2022-02-22T10:00:00", Utc.with_ymd_and_hms(2022, 2, 22, 10, 0, 0).unwrap())]
    #[case::naive_space("2022-02-22 10:00:00", Utc.with_ymd_and_hms(2022, 2, 22, 10, 0, 0).unwrap())]
    fn test_parse_utc(#[case] input: &str, #[case] expected: chrono::DateTime<Utc>) {
        assert_eq!(parse_utc(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_utc_invalid() {
        assert!(parse_utc("yesterday").is_err());
    }

    /// フィールド名の大文字小文字を区別せずに読み込めることを確認する。
    #[tokio::test]
    async fn test_read_time_entries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .match_query(Matcher::UrlEncoded("code".into(), "test-code".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"Id": "a1", "EmployeeName": "Alice", "StarTimeUtc": "2022-02-22T08:00:00",
                     "EndTimeUtc": "2022-02-22T10:30:00", "EntryNotes": "work", "DeletedOn": null},
                    {"id": "b2", "employeename": null, "startimeutc": "2022-02-22T08:00:00Z",
                     "ENDTIMEUTC": "2022-02-22T09:00:00Z", "DeletedOn": "2022-02-23T00:00:00"}
                ]"#,
            )
            .create_async()
            .await;

        let client = client_for(&server).await;
        let time_entries = client.read_time_entries().await.unwrap();

        mock.assert_async().await;
        assert_eq!(time_entries.len(), 2);
        assert_eq!(time_entries[0].id, "a1");
        assert_eq!(time_entries[0].employee_name, "Alice");
        assert_eq!(time_entries[0].notes.as_deref(), Some("work"));
        assert!((time_entries[0].worked_hours() - 2.5).abs() < 1e-9);
        assert!(time_entries[0].is_active());
        assert_eq!(time_entries[1].employee_name, "");
        assert_eq!(
            time_entries[1].deleted_on,
            Some(Utc.with_ymd_and_hms(2022, 2, 23, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_read_time_entries_error_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server).await;
        let err = client.read_time_entries().await.unwrap_err();

        assert_eq!(
            failure_hint(&err),
            Some("Please check the API endpoint and access code.")
        );
    }

    #[rstest]
    #[case::not_json("<html></html>")]
    #[case::not_array(r#"{"Id": "a1"}"#)]
    #[case::bad_datetime(
        r#"[{"Id": "a1", "EmployeeName": "Alice", "StarTimeUtc": "soon", "EndTimeUtc": "later"}]"#
    )]
    #[tokio::test]
    async fn test_read_time_entries_malformed(#[case] body: &str) {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server).await;

        assert!(client.read_time_entries().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_time_entries_returns_none_on_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(&server).await;

        assert_eq!(fetch_time_entries(&client).await, None);
    }

    /// 取得に失敗した場合は部分的な結果ではなく`None`を返すことを確認する。
    #[tokio::test]
    async fn test_fetch_time_entries_repository_error() {
        let mut repository = MockTimeEntryRepository::new();
        repository
            .expect_read_time_entries()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("Invalid time entry at index 3")));

        assert_eq!(fetch_time_entries(&repository).await, None);
    }

    #[tokio::test]
    async fn test_fetch_time_entries_connection_refused() {
        let client = TimeEntryClient::new(Client::new(), "http://127.0.0.1:9/api", "code");
        let err = client.read_time_entries().await.unwrap_err();

        assert_eq!(
            failure_hint(&err),
            Some("Please check your internet connection or the API endpoint.")
        );
    }

    #[tokio::test]
    async fn test_fetch_time_entries_empty_array() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = client_for(&server).await;

        assert_eq!(fetch_time_entries(&client).await, Some(vec![]));
    }
}
