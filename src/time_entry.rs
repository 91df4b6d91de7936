use chrono::{DateTime, Utc};

/// APIから取得した1件分の作業記録。
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    pub id: String,
    pub employee_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notes: Option<String>,
    pub deleted_on: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// 作業時間を時間単位で返す。
    ///
    /// 終了が開始より前の場合は負の値になるが、検証はしない。
    pub fn worked_hours(&self) -> f64 {
        let duration = self.end - self.start;
        duration.num_seconds() as f64 / 3600.0
            + duration.subsec_nanos() as f64 / 3_600_000_000_000.0
    }

    /// 論理削除されていないエントリーかどうか。
    pub fn is_active(&self) -> bool {
        self.deleted_on.is_none()
    }
}
