use std::collections::HashMap;

use crate::time_entry::TimeEntry;

/// 従業員ごとの作業時間の集計結果。
#[derive(Clone, Debug, PartialEq)]
pub struct EmployeeSummary {
    pub name: String,
    pub total_hours: f64,
}

/// 全体に占める割合を含む従業員ごとの集計結果。円グラフで利用する。
#[derive(Clone, Debug, PartialEq)]
pub struct EmployeeShare {
    pub name: String,
    pub total_hours: f64,
    pub percentage_of_total: f64,
}

/// 従業員ごとの作業時間を合計時間の降順で返す。
///
/// 論理削除されたエントリーは集計対象外とする。
/// 従業員名は大文字小文字を区別して比較し、同じ合計時間の場合は最初に現れた順を保つ。
pub fn summarize_hours(time_entries: &[TimeEntry]) -> Vec<EmployeeSummary> {
    let mut summaries = group_by_employee(time_entries);
    summaries.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
    summaries
}

/// 従業員ごとの作業時間と全体に占める割合を、割合の降順で返す。
///
/// 有効なエントリー全体の合計が0以下の場合は割合を計算できないため`None`を返す。
pub fn summarize_shares(time_entries: &[TimeEntry]) -> Option<Vec<EmployeeShare>> {
    let overall_hours: f64 = time_entries
        .iter()
        .filter(|entry| entry.is_active())
        .map(TimeEntry::worked_hours)
        .sum();
    if overall_hours <= 0.0 {
        return None;
    }

    let mut shares: Vec<EmployeeShare> = group_by_employee(time_entries)
        .into_iter()
        .map(|summary| EmployeeShare {
            percentage_of_total: summary.total_hours / overall_hours * 100.0,
            name: summary.name,
            total_hours: summary.total_hours,
        })
        .collect();
    shares.sort_by(|a, b| b.percentage_of_total.total_cmp(&a.percentage_of_total));

    Some(shares)
}

/// 有効なエントリーを従業員名ごとに集計する。結果は最初に現れた順に並ぶ。
fn group_by_employee(time_entries: &[TimeEntry]) -> Vec<EmployeeSummary> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut summaries: Vec<EmployeeSummary> = Vec::new();

    for entry in time_entries.iter().filter(|entry| entry.is_active()) {
        let position = *positions
            .entry(entry.employee_name.as_str())
            .or_insert_with(|| {
                summaries.push(EmployeeSummary {
                    name: entry.employee_name.clone(),
                    total_hours: 0.0,
                });
                summaries.len() - 1
            });
        summaries[position].total_hours += entry.worked_hours();
    }

    summaries
}
