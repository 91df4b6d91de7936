use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
#[cfg(test)]
use mockall::automock;
use tempfile::Builder;

/// 集計結果を成果物として書き出すためのtrait。
#[cfg_attr(test, automock)]
pub trait ReportWriter<T: 'static> {
    /// 集計結果を書き出し、書き出したファイルのパスを返す。
    ///
    /// # Arguments
    ///
    /// * `rows` - 並び替え済みの集計結果
    fn write_report(&self, rows: &[T]) -> Result<PathBuf>;
}

/// レポート作成処理の結果。
#[derive(Clone, Debug, PartialEq)]
pub enum ReportOutcome {
    /// 成果物を書き出した。
    Written(PathBuf),
    /// タイムエントリーを取得できなかった、または1件もなかった。
    NoData,
    /// 論理削除を除くと集計対象がなかった。
    NoActiveEntries,
    /// 作業時間の合計が0以下で割合を計算できなかった。
    NonPositiveTotal,
}

/// 一時ファイルに書き込んでから置き換えることで、書きかけのファイルを残さない。
///
/// 既存のファイルがあればそのパーミッションを引き継ぎ、なければ通常のファイル作成と同じくumaskに従う。
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut file = builder
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    if let Ok(metadata) = fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .with_context(|| format!("Failed to copy permissions of {}", path.display()))?;
    }
    file.write_all(contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

/// 表示用に絶対パスへ変換する。変換できない場合はそのまま返す。
pub fn display_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
