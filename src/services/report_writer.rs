//! 报告写入服务 - 业务能力层
//!
//! 只负责"把 PDF 字节写到磁盘"，不关心报告内容

use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// 报告文件扩展名
pub const REPORT_EXTENSION: &str = "pdf";

/// 同名文件最多尝试的编号
const MAX_NAME_ATTEMPTS: usize = 1000;

/// 把标题转换为文件名安全的 slug
///
/// 小写；保留 ASCII 字母和数字，其余连续字符折叠为一个 `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}

/// 报告文件名：`<slug>-<YYYY-MM-DD>.pdf`
pub fn report_file_name(title: &str, date: NaiveDate) -> String {
    numbered_file_name(title, date, 1)
}

/// 第 n 个同名报告的文件名，从第 2 个开始加 `-n` 后缀
fn numbered_file_name(title: &str, date: NaiveDate, attempt: usize) -> String {
    let stem = format!("{}-{}", slugify(title), date.format("%Y-%m-%d"));
    if attempt <= 1 {
        format!("{}.{}", stem, REPORT_EXTENSION)
    } else {
        format!("{}-{}.{}", stem, attempt, REPORT_EXTENSION)
    }
}

/// 报告写入服务
///
/// 从不覆盖已有文件：同名时依次尝试 `-2`、`-3` 后缀，
/// 文件以 `create_new` 方式打开，并发写入同一目录也不会互相覆盖
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// 使用指定目录创建
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 写入报告
    ///
    /// # 参数
    /// - `title`: 报告标题（用于生成文件名）
    /// - `date`: 文件名中的日期
    /// - `bytes`: PDF 内容
    ///
    /// # 返回
    /// 返回写入的文件路径
    pub async fn write(&self, title: &str, date: NaiveDate, bytes: &[u8]) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.output_dir.display().to_string(), e))?;

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let path = self.output_dir.join(numbered_file_name(title, date, attempt));

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("文件已存在，换一个编号: {}", path.display());
                    continue;
                }
                Err(e) => return Err(AppError::file_write_failed(path.display().to_string(), e)),
            };

            if attempt > 1 {
                warn!("⚠️ 同名报告已存在，改为写入 {}", path.display());
            }
            debug!("写入报告: {} ({} 字节)", path.display(), bytes.len());

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                // 不留下写了一半的文件
                let _ = fs::remove_file(&path).await;
                return Err(AppError::file_write_failed(path.display().to_string(), e));
            }

            return Ok(path);
        }

        let first = self.output_dir.join(report_file_name(title, date));
        Err(AppError::file_write_failed(
            first.display().to_string(),
            std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("已有 {} 个同名报告", MAX_NAME_ATTEMPTS),
            ),
        ))
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new("reports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Learning Analytics Report"), "learning-analytics-report");
        assert_eq!(slugify("  VR / Game Design:  Midterm #2 "), "vr-game-design-midterm-2");
        assert_eq!(slugify("???"), "report");
    }

    #[test]
    fn test_report_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(
            report_file_name("Unit 3 Quiz", date),
            "unit-3-quiz-2026-10-15.pdf"
        );
    }

    #[tokio::test]
    async fn test_same_title_never_overwrites() {
        let dir = std::env::temp_dir().join(format!("bloom_report_writer_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir).await;
        let writer = ReportWriter::new(&dir);
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();

        let first = writer.write("Unit One", date, b"first").await.unwrap();
        let second = writer.write("unit_one", date, b"second").await.unwrap();
        let third = writer.write("UNIT-ONE", date, b"third").await.unwrap();

        assert_eq!(first, dir.join("unit-one-2026-10-15.pdf"));
        assert_eq!(second, dir.join("unit-one-2026-10-15-2.pdf"));
        assert_eq!(third, dir.join("unit-one-2026-10-15-3.pdf"));
        assert_eq!(fs::read(&first).await.unwrap(), b"first");
        assert_eq!(fs::read(&second).await.unwrap(), b"second");

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_concurrent_writes_get_distinct_files() {
        let dir = std::env::temp_dir().join(format!("bloom_report_writer_mt_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir).await;
        let writer = std::sync::Arc::new(ReportWriter::new(&dir));
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let writer = writer.clone();
                tokio::spawn(async move { writer.write("Same Title", date, &[i as u8]).await })
            })
            .collect();

        let mut paths = Vec::new();
        for handle in handles {
            paths.push(handle.await.unwrap().unwrap());
        }
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 4);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
