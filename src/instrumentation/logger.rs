use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLog {
    pub attempt: u32,
    pub run_id: String,
    pub status: String,
    pub file_search_used: bool,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnLog {
    pub turn_id: String,
    pub timestamp: String,
    pub thread_id: String,
    pub message: String,
    pub attempts: Vec<AttemptLog>,
    pub retried: bool,
    pub fallback_used: bool,
    pub total_latency_ms: u64,
}

impl TurnLog {
    pub fn file_search_used(&self) -> bool {
        self.attempts.last().is_some_and(|a| a.file_search_used)
    }

    pub fn summary(&self) -> String {
        format!(
            "Runs: {} | File search: {} | Retried: {} | Fallback: {} | Total latency: {:.1}s",
            self.attempts.len(),
            if self.file_search_used() { "yes" } else { "no" },
            if self.retried { "yes" } else { "no" },
            if self.fallback_used { "yes" } else { "no" },
            self.total_latency_ms as f64 / 1000.0,
        )
    }
}

/// Appends one JSON line per turn to `<dir>/turns.jsonl`.
#[derive(Debug, Clone)]
pub struct TurnLogger {
    dir: PathBuf,
}

impl TurnLogger {
    pub fn new(dir: &str) -> Result<Self> {
        let dir = PathBuf::from(dir);
        fs::create_dir_all(&dir).context("Failed to create logs directory")?;
        Ok(Self { dir })
    }

    pub fn write(&self, turn_log: &TurnLog) -> Result<()> {
        let path = self.dir.join("turns.jsonl");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open log file")?;

        let json = serde_json::to_string(turn_log).context("Failed to serialize turn log")?;
        writeln!(file, "{}", json).context("Failed to write log")?;

        Ok(())
    }

    /// Same as [`TurnLogger::write`], run on the blocking pool.
    pub async fn record(&self, turn_log: TurnLog) -> Result<()> {
        let logger = self.clone();
        tokio::task::spawn_blocking(move || logger.write(&turn_log))
            .await
            .context("Turn log writer task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(retried: bool) -> TurnLog {
        TurnLog {
            turn_id: "t-1".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            thread_id: "thread_1".into(),
            message: "0035".into(),
            attempts: vec![AttemptLog {
                attempt: 1,
                run_id: "run_1".into(),
                status: "completed".into(),
                file_search_used: true,
                latency_ms: 1200,
            }],
            retried,
            fallback_used: false,
            total_latency_ms: 1500,
        }
    }

    #[test]
    fn appends_one_line_per_turn() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let logger = TurnLogger::new(dir.to_str().unwrap()).unwrap();

        logger.write(&sample(false)).unwrap();
        logger.write(&sample(true)).unwrap();

        let contents = fs::read_to_string(dir.join("turns.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: TurnLog = serde_json::from_str(lines[1]).unwrap();
        assert!(parsed.retried);
        assert_eq!(parsed.attempts[0].run_id, "run_1");
        assert!(lines[0].contains("\"fileSearchUsed\":true"));
    }

    #[tokio::test]
    async fn record_appends_from_async_context() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = TurnLogger::new(tmp.path().to_str().unwrap()).unwrap();

        logger.record(sample(false)).await.unwrap();
        logger.record(sample(true)).await.unwrap();

        let contents = fs::read_to_string(tmp.path().join("turns.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with('\n'));
    }

    #[test]
    fn summary_reports_search_and_latency() {
        let summary = sample(false).summary();
        assert_eq!(
            summary,
            "Runs: 1 | File search: yes | Retried: no | Fallback: no | Total latency: 1.5s"
        );
    }
}
