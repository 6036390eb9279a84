use crate::error::BlockError;
use crate::message::Message;
use std::process::Stdio;
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::mpsc,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

const LINE_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct StreamJob {
    pub block_id: String,
    pub command: String,
    pub flush_every: Duration,
}

/// Owns the child's pipes until it exits. Lines are buffered and posted as
/// one `StreamBatch` per flush window; the last message is always
/// `StreamClosed`.
pub async fn pump(job: StreamJob, tx: mpsc::Sender<Message>) {
    pump_with("sh", job, tx).await
}

async fn pump_with(shell: &str, job: StreamJob, tx: mpsc::Sender<Message>) {
    let mut child = match Command::new(shell)
        .arg("-c")
        .arg(&job.command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!(block = %job.block_id, "stream_spawn_failed: {err}");
            let _ = tx
                .send(Message::StreamClosed {
                    block_id: job.block_id,
                    error: Some(BlockError::Stream(format!("failed to start: {err}"))),
                })
                .await;
            return;
        }
    };
    info!(block = %job.block_id, command = %job.command, "stream_started");

    let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_QUEUE_CAPACITY);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, line_tx.clone()));
    }
    drop(line_tx);

    let mut buffer: Vec<String> = Vec::new();
    let mut ticker = tokio::time::interval(job.flush_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            maybe_line = line_rx.recv() => {
                match maybe_line {
                    Some(line) => buffer.push(line),
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if buffer.is_empty() {
                    continue;
                }
                let lines = std::mem::take(&mut buffer);
                if tx.send(Message::stream_batch(&job.block_id, lines)).await.is_err() {
                    debug!(block = %job.block_id, "stream_receiver_gone");
                    return;
                }
            }
        }
    }

    if !buffer.is_empty() {
        let _ = tx.send(Message::stream_batch(&job.block_id, buffer)).await;
    }

    let error = match child.wait().await {
        Ok(status) if status.success() => None,
        Ok(status) => Some(BlockError::Stream(format!("process exited with {status}"))),
        Err(err) => Some(BlockError::Stream(err.to_string())),
    };
    info!(block = %job.block_id, failed = error.is_some(), "stream_closed");
    let _ = tx
        .send(Message::StreamClosed {
            block_id: job.block_id,
            error,
        })
        .await;
}

async fn forward_lines<R>(reader: R, line_tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line_tx.send(line).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(command: &str) -> StreamJob {
        StreamJob {
            block_id: "log_tail".to_string(),
            command: command.to_string(),
            flush_every: Duration::from_millis(10),
        }
    }

    async fn collect_with(shell: &str, command: &str) -> Vec<Message> {
        let (tx, mut rx) = mpsc::channel(64);
        pump_with(shell, job(command), tx).await;
        let mut out = Vec::new();
        while let Some(msg) = rx.recv().await {
            out.push(msg);
        }
        out
    }

    async fn collect(command: &str) -> Vec<Message> {
        collect_with("sh", command).await
    }

    #[tokio::test]
    async fn batches_carry_every_line_then_close_cleanly() {
        let messages = collect("printf 'INFO x\\nERROR y\\n'; sleep 0.05; printf 'ERROR z\\n'").await;
        let (last, batches) = messages.split_last().expect("at least one message");

        let mut lines = Vec::new();
        for msg in batches {
            match msg {
                Message::StreamBatch { block_id, lines: batch } => {
                    assert_eq!(block_id, "log_tail");
                    assert!(!batch.is_empty());
                    lines.extend(batch.iter().cloned());
                }
                other => panic!("unexpected {}", other.label()),
            }
        }
        assert_eq!(lines, vec!["INFO x", "ERROR y", "ERROR z"]);
        assert!(matches!(
            last,
            Message::StreamClosed { error: None, .. }
        ));
    }

    #[tokio::test]
    async fn failing_process_reports_error_after_flushing() {
        let messages = collect("echo last words; exit 4").await;
        assert!(matches!(
            messages.first(),
            Some(Message::StreamBatch { .. })
        ));
        match messages.last() {
            Some(Message::StreamClosed {
                error: Some(BlockError::Stream(text)),
                ..
            }) => assert!(text.contains('4'), "{text}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn spawn_failure_closes_without_data() {
        let messages = collect_with("/nonexistent/fw-shell", "echo never").await;
        assert_eq!(messages.len(), 1, "{messages:?}");
        match &messages[0] {
            Message::StreamClosed {
                block_id,
                error: Some(BlockError::Stream(text)),
            } => {
                assert_eq!(block_id, "log_tail");
                assert!(text.starts_with("failed to start"), "{text}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
