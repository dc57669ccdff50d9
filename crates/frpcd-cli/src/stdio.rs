//! Line-oriented observer transport: one JSON message per line.

use async_trait::async_trait;
use frpcd_core::{ConnectionError, ObserverConnection};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Observer that writes each frame as one line to `W`.
pub struct LineObserver<W> {
    writer: Mutex<W>,
}

/// Observer on the process's stdout.
pub type StdioObserver = LineObserver<Stdout>;

impl StdioObserver {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LineObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

fn map_io(e: &std::io::Error) -> ConnectionError {
    if e.kind() == std::io::ErrorKind::BrokenPipe {
        ConnectionError::Closed
    } else {
        ConnectionError::Transport(e.to_string())
    }
}

#[async_trait]
impl<W> ObserverConnection for LineObserver<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, frame: String) -> Result<(), ConnectionError> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| map_io(&e))?;
        writer.write_all(b"\n").await.map_err(|e| map_io(&e))?;
        writer.flush().await.map_err(|e| map_io(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_are_newline_delimited() {
        let observer = LineObserver::new(Vec::new());
        observer.send(r#"{"type":"log","content":"a"}"#.to_string())
            .await
            .unwrap();
        observer.send(r#"{"type":"log","content":"b"}"#.to_string())
            .await
            .unwrap();

        let written = String::from_utf8(observer.into_inner()).unwrap();
        assert_eq!(
            written,
            "{\"type\":\"log\",\"content\":\"a\"}\n{\"type\":\"log\",\"content\":\"b\"}\n"
        );
    }
}
