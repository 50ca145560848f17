use anyhow::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;

/// Produces the raw state names reported by the platform, one at a time.
#[async_trait]
pub trait LifecycleSource: Send {
    /// `None` means the source is exhausted.
    async fn next_state(&mut self) -> Result<Option<String>>;
}

/// States pushed through a channel. Used to feed synthetic transitions.
pub struct ChannelLifecycle {
    receiver: UnboundedReceiver<String>,
}

impl ChannelLifecycle {
    pub fn new(receiver: UnboundedReceiver<String>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl LifecycleSource for ChannelLifecycle {
    async fn next_state(&mut self) -> Result<Option<String>> {
        Ok(self.receiver.recv().await)
    }
}

/// States read from a stream of lines, one state per line. Blank lines are skipped.
pub struct LineLifecycle<S> {
    lines: S,
}

impl<S> LineLifecycle<S>
where
    S: Stream<Item = std::io::Result<String>> + Unpin + Send,
{
    pub fn new(lines: S) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl<S> LifecycleSource for LineLifecycle<S>
where
    S: Stream<Item = std::io::Result<String>> + Unpin + Send,
{
    async fn next_state(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.lines.next().await {
            let line = line?;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio_stream::wrappers::LinesStream;

    use super::{LifecycleSource, LineLifecycle};

    #[tokio::test]
    async fn test_line_lifecycle_skips_blank_lines() -> Result<()> {
        let input = "background\n\n   \nactive\n";
        let lines = LinesStream::new(BufReader::new(input.as_bytes()).lines());
        let mut source = LineLifecycle::new(lines);

        assert_eq!(source.next_state().await?.as_deref(), Some("background"));
        assert_eq!(source.next_state().await?.as_deref(), Some("active"));
        assert_eq!(source.next_state().await?, None);
        Ok(())
    }
}
