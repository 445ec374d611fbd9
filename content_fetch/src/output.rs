use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::interfaces::OutputSink;

/// Where the reassembled payload goes.
pub enum OutputTarget {
    Writer(Box<dyn Write + Send>),
    File(PathBuf),
    Stdout,
}

pub fn new_output_sink(target: OutputTarget) -> Result<Box<dyn OutputSink>> {
    match target {
        OutputTarget::Writer(writer) => Ok(Box::new(writer)),
        OutputTarget::File(path) => {
            let file = File::create(&path)?;
            Ok(Box::new(BufWriter::new(file)))
        },
        OutputTarget::Stdout => Ok(Box::new(io::stdout())),
    }
}

/// Adapts an unbounded `mpsc::UnboundedSender<Bytes>` to `io::Write`, so flushed segments can be
/// consumed as a stream by another task.  Sending never blocks the flushing callback.
pub struct ChannelWriter(mpsc::UnboundedSender<Bytes>);

impl ChannelWriter {
    pub fn new(sender: mpsc::UnboundedSender<Bytes>) -> Self {
        Self(sender)
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .send(Bytes::copy_from_slice(buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_writes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object.bin");

        let mut sink = new_output_sink(OutputTarget::File(path.clone())).unwrap();
        sink.write_segment(b"AB").unwrap();
        sink.write_segment(b"CD").unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(std::fs::read(&path).unwrap(), b"ABCD");
    }

    #[test]
    fn test_file_sink_reports_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("object.bin");

        assert!(new_output_sink(OutputTarget::File(path)).is_err());
    }

    #[test]
    fn test_channel_writer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = new_output_sink(OutputTarget::Writer(Box::new(ChannelWriter::new(tx)))).unwrap();

        sink.write_segment(b"AB").unwrap();
        sink.write_segment(b"CD").unwrap();

        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"AB"));
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"CD"));

        drop(rx);
        assert!(sink.write_segment(b"EF").is_err());
    }
}
