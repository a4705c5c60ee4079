//! Pipeline sinks.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::spec::ParamMap;
use crate::pipeline::stage::{BoxedStage, Stage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Sink that discards every frame. Provides a terminal for pipelines whose
/// interesting work happens in the filters.
pub struct NullWriter {
    source: BoxedStage,
    consumed: u64,
}

impl NullWriter {
    pub const LABEL: &'static str = "NullWriter";

    pub fn new(source: BoxedStage) -> Self {
        Self {
            source,
            consumed: 0,
        }
    }
}

impl Stage for NullWriter {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn drive(&mut self) -> PipelineResult<()> {
        while self.source.produce()?.is_some() {
            self.consumed += 1;
        }
        tracing::debug!(frames = self.consumed, "null writer drained the chain");
        Ok(())
    }
}

/// Sink that appends every frame as one JSON line to `path`, journal style.
pub struct TraceWriter {
    source: BoxedStage,
    path: PathBuf,
}

impl TraceWriter {
    pub const LABEL: &'static str = "TraceWriter";

    pub fn new(source: BoxedStage, path: PathBuf) -> Self {
        Self { source, path }
    }

    pub fn from_params(source: BoxedStage, params: &ParamMap) -> PipelineResult<Self> {
        let path = PathBuf::from(params.str_required("path")?);
        Ok(Self::new(source, path))
    }
}

impl Stage for TraceWriter {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn drive(&mut self) -> PipelineResult<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        let mut written = 0u64;
        while let Some(mut frame) = self.source.produce()? {
            frame.push_trace(Self::LABEL);
            let line = serde_json::to_string(&frame).map_err(std::io::Error::from)?;
            writeln!(writer, "{line}")?;
            written += 1;
        }
        writer.flush()?;
        tracing::info!(path = %self.path.display(), frames = written, "trace written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame::Frame;
    use crate::pipeline::stages::SyntheticReader;

    #[test]
    fn test_null_writer_drains() {
        let reader = Box::new(SyntheticReader::new(6, 1));
        let mut writer = NullWriter::new(reader);
        writer.drive().unwrap();
        assert_eq!(writer.consumed, 6);
    }

    #[test]
    fn test_trace_writer_journals_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");
        let reader = Box::new(SyntheticReader::new(3, 2));
        let mut writer = TraceWriter::new(reader, path.clone());
        writer.drive().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let frames: Vec<Frame> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames.iter().map(|f| f.number).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            frames[0].trace,
            vec![SyntheticReader::LABEL, TraceWriter::LABEL]
        );
    }
}
