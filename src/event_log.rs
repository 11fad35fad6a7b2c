use anyhow::{Context, Result};
use serde::Serialize;
use soundstage_core::SimTick;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// One line of the audio event log.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Host tick when the event occurred.
    pub tick: SimTick,
    /// Short kind label (`play`, `fade`, `scene`, ...).
    pub kind: &'a str,
    /// Free-form detail.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON.
pub struct JsonlSink<W: Write = BufWriter<File>> {
    out: W,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create event log {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_object_per_line() {
        let mut sink = JsonlSink::new(Vec::new());
        for (tick, kind) in [(1, "play"), (2, "fade")] {
            sink.write(&EventRecord {
                tick: SimTick(tick),
                kind,
                payload: "ok",
            })
            .unwrap();
        }
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"tick":1,"kind":"play","payload":"ok"}"#);
    }

    #[test]
    fn create_makes_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("soundstage_log_{}", std::process::id()));
        let path = dir.join("nested/events.jsonl");
        let mut sink = JsonlSink::create(&path).expect("can create log");
        sink.write(&EventRecord {
            tick: SimTick::ZERO,
            kind: "smoke",
            payload: "",
        })
        .unwrap();
        sink.flush().unwrap();
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }
}
