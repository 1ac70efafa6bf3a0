// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log multiplexer: weaves child stdout/stderr and any number of log FIFOs
//! into the job logger, one line at a time.
//!
//! A single cooperative loop waits for readability on every registered
//! stream with a 50 ms timeout, checking for child termination on each
//! quiet cycle (readiness alone is not guaranteed to observe child death,
//! and a child may exit right after writing to a FIFO that has not
//! drained). Reads are raw and bounded; line assembly happens in a
//! per-stream buffer so unbuffered writers interleaved across streams can
//! never deadlock or shear lines.
//!
//! FIFO readers are opened non-blocking so the open never stalls waiting
//! for a writer; reads then go through the same uniform path as the child
//! pipes. When a writer closes, the reader is flushed, closed, and the same
//! path reopened so the next writer is captured.

use std::future::{poll_fn, Future};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::ExitStatus;
use std::task::Poll;
use std::time::Duration;

use hdist_core::{Level, Logger};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::net::unix::pipe;
use tokio::process::{Child, ChildStderr, ChildStdout};

/// Read chunk size per stream per cycle.
pub(crate) const BUFSIZE: usize = 4096;

/// Poll timeout; also bounds how stale a child-termination check can be.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Where a child's stdout bytes go.
pub(crate) enum StdoutSink<'a> {
    /// Line-framed into the job logger (the default).
    Logger,
    /// Captured verbatim for `to_var`.
    Capture(&'a mut Vec<u8>),
    /// Appended verbatim to a file for `append_to_file`.
    File(&'a mut std::fs::File),
}

impl StdoutSink<'_> {
    pub(crate) fn is_logger(&self) -> bool {
        matches!(self, StdoutSink::Logger)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            StdoutSink::Logger => Ok(()),
            StdoutSink::Capture(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            StdoutSink::File(file) => file.write_all(bytes),
        }
    }
}

/// Per-stream line assembly buffer.
#[derive(Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Append raw bytes and return every completed line, newline stripped.
    /// A trailing partial line stays buffered.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Drain a final unterminated line, if any.
    pub(crate) fn take_residual(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let residual = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Some(residual)
    }
}

#[derive(PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
    Fifo(PathBuf),
}

enum Source {
    Stdout(ChildStdout),
    Stderr(ChildStderr),
    Fifo(pipe::Receiver),
    /// Closed child stream; no longer polled.
    Done,
}

struct Stream {
    kind: StreamKind,
    logger: Logger,
    level: Level,
    lines: LineBuffer,
    source: Source,
}

impl Stream {
    fn flush(&mut self) {
        if let Some(residual) = self.lines.take_residual() {
            self.logger.log(self.level, &residual);
        }
    }
}

enum StreamEvent {
    Data(Vec<u8>),
    Eof,
    Failed(io::Error),
}

/// One multiplexing session over a single child's lifetime.
pub(crate) struct LogMux {
    streams: Vec<Stream>,
}

impl LogMux {
    pub(crate) fn new() -> Self {
        Self {
            streams: Vec::new(),
        }
    }

    /// Register the child's stdout and stderr, logged at DEBUG.
    pub(crate) fn register_child(
        &mut self,
        logger: &Logger,
        stdout: ChildStdout,
        stderr: ChildStderr,
    ) {
        self.streams.push(Stream {
            kind: StreamKind::Stdout,
            logger: logger.clone(),
            level: Level::Debug,
            lines: LineBuffer::default(),
            source: Source::Stdout(stdout),
        });
        self.streams.push(Stream {
            kind: StreamKind::Stderr,
            logger: logger.clone(),
            level: Level::Debug,
            lines: LineBuffer::default(),
            source: Source::Stderr(stderr),
        });
    }

    /// Register a log FIFO routed to `logger` at `level`.
    pub(crate) fn register_fifo(
        &mut self,
        logger: Logger,
        level: Level,
        path: &Path,
    ) -> io::Result<()> {
        let receiver = open_fifo_reader(path)?;
        self.streams.push(Stream {
            kind: StreamKind::Fifo(path.to_path_buf()),
            logger,
            level,
            lines: LineBuffer::default(),
            source: Source::Fifo(receiver),
        });
        Ok(())
    }

    /// Drain all streams until the child has terminated and a full poll
    /// cycle saw no events, then flush residual buffers and reap the child.
    pub(crate) async fn drive(
        &mut self,
        child: &mut Child,
        sink: &mut StdoutSink<'_>,
    ) -> io::Result<ExitStatus> {
        let mut scratch = [0u8; BUFSIZE];
        loop {
            let outcome = {
                let sleep = tokio::time::sleep(POLL_TIMEOUT);
                tokio::pin!(sleep);
                poll_fn(|cx| {
                    let mut events: Vec<(usize, StreamEvent)> = Vec::new();
                    for (idx, stream) in self.streams.iter_mut().enumerate() {
                        let mut read_buf = ReadBuf::new(&mut scratch);
                        let poll = match &mut stream.source {
                            Source::Stdout(r) => Pin::new(r).poll_read(cx, &mut read_buf),
                            Source::Stderr(r) => Pin::new(r).poll_read(cx, &mut read_buf),
                            Source::Fifo(r) => Pin::new(r).poll_read(cx, &mut read_buf),
                            Source::Done => continue,
                        };
                        match poll {
                            Poll::Pending => {}
                            Poll::Ready(Ok(())) => {
                                let filled = read_buf.filled();
                                if filled.is_empty() {
                                    events.push((idx, StreamEvent::Eof));
                                } else {
                                    events.push((idx, StreamEvent::Data(filled.to_vec())));
                                }
                            }
                            Poll::Ready(Err(e)) => events.push((idx, StreamEvent::Failed(e))),
                        }
                    }
                    if !events.is_empty() {
                        return Poll::Ready(Some(events));
                    }
                    match sleep.as_mut().poll(cx) {
                        Poll::Ready(()) => Poll::Ready(None),
                        Poll::Pending => Poll::Pending,
                    }
                })
                .await
            };

            match outcome {
                Some(events) => {
                    for (idx, event) in events {
                        self.handle_event(idx, event, sink)?;
                    }
                }
                None => {
                    // Quiet cycle; exit once the child is gone too.
                    if child.try_wait()?.is_some() {
                        break;
                    }
                }
            }
        }

        // Streams may have ended without a terminating newline.
        for stream in &mut self.streams {
            stream.flush();
            stream.source = Source::Done;
        }
        child.wait().await
    }

    fn handle_event(
        &mut self,
        idx: usize,
        event: StreamEvent,
        sink: &mut StdoutSink<'_>,
    ) -> io::Result<()> {
        let stream = &mut self.streams[idx];
        match event {
            StreamEvent::Data(bytes) => {
                if stream.kind == StreamKind::Stdout && !sink.is_logger() {
                    // Captured stdout bypasses line assembly entirely.
                    sink.write_all(&bytes)?;
                } else {
                    for line in stream.lines.push(&bytes) {
                        stream.logger.log(stream.level, &line);
                    }
                }
            }
            StreamEvent::Eof => {
                stream.flush();
                if let StreamKind::Fifo(path) = &stream.kind {
                    // Re-arm: the writer closed; reopen so the next one is
                    // captured. A fresh reader stays quiet until a writer
                    // connects, so this cannot spin.
                    stream.source = Source::Fifo(open_fifo_reader(path)?);
                } else {
                    stream.source = Source::Done;
                }
            }
            StreamEvent::Failed(e) => return Err(e),
        }
        Ok(())
    }
}

/// Open a FIFO read end without stalling on a missing writer.
fn open_fifo_reader(path: &Path) -> io::Result<pipe::Receiver> {
    pipe::OpenOptions::new().open_receiver(path)
}

#[cfg(test)]
#[path = "logmux_tests.rs"]
mod tests;
