//! # Copy and Move
//!
//! Generic transfer algorithms the repository falls back on when a backend
//! has no cheaper native primitive, plus the progress sink handed to long
//! stream transfers.
//!
//! The generic copy works entirely through the public API of the two
//! repositories involved, so it crosses backends, repository instances and
//! sub-repository mounts alike:
//!
//! 1. Describe the source.
//! 2. If the destination exists, fail with a state conflict unless
//!    overwriting is allowed, in which case the destination is deleted.
//! 3. Zero-length sources are created directly with empty content; anything
//!    else is streamed from a source reader into a destination writer.
//! 4. Collections recurse into their direct children.
//!
//! A generic move is a generic copy followed by deleting the source.

use log::debug;
use std::io::{self, Read, Write};
use url::Url;

use crate::error::{self, BackendError, Error, Result};
use crate::repository::Repository;
use crate::uri;

const BUFFER_SIZE: usize = 8 * 1024;

/// Receives byte counts while content streams are transferred.
///
/// Notifications are advisory and cannot abort a transfer.
pub trait ProgressListener: Send + Sync {
    fn progress(&self, transferred: u64, total: Option<u64>);
}

/// A listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn progress(&self, _transferred: u64, _total: Option<u64>) {}
}

/// Copy `reader` into `writer`, reporting progress after every chunk, and
/// flush the writer. Returns the number of bytes copied.
pub fn copy_stream(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    total: Option<u64>,
    progress: &dyn ProgressListener,
) -> io::Result<u64> {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut transferred = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..read])?;
        transferred += read as u64;
        progress.progress(transferred, total);
    }
    writer.flush()?;
    Ok(transferred)
}

/// Copy `source_uri` of `source` to `destination_uri` of `destination`
/// through the public API of both repositories.
pub fn copy_generic(
    source: &Repository,
    source_uri: &Url,
    destination: &Repository,
    destination_uri: &Url,
    overwrite: bool,
    progress: &dyn ProgressListener,
) -> Result<()> {
    debug!("Generic copy {} -> {}", source_uri, destination_uri);
    let mut description = source.describe(source_uri)?;

    if destination.exists(destination_uri)? {
        if !overwrite {
            return Err(Error::conflict(
                destination_uri,
                "destination exists and overwriting is not allowed",
            ));
        }
        destination.delete(destination_uri)?;
    }

    let length = description.content_length();
    description.set_uri(destination_uri.clone());
    if length == Some(0) {
        destination.create(destination_uri, &description, &[])?;
    } else {
        let mut reader = source.read(source_uri)?;
        let mut writer = destination.create_stream(destination_uri, &description)?;
        copy_stream(reader.as_mut(), writer.as_mut(), length, progress)
            .map_err(|e| error::translate(destination_uri, BackendError::Io(e)))?;
    }

    if description.is_collection() {
        for child in source.children(source_uri, None, 1)? {
            let relative = uri::relativize(source_uri, child.uri())
                .ok_or_else(|| Error::invalid(format!("{} is not a child of {}", child.uri(), source_uri)))?;
            let child_destination = uri::resolve(destination_uri, &relative)?;
            copy_generic(
                source,
                child.uri(),
                destination,
                &child_destination,
                overwrite,
                progress,
            )?;
        }
    }
    Ok(())
}

/// Copy, then delete the source.
pub fn move_generic(
    source: &Repository,
    source_uri: &Url,
    destination: &Repository,
    destination_uri: &Url,
    overwrite: bool,
    progress: &dyn ProgressListener,
) -> Result<()> {
    copy_generic(
        source,
        source_uri,
        destination,
        destination_uri,
        overwrite,
        progress,
    )?;
    source.delete(source_uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(u64, Option<u64>)>>,
    }

    impl ProgressListener for Recorder {
        fn progress(&self, transferred: u64, total: Option<u64>) {
            self.calls.lock().unwrap().push((transferred, total));
        }
    }

    #[test]
    fn test_copy_stream_reports_progress() {
        let data = vec![7u8; BUFFER_SIZE * 2 + 10];
        let mut reader = Cursor::new(data.clone());
        let mut output = Vec::new();
        let recorder = Recorder::default();

        let copied = copy_stream(
            &mut reader,
            &mut output,
            Some(data.len() as u64),
            &recorder,
        )
        .unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(output, data);
        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls.last(), Some(&(data.len() as u64, Some(data.len() as u64))));
    }

    #[test]
    fn test_copy_stream_empty() {
        let mut reader = Cursor::new(Vec::new());
        let mut output = Vec::new();
        let recorder = Recorder::default();
        assert_eq!(copy_stream(&mut reader, &mut output, None, &recorder).unwrap(), 0);
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_progress_is_silent() {
        NoProgress.progress(1, Some(2));
    }
}
