// src/scan/poll.rs

//! Build-mode change detection: a one-shot, poll-based scan.
//!
//! Re-run on every build request. Deliberately avoids filesystem watches,
//! trading rebuild latency for simplicity and for environments where
//! persistent watches are undesirable (one-shot CI builds).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::Result;
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::scan::candidates::CandidateSet;
use crate::types::{ChangedContent, extension_of};

/// Expand the candidate set and return the content of every file that is new
/// or newer than its entry in `file_modified`.
///
/// A file absent from the map has an effective previous timestamp of negative
/// infinity: it is always considered changed on first sight. Unchanged files
/// are skipped without reading their contents. The map is updated in place
/// with the timestamps of the files that were read.
pub fn scan_changes(
    fs: &dyn FileSystem,
    candidates: &CandidateSet,
    file_modified: &mut HashMap<PathBuf, SystemTime>,
) -> Result<Vec<ChangedContent>> {
    let files = candidates.expand(fs)?;
    debug!(candidates = files.len(), "expanded candidate patterns");

    let mut changed = Vec::new();
    for file in files {
        let mtime = match fs.modified(&file) {
            Ok(m) => m,
            Err(err) => {
                // Raced with a deletion between expansion and stat.
                debug!(file = ?file, error = %err, "candidate vanished during scan");
                continue;
            }
        };

        let is_new = match file_modified.get(&file) {
            Some(prev) => mtime > *prev,
            None => true,
        };
        if !is_new {
            continue;
        }

        let content = match fs.read_to_string(&file) {
            Ok(c) => c,
            Err(err) => {
                // Leave the map untouched so the next scan retries this file.
                warn!(file = ?file, error = %err, "failed to read changed candidate");
                continue;
            }
        };

        file_modified.insert(file.clone(), mtime);
        changed.push(ChangedContent {
            content,
            extension: extension_of(&file),
        });
    }

    debug!(changed = changed.len(), "poll scan complete");
    Ok(changed)
}
