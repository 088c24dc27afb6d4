use crate::{
    error::Error,
    file::{FileEntry, TextFile},
    filter::FileFilter,
    source::{ContentEntry, EntryKind, SourceHost},
};
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::{debug, error, info, trace, warn};

/// Where a walk stands.
#[derive(Debug, Clone)]
pub enum WalkState {
    /// Not every reachable file has been visited yet
    Pending,
    /// Every reachable file was visited
    Completed,
    /// Traversal stopped on a host-level failure
    Aborted(Error),
}

/// Counters collected during a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories expanded
    pub directories: usize,
    /// Files yielded as text
    pub accepted: usize,
    /// Entries skipped by path or kind
    pub filtered: usize,
    /// Files skipped because their content could not be fetched or decoded
    pub skipped: usize,
}

/// Breadth-first walk over a repository, yielding decodable text files.
///
/// Directories are expanded by appending their children to the back of a
/// single FIFO queue. The walk is single-pass: once it returns `None` it stays
/// exhausted, and a retry needs a new walker.
pub struct RepoWalker<'a> {
    source: &'a dyn SourceHost,
    filter: FileFilter,
    queue: VecDeque<ContentEntry>,
    started: bool,
    state: WalkState,
    stats: WalkStats,
}

impl<'a> RepoWalker<'a> {
    /// Creates a walker. Nothing is fetched until the first call to `next`.
    #[must_use]
    pub fn new(source: &'a dyn SourceHost, filter: FileFilter) -> Self {
        Self {
            source,
            filter,
            queue: VecDeque::new(),
            started: false,
            state: WalkState::Pending,
            stats: WalkStats::default(),
        }
    }

    /// Current state of the walk.
    #[must_use]
    pub const fn state(&self) -> &WalkState {
        &self.state
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> WalkStats {
        self.stats
    }

    fn abort(&mut self, err: Error) {
        error!("Repository traversal aborted: {}", err);
        self.queue.clear();
        self.state = WalkState::Aborted(err);
    }

    /// Checks access to the repository and queues the root listing.
    fn start(&mut self) -> Result<(), Error> {
        self.started = true;

        let info = self.source.repository()?;
        debug!(
            "Walking {} (default branch {})",
            info.full_name, info.default_branch
        );

        self.expand("")
    }

    fn expand(&mut self, path: &str) -> Result<(), Error> {
        let children = self.source.list_directory(path)?;
        trace!("Expanded '{}' ({} entries)", path, children.len());
        self.stats.directories += 1;
        self.queue.extend(children);
        Ok(())
    }

    /// Fetches and decodes one file. `Ok(None)` means the file was skipped.
    fn load(&mut self, path: String) -> Result<Option<TextFile>, Error> {
        if !self.filter.should_process(&path) {
            trace!("Skipping filtered path: {}", path);
            self.stats.filtered += 1;
            return Ok(None);
        }

        let bytes = match self.source.fetch_blob(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.is_per_file() => {
                warn!("Skipping file {} due to fetch error: {}", path, e);
                self.stats.skipped += 1;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match FileEntry::new(path, bytes).decode() {
            Ok(file) => {
                trace!("Decoded {} as {}", file.path, file.encoding);
                self.stats.accepted += 1;
                Ok(Some(file))
            }
            Err(e) => {
                warn!("Skipping file due to decoding error: {}", e);
                self.stats.skipped += 1;
                Ok(None)
            }
        }
    }
}

impl Iterator for RepoWalker<'_> {
    type Item = TextFile;

    fn next(&mut self) -> Option<TextFile> {
        if !matches!(self.state, WalkState::Pending) {
            return None;
        }

        if !self.started {
            if let Err(e) = self.start() {
                self.abort(e);
                return None;
            }
        }

        while let Some(entry) = self.queue.pop_front() {
            let step = match entry.kind {
                EntryKind::Dir => self.expand(&entry.path).map(|()| None),
                EntryKind::File | EntryKind::Symlink => self.load(entry.path),
                EntryKind::Submodule | EntryKind::Other => {
                    trace!("Skipping {:?} entry: {}", entry.kind, entry.path);
                    self.stats.filtered += 1;
                    Ok(None)
                }
            };

            match step {
                Ok(Some(file)) => return Some(file),
                Ok(None) => {}
                Err(e) => {
                    self.abort(e);
                    return None;
                }
            }
        }

        self.state = WalkState::Completed;
        info!("Total number of files to process: {}", self.stats.accepted);
        None
    }
}

impl FusedIterator for RepoWalker<'_> {}
