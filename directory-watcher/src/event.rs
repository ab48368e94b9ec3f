//! File events from directory watching.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// A file system event for one path.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// The kind of event.
    pub kind: FileEventKind,

    /// Path to the affected file.
    pub path: PathBuf,

    /// When the event was received.
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Create a new file event.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    /// Split a notify event into one event per affected path.
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let kind = FileEventKind::from(event.kind);
        event
            .paths
            .into_iter()
            .map(|path| Self::new(kind, path))
            .collect()
    }
}

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created.
    Created,

    /// File content was written.
    Modified,

    /// File was deleted.
    Deleted,

    /// File was renamed away (old path).
    RenamedFrom,

    /// File was renamed into place (new path).
    RenamedTo,

    /// File metadata changed.
    MetadataChanged,

    /// Access time changed.
    Accessed,

    /// Unknown event type.
    Unknown,
}

impl FileEventKind {
    /// Whether the event means new bytes may have landed at the path.
    ///
    /// A rename into the folder counts as a create: most platforms report a
    /// file moved in from elsewhere that way.
    pub fn is_write(self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::RenamedTo)
    }
}

impl From<notify::EventKind> for FileEventKind {
    fn from(kind: notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Create(_) => Self::Created,
            notify::EventKind::Modify(modify_kind) => match modify_kind {
                notify::event::ModifyKind::Name(rename) => match rename {
                    notify::event::RenameMode::From => Self::RenamedFrom,
                    notify::event::RenameMode::To => Self::RenamedTo,
                    _ => Self::Unknown,
                },
                notify::event::ModifyKind::Metadata(_) => Self::MetadataChanged,
                _ => Self::Modified,
            },
            notify::EventKind::Remove(_) => Self::Deleted,
            notify::EventKind::Access(_) => Self::Accessed,
            _ => Self::Unknown,
        }
    }
}
