/// Which result area a request feeds
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ViewMode {
    Tracks,
    Artists,
    Playlists,
    PlaylistDetail,
    History,
}

/// Identifies one query. A later token for the same view supersedes it.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RequestToken {
    pub view: ViewMode,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

/// One-line feedback for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}
