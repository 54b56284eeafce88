//! Data model for published and downloaded files.

use std::fmt;

pub use fileshare_files::CHUNK_SIZE;

/// Lifecycle state of a [`FileMetadata`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Freshly observed via a peer listing; no fragments held yet.
    New,
    /// A download was started and then stopped before completion.
    Paused,
    /// A download is actively in progress.
    Downloading,
    /// Unpublished; no longer advertised, fragments remain on disk.
    Finished,
    /// Fully held and advertised to peers.
    Seeding,
}

impl Status {
    /// Encode as the small integer stored in the catalog.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Status::New => 0,
            Status::Paused => 1,
            Status::Downloading => 2,
            Status::Finished => 3,
            Status::Seeding => 4,
        }
    }

    /// Decode from the integer stored in the catalog.
    #[must_use]
    pub const fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Status::New),
            1 => Some(Status::Paused),
            2 => Some(Status::Downloading),
            3 => Some(Status::Finished),
            4 => Some(Status::Seeding),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::New => "New",
            Status::Paused => "Paused",
            Status::Downloading => "Downloading",
            Status::Finished => "Finished",
            Status::Seeding => "Seeding",
        };
        f.write_str(s)
    }
}

/// A single `CHUNK_SIZE`-aligned slice of a file that this node holds on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Index in `[0, fragment_count)`.
    pub id: u32,
    /// Fingerprint of the parent file.
    pub fingerprint: String,
}

/// Everything the catalog knows about a file, local or remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Display name, not unique.
    pub name: String,
    /// Absolute path on disk (publisher's source path, or this node's destination path).
    pub file_path: String,
    /// Name of the node that originally published the file.
    pub publisher: String,
    /// Lowercase hex MD5 of the full file content. Primary identity.
    pub fingerprint: String,
    /// Total size in bytes.
    pub size: u64,
    /// `ceil(size / CHUNK_SIZE)`.
    pub fragment_count: u32,
    /// Ids of fragments currently held on disk, ascending.
    pub held_fragments: Vec<u32>,
    /// Current lifecycle state.
    pub status: Status,
}

impl FileMetadata {
    /// Number of fragments required to hold `size` bytes.
    #[must_use]
    pub fn fragment_count_for(size: u64) -> u32 {
        fileshare_files::fragment_count(size)
    }

    /// True once every fragment is held.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.held_fragments.len() as u32 == self.fragment_count
    }

    /// True if `id` is already held.
    #[must_use]
    pub fn has_fragment(&self, id: u32) -> bool {
        self.held_fragments.contains(&id)
    }
}
