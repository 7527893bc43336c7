//! Emitter and grid-table error types.

use std::error::Error;
use std::fmt;
use std::io;

use umbra_core::{CoordKindError, GridError, InvariantError};

/// Errors surfaced by emitter operations, at construction or during
/// tracing.
#[derive(Debug)]
pub enum AstrobjError {
    /// Tabulated-grid indexing overflow.
    Grid(GridError),
    /// The emitter does not support the active coordinate chart.
    CoordKind(CoordKindError),
    /// Internal consistency violation.
    Invariant(InvariantError),
    /// Grid-table container failure.
    Table(TableError),
}

impl fmt::Display for AstrobjError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "{e}"),
            Self::CoordKind(e) => write!(f, "{e}"),
            Self::Invariant(e) => write!(f, "{e}"),
            Self::Table(e) => write!(f, "{e}"),
        }
    }
}

impl Error for AstrobjError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            Self::CoordKind(e) => Some(e),
            Self::Invariant(e) => Some(e),
            Self::Table(e) => Some(e),
        }
    }
}

impl From<TableError> for AstrobjError {
    fn from(e: TableError) -> Self {
        Self::Table(e)
    }
}

impl From<GridError> for AstrobjError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<CoordKindError> for AstrobjError {
    fn from(e: CoordKindError) -> Self {
        Self::CoordKind(e)
    }
}

impl From<InvariantError> for AstrobjError {
    fn from(e: InvariantError) -> Self {
        Self::Invariant(e)
    }
}

/// Errors reading or writing the binary grid-table container.
///
/// All variants are fatal at scenery construction time.
#[derive(Debug)]
pub enum TableError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// The file does not start with the container magic.
    BadMagic,
    /// Unsupported container format version.
    UnsupportedVersion {
        /// The version found in the file.
        found: u32,
    },
    /// A mandatory scalar metadata key is absent.
    MissingKey {
        /// The absent key.
        name: String,
    },
    /// A mandatory extension is absent.
    MissingExtension {
        /// The absent extension name.
        name: String,
    },
    /// An extension's dimensions or payload are inconsistent.
    MalformedExtension {
        /// What went wrong.
        detail: String,
    },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::BadMagic => write!(f, "not a grid-table container (bad magic)"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported grid-table version {found}")
            }
            Self::MissingKey { name } => write!(f, "missing mandatory key '{name}'"),
            Self::MissingExtension { name } => {
                write!(f, "missing mandatory extension '{name}'")
            }
            Self::MalformedExtension { detail } => {
                write!(f, "malformed extension: {detail}")
            }
        }
    }
}

impl Error for TableError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TableError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
