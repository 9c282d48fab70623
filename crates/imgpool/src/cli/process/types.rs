//! CLI enum types for the process command: algorithm and collector.

use clap::ValueEnum;

/// Per-image transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Invert RGB channels, keep alpha
    #[default]
    Invert,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Invert => write!(f, "invert"),
        }
    }
}

/// Where committed results go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CollectorKind {
    /// Keep results in memory, write them out after the pool drains
    #[default]
    Memory,
    /// Stage each result in a temp file, publish it on commit
    Fs,
}

impl std::fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorKind::Memory => write!(f, "memory"),
            CollectorKind::Fs => write!(f, "fs"),
        }
    }
}
