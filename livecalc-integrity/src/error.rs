use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("memory error: {0}")]
    Memory(#[from] livecalc_memory::MemoryError),
    #[error("resource {0:?} has no recorded integrity trailer to compare against")]
    NoTrailer(String),
    #[error("I/O error reading asset {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
