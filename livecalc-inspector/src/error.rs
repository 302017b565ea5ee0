use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("memory error: {0}")]
    Memory(#[from] livecalc_memory::MemoryError),
    #[error("unknown resource {0:?}")]
    UnknownResource(String),
    #[error("slice request [{start}, {start}+{len}) is out of bounds for resource {resource:?} with {element_count} elements")]
    SliceOutOfBounds {
        resource: String,
        start: usize,
        len: usize,
        element_count: usize,
    },
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
