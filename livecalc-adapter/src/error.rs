use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("wasm engine error: {0}")]
    Wasm(#[from] wasmtime::Error),
    #[error("lua engine error: {0}")]
    Lua(#[from] mlua::Error),
    #[error("module is missing required export {0:?}")]
    MissingExport(String),
    #[error("resource {0:?} length does not divide evenly into f64 elements")]
    Misaligned(String),
}
