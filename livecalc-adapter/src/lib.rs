//! Node runner adapters: a uniform `init`/`run_chunk`/`dispose`
//! surface over two engine kinds, native (wasm, via wasmtime) and script
//! (Lua, via mlua), each operating on named bus resource byte slices.

mod error;
mod native;
mod script;
mod view;

pub use error::AdapterError;
pub use native::NativeRunner;
pub use script::ScriptRunner;
pub use view::{as_f64, as_f64_mut};

/// Uniform lifecycle for a node's engine instance. `run_chunk` receives the
/// node's resolved input resources (by name) and must fill every declared
/// output resource before returning.
pub trait NodeRunner: Send {
    fn init(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn run_chunk(
        &mut self,
        inputs: &[(&str, &[u8])],
        outputs: &mut [(&str, &mut [u8])],
    ) -> Result<(), AdapterError>;

    fn dispose(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Engine kind parsed from a node's `engine` reference (`native://...` or
/// `script://...`), per [`livecalc_validator`]'s engine ref grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Native,
    Script,
}

impl EngineKind {
    pub fn from_engine_ref(engine_ref: &str) -> Option<(Self, &str)> {
        if let Some(rest) = engine_ref.strip_prefix("native://") {
            Some((EngineKind::Native, rest))
        } else if let Some(rest) = engine_ref.strip_prefix("script://") {
            Some((EngineKind::Script, rest))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_kind_and_name() {
        assert_eq!(
            EngineKind::from_engine_ref("native://fast_sum"),
            Some((EngineKind::Native, "fast_sum"))
        );
        assert_eq!(
            EngineKind::from_engine_ref("script://pricing"),
            Some((EngineKind::Script, "pricing"))
        );
        assert_eq!(EngineKind::from_engine_ref("bus://x"), None);
    }
}
