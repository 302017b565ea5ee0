//! Native engine modules: compiled-to-wasm node code, run under wasmtime.
//!
//! A guest module exports `memory`, a zero-argument `run`, and one
//! `input_offset_<resource>` / `output_offset_<resource>` function per
//! resource it touches. The adapter copies bus resource bytes into guest
//! memory at those offsets before `run` and copies outputs back after.

use std::path::Path;

use wasmtime::{Engine, Instance, Memory, Module, Store};

use crate::error::AdapterError;
use crate::NodeRunner;

pub struct NativeRunner {
    store: Store<()>,
    instance: Instance,
}

impl NativeRunner {
    pub fn load(wasm_path: &Path) -> Result<Self, AdapterError> {
        let engine = Engine::default();
        let module = Module::from_file(&engine, wasm_path)?;
        let mut store = Store::new(&engine, ());
        let instance = Instance::new(&mut store, &module, &[])?;
        Ok(Self { store, instance })
    }

    fn memory(&mut self) -> Result<Memory, AdapterError> {
        self.instance
            .get_memory(&mut self.store, "memory")
            .ok_or_else(|| AdapterError::MissingExport("memory".to_string()))
    }

    fn guest_offset(&mut self, export_name: &str) -> Result<i32, AdapterError> {
        let func = self
            .instance
            .get_typed_func::<(), i32>(&mut self.store, export_name)
            .map_err(|_| AdapterError::MissingExport(export_name.to_string()))?;
        Ok(func.call(&mut self.store, ())?)
    }
}

impl NodeRunner for NativeRunner {
    fn run_chunk(
        &mut self,
        inputs: &[(&str, &[u8])],
        outputs: &mut [(&str, &mut [u8])],
    ) -> Result<(), AdapterError> {
        for (name, bytes) in inputs {
            let offset = self.guest_offset(&format!("input_offset_{name}"))?;
            let memory = self.memory()?;
            memory.write(&mut self.store, offset as usize, bytes)?;
        }

        let run = self
            .instance
            .get_typed_func::<(), ()>(&mut self.store, "run")
            .map_err(|_| AdapterError::MissingExport("run".to_string()))?;
        run.call(&mut self.store, ())?;

        for (name, bytes) in outputs.iter_mut() {
            let offset = self.guest_offset(&format!("output_offset_{name}"))?;
            let memory = self.memory()?;
            memory.read(&self.store, offset as usize, bytes)?;
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}
