//! Script engine modules: Lua source evaluated under mlua, operating on
//! `f64` arrays exposed as Lua tables.

use mlua::{Function, Lua, Table};

use crate::error::AdapterError;
use crate::view::{as_f64, as_f64_mut};
use crate::NodeRunner;

pub struct ScriptRunner {
    lua: Lua,
}

impl ScriptRunner {
    pub fn load(source: &str) -> Result<Self, AdapterError> {
        let lua = Lua::new();
        lua.load(source).exec()?;
        Ok(Self { lua })
    }
}

impl NodeRunner for ScriptRunner {
    fn run_chunk(
        &mut self,
        inputs: &[(&str, &[u8])],
        outputs: &mut [(&str, &mut [u8])],
    ) -> Result<(), AdapterError> {
        let globals = self.lua.globals();

        for (name, bytes) in inputs {
            let values = as_f64(bytes, name)?;
            let table = self.lua.create_table()?;
            for (i, v) in values.iter().enumerate() {
                table.set(i + 1, *v)?;
            }
            globals.set(*name, table)?;
        }

        let run: Function = globals.get("run")?;
        run.call::<_, ()>(())?;

        for (name, bytes) in outputs.iter_mut() {
            let table: Table = globals.get(*name)?;
            let values = as_f64_mut(bytes, name)?;
            for (i, slot) in values.iter_mut().enumerate() {
                *slot = table.get(i + 1)?;
            }
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_an_input_array_into_an_output_array() {
        let source = r#"
            function run()
                out = {}
                for i, v in ipairs(inp) do
                    out[i] = v * 2
                end
            end
        "#;
        let mut runner = ScriptRunner::load(source).unwrap();
        let input_bytes = 2.5f64.to_le_bytes();
        let mut output_bytes = [0u8; 8];
        runner
            .run_chunk(&[("inp", &input_bytes[..])], &mut [("out", &mut output_bytes[..])])
            .unwrap();
        assert_eq!(f64::from_le_bytes(output_bytes), 5.0);
    }
}
