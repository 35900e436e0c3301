/*
Copyright 2025 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

     https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Query-client output. Results are buffered per query and printed at the
//! end, either as plain `path config[ module]` lines or as one JSON
//! document.

use serde_json::{Value, json};

pub trait OutputFormatter {
    /// Starts a new query object; only the JSON formatter cares.
    fn new_obj(&mut self, _qtype: &str, _value: &str) {}

    fn add_config(&mut self, path: &str, config: &str, module: Option<&str>);

    fn add_rename(&mut self, old_path: &str, new_path: &str, similarity: u32);

    fn print(&self);
}

#[derive(Default)]
pub struct OutputFormatterSimple {
    configs: String,
    renames: String,
    modules: bool,
}

impl OutputFormatterSimple {
    pub fn new(modules: bool) -> OutputFormatterSimple {
        OutputFormatterSimple {
            modules,
            ..Default::default()
        }
    }
}

impl OutputFormatter for OutputFormatterSimple {
    fn add_config(&mut self, path: &str, config: &str, module: Option<&str>) {
        self.configs.push_str(path);
        self.configs.push(' ');
        self.configs.push_str(config);
        if self.modules {
            if let Some(module) = module {
                self.configs.push(' ');
                self.configs.push_str(module);
            }
        }
        self.configs.push('\n');
    }

    fn add_rename(&mut self, old_path: &str, new_path: &str, similarity: u32) {
        self.renames
            .push_str(&format!("{similarity} {old_path} {new_path}\n"));
    }

    fn print(&self) {
        print!("{}{}", self.configs, self.renames);
    }
}

#[derive(Default)]
pub struct OutputFormatterJson {
    objects: Vec<Value>,
}

impl OutputFormatterJson {
    pub fn new() -> OutputFormatterJson {
        OutputFormatterJson::default()
    }

    fn last(&mut self) -> &mut Value {
        if self.objects.is_empty() {
            self.objects.push(json!({}));
        }
        self.objects.last_mut().unwrap()
    }
}

impl OutputFormatter for OutputFormatterJson {
    fn new_obj(&mut self, qtype: &str, value: &str) {
        self.objects.push(json!({
            "query": { "type": qtype, "value": value },
        }));
    }

    fn add_config(&mut self, path: &str, config: &str, module: Option<&str>) {
        let entry = json!({
            "path": path,
            "config": config,
            "module": module.unwrap_or(""),
        });
        let slot = &mut self.last()["configs"];
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Some(configs) = slot.as_array_mut() {
            configs.push(entry);
        }
    }

    fn add_rename(&mut self, old_path: &str, new_path: &str, similarity: u32) {
        let obj = self.last();
        obj["rename"] = json!({
            "similarity": similarity,
            "from": old_path,
            "to": new_path,
        });
    }

    fn print(&self) {
        println!(
            "{}",
            serde_json::to_string_pretty(&self.objects).unwrap_or_else(|_| "[]".to_string())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_formatter() {
        let mut fmt = OutputFormatterSimple::new(true);
        fmt.add_config("drivers/x.c", "CONFIG_X", Some("drivers/x.o"));
        fmt.add_config("drivers/y.c", "CONFIG_Y", None);
        assert_eq!(
            fmt.configs,
            "drivers/x.c CONFIG_X drivers/x.o\ndrivers/y.c CONFIG_Y\n"
        );
    }

    #[test]
    fn test_simple_formatter_without_modules() {
        let mut fmt = OutputFormatterSimple::new(false);
        fmt.add_config("drivers/x.c", "CONFIG_X", Some("drivers/x.o"));
        assert_eq!(fmt.configs, "drivers/x.c CONFIG_X\n");
    }

    #[test]
    fn test_json_formatter() {
        let mut fmt = OutputFormatterJson::new();
        fmt.new_obj("file", "drivers/x.c");
        fmt.add_config("drivers/x.c", "CONFIG_X", None);
        fmt.add_rename("drivers/x.c", "drivers/z.c", 90);

        let obj = &fmt.objects[0];
        assert_eq!(obj["query"]["type"], "file");
        assert_eq!(obj["configs"][0]["config"], "CONFIG_X");
        assert_eq!(obj["rename"]["similarity"], 90);
    }
}
