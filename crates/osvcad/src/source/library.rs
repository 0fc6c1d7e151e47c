//! Parametric part libraries.
//!
//! A library file holds one script template and a table of parts, each
//! overriding some of the template's params:
//!
//! ```toml
//! name = "washers"
//!
//! [template]
//! part = "washer"
//! params = { d = 5.0, od = 10.0, t = 1.0 }
//! # solids and anchors as in any part script
//!
//! [[parts]]
//! id = "M5"
//!
//! [[parts]]
//! id = "M8"
//! params = { d = 8.4, od = 16.0, t = 1.6 }
//! ```
//!
//! Generating the library writes one script per part into a `scripts/`
//! directory next to the library file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::script::PartScript;
use super::{Catalog, CatalogGenerator};
use crate::error::{OsvcadError, Result};

/// Directory, relative to the library file, that receives generated scripts.
pub const SCRIPTS_DIR: &str = "scripts";

/// One part of a library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryPart {
    /// Part id, also the generated script's file stem.
    pub id: String,
    /// Overrides merged over the template params.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// A parsed library file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryFile {
    /// Library name, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Script shared by every part.
    pub template: PartScript,
    /// Parts.
    #[serde(default)]
    pub parts: Vec<LibraryPart>,
}

impl LibraryFile {
    /// Parse library text.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// The template with `part`'s params merged in.
    pub fn script_for(&self, part: &LibraryPart) -> PartScript {
        let mut script = self.template.clone();
        script
            .params
            .extend(part.params.iter().map(|(k, v)| (k.clone(), *v)));
        script
    }
}

/// Generates TOML part scripts from a [`LibraryFile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLibrary;

impl CatalogGenerator for TomlLibrary {
    #[tracing::instrument(skip(self), fields(library = %library.display()))]
    fn generate(&self, library: &Path) -> Result<Catalog> {
        let text =
            std::fs::read_to_string(library).map_err(|e| OsvcadError::io(library, e))?;
        let file =
            LibraryFile::parse(&text).map_err(|reason| OsvcadError::invalid_source(library, reason))?;

        let scripts_dir = library
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SCRIPTS_DIR);
        std::fs::create_dir_all(&scripts_dir).map_err(|e| OsvcadError::io(&scripts_dir, e))?;

        let mut parts: BTreeMap<String, PathBuf> = BTreeMap::new();
        for part in &file.parts {
            if !is_safe_id(&part.id) {
                return Err(OsvcadError::invalid_source(
                    library,
                    format!("part id '{}' is not a valid file stem", part.id),
                ));
            }
            if parts.contains_key(&part.id) {
                return Err(OsvcadError::invalid_source(
                    library,
                    format!("part id '{}' appears twice", part.id),
                ));
            }
            let path = scripts_dir.join(format!("{}.toml", part.id));
            let body = file.script_for(part).to_toml()?;
            std::fs::write(&path, body).map_err(|e| OsvcadError::io(&path, e))?;
            parts.insert(part.id.clone(), path);
        }

        info!(
            parts = parts.len(),
            dir = %scripts_dir.display(),
            "generated library scripts"
        );
        Ok(Catalog::new(scripts_dir, parts))
    }
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ScriptEvaluator, TomlScriptEvaluator};
    use osvcad_kernel::CsgKernel;

    const WASHERS: &str = r#"
name = "washers"

[template]
part = "washer"

[template.params]
d = 5.0
od = 10.0
t = 1.0

[[template.solids]]
name = "disc"
make = { cylinder = { radius = "od / 2", height = "t" } }

[[template.solids]]
name = "bore"
make = { cylinder = { radius = "d / 2", height = "t" } }

[[template.solids]]
name = "washer"
make = { difference = { base = "disc", tools = ["bore"] } }

[template.anchors.0]
position = [0, 0, "t"]
direction = [0, 0, 1]
dimension = "d"
description = "M{d} bore"

[[parts]]
id = "M5"

[[parts]]
id = "M8"
params = { d = 8.4, od = 16.0, t = 1.6 }
"#;

    #[test]
    fn generates_one_script_per_part() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("washers.toml");
        std::fs::write(&library, WASHERS).unwrap();

        let catalog = TomlLibrary.generate(&library).unwrap();
        assert_eq!(catalog.part_ids().collect::<Vec<_>>(), ["M5", "M8"]);
        assert_eq!(catalog.scripts_dir(), dir.path().join(SCRIPTS_DIR));

        let m8 = catalog.script_for("M8").unwrap();
        assert!(m8.is_file());
        let kernel = CsgKernel::new();
        let outputs = TomlScriptEvaluator::new(&kernel).evaluate(m8).unwrap();
        let anchors = outputs.anchors.unwrap();
        let bore = anchors.values().next().unwrap();
        assert_eq!(bore.dimension(), 8.4);
        assert_eq!(bore.description(), "M8.4 bore");
        assert!(outputs.part.is_some());
    }

    #[test]
    fn part_params_override_template() {
        let file = LibraryFile::parse(WASHERS).unwrap();
        let script = file.script_for(&file.parts[1]);
        assert_eq!(script.params["d"], 8.4);
        let script = file.script_for(&file.parts[0]);
        assert_eq!(script.params["d"], 5.0);
    }

    #[test]
    fn rejects_unsafe_and_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("lib.toml");

        std::fs::write(&library, "[template]\n\n[[parts]]\nid = \"../escape\"\n").unwrap();
        let err = TomlLibrary.generate(&library).unwrap_err();
        assert!(matches!(err, OsvcadError::InvalidSource { .. }));

        std::fs::write(&library, "[template]\n\n[[parts]]\nid = \"a\"\n\n[[parts]]\nid = \"a\"\n")
            .unwrap();
        let err = TomlLibrary.generate(&library).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn missing_template_is_invalid_source() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("lib.toml");
        std::fs::write(&library, "[[parts]]\nid = \"a\"\n").unwrap();
        assert!(matches!(
            TomlLibrary.generate(&library).unwrap_err(),
            OsvcadError::InvalidSource { .. }
        ));
    }
}
