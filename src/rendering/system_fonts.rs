//! Index of fonts installed on the host.
//!
//! Faces are registered under `family$$$$name` and `$$$$name` keys; aliases
//! map one key to another registered key. The index is built once (scanning
//! is the slow part) and then only read.

use std::path::PathBuf;

use log::info;
use rustc_hash::FxHashMap;

/// Key separator between family and font name.
pub const SEPARATOR: &str = "$$$$";

/// Where a face lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontLocation {
    pub path: PathBuf,
    /// Face index within a collection; `None` means pick by name
    pub index: Option<u32>,
}

impl FontLocation {
    /// A face at `path`, selected by name if the file is a collection.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        FontLocation {
            path: path.into(),
            index: None,
        }
    }
}

/// Substitute for a font that is not installed, chosen by name.
///
/// Documents frequently reference the common CJK system faces under many
/// spellings; this maps them onto the canonical installed family.
pub fn similar_font_name(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.contains("simfang") || lower.contains("仿宋") {
        "FangSong"
    } else if lower.contains("kai") || lower.contains("楷") {
        "KaiTi"
    } else if lower.contains("hei") || lower.contains("黑体") {
        "SimHei"
    } else if lower.contains("标宋") {
        "XiaoBiaoSong"
    } else {
        "SimSun"
    }
}

/// Family/name → file index with alias support.
#[derive(Debug, Clone, Default)]
pub struct SystemFontIndex {
    paths: FxHashMap<String, FontLocation>,
    aliases: FxHashMap<String, String>,
}

fn key(family: Option<&str>, name: &str) -> String {
    format!("{}{}{}", family.unwrap_or(""), SEPARATOR, name)
}

impl SystemFontIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face under `family$$$$name` and `$$$$name`.
    pub fn register(&mut self, family: Option<&str>, name: &str, location: FontLocation) {
        if let Some(family) = family.filter(|f| !f.is_empty()) {
            self.paths.insert(key(Some(family), name), location.clone());
        }
        self.paths.insert(key(None, name), location);
    }

    /// Make `family/name` resolve to the face registered as `target_family/target_name`.
    ///
    /// Returns false, and registers nothing, if the target is unknown.
    pub fn add_alias(
        &mut self,
        family: Option<&str>,
        name: &str,
        target_family: Option<&str>,
        target_name: &str,
    ) -> bool {
        let target = key(target_family, target_name);
        if !self.paths.contains_key(&target) {
            info!(
                "Font alias [{:?} {}] -> [{:?} {}] targets an unknown face",
                family, name, target_family, target_name
            );
            return false;
        }
        self.aliases.insert(key(family, name), target);
        true
    }

    /// Look up a face: alias then path with the family, then alias then path by name alone.
    pub fn find(&self, family: Option<&str>, name: &str) -> Option<&FontLocation> {
        let lookup = |k: String| {
            self.aliases
                .get(&k)
                .and_then(|target| self.paths.get(target))
                .or_else(|| self.paths.get(&k))
        };

        family
            .filter(|f| !f.is_empty())
            .and_then(|f| lookup(key(Some(f), name)))
            .or_else(|| lookup(key(None, name)))
    }

    /// Any registered face, used as a last-resort default.
    pub fn any(&self) -> Option<&FontLocation> {
        self.find(None, "SimSun").or_else(|| {
            let mut keys: Vec<&String> = self.paths.keys().collect();
            keys.sort();
            keys.first().and_then(|k| self.paths.get(*k))
        })
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no face is registered.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Build an index from a populated font database.
    #[cfg(feature = "system-fonts")]
    pub fn from_database(db: &fontdb::Database) -> Self {
        let mut index = SystemFontIndex::new();
        for face in db.faces() {
            let path = match &face.source {
                fontdb::Source::File(path) => path.clone(),
                fontdb::Source::SharedFile(path, _) => path.clone(),
                fontdb::Source::Binary(_) => continue,
            };
            let location = FontLocation {
                path,
                index: Some(face.index),
            };
            for (family, _) in &face.families {
                index.register(Some(family.as_str()), &face.post_script_name, location.clone());
                index.register(Some(family.as_str()), family, location.clone());
            }
            if face.families.is_empty() {
                index.register(None, &face.post_script_name, location);
            }
        }
        log::debug!("Indexed {} font keys from {} faces", index.len(), db.len());
        index
    }

    /// Scan the platform font directories.
    #[cfg(feature = "system-fonts")]
    pub fn load_system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        Self::from_database(&db)
    }

    /// Scan explicit font directories recursively.
    #[cfg(feature = "system-fonts")]
    pub fn scan_directories<P: AsRef<std::path::Path>>(dirs: &[P]) -> Self {
        let mut db = fontdb::Database::new();
        for dir in dirs {
            db.load_fonts_dir(dir.as_ref());
        }
        Self::from_database(&db)
    }
}
