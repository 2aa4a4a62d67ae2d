//! Location identity and on-disk layout (spec §3.1, §6.3).

use std::fs;
use std::path::{Path, PathBuf};

use crate::ids::hash_str_32;

/// Run mode, maps to a directory name under the output root (spec §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Live,
    Data,
    Replay,
    Backtest,
}

impl Mode {
    pub fn dir_name(self) -> &'static str {
        match self {
            Mode::Live => "runtime",
            Mode::Data => "dataset",
            Mode::Replay => "replay",
            Mode::Backtest => "backtest",
        }
    }
}

/// Engine role a location belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Module {
    Md,
    Td,
    Strategy,
    System,
}

impl Module {
    pub fn dir_name(self) -> &'static str {
        match self {
            Module::Md => "md",
            Module::Td => "td",
            Module::Strategy => "strategy",
            Module::System => "system",
        }
    }
}

/// A logical producer/consumer role: `(mode, module, group, name)`. Its `uid` is a
/// stable hash of those fields (spec §3.1) and doubles as the frame `source` id for
/// anything this location writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub mode: Mode,
    pub module: Module,
    pub group: String,
    pub name: String,
    pub uid: u32,
}

impl Location {
    pub fn new(mode: Mode, module: Module, group: impl Into<String>, name: impl Into<String>) -> Self {
        let group = group.into();
        let name = name.into();
        let uname = format!("{}/{}/{}/{}", module.dir_name(), group, name, mode.dir_name());
        let uid = hash_str_32(&uname);
        Self {
            mode,
            module,
            group,
            name,
            uid,
        }
    }
}

/// Resolves a `Location` + destination id into filesystem paths for journal pages
/// (spec §6.3): `<root>/<mode-name>/<module>/<group>/<name>/journal/<mode-name>/`,
/// files named `<dest:08x>.<page_id>.journal`.
#[derive(Debug, Clone)]
pub struct Locator {
    root: PathBuf,
}

impl Locator {
    pub fn new(output_root_path: impl Into<PathBuf>) -> Self {
        Self {
            root: output_root_path.into(),
        }
    }

    pub fn journal_dir(&self, location: &Location) -> PathBuf {
        let dir = self
            .root
            .join(location.mode.dir_name())
            .join(location.module.dir_name())
            .join(&location.group)
            .join(&location.name)
            .join("journal")
            .join(location.mode.dir_name());
        dir
    }

    /// Ensures the journal directory exists, creating it (and parents) if needed.
    pub fn ensure_journal_dir(&self, location: &Location) -> std::io::Result<PathBuf> {
        let dir = self.journal_dir(location);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn page_path(&self, location: &Location, dest_id: u32, page_id: u32) -> PathBuf {
        self.journal_dir(location).join(format!("{dest_id:08x}.{page_id}.journal"))
    }

    /// Lists the page ids already present on disk for `(location, dest_id)`, sorted
    /// ascending. Empty if the journal directory doesn't exist yet.
    pub fn list_page_ids(&self, location: &Location, dest_id: u32) -> Vec<u32> {
        let dir = self.journal_dir(location);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let prefix = format!("{dest_id:08x}.");
        let mut ids: Vec<u32> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name();
                let name = name.to_str()?;
                let rest = name.strip_prefix(&prefix)?;
                let page_str = rest.strip_suffix(".journal")?;
                page_str.parse::<u32>().ok()
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Supplemented feature (SPEC_FULL §6, grounded on `JLocator::list_location_dest`):
    /// enumerate every destination id with at least one page file under `location`,
    /// without prior knowledge of the config.
    pub fn list_destinations(&self, location: &Location) -> Vec<u32> {
        let dir = self.journal_dir(location);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut dests: Vec<u32> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name();
                let name = name.to_str()?.to_string();
                let dest_str = name.split('.').next()?;
                u32::from_str_radix(dest_str, 16).ok()
            })
            .collect();
        dests.sort_unstable();
        dests.dedup();
        dests
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_is_stable_across_equal_locations() {
        let a = Location::new(Mode::Live, Module::Md, "binance", "spot");
        let b = Location::new(Mode::Live, Module::Md, "binance", "spot");
        assert_eq!(a.uid, b.uid);
    }

    #[test]
    fn uid_differs_on_any_field_change() {
        let a = Location::new(Mode::Live, Module::Md, "binance", "spot");
        let b = Location::new(Mode::Live, Module::Md, "binance", "futures");
        assert_ne!(a.uid, b.uid);
    }

    #[test]
    fn page_path_matches_dest_and_page_id() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = Locator::new(tmp.path());
        let loc = Location::new(Mode::Backtest, Module::Td, "sim", "acct1");
        let path = locator.page_path(&loc, 0xdead_beef, 3);
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "deadbeef.3.journal");
    }

    #[test]
    fn list_page_ids_returns_sorted_existing_pages() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = Locator::new(tmp.path());
        let loc = Location::new(Mode::Backtest, Module::Td, "sim", "acct1");
        let dir = locator.ensure_journal_dir(&loc).unwrap();
        for id in [3u32, 1, 2] {
            fs::write(dir.join(format!("{:08x}.{}.journal", 7, id)), []).unwrap();
        }
        assert_eq!(locator.list_page_ids(&loc, 7), vec![1, 2, 3]);
    }
}
