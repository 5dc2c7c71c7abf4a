use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, XmlRegError};
use crate::fragment::{load_fragment, Fragment, FragmentNode};
use crate::hive::HiveView;
use crate::options::RunOptions;
use crate::registry_store::{RegistryStore, StoreError};
use crate::registry_utils::join_path;
use crate::report::OperationReport;

pub fn wipe<S>(store: &mut S, file: &Path, options: RunOptions) -> Result<OperationReport>
where
    S: RegistryStore + ?Sized,
{
    info!("wiping from registry items defined in file {}", file.display());
    let fragment = load_fragment(file)?;
    wipe_fragment(store, &fragment, options)
}

/// Deletes what `fragment` declares. A key goes only once nothing undeclared is left in it.
pub fn wipe_fragment<S>(store: &mut S, fragment: &Fragment, options: RunOptions) -> Result<OperationReport>
where
    S: RegistryStore + ?Sized,
{
    let (view, root) = fragment.target();
    info!("from {}", view.display_path(&root));

    let mut reaper = TreeReaper {
        store,
        view,
        options,
        report: OperationReport::default(),
    };
    if !reaper.store.key_exists(view, &root) {
        info!("nothing to wipe, {} does not exist", view.display_path(&root));
        return Ok(reaper.report);
    }
    reaper.wipe_node(&root, &fragment.children)?;
    info!(
        "deleted {} items, {} skipped, {} keys kept",
        reaper.report.applied_count(),
        reaper.report.skipped_count(),
        reaper.report.kept_keys.len()
    );
    Ok(reaper.report)
}

struct TreeReaper<'a, S: RegistryStore + ?Sized> {
    store: &'a mut S,
    view: HiveView,
    options: RunOptions,
    report: OperationReport,
}

impl<S: RegistryStore + ?Sized> TreeReaper<'_, S> {
    fn wipe_node(&mut self, path: &str, nodes: &[FragmentNode]) -> Result<()> {
        if !self.store.key_exists(self.view, path) {
            return Ok(());
        }

        for node in nodes {
            match node {
                FragmentNode::Value(element) => {
                    let deleted = self.delete_value(path, &element.name);
                    self.report.settle(self.options, deleted)?;
                }
                FragmentNode::Key(key) => {
                    if key.name.is_empty() {
                        warn!("ignoring key element without a name at {}", self.view.display_path(path));
                        continue;
                    }
                    self.wipe_node(&join_path(path, &key.name), &key.children)?;
                }
                FragmentNode::Unknown(name) => warn!("ignoring unknown element {}", name),
            }
        }

        let emptied = self.holds_no_content(path).map_err(|source| XmlRegError::QueryFailed {
            key: self.view.display_path(path).to_string(),
            source,
        });
        match emptied {
            Ok(true) => {
                let deleted = self.delete_key(path);
                self.report.settle(self.options, deleted)
            }
            Ok(false) => {
                warn!(
                    "will not delete key {} because it has contents that are not defined in xml",
                    self.view.display_path(path)
                );
                self.report.kept_keys.push(path.to_string());
                Ok(())
            }
            Err(err) => self.report.settle(self.options, Err(err)),
        }
    }

    fn delete_value(&mut self, path: &str, name: &str) -> Result<()> {
        match self.store.delete_value(self.view, path, name) {
            Ok(true) => {
                self.report.record();
                Ok(())
            }
            Ok(false) => {
                debug!("value '{}' already absent at {}", name, self.view.display_path(path));
                Ok(())
            }
            Err(source) => Err(XmlRegError::DeletePropertyFailed {
                key: self.view.display_path(path).to_string(),
                name: name.to_string(),
                source,
            }),
        }
    }

    fn delete_key(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            debug!("keeping hive root {}", self.view.display_path(path));
            return Ok(());
        }
        self.store
            .delete_key(self.view, path)
            .map_err(|source| XmlRegError::DeleteKeyFailed {
                key: self.view.display_path(path).to_string(),
                source,
            })?;
        self.report.record();
        Ok(())
    }

    // No values left, or only an unnamed one with an empty payload, and no subkeys.
    fn holds_no_content(&self, path: &str) -> std::result::Result<bool, StoreError> {
        let names = self.store.value_names(self.view, path)?;
        let values_gone = match names.as_slice() {
            [] => true,
            [only] if only.is_empty() => match self.store.get_value(self.view, path, "") {
                Ok(value) => value.is_none_or(|value| value.is_empty_payload()),
                // An unreadable default value does not count as content.
                Err(err) => {
                    debug!("default value at {} unreadable: {}", self.view.display_path(path), err);
                    true
                }
            },
            _ => false,
        };
        Ok(values_gone && self.store.subkey_names(self.view, path)?.is_empty())
    }
}
