use std::borrow::Cow;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, XmlRegError};
use crate::fragment::{load_fragment, Fragment, FragmentNode, ValueElement};
use crate::hive::HiveView;
use crate::options::RunOptions;
use crate::prompt::Confirm;
use crate::registry_store::RegistryStore;
use crate::registry_utils::join_path;
use crate::registry_value::REG_MULTI_SZ;
use crate::replacement::ReplacementEngine;
use crate::report::OperationReport;
use crate::value_codec::{self, parse_type_tag};

pub fn import<S, C>(
    store: &mut S,
    file: &Path,
    rules: &ReplacementEngine,
    options: RunOptions,
    confirm: &mut C,
) -> Result<OperationReport>
where
    S: RegistryStore + ?Sized,
    C: Confirm + ?Sized,
{
    info!("importing from file {}", file.display());
    let fragment = load_fragment(file)?;
    import_fragment(store, &fragment, rules, options, confirm)
}

/// Merges an already parsed fragment into the store.
pub fn import_fragment<S, C>(
    store: &mut S,
    fragment: &Fragment,
    rules: &ReplacementEngine,
    options: RunOptions,
    confirm: &mut C,
) -> Result<OperationReport>
where
    S: RegistryStore + ?Sized,
    C: Confirm + ?Sized,
{
    let (view, root) = fragment.target();
    info!("to {}", view.display_path(&root));

    if store.key_exists(view, &root) {
        warn!("target key already exists, trees will be merged and some values might be overwritten");
        if !options.unattended && !confirm.confirm("continue?") {
            return Err(XmlRegError::UserDeclinedMerge {
                key: view.display_path(&root).to_string(),
            });
        }
    }

    let mut merger = TreeMerger {
        store,
        view,
        rules,
        options,
        report: OperationReport::default(),
    };
    merger.merge_children(&root, &fragment.children)?;
    info!(
        "imported {} items, {} skipped",
        merger.report.applied_count(),
        merger.report.skipped_count()
    );
    Ok(merger.report)
}

struct TreeMerger<'a, S: RegistryStore + ?Sized> {
    store: &'a mut S,
    view: HiveView,
    rules: &'a ReplacementEngine,
    options: RunOptions,
    report: OperationReport,
}

impl<S: RegistryStore + ?Sized> TreeMerger<'_, S> {
    fn merge_children(&mut self, path: &str, nodes: &[FragmentNode]) -> Result<()> {
        for node in nodes {
            match node {
                FragmentNode::Value(element) => {
                    let written = self.write_value(path, element);
                    self.report.settle(self.options, written)?;
                }
                FragmentNode::Key(key) => {
                    if key.name.is_empty() {
                        warn!("ignoring key element without a name at {}", self.view.display_path(path));
                        continue;
                    }
                    let child = join_path(path, &key.name);
                    match self.create_key(&child) {
                        Ok(()) => self.merge_children(&child, &key.children)?,
                        Err(err) => self.report.settle(self.options, Err(err))?,
                    }
                }
                FragmentNode::Unknown(name) => warn!("ignoring unknown element {}", name),
            }
        }
        Ok(())
    }

    fn create_key(&mut self, path: &str) -> Result<()> {
        self.store
            .create_key(self.view, path)
            .map_err(|source| XmlRegError::CreateKeyFailed {
                key: self.view.display_path(path).to_string(),
                source,
            })?;
        self.report.record();
        Ok(())
    }

    fn write_value(&mut self, path: &str, element: &ValueElement) -> Result<()> {
        for ignored in &element.ignored_children {
            warn!(
                "ignoring unrecognized child element ({}) of multi-string {} at {}",
                ignored,
                element.name,
                self.view.display_path(path)
            );
        }
        if parse_type_tag(&element.type_tag).is_none() {
            warn!(
                "unknown type '{}' for value {}, writing it as none at {}",
                element.type_tag,
                element.name,
                self.view.display_path(path)
            );
        }

        let element = self.substitute(element);
        let value = value_codec::decode(&element).map_err(|err| XmlRegError::SetPropertyFailed {
            key: self.view.display_path(path).to_string(),
            name: element.name.clone(),
            reason: err.to_string(),
        })?;

        if self.store.value_exists(self.view, path, &value.name) {
            if value.reg_type() == REG_MULTI_SZ {
                warn!(
                    "replacing existing value {} with multi-string at {}",
                    value.name,
                    self.view.display_path(path)
                );
            } else {
                warn!(
                    "replacing existing value {} with {} at {}",
                    value.name,
                    value,
                    self.view.display_path(path)
                );
            }
        } else if !self.store.key_exists(self.view, path) {
            self.create_key(path)?;
        }

        self.store
            .set_value(self.view, path, &value)
            .map_err(|source| XmlRegError::SetPropertyFailed {
                key: self.view.display_path(path).to_string(),
                name: value.name.clone(),
                reason: source.to_string(),
            })?;
        debug!("wrote {} = {} at {}", value.name, value, self.view.display_path(path));
        self.report.record();
        Ok(())
    }

    // Rules reach every textual payload, list items included.
    fn substitute<'e>(&self, element: &'e ValueElement) -> Cow<'e, ValueElement> {
        if self.rules.is_empty() {
            return Cow::Borrowed(element);
        }
        let mut substituted = element.clone();
        substituted.text = self.rules.apply(&element.text);
        substituted.items = element.items.iter().map(|item| self.rules.apply(item)).collect();
        Cow::Owned(substituted)
    }
}
