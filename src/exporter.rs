use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{Result, XmlRegError};
use crate::fragment::{Fragment, FragmentNode, KeyElement};
use crate::hive::HiveView;
use crate::options::RunOptions;
use crate::prompt::Confirm;
use crate::registry_store::RegistryStore;
use crate::registry_utils::{join_path, normalize_path};
use crate::report::OperationReport;
use crate::value_codec::{self, is_raw_type};

/// Source subtree, the labels written into the fragment root, and the target file.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source: HiveView,
    pub source_key: String,
    pub destination: HiveView,
    pub destination_key: String,
    pub file: PathBuf,
}

impl ExportRequest {
    /// Export whose fragment points back at the same location it was read from.
    pub fn same_location(view: HiveView, key: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        let key = key.into();
        Self {
            source: view,
            source_key: key.clone(),
            destination: view,
            destination_key: key,
            file: file.into(),
        }
    }
}

pub fn export<S, C>(
    store: &S,
    request: &ExportRequest,
    options: RunOptions,
    confirm: &mut C,
) -> Result<OperationReport>
where
    S: RegistryStore + ?Sized,
    C: Confirm + ?Sized,
{
    let source_key = normalize_path(&request.source_key);
    let file = &request.file;
    info!(
        "exporting {} to {}",
        request.source.display_path(&source_key),
        file.display()
    );

    if !store.key_exists(request.source, &source_key) {
        return Err(XmlRegError::NoSuchKey {
            key: request.source.display_path(&source_key).to_string(),
        });
    }

    if file.is_dir() {
        return Err(XmlRegError::TargetIsDirectory(file.clone()));
    }
    if file.exists() {
        if options.unattended {
            warn!("overwriting existing file {}", file.display());
        } else if !confirm.confirm("file already exists, overwrite?") {
            return Err(XmlRegError::UserDeclinedOverwrite(file.clone()));
        }
    }

    let mut fragment = Fragment::new(
        request.destination.hive,
        request.destination_key.as_str(),
        request.destination.redirection,
    );

    // Surfaces permission problems before the traversal does any work.
    fragment
        .placeholder()
        .write_to_file(file)
        .map_err(|err| XmlRegError::WriteFailed {
            file: file.clone(),
            message: err.to_string(),
        })?;

    let mut walker = TreeWalker {
        store,
        view: request.source,
        options,
        report: OperationReport::default(),
    };
    let walked = walker
        .convert_key(&source_key, &mut fragment.children)
        .and_then(|_| {
            fragment
                .write_to_file(file)
                .map_err(|err| XmlRegError::WriteFailed {
                    file: file.clone(),
                    message: err.to_string(),
                })
        });

    if let Err(err) = walked {
        if let Err(remove_err) = fs::remove_file(file) {
            warn!("failed to remove incomplete {}: {}", file.display(), remove_err);
        }
        return Err(err);
    }

    info!(
        "exported {} items, {} skipped",
        walker.report.applied_count(),
        walker.report.skipped_count()
    );
    Ok(walker.report)
}

struct TreeWalker<'a, S: RegistryStore + ?Sized> {
    store: &'a S,
    view: HiveView,
    options: RunOptions,
    report: OperationReport,
}

impl<S: RegistryStore + ?Sized> TreeWalker<'_, S> {
    fn convert_key(&mut self, path: &str, nodes: &mut Vec<FragmentNode>) -> Result<()> {
        // An unreadable key is skipped as a whole and exported empty.
        let Some(names) = self.query(path, |store, view| store.value_names(view, path))? else {
            return Ok(());
        };
        for name in names {
            self.convert_value(path, &name, nodes)?;
        }

        let subkeys = self
            .query(path, |store, view| store.subkey_names(view, path))?
            .unwrap_or_default();
        for subkey in subkeys {
            let mut element = KeyElement::new(subkey.as_str());
            self.convert_key(&join_path(path, &subkey), &mut element.children)?;
            nodes.push(FragmentNode::Key(element));
        }
        Ok(())
    }

    fn convert_value(&mut self, path: &str, name: &str, nodes: &mut Vec<FragmentNode>) -> Result<()> {
        let Some(value) = self.query(path, |store, view| store.get_value(view, path, name))? else {
            return Ok(());
        };
        let Some(value) = value else {
            warn!("value '{}' vanished during export at {}", name, self.view.display_path(path));
            return Ok(());
        };
        let element = value_codec::encode(&value);
        if is_raw_type(value.reg_type()) && value.reg_type() != crate::REG_BINARY {
            debug!(
                "value '{}' of type {} exported as raw bytes at {}",
                name,
                element.type_tag,
                self.view.display_path(path)
            );
        }
        nodes.push(FragmentNode::Value(element));
        self.report.record();
        Ok(())
    }

    // A read failure becomes `QueryFailed`; in skip-errors mode it is recorded and
    // `None` tells the caller to leave the item out.
    fn query<T, F>(&mut self, path: &str, read: F) -> Result<Option<T>>
    where
        F: FnOnce(&S, HiveView) -> std::result::Result<T, crate::registry_store::StoreError>,
    {
        match read(self.store, self.view) {
            Ok(found) => Ok(Some(found)),
            Err(source) => {
                let err = XmlRegError::QueryFailed {
                    key: self.view.display_path(path).to_string(),
                    source,
                };
                self.report.settle(self.options, Err(err))?;
                Ok(None)
            }
        }
    }
}
