use std::fs;
use std::path::{Path, PathBuf};

use xmlreg::*;

fn hkcu() -> HiveView {
    HiveView::new(Hive::CurrentUser, Redirection::None)
}

fn write_fragment(dir: &Path, key: &str, body: &str) -> PathBuf {
    let file = dir.join("wipe.xml");
    fs::write(
        &file,
        format!("<fragment hive=\"HKCU\" key=\"{}\">{}</fragment>", key, body),
    )
    .unwrap();
    file
}

const APP_FRAGMENT: &str = r#"
    <value name="Name" type="string">demo</value>
    <key name="Settings">
        <value name="Level" type="dword">1</value>
    </key>"#;

#[test]
fn fully_described_tree_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", APP_FRAGMENT);
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |k| {
            k.value("Name", "demo");
            k.key("Settings", |s| s.dword("Level", 1));
        });
    });

    let report = wipe(&mut store, &file, RunOptions::default()).unwrap();

    assert!(!store.key_exists(hkcu(), "Software\\App"));
    assert!(store.key_exists(hkcu(), "Software"));
    assert!(report.kept_keys.is_empty());
    // Two values and two keys.
    assert_eq!(report.applied_count(), 4);
}

#[test]
fn undeclared_content_keeps_the_key_and_its_ancestors() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", APP_FRAGMENT);
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |k| {
            k.value("Name", "demo");
            k.key("Settings", |s| {
                s.dword("Level", 1);
                s.value("UserChoice", "keep");
            });
        });
    });

    let report = wipe(&mut store, &file, RunOptions::default()).unwrap();

    assert!(!store.value_exists(hkcu(), "Software\\App", "Name"));
    assert!(!store.value_exists(hkcu(), "Software\\App\\Settings", "Level"));
    assert!(store.value_exists(hkcu(), "Software\\App\\Settings", "UserChoice"));
    assert_eq!(
        report.kept_keys,
        vec!["Software\\App\\Settings".to_string(), "Software\\App".to_string()]
    );
}

#[test]
fn undeclared_subkey_blocks_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", APP_FRAGMENT);
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |k| {
            k.value("Name", "demo");
            k.key("Settings", |s| s.dword("Level", 1));
            k.key("Plugins", |_| {});
        });
    });

    wipe(&mut store, &file, RunOptions::default()).unwrap();

    assert!(!store.key_exists(hkcu(), "Software\\App\\Settings"));
    assert!(store.key_exists(hkcu(), "Software\\App\\Plugins"));
}

#[test]
fn empty_default_value_does_not_block_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", "");
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |k| k.value("", ""));
    });

    wipe(&mut store, &file, RunOptions::default()).unwrap();
    assert!(!store.key_exists(hkcu(), "Software\\App"));
}

#[test]
fn non_empty_default_value_blocks_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", "");
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |k| k.dword("", 0));
    });

    let report = wipe(&mut store, &file, RunOptions::default()).unwrap();
    assert!(store.key_exists(hkcu(), "Software\\App"));
    assert_eq!(report.kept_keys, vec!["Software\\App".to_string()]);
}

#[test]
fn missing_root_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\Gone", APP_FRAGMENT);
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\Other", |k| k.value("A", "b"));
    });
    let before = store.mutation_count();

    let report = wipe(&mut store, &file, RunOptions::default()).unwrap();
    assert_eq!(report.applied_count(), 0);
    assert_eq!(store.mutation_count(), before);
}

#[test]
fn missing_declared_items_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", APP_FRAGMENT);
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |k| k.value("Name", "demo"));
    });

    let report = wipe(&mut store, &file, RunOptions::default()).unwrap();
    assert!(report.is_clean());
    assert!(!store.key_exists(hkcu(), "Software\\App"));
}

#[test]
fn delete_failure_aborts_unless_skipping() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", APP_FRAGMENT);
    let build = || {
        let mut store = registry(|r| {
            r.key(hkcu(), "Software\\App", |k| {
                k.value("Name", "demo");
                k.key("Settings", |s| s.dword("Level", 1));
            });
        });
        store.deny_key_delete(hkcu(), "Software\\App\\Settings");
        store
    };

    let mut strict = build();
    let err = wipe(&mut strict, &file, RunOptions::default()).unwrap_err();
    assert!(matches!(err, XmlRegError::DeleteKeyFailed { .. }));
    assert_eq!(err.exit_code(), 50);

    let mut lenient = build();
    let report = wipe(&mut lenient, &file, RunOptions::default().with_skip_errors(true)).unwrap();
    assert_eq!(report.skipped_count(), 1);
    assert!(lenient.key_exists(hkcu(), "Software\\App\\Settings"));
    // The surviving child keeps its parent alive.
    assert_eq!(report.kept_keys, vec!["Software\\App".to_string()]);
}

#[test]
fn hive_root_is_emptied_but_never_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "", r#"<key name="Software"><key name="App"/></key>"#);
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |_| {});
    });

    wipe(&mut store, &file, RunOptions::default()).unwrap();
    assert!(!store.key_exists(hkcu(), "Software"));
    assert!(store.key_exists(hkcu(), ""));
    assert_eq!(store.delete_key(hkcu(), "").unwrap_err().to_string(), "cannot delete hive root");
}

#[test]
fn other_views_are_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", APP_FRAGMENT);
    let wow64 = HiveView::new(Hive::CurrentUser, Redirection::Wow64);
    let mut store = registry(|r| {
        r.key(wow64, "Software\\App", |k| k.value("Name", "demo"));
    });

    wipe(&mut store, &file, RunOptions::default()).unwrap();
    assert!(store.value_exists(wow64, "Software\\App", "Name"));
}

#[test]
fn unreadable_default_value_does_not_block_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_fragment(dir.path(), "Software\\App", "");
    let mut store = registry(|r| {
        r.key(hkcu(), "Software\\App", |k| k.value("", "locked"));
    });
    store.deny_value_read(hkcu(), "Software\\App", "");

    let report = wipe(&mut store, &file, RunOptions::default()).unwrap();
    assert!(!store.key_exists(hkcu(), "Software\\App"));
    assert!(report.kept_keys.is_empty());
}
