use std::path::Path;

use xmlreg::*;

#[test]
fn rules_apply_in_order_and_chain() {
    let engine = ReplacementEngine::from_pairs([("A", "B"), ("B", "C")]).unwrap();
    assert_eq!(engine.apply("A-B-x"), "C-C-x");

    let reversed = ReplacementEngine::from_pairs([("B", "C"), ("A", "B")]).unwrap();
    assert_eq!(reversed.apply("A-B-x"), "B-C-x");
}

#[test]
fn captures_expand_in_replacements() {
    let engine = ReplacementEngine::from_pairs([(r"(\w+)@(\w+)", "$2 at ${1}")]).unwrap();
    assert_eq!(engine.apply("user@host"), "host at user");
}

#[test]
fn braced_captures_can_be_followed_by_letters() {
    let braced = ReplacementRule::new(r"v(\d+)", "${1}a").unwrap();
    assert_eq!(braced.apply("v2"), "2a");

    // `$1a` refers to a group named `1a`, which does not exist.
    let bare = ReplacementRule::new(r"v(\d+)", "$1a").unwrap();
    assert_eq!(bare.apply("v2"), "");
}

#[test]
fn every_match_is_replaced() {
    let engine = ReplacementEngine::from_pairs([(r"C:\\Old", r"D:\New")]).unwrap();
    assert_eq!(engine.apply(r"C:\Old\a;C:\Old\b"), r"D:\New\a;D:\New\b");
}

#[test]
fn invalid_patterns_fail_to_compile() {
    assert!(ReplacementRule::new("(unclosed", "x").is_err());
    assert!(ReplacementEngine::from_pairs([("ok", "x"), ("[", "y")]).is_err());
}

#[test]
fn literal_rules_do_not_expand_dollars() {
    let rule = ReplacementRule::literal("{dir}", "C:\\$1\\money$").unwrap();
    assert_eq!(rule.apply("at {dir}!"), "at C:\\$1\\money$!");
}

#[test]
fn reference_placeholders_follow_user_rules() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("tool.exe");
    std::fs::write(&reference, b"").unwrap();

    let paths = ReferencePaths::resolve(&reference);
    let engine = ReplacementEngine::from_pairs([("TOOL", "{file}")])
        .unwrap()
        .with_reference_path(&reference)
        .unwrap();
    assert_eq!(engine.rules().len(), 5);
    assert_eq!(engine.rules()[1].pattern(), regex::escape(DIR_PLACEHOLDER));

    let file = paths.file.to_string_lossy().into_owned();
    let parent = paths.dir.to_string_lossy().into_owned();
    assert_eq!(engine.apply("run TOOL"), format!("run {}", file));
    assert_eq!(engine.apply("cd {dir}"), format!("cd {}", parent));
    assert_eq!(engine.apply("{file}"), file);
}

#[test]
fn reference_paths_are_absolute() {
    let paths = ReferencePaths::resolve(Path::new("relative/name.txt"));
    assert!(paths.file.is_absolute());
    assert!(paths.file.ends_with("relative/name.txt"));
    assert!(paths.dir.ends_with("relative"));
    #[cfg(not(windows))]
    {
        assert_eq!(paths.short_file, paths.file);
        assert_eq!(paths.short_dir, paths.dir);
    }
}
