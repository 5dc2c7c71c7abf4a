use std::fs;

use xmlreg::*;

const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<fragment hive="hklm" key="\Software\Vendor\" redirection="32">
	<value name="" type="string">default text</value>
	<key name="Settings">
		<value name="Count" type="dword">7</value>
		<value name="Paths" type="multi-string">
			<li>C:\one</li>
			<note>ignored</note>
			<li>C:\two &amp; three</li>
		</value>
		<key name="Empty"/>
	</key>
	<comment/>
</fragment>
"#;

#[test]
fn reads_root_attributes_and_tree() {
    let fragment = Fragment::load_from_text(SAMPLE).unwrap();
    assert_eq!(fragment.hive, Some(Hive::LocalMachine));
    assert_eq!(fragment.redirection, Redirection::Wow32);
    assert_eq!(
        fragment.target(),
        (HiveView::new(Hive::LocalMachine, Redirection::Wow32), "Software\\Vendor".to_string())
    );

    assert_eq!(fragment.children.len(), 3);
    let FragmentNode::Value(default) = &fragment.children[0] else {
        panic!("expected value");
    };
    assert_eq!(default.name, "");
    assert_eq!(default.text, "default text");

    let FragmentNode::Key(settings) = &fragment.children[1] else {
        panic!("expected key");
    };
    assert_eq!(settings.name, "Settings");
    let FragmentNode::Value(paths) = &settings.children[1] else {
        panic!("expected value");
    };
    assert_eq!(paths.items, vec!["C:\\one".to_string(), "C:\\two & three".to_string()]);
    assert_eq!(paths.ignored_children, vec!["note".to_string()]);
    assert_eq!(settings.children[2], FragmentNode::Key(KeyElement::new("Empty")));

    assert_eq!(fragment.children[2], FragmentNode::Unknown("comment".into()));
}

#[test]
fn wrong_root_is_a_schema_error() {
    let err = Fragment::load_from_text(r#"<registry hive="HKCU" key="x"/>"#).unwrap_err();
    assert!(matches!(err, FragmentError::Schema(ref found) if found == "registry"));
}

#[test]
fn malformed_xml_is_a_parse_error() {
    let err = Fragment::load_from_text("<fragment hive=\"HKCU\"><key name=\"a\"></fragment>").unwrap_err();
    assert!(matches!(err, FragmentError::Parse(_)));
}

#[test]
fn load_fragment_maps_onto_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("schema.xml");
    fs::write(&schema, "<other/>").unwrap();
    assert_eq!(load_fragment(&schema).unwrap_err().exit_code(), 21);

    let broken = dir.path().join("broken.xml");
    fs::write(&broken, "<fragment").unwrap();
    assert_eq!(load_fragment(&broken).unwrap_err().exit_code(), 20);

    let missing = dir.path().join("missing.xml");
    assert_eq!(load_fragment(&missing).unwrap_err().exit_code(), 20);
}

#[test]
fn missing_or_unknown_hive_defaults_to_current_user() {
    let fragment = Fragment::load_from_text(r#"<fragment key="Software"/>"#).unwrap();
    assert_eq!(fragment.hive, None);
    assert_eq!(fragment.target().0.hive, Hive::CurrentUser);

    let fragment = Fragment::load_from_text(r#"<fragment hive="HKXX" key="Software"/>"#).unwrap();
    assert_eq!(fragment.hive, None);
    assert_eq!(fragment.redirection, Redirection::None);
}

#[test]
fn written_document_reads_back_identically() {
    let mut fragment = Fragment::new(Hive::Users, "S-1-5\\Software", Redirection::Wow64);
    let mut value = ValueElement::new("Greeting", "string");
    value.text = "<hello> & \"bye\"".into();
    let mut list = ValueElement::new("List", "multi-string");
    list.items = vec!["x".into(), "y".into()];
    let mut key = KeyElement::new("Child");
    key.children.push(FragmentNode::Value(list));
    key.children.push(FragmentNode::Value(ValueElement::new("Nothing", "multi-string")));
    fragment.children.push(FragmentNode::Value(value));
    fragment.children.push(FragmentNode::Key(key));

    let text = fragment.write_to_string().unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(text.contains("<fragment hive=\"HKU\" key=\"S-1-5\\Software\" redirection=\"64\">"));
    assert!(text.contains("<li>x</li>"));

    let reread = Fragment::load_from_text(&text).unwrap();
    assert_eq!(reread, fragment);
}

#[test]
fn placeholder_keeps_only_the_root() {
    let mut fragment = Fragment::new(Hive::CurrentUser, "Software\\App", Redirection::None);
    fragment.children.push(FragmentNode::Key(KeyElement::new("Sub")));

    let text = fragment.placeholder().write_to_string().unwrap();
    assert!(text.contains("<fragment hive=\"HKCU\" key=\"Software\\App\"/>"));
    assert!(!text.contains("redirection"));
}

#[test]
fn write_to_file_replaces_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xml");
    fs::write(&path, "stale").unwrap();

    let fragment = Fragment::new(Hive::ClassesRoot, ".txt", Redirection::None);
    fragment.write_to_file(&path).unwrap();

    let reread = Fragment::load_from_file(&path).unwrap();
    assert_eq!(reread, fragment);
    assert!(!dir.path().join("out.xml.tmp").exists());
}
