//! End-to-end loading and querying of data directories on disk.

use std::{collections::HashSet, fs, path::Path, ptr};

use modulestore::{
    Config, CourseLoadError, ItemError, Location, StoreLoadError, XmlModuleStore, domain::clean,
};
use tempfile::TempDir;
use test_case::test_case;

/// (directory, course.xml)
type CourseFixture = (&'static str, &'static str);

const COURSES: &[CourseFixture] = &[
    (
        "circuits",
        r#"<course org="MITx" course="6002" name="Circuits and Electronics">
            <chapter name="Week 1">
                <sequential name="Lecture 1">
                    <html/>
                    <html/>
                    <video name="Ohm's law" youtube="1.0:abc"/>
                </sequential>
            </chapter>
            <chapter name="Week 1">
                <problem slug="homework_1"><p>What is <b>V</b>?</p></problem>
            </chapter>
            <chapter name="Week-2.b">
                <html>Some &amp; text</html>
            </chapter>
        </course>"#,
    ),
    (
        "cs50",
        r#"<course org="HarvardX" course="CS50" slug="cs50">
            <chapter name="Scratch">
                <html/>
            </chapter>
        </course>"#,
    ),
];

/// (location, expected display name)
const EXPECTED_NODES: &[(&str, &str)] = &[
    ("i4x://MITx/6002/course/Circuits_and_Electronics", "Circuits and Electronics"),
    ("i4x://MITx/6002/chapter/Week_1", "Week 1"),
    ("i4x://MITx/6002/sequential/Lecture_1", "Lecture 1"),
    ("i4x://MITx/6002/html/html_1", "html_1"),
    ("i4x://MITx/6002/html/html_2", "html_2"),
    ("i4x://MITx/6002/video/Ohm_s_law", "Ohm's law"),
    ("i4x://MITx/6002/problem/homework_1", "homework_1"),
    ("i4x://MITx/6002/chapter/Week-2.b", "Week-2.b"),
    ("i4x://HarvardX/CS50/course/cs50", "cs50"),
    ("i4x://HarvardX/CS50/chapter/Scratch", "Scratch"),
    ("i4x://HarvardX/CS50/html/html_1", "html_1"),
];

fn write_courses(root: &Path, courses: &[CourseFixture]) {
    for (dir, xml) in courses {
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(root.join(dir).join("course.xml"), xml).unwrap();
    }
}

fn data_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_courses(tmp.path(), COURSES);
    tmp
}

#[test]
fn every_expected_node_is_loaded() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    for (location, name) in EXPECTED_NODES {
        let node = store
            .get_item(*location)
            .unwrap_or_else(|e| panic!("{location}: {e}"));
        assert_eq!(node.display_name(), *name, "{location}");
        assert_eq!(node.location().to_string(), *location);
    }
}

#[test]
fn slugs_are_unique_within_each_course() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    let mut seen = HashSet::new();
    for location in store.index().locations() {
        assert!(
            seen.insert((location.org(), location.course(), location.slug())),
            "duplicate slug {location}"
        );
    }
    // the second "Week 1" chapter is disambiguated with the next counter value
    assert_eq!(
        store
            .index()
            .locations()
            .filter(|l| l.category() == "chapter" && l.course() == "6002")
            .count(),
        3
    );
}

#[test]
fn each_course_has_its_own_counter() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    assert!(store.get_item("i4x://MITx/6002/html/html_1").is_ok());
    assert!(store.get_item("i4x://HarvardX/CS50/html/html_1").is_ok());
}

#[test_case("Week 1"; "space")]
#[test_case("Ohm's law!!"; "punctuation")]
#[test_case("a   b"; "repeated separators")]
#[test_case("Week-2.b"; "kept characters")]
#[test_case("__x__"; "underscores")]
fn clean_is_idempotent(name: &str) {
    let once = clean(name);
    assert_eq!(clean(&once), once);
    assert!(!once.contains("__"));
}

#[test]
fn repeated_lookups_return_the_same_node() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    let location = Location::new("MITx", "6002", "html", "html_2", None).unwrap();
    let first = store.get_item(&location).unwrap();
    let second = store.get_item("i4x://MITx/6002/html/html_2").unwrap();
    assert!(ptr::eq(first, second));
}

#[test]
fn lookups_outside_the_index_fail() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    assert!(matches!(
        store.get_item("i4x://MITx/6002/html/html_9"),
        Err(ItemError::NotFound(_))
    ));
    assert!(matches!(
        store.get_item("i4x://MITx/6002/html"),
        Err(ItemError::InsufficientSpecification(_))
    ));
}

#[test]
fn raw_content_keeps_markup() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    let problem = store
        .get_item("i4x://MITx/6002/problem/homework_1")
        .unwrap();
    assert_eq!(problem.data(), Some("<p>What is <b>V</b>?</p>"));

    let video = store.get_item("i4x://MITx/6002/video/Ohm_s_law").unwrap();
    assert_eq!(video.get("youtube"), Some("1.0:abc"));
    assert_eq!(video.get("slug"), Some("Ohm_s_law"));
}

#[test]
fn children_are_linked_by_location() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    let children = store
        .get_children("i4x://MITx/6002/sequential/Lecture_1")
        .unwrap();
    let names: Vec<_> = children.iter().map(|c| c.display_name()).collect();
    assert_eq!(names, ["html_1", "html_2", "Ohm's law"]);
}

#[test]
fn store_is_read_only() {
    let tmp = data_dir();
    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();
    let location = Location::new("MITx", "6002", "html", "html_1", None).unwrap();

    let error = store.update_item(&location, "<html/>").unwrap_err();
    assert_eq!(
        error.to_string(),
        "unsupported operation update_item: store is read-only"
    );
    assert!(store.create_item(&location).is_err());
    assert!(store.update_children(&location, &[]).is_err());

    // nothing changed
    assert_eq!(store.get_item(&location).unwrap().data(), Some(""));
}

#[test]
fn malformed_course_aborts_the_load() {
    let tmp = data_dir();
    write_courses(
        tmp.path(),
        &[("broken", r#"<course org="MITx" course="broken"><chapter></course>"#)],
    );

    let error = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap_err();
    match error {
        StoreLoadError::Course { path, source } => {
            assert!(path.ends_with("broken"));
            assert!(matches!(source, CourseLoadError::Parse(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn pathologically_deep_course_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let depth = 5_000;
    let xml = format!(
        r#"<course org="MITx" course="deep">{}{}</course>"#,
        "<chapter>".repeat(depth),
        "</chapter>".repeat(depth)
    );
    fs::create_dir_all(tmp.path().join("deep")).unwrap();
    fs::write(tmp.path().join("deep/course.xml"), xml).unwrap();

    let error = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap_err();
    assert!(matches!(
        error,
        StoreLoadError::Course {
            source: CourseLoadError::Parse(_),
            ..
        }
    ));
}

#[test]
fn malformed_course_registers_nothing_when_skipped() {
    let tmp = data_dir();
    write_courses(
        tmp.path(),
        &[(
            "broken",
            r#"<course org="MITx" course="broken"><chapter name="ok"/><html></course>"#,
        )],
    );
    let mut config = Config::default();
    config.skip_invalid_courses = true;

    let store = XmlModuleStore::with_config(tmp.path().to_path_buf(), config)
        .load_all()
        .unwrap();

    assert_eq!(store.loaded_courses().len(), 2);
    assert!(store.index().locations().all(|l| l.course() != "broken"));
    assert!(store.get_item("i4x://MITx/broken/chapter/ok").is_err());
}

#[test]
fn eager_and_lazy_loads_agree() {
    let lazy_dir = data_dir();
    let eager_dir = data_dir();
    let lazy = XmlModuleStore::new(lazy_dir.path().to_path_buf())
        .load_all()
        .unwrap();
    let eager = XmlModuleStore::new(eager_dir.path().to_path_buf())
        .eager(true)
        .load_all()
        .unwrap();

    let mut locations: Vec<_> = eager.index().locations().cloned().collect();
    locations.sort();
    let mut lazy_locations: Vec<_> = lazy.index().locations().cloned().collect();
    lazy_locations.sort();
    assert_eq!(locations, lazy_locations);

    for location in &locations {
        assert_eq!(
            lazy.get_item(location).unwrap(),
            eager.get_item(location).unwrap()
        );
    }
}

#[test]
fn configuration_file_is_honoured() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("physics")).unwrap();
    fs::write(
        tmp.path().join("physics/root.xml"),
        r#"<course org="MITx" course="8.01"><mystery name="Dark matter"/></course>"#,
    )
    .unwrap();
    fs::write(
        tmp.path().join("modulestore.toml"),
        r#"_version = "1"
courses = ["MITx/8.01"]
course_file = "root.xml"
default_class = "raw"
"#,
    )
    .unwrap();

    let store = XmlModuleStore::new(tmp.path().to_path_buf())
        .load_all()
        .unwrap();

    assert_eq!(store.get_courses(), ["MITx/8.01"]);
    let mystery = store
        .get_item("i4x://MITx/8.01/mystery/Dark_matter")
        .unwrap();
    assert_eq!(mystery.class(), "raw");
}
