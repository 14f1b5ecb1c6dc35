use super::*;

fn no_resources() -> ResourceDirs {
    ResourceDirs::default()
}

#[test]
fn test_script_resolves_to_itself() {
    let source = TaskSource::Script("SELECT 1; SELECT 2".to_string());
    assert_eq!(
        source.resolve(None, &no_resources()).unwrap(),
        "SELECT 1; SELECT 2"
    );
}

#[test]
fn test_file_relative_to_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("create.sql"), "CREATE TABLE a (id INT)").unwrap();

    let source = TaskSource::File("create.sql".to_string());
    let text = source.resolve(Some(dir.path()), &no_resources()).unwrap();
    assert_eq!(text, "CREATE TABLE a (id INT)");
}

#[test]
fn test_absolute_file_ignores_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abs.sql");
    std::fs::write(&path, "SELECT 42").unwrap();

    let other = tempfile::tempdir().unwrap();
    let source = TaskSource::File(path.display().to_string());
    assert_eq!(
        source.resolve(Some(other.path()), &no_resources()).unwrap(),
        "SELECT 42"
    );
}

#[test]
fn test_missing_file_is_file_not_found() {
    let source = TaskSource::File("does/not/exist.sql".to_string());
    let err = source.resolve(None, &no_resources()).unwrap_err();
    assert!(matches!(err, CoreError::FileNotFound { .. }));
}

#[test]
fn test_classpath_reference_uses_resource_dirs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sql")).unwrap();
    std::fs::write(dir.path().join("sql/seed.sql"), "INSERT INTO a VALUES (1)").unwrap();

    let resources = ResourceDirs::new([dir.path()]);
    let source = TaskSource::File("classpath:sql/seed.sql".to_string());
    assert_eq!(
        source.resolve(None, &resources).unwrap(),
        "INSERT INTO a VALUES (1)"
    );
}

#[test]
fn test_classpath_prefix_is_case_insensitive() {
    let mut resources = HashMap::new();
    resources.insert("seed.sql".to_string(), "SELECT 1".to_string());

    for reference in ["classpath:seed.sql", "CLASSPATH:seed.sql", "Classpath:/seed.sql"] {
        let source = TaskSource::File(reference.to_string());
        assert_eq!(source.resolve(None, &resources).unwrap(), "SELECT 1");
    }
}

#[test]
fn test_resource_dirs_search_in_order() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    std::fs::write(second.path().join("x.sql"), "SELECT 'second'").unwrap();

    let resources = ResourceDirs::new([first.path(), second.path()]);
    assert_eq!(
        resources.load("x.sql").unwrap().as_deref(),
        Some("SELECT 'second'")
    );

    std::fs::write(first.path().join("x.sql"), "SELECT 'first'").unwrap();
    assert_eq!(
        resources.load("x.sql").unwrap().as_deref(),
        Some("SELECT 'first'")
    );
}

#[test]
fn test_missing_resource_is_resource_not_found() {
    let source = TaskSource::File("classpath:nowhere.sql".to_string());
    let err = source.resolve(None, &no_resources()).unwrap_err();
    match err {
        CoreError::ResourceNotFound { path } => assert_eq!(path, "classpath:nowhere.sql"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_classpath_does_not_fall_back_to_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("local.sql"), "SELECT 1").unwrap();

    let source = TaskSource::File("classpath:local.sql".to_string());
    assert!(source.resolve(Some(dir.path()), &no_resources()).is_err());
}

#[derive(rust_embed::RustEmbed)]
#[folder = "tests/resources/"]
struct Bundled;

#[test]
fn test_embedded_resources() {
    let resources = EmbeddedResources::<Bundled>::new();
    let source = TaskSource::File("classpath:bundled/create_users.sql".to_string());
    let text = source.resolve(None, &resources).unwrap();
    assert!(text.contains("CREATE TABLE users"));

    assert!(resources.load("bundled/missing.sql").unwrap().is_none());
}
