use cinelog_core::{active_logging, init_logging, load_config};

#[test]
fn relative_config_path_starts_logging_next_to_config() {
    let cwd = std::env::current_dir().unwrap();
    let dir = tempfile::Builder::new()
        .prefix("cinelog-cli-config-")
        .tempdir_in(&cwd)
        .unwrap();
    let relative_dir = dir.path().strip_prefix(&cwd).unwrap().to_path_buf();
    std::fs::write(
        dir.path().join("cinelog.toml"),
        r#"
        database_path = "cinelog.db"
        data_dir = "documents"

        [logging]
        level = "info"
        log_dir = "logs"
        "#,
    )
    .unwrap();

    let config = load_config(relative_dir.join("cinelog.toml")).unwrap();
    let logging = config.logging.unwrap();
    init_logging(&logging).unwrap();

    let (_, active_dir) = active_logging().unwrap();
    assert_eq!(active_dir, dir.path().join("logs"));
    assert!(active_dir.is_dir());
}
