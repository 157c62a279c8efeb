//! End-to-end fixture lifecycle tests
//!
//! Drive the full stack against a stub install root: `mysqld` is a shell
//! script that keeps a liveness marker while it runs, `mysqladmin ping`
//! succeeds only while the marker exists, and `mysql` captures its stdin.
//! This exercises the real sequencing (spawn, poll, bootstrap, teardown)
//! without needing a MySQL distribution on the machine.

#![cfg(unix)]

use mysql_fixture::binary::{BinaryLayout, FixedRoot};
use mysql_fixture::config::InstanceConfig;
use mysql_fixture::fixture::MysqlFixture;
use mysql_fixture::instance::probe;
use mysql_fixture::FixtureError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

/// Build a stub install root. The mysqld stub holds `mysqld.alive` inside
/// the install root for its lifetime and drops it on SIGTERM, so the admin
/// stub behaves like a real liveness probe.
fn stub_install(root: &Path) {
    let bin = root.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let marker = root.join("mysqld.alive");

    let write = |name: &str, body: String| {
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    };

    write(
        "mysqld",
        format!(
            "touch {m}\ntrap 'kill $! 2>/dev/null; rm -f {m}; exit 0' TERM\nsleep 600 &\nwait $!",
            m = marker.display()
        ),
    );
    write("mysqladmin", format!("test -f {}", marker.display()));
    write("mysql", "cat >> ./captured.sql".to_string());

    fs::create_dir_all(root.join("template").join("data")).unwrap();
    fs::write(root.join("template/data/ibdata1"), "tablespace").unwrap();
}

fn fast_config() -> InstanceConfig {
    let mut config = InstanceConfig::default_fixture();
    config.startup_attempts = 50;
    config
}

fn fixture_for(root: &TempDir) -> MysqlFixture {
    MysqlFixture::with_loader(
        fast_config(),
        Box::new(FixedRoot::new(root.path().to_path_buf())),
    )
}

#[test]
fn test_set_up_makes_port_probeable() {
    let root = TempDir::new().unwrap();
    stub_install(root.path());
    let mut fixture = fixture_for(&root);

    fixture.set_up().unwrap();

    let port = fixture.port().unwrap();
    let layout = BinaryLayout::new(root.path().to_path_buf());
    assert!(probe::ping_server(&layout.admin(), port).unwrap());

    fixture.tear_down().unwrap();
}

#[test]
fn test_tear_down_removes_directory_and_stops_server() {
    let root = TempDir::new().unwrap();
    stub_install(root.path());
    let mut fixture = fixture_for(&root);

    fixture.set_up().unwrap();
    let port = fixture.port().unwrap();
    let workdir = fixture.workdir().unwrap().to_path_buf();
    assert!(workdir.exists());

    fixture.tear_down().unwrap();

    assert!(!workdir.exists());
    // The probe fails once the server is down
    let layout = BinaryLayout::new(root.path().to_path_buf());
    assert!(!probe::ping_server(&layout.admin(), port).unwrap());
}

#[test]
fn test_bootstrap_round_trip() {
    let root = TempDir::new().unwrap();
    stub_install(root.path());
    let mut fixture = fixture_for(&root);

    fixture.set_up().unwrap();

    let workdir = fixture.workdir().unwrap().to_path_buf();
    let captured = fs::read_to_string(workdir.join("captured.sql")).unwrap();
    let lines: Vec<&str> = captured.lines().collect();
    assert_eq!(
        lines,
        vec![
            "CREATE DATABASE service;",
            "CREATE USER 'test'@'localhost' IDENTIFIED BY 'test';",
            "GRANT ALL ON service.* TO 'test'@'localhost';",
        ]
    );

    // The connection string a generic client would use
    let url = fixture.db_url().unwrap();
    assert_eq!(
        url,
        format!(
            "mysql://localhost:{}/service?useSSL=false",
            fixture.port().unwrap()
        )
    );
    assert_eq!(fixture.db_user(), "test");
    assert_eq!(fixture.db_password(), "test");

    fixture.tear_down().unwrap();
}

#[test]
fn test_concurrent_fixtures_are_disjoint() {
    use std::thread;

    let handles: Vec<_> = (0..3)
        .map(|_| {
            thread::spawn(|| {
                let root = TempDir::new().unwrap();
                stub_install(root.path());
                let mut fixture = fixture_for(&root);

                fixture.set_up().unwrap();
                let port = fixture.port().unwrap();
                let workdir = fixture.workdir().unwrap().to_path_buf();
                fixture.tear_down().unwrap();

                (port, workdir)
            })
        })
        .collect();

    let results: Vec<(u16, std::path::PathBuf)> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    for i in 0..results.len() {
        for j in (i + 1)..results.len() {
            assert_ne!(results[i].0, results[j].0, "Ports collided");
            assert_ne!(results[i].1, results[j].1, "Working directories collided");
        }
    }
}

#[test]
fn test_missing_binary_creates_nothing() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("not-installed");
    let mut fixture = MysqlFixture::with_loader(fast_config(), Box::new(FixedRoot::new(missing)));

    let result = fixture.set_up();

    assert!(matches!(result, Err(FixtureError::BinaryNotFound(_))));
    assert_eq!(fixture.workdir(), None);
    assert_eq!(fixture.port(), None);
}

#[test]
fn test_missing_template_fails_before_spawn() {
    let root = TempDir::new().unwrap();
    stub_install(root.path());
    fs::remove_dir_all(root.path().join("template")).unwrap();
    let mut fixture = fixture_for(&root);

    let result = fixture.set_up();

    assert!(matches!(result, Err(FixtureError::TemplateMissing(_))));
    // No server was spawned, so the liveness marker never appeared
    assert!(!root.path().join("mysqld.alive").exists());
}

#[test]
fn test_startup_timeout_stops_spawned_server() {
    let root = TempDir::new().unwrap();
    stub_install(root.path());
    // Break the probe so readiness is never observed
    let admin = root.path().join("bin/mysqladmin");
    fs::write(&admin, "#!/bin/sh\nexit 1\n").unwrap();
    fs::set_permissions(&admin, fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = fast_config();
    config.startup_attempts = 3;
    let mut fixture = MysqlFixture::with_loader(
        config,
        Box::new(FixedRoot::new(root.path().to_path_buf())),
    );

    let result = fixture.set_up();

    assert!(matches!(result, Err(FixtureError::StartupTimeout(_))));
    // Teardown ran: the spawned server dropped its liveness marker
    assert!(!root.path().join("mysqld.alive").exists());
    assert_eq!(fixture.workdir(), None);
}

#[test]
fn test_debug_fixture_still_tears_down() {
    let root = TempDir::new().unwrap();
    stub_install(root.path());

    let mut config = InstanceConfig::debug();
    config.startup_attempts = 50;
    let mut fixture = MysqlFixture::with_loader(
        config,
        Box::new(FixedRoot::new(root.path().to_path_buf())),
    );

    fixture.set_up().unwrap();
    let workdir = fixture.workdir().unwrap().to_path_buf();
    fixture.tear_down().unwrap();
    assert!(!workdir.exists());
}
