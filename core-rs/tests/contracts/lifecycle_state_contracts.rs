//! Lifecycle state machine contracts
//!
//! The single-start / single-stop discipline of the server process, held
//! against stub binaries: no transition skips a state, `Stopped` is
//! terminal, and invalid transitions fail without side effects.

#![cfg(unix)]

use mysql_fixture::instance::{InstanceState, MysqldServer, ServerProcess, TemplateSeeded};
use mysql_fixture::{port, process_guard, FixtureError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

fn stub_install(root: &Path, admin_body: &str) {
    let bin = root.join("bin");
    fs::create_dir_all(&bin).unwrap();

    let write = |name: &str, body: &str| {
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    };

    write("mysqld", "exec sleep 600");
    write("mysqladmin", admin_body);
    write("mysql", "cat > /dev/null");
}

fn server(binroot: &TempDir, workdir: &TempDir, ready: bool) -> MysqldServer {
    stub_install(binroot.path(), if ready { "exit 0" } else { "exit 1" });
    MysqldServer::new(
        workdir.path().to_path_buf(),
        binroot.path().to_path_buf(),
        port::allocate().unwrap(),
        false,
    )
    .with_startup_attempts(3)
}

#[test]
fn contract_double_start_rejected_without_spawn() {
    let binroot = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let mut instance = server(&binroot, &workdir, true);

    instance.start().unwrap();
    let pid = instance.pid().unwrap();

    let result = instance.start();
    assert!(matches!(result, Err(FixtureError::InvalidState(_))));
    // The original child is untouched
    assert_eq!(instance.pid(), Some(pid));
    assert!(process_guard::is_process_running(pid));

    let p = instance.port();
    instance.stop_and_cleanup().unwrap();
    port::release(p);
}

#[test]
fn contract_stop_before_start_rejected() {
    let binroot = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let mut instance = server(&binroot, &workdir, true);

    let result = instance.stop_and_cleanup();
    assert!(matches!(result, Err(FixtureError::InvalidState(_))));
    // The working directory was not touched
    assert!(workdir.path().exists());
    port::release(instance.port());
}

#[test]
fn contract_stopped_is_terminal() {
    let binroot = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let mut instance = server(&binroot, &workdir, true);

    instance.start_and_wait().unwrap();
    let p = instance.port();
    instance.stop_and_cleanup().unwrap();
    assert_eq!(instance.state(), InstanceState::Stopped);

    // Every operation is now rejected
    assert!(matches!(
        instance.start(),
        Err(FixtureError::InvalidState(_))
    ));
    assert!(matches!(
        instance.send_client_commands(&["SELECT 1;".to_string()]),
        Err(FixtureError::InvalidState(_))
    ));
    assert!(matches!(
        instance.stop_and_cleanup(),
        Err(FixtureError::InvalidState(_))
    ));
    assert_eq!(instance.state(), InstanceState::Stopped);

    port::release(p);
}

#[test]
fn contract_failed_wait_supports_cleanup_from_starting() {
    let binroot = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let mut instance = server(&binroot, &workdir, false);

    let result = instance.start_and_wait();
    assert!(matches!(result, Err(FixtureError::StartupTimeout(_))));
    assert_eq!(instance.state(), InstanceState::Starting);

    let pid = instance.pid().unwrap();
    let p = instance.port();
    instance.stop_and_cleanup().unwrap();
    assert_eq!(instance.state(), InstanceState::Stopped);
    assert!(!process_guard::is_process_running(pid));
    assert!(!workdir.path().exists());
    port::release(p);
}

#[test]
fn contract_commands_require_running() {
    let binroot = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let mut instance = server(&binroot, &workdir, true);

    // NotStarted
    assert!(matches!(
        instance.send_client_commands(&["SELECT 1;".to_string()]),
        Err(FixtureError::InvalidState(_))
    ));

    // Starting (started but never waited)
    instance.start().unwrap();
    assert!(matches!(
        instance.send_client_commands(&["SELECT 1;".to_string()]),
        Err(FixtureError::InvalidState(_))
    ));

    let p = instance.port();
    instance.stop_and_cleanup().unwrap();
    port::release(p);
}

#[test]
fn contract_template_decorator_preserves_state_rules() {
    let binroot = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let template = TempDir::new().unwrap();
    fs::create_dir_all(template.path().join("data")).unwrap();
    fs::write(template.path().join("data/ibdata1"), "x").unwrap();

    let inner = server(&binroot, &workdir, true);
    let p = inner.port();
    let mut seeded = TemplateSeeded::new(
        inner,
        workdir.path().to_path_buf(),
        template.path().to_path_buf(),
    );

    seeded.start_and_wait().unwrap();
    assert_eq!(seeded.delegate().state(), InstanceState::Running);

    // Second start through the decorator hits the same invalid-state wall
    let result = seeded.start();
    assert!(matches!(result, Err(FixtureError::InvalidState(_))));

    seeded.stop_and_cleanup().unwrap();
    assert!(!workdir.path().exists());
    port::release(p);
}

#[test]
fn contract_missing_template_spawns_nothing() {
    let binroot = TempDir::new().unwrap();
    let workdir = TempDir::new().unwrap();
    let template = TempDir::new().unwrap();
    let missing = template.path().join("absent");

    let inner = server(&binroot, &workdir, true);
    let p = inner.port();
    let mut seeded = TemplateSeeded::new(inner, workdir.path().to_path_buf(), missing);

    let result = seeded.start_and_wait();
    assert!(matches!(result, Err(FixtureError::TemplateMissing(_))));
    assert_eq!(seeded.delegate().state(), InstanceState::NotStarted);
    assert_eq!(seeded.delegate().pid(), None);
    port::release(p);
}
