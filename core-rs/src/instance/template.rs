//! Template-seeded instances
//!
//! Copies a pre-initialized data-directory template into the working
//! directory before the wrapped server starts, standing in for the
//! engine's own (much slower) from-scratch initialization. Probably
//! don't want to do this for a production server.

use crate::errors::{FixtureError, Result};
use crate::fsops;
use crate::instance::ServerProcess;
use std::path::PathBuf;

/// Decorator that seeds the working directory from a template before
/// delegating `start` / `start_and_wait`. A template is either a
/// directory or a `.tar.gz` snapshot.
pub struct TemplateSeeded<P: ServerProcess> {
    delegate: P,
    workdir: PathBuf,
    template_root: PathBuf,
}

impl<P: ServerProcess> TemplateSeeded<P> {
    /// # Arguments
    ///
    /// * `delegate` - The server to start once seeding completed
    /// * `workdir` - The instance working directory
    /// * `template_root` - Pre-initialized data directory or archive
    pub fn new(delegate: P, workdir: PathBuf, template_root: PathBuf) -> Self {
        Self {
            delegate,
            workdir,
            template_root,
        }
    }

    pub fn delegate(&self) -> &P {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut P {
        &mut self.delegate
    }

    /// Seed the working directory. Fails before any subprocess is spawned
    /// when the template is absent, so this path never needs process
    /// cleanup.
    fn seed(&self) -> Result<()> {
        if !self.template_root.exists() {
            return Err(FixtureError::TemplateMissing(format!(
                "Unable to find template: {}",
                self.template_root.display()
            )));
        }

        if fsops::is_archive_template(&self.template_root) {
            fsops::unpack_archive(&self.template_root, &self.workdir)
        } else {
            fsops::copy_tree(&self.template_root, &self.workdir)
        }
    }
}

impl<P: ServerProcess> ServerProcess for TemplateSeeded<P> {
    fn start(&mut self) -> Result<()> {
        self.seed()?;
        self.delegate.start()
    }

    fn start_and_wait(&mut self) -> Result<()> {
        self.seed()?;
        self.delegate.start_and_wait()
    }

    fn send_client_commands(&mut self, commands: &[String]) -> Result<()> {
        self.delegate.send_client_commands(commands)
    }

    fn stop_and_cleanup(&mut self) -> Result<()> {
        self.delegate.stop_and_cleanup()
    }
}
