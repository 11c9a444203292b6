//! Open/closed state of a repository.
//!
//! The state is a single atomic flag. Transitions run under a mutex and
//! re-check the flag once the mutex is held, so concurrent `open` calls
//! invoke the backend-specific opening at most once.

use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct Lifecycle {
    open: AtomicBool,
    transition: Mutex<()>,
}

impl Lifecycle {
    /// A closed lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Open, running `opening` only if the state is not already open.
    ///
    /// The state flips to open only when `opening` succeeds.
    pub fn open<F>(&self, opening: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.is_open() {
            return Ok(());
        }
        let _guard = self
            .transition
            .lock()
            .map_err(|_| Error::poisoned("lifecycle transition"))?;
        if self.is_open() {
            return Ok(());
        }
        opening()?;
        self.open.store(true, Ordering::Release);
        debug!("Repository opened");
        Ok(())
    }

    /// Close, running `closing` only if the state is currently open.
    ///
    /// The state flips to closed when `closing` returns normally.
    pub fn close<F>(&self, closing: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if !self.is_open() {
            return Ok(());
        }
        let _guard = self
            .transition
            .lock()
            .map_err(|_| Error::poisoned("lifecycle transition"))?;
        if !self.is_open() {
            return Ok(());
        }
        closing()?;
        self.open.store(false, Ordering::Release);
        debug!("Repository closed");
        Ok(())
    }

    /// Ensure the state is open, opening through `opening` when `auto_open`
    /// is set and failing with a precondition error otherwise.
    pub fn check_open<F>(&self, auto_open: bool, opening: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.is_open() {
            return Ok(());
        }
        if auto_open {
            self.open(opening)
        } else {
            Err(Error::precondition("repository is not open"))
        }
    }
}
