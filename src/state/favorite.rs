//! Favorite flag for a single ticker, with optimistic toggling.
//!
//! SYSTEM CONTEXT
//! ==============
//! The star button on a stock page shows `FavoriteState::is_favorite`. A
//! click flips the displayed value immediately, then the server is told and
//! asked again. Whatever the server answers becomes authoritative and the
//! optimistic value is dropped, so a failed toggle snaps back on its own.

#[cfg(test)]
#[path = "favorite_test.rs"]
mod favorite_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::net::error::ApiError;
use crate::net::favorites::FavoritesApi;

/// Value shown ahead of the server's answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Optimistic {
    #[default]
    Unset,
    Pending(bool),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FavoriteState {
    /// Last value the server confirmed; `false` until loaded.
    pub authoritative: bool,
    pub optimistic: Optimistic,
}

impl FavoriteState {
    pub fn is_favorite(&self) -> bool {
        match self.optimistic {
            Optimistic::Pending(value) => value,
            Optimistic::Unset => self.authoritative,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.optimistic != Optimistic::Unset
    }

    /// Flip the displayed value and return it.
    pub fn begin_toggle(&mut self) -> bool {
        let next = !self.is_favorite();
        self.optimistic = Optimistic::Pending(next);
        next
    }

    /// Take the server's answer; the optimistic value is always dropped,
    /// even when it already matched.
    pub fn settle(&mut self, authoritative: bool) {
        self.authoritative = authoritative;
        self.clear_optimistic();
    }

    pub fn clear_optimistic(&mut self) {
        self.optimistic = Optimistic::Unset;
    }
}

/// Favorite toggle for one ticker. Clones share state.
#[derive(Clone)]
pub struct FavoriteToggle {
    api: FavoritesApi,
    ticker: String,
    state: Rc<RefCell<FavoriteState>>,
    busy: Rc<Cell<bool>>,
}

impl FavoriteToggle {
    pub fn new(api: FavoritesApi, ticker: impl Into<String>) -> Self {
        Self {
            api,
            ticker: ticker.into(),
            state: Rc::new(RefCell::new(FavoriteState::default())),
            busy: Rc::new(Cell::new(false)),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn state(&self) -> FavoriteState {
        *self.state.borrow()
    }

    pub fn is_favorite(&self) -> bool {
        self.state.borrow().is_favorite()
    }

    /// Fetch the authoritative flag.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the check; state is left untouched.
    pub async fn load(&self) -> Result<bool, ApiError> {
        let value = self.api.check(&self.ticker).await?;
        self.state.borrow_mut().settle(value);
        Ok(value)
    }

    /// Flip the favorite. Ignored while a previous toggle is still running.
    ///
    /// # Errors
    ///
    /// Returns the add/remove failure after the state has been reconciled
    /// with the server.
    pub async fn toggle(&self) -> Result<bool, ApiError> {
        if self.busy.replace(true) {
            log::debug!("[favorite] toggle for {} already in flight", self.ticker);
            return Ok(self.is_favorite());
        }
        let target = self.state.borrow_mut().begin_toggle();
        let result = if target {
            self.api.add(&self.ticker).await
        } else {
            self.api.remove(&self.ticker).await
        };
        if let Err(err) = &result {
            log::warn!("[favorite] toggle for {} failed: {err}", self.ticker);
        }

        match self.api.check(&self.ticker).await {
            Ok(value) => self.state.borrow_mut().settle(value),
            Err(err) => {
                log::warn!("[favorite] re-check for {} failed: {err}", self.ticker);
                self.state.borrow_mut().clear_optimistic();
            }
        }
        self.busy.set(false);
        result.map(|()| self.is_favorite())
    }
}
