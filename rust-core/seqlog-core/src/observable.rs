// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Observable cells.
//
// An `Observable<T>` holds the latest value of some state (a log's tail
// sequence, a sublog's member count) and lets any number of subscribers
// wait for it to change. A cell may be terminated with a `Terminal` kind;
// the terminal value is final and every subscriber observes it.
//
// Built on `tokio::sync::watch`. Subscribers see the newest value on each
// wakeup; intermediate values written between two wakeups are coalesced.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{LogError, LogResult};

/// Terminal states an observable can enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// The sublog owning this observable was deleted.
    SublogDeleted,
}

impl Terminal {
    /// The error a reader surfaces when it runs into this terminal state.
    pub fn to_error(self) -> LogError {
        match self {
            Terminal::SublogDeleted => LogError::SublogDeleted,
        }
    }
}

/// A value published through an [`Observable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed<T> {
    Value(T),
    Terminated(Terminal),
}

impl<T> Observed<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Observed::Value(v) => Some(v),
            Observed::Terminated(_) => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Observed::Terminated(_))
    }

    /// Turn a terminal state into its error.
    pub fn into_result(self) -> LogResult<T> {
        match self {
            Observed::Value(v) => Ok(v),
            Observed::Terminated(t) => Err(t.to_error()),
        }
    }
}

/// A shared, subscribable cell holding the latest value of `T`.
///
/// Clones share the same cell.
#[derive(Debug)]
pub struct Observable<T> {
    tx: Arc<watch::Sender<Observed<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Observed::Value(initial));
        Self { tx: Arc::new(tx) }
    }

    /// The current state, value or terminal.
    pub fn get(&self) -> Observed<T> {
        self.tx.borrow().clone()
    }

    /// The current value, or `None` once terminated.
    pub fn value(&self) -> Option<T> {
        self.tx.borrow().value().cloned()
    }

    pub fn is_terminated(&self) -> bool {
        self.tx.borrow().is_terminated()
    }

    /// Publish a new value.
    ///
    /// Ignored once the cell is terminated; returns whether the value was
    /// published.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_terminated() {
                return false;
            }
            *current = Observed::Value(value);
            true
        })
    }

    /// Move the cell into a terminal state and wake every subscriber.
    ///
    /// The first terminal state wins.
    pub fn terminate(&self, terminal: Terminal) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_terminated() {
                return false;
            }
            *current = Observed::Terminated(terminal);
            true
        })
    }

    /// Subscribe to future changes. The current state counts as seen.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// A receiver of changes published by an [`Observable`].
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<Observed<T>>,
}

impl<T: Clone> Subscription<T> {
    /// The newest state, marking it as seen.
    pub fn current(&mut self) -> Observed<T> {
        self.rx.borrow_and_update().clone()
    }

    /// Wait until the cell changes and return the new state.
    ///
    /// Returns immediately if a change happened since the last call.
    /// Returns `None` once every `Observable` handle has been dropped.
    pub async fn changed(&mut self) -> Option<Observed<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
