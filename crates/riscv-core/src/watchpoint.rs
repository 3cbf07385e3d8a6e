//! Fixed pool of data watchpoints.
//!
//! Slots live in an arena and are threaded onto two index-linked lists,
//! `active` and `free`. Every slot is on exactly one list; registration moves
//! the free-list head to the front of the active list, so active order is
//! most recently registered first.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::expr::{evaluate, ExprContext, ExprError};

/// Number of watchpoint slots.
pub const WATCHPOINT_POOL_SIZE: usize = 32;
/// Longest accepted watch expression, in bytes.
pub const MAX_EXPRESSION_LEN: usize = 255;

/// Watchpoint number, stable for the lifetime of the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct WatchpointId(pub usize);

impl fmt::Display for WatchpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure of a pool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum WatchpointError {
    /// Every slot is active.
    #[error("no free watchpoint: all {size} slots are in use", size = WATCHPOINT_POOL_SIZE)]
    PoolExhausted,
    /// The number does not name an active watchpoint.
    #[error("no active watchpoint {0}")]
    NotFound(WatchpointId),
    /// The expression text exceeds [`MAX_EXPRESSION_LEN`].
    #[error("watch expression of {0} bytes is longer than {max} bytes", max = MAX_EXPRESSION_LEN)]
    ExpressionTooLong(usize),
}

impl WatchpointError {
    /// Pool exhaustion and unknown handles end the debugging session.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::PoolExhausted | Self::NotFound(_))
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    expr: String,
    value: Option<u32>,
    next: Option<usize>,
}

/// Read-only view of an active watchpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchpoint<'a> {
    /// Watchpoint number.
    pub id: WatchpointId,
    /// Watched expression.
    pub expr: &'a str,
    /// Last observed value; `None` until the first check.
    pub value: Option<u32>,
}

/// One value change detected by [`WatchpointPool::check_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchChange {
    /// Watchpoint number.
    pub id: WatchpointId,
    /// Watched expression.
    pub expr: String,
    /// Previously stored value.
    pub old: u32,
    /// Newly evaluated value.
    pub new: u32,
}

impl fmt::Display for WatchChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Watchpoint {}: {}\n  Old value = {:#010x}\n  New value = {:#010x}",
            self.id, self.expr, self.old, self.new
        )
    }
}

/// Result of one check pass over all active watchpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchReport {
    /// Changes in active-list order.
    pub changes: Vec<WatchChange>,
}

impl WatchReport {
    /// Returns `true` when execution must stop.
    #[must_use]
    pub fn triggered(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Arena of [`WATCHPOINT_POOL_SIZE`] watchpoint slots.
#[derive(Debug, Clone)]
pub struct WatchpointPool {
    slots: Box<[Slot]>,
    active: Option<usize>,
    free: Option<usize>,
}

impl Default for WatchpointPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchpointPool {
    /// Creates a pool with every slot on the free list, lowest number first.
    #[must_use]
    pub fn new() -> Self {
        let slots = (0..WATCHPOINT_POOL_SIZE)
            .map(|index| Slot {
                next: (index + 1 < WATCHPOINT_POOL_SIZE).then_some(index + 1),
                ..Slot::default()
            })
            .collect();
        Self {
            slots,
            active: None,
            free: Some(0),
        }
    }

    /// Registers `expr` and returns its number. The value stays unset until
    /// the first check or [`Self::prime`].
    ///
    /// # Errors
    ///
    /// [`WatchpointError::PoolExhausted`] when no slot is free and
    /// [`WatchpointError::ExpressionTooLong`] for oversized expressions.
    pub fn register(&mut self, expr: &str) -> Result<WatchpointId, WatchpointError> {
        if expr.len() > MAX_EXPRESSION_LEN {
            return Err(WatchpointError::ExpressionTooLong(expr.len()));
        }
        let index = self.free.ok_or(WatchpointError::PoolExhausted)?;
        let slot = &mut self.slots[index];
        self.free = slot.next;
        slot.next = self.active;
        slot.expr = expr.to_owned();
        slot.value = None;
        self.active = Some(index);
        debug!(id = index, expr, "watchpoint registered");
        Ok(WatchpointId(index))
    }

    /// Removes an active watchpoint and returns its slot to the free list.
    ///
    /// # Errors
    ///
    /// [`WatchpointError::NotFound`] when `id` is not active.
    pub fn remove(&mut self, id: WatchpointId) -> Result<(), WatchpointError> {
        let mut prev: Option<usize> = None;
        let mut cursor = self.active;
        while let Some(index) = cursor {
            if index == id.0 {
                let next = self.slots[index].next;
                match prev {
                    Some(prev) => self.slots[prev].next = next,
                    None => self.active = next,
                }
                let slot = &mut self.slots[index];
                slot.next = self.free;
                slot.expr.clear();
                slot.value = None;
                self.free = Some(index);
                debug!(id = index, "watchpoint removed");
                return Ok(());
            }
            prev = cursor;
            cursor = self.slots[index].next;
        }
        Err(WatchpointError::NotFound(id))
    }

    /// Stores `value` as the last observed value of `id`.
    ///
    /// # Errors
    ///
    /// [`WatchpointError::NotFound`] when `id` is not active.
    pub fn prime(&mut self, id: WatchpointId, value: u32) -> Result<(), WatchpointError> {
        if !self.is_active(id) {
            return Err(WatchpointError::NotFound(id));
        }
        self.slots[id.0].value = Some(value);
        Ok(())
    }

    /// Returns the active watchpoint `id`.
    #[must_use]
    pub fn get(&self, id: WatchpointId) -> Option<Watchpoint<'_>> {
        self.iter().find(|wp| wp.id == id)
    }

    /// Active watchpoints, most recently registered first.
    pub fn iter(&self) -> impl Iterator<Item = Watchpoint<'_>> + '_ {
        self.chain(self.active).map(move |index| {
            let slot = &self.slots[index];
            Watchpoint {
                id: WatchpointId(index),
                expr: &slot.expr,
                value: slot.value,
            }
        })
    }

    /// Number of active watchpoints.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.chain(self.active).count()
    }

    /// Number of free slots.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.chain(self.free).count()
    }

    /// Re-evaluates every active watchpoint and records changed values.
    ///
    /// A watchpoint without a stored value takes the evaluated value without
    /// reporting a change. Recoverable evaluation failures are logged and the
    /// watchpoint is skipped for this pass.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ExprError`].
    pub fn check_all(&mut self, ctx: &dyn ExprContext) -> Result<WatchReport, ExprError> {
        let mut report = WatchReport::default();
        let mut cursor = self.active;
        while let Some(index) = cursor {
            let slot = &mut self.slots[index];
            cursor = slot.next;
            let new = match evaluate(&slot.expr, ctx) {
                Ok(value) => value,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(id = index, expr = %slot.expr, error = %err, "watch expression failed");
                    continue;
                }
            };
            match slot.value.replace(new) {
                Some(old) if old != new => report.changes.push(WatchChange {
                    id: WatchpointId(index),
                    expr: slot.expr.clone(),
                    old,
                    new,
                }),
                _ => {}
            }
        }
        Ok(report)
    }

    fn is_active(&self, id: WatchpointId) -> bool {
        self.chain(self.active).any(|index| index == id.0)
    }

    fn chain(&self, head: Option<usize>) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(head, move |index| self.slots[*index].next)
    }
}
