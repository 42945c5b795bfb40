//! Order-index maintenance for ordered sibling collections.
//!
//! Stages within a workflow and values within a stage each carry an explicit
//! `order_index`. Readers compare those indices, never array positions, so
//! every operation that changes the membership of a collection must leave it
//! sorted and densely numbered `0..n-1` before returning.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, TRACING_TARGET_ORDER};

/// An element of an ordered sibling collection.
pub trait Ordered {
    /// Returns the explicit position of this element among its siblings.
    fn order_index(&self) -> usize;

    /// Overwrites the explicit position of this element.
    fn set_order_index(&mut self, index: usize);
}

/// Direction of an adjacent move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Towards index 0.
    Up,
    /// Towards the end of the collection.
    Down,
}

/// Sorts the collection by `order_index` and renumbers it `0..n-1`.
///
/// The sort is stable, so elements sharing an index keep their relative
/// array order.
pub fn renormalize<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(T::order_index);
    for (position, item) in items.iter_mut().enumerate() {
        item.set_order_index(position);
    }
}

/// Returns the index a newly appended element should receive.
#[inline]
pub fn next_index<T: Ordered>(items: &[T]) -> usize {
    items.len()
}

/// Verifies that the element at position `i` carries `order_index == i`.
pub fn check_dense<T: Ordered>(items: &[T]) -> Result<()> {
    match items
        .iter()
        .enumerate()
        .find(|(position, item)| item.order_index() != *position)
    {
        None => Ok(()),
        Some((position, item)) => Err(Error::ordering_violation().with_message(format!(
            "element at position {position} has order index {}",
            item.order_index()
        ))),
    }
}

/// Checks density and repairs the collection when it is broken.
///
/// A violation means a bug in the caller. Debug builds panic so the bug
/// surfaces immediately; release builds log it and renormalize.
pub fn enforce_dense<T: Ordered>(items: &mut [T], collection: &str) {
    let Err(error) = check_dense(items) else {
        return;
    };

    if cfg!(debug_assertions) {
        panic!("order index violation in {collection}: {error}");
    }

    tracing::error!(
        target: TRACING_TARGET_ORDER,
        collection,
        error = %error,
        "repairing order indices"
    );
    renormalize(items);
}

/// Swaps the element at `position` with its neighbour in `direction`.
///
/// The collection must be dense. Returns `false`, leaving the collection
/// untouched, when the neighbour does not exist.
pub fn move_adjacent<T: Ordered>(items: &mut [T], position: usize, direction: Direction) -> bool {
    let neighbour = match direction {
        Direction::Up => position.checked_sub(1),
        Direction::Down => position.checked_add(1).filter(|n| *n < items.len()),
    };
    let Some(neighbour) = neighbour.filter(|_| position < items.len()) else {
        return false;
    };

    items.swap(position, neighbour);
    items[position].set_order_index(position);
    items[neighbour].set_order_index(neighbour);
    true
}
