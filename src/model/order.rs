//! Dense display-order maintenance for ordered child collections
//! (joins, filters, groups, chart ranges).
//!
//! Positions are a dense 0-based sequence. Deleting an item recompacts
//! its siblings in one pass; there is never a hole to special-case later.

use uuid::Uuid;

/// An entity with a display position among its siblings.
pub trait Ordered {
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
}

/// Reassign dense 0-based positions, preserving the current relative order.
pub fn reindex<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|i| i.position());
    for (i, item) in items.iter_mut().enumerate() {
        item.set_position(i as u32);
    }
}

/// Remove the item with the given id and recompact sibling positions.
///
/// Returns the removed item, or `None` if the id was absent (the
/// collection is left untouched in that case).
pub fn remove_and_reindex<T, F>(items: &mut Vec<T>, id: Uuid, id_of: F) -> Option<T>
where
    T: Ordered,
    F: Fn(&T) -> Uuid,
{
    let idx = items.iter().position(|i| id_of(i) == id)?;
    let removed = items.remove(idx);
    reindex(items);
    Some(removed)
}

/// Position for a newly appended sibling.
pub fn next_position<T: Ordered>(items: &[T]) -> u32 {
    items.len() as u32
}
