//! Explicitly managed object heap.
//!
//! Objects live in an arena indexed by [`ObjectId`]. Freeing an object empties
//! its slot instead of removing it, so ids are never reused and a dangling
//! reference is detected on its next use rather than aliasing a newer object.

use core::fmt;

use hashbrown::HashMap;

use super::{RuntimeErrorKind, Value};

/// Identifier of a heap object. Allocated in increasing order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Field name to value mapping of one heap object.
pub type Fields = HashMap<String, Value>;

#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Option<Fields>>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an object with every named field set to nil.
    pub fn alloc(&mut self, field_names: &[String]) -> ObjectId {
        let id = ObjectId(self.objects.len());
        let fields = field_names
            .iter()
            .map(|name| (name.clone(), Value::Nil))
            .collect();
        self.objects.push(Some(fields));
        id
    }

    /// Remove an object. Freeing a dead or unknown id is an invalid access.
    pub fn free(&mut self, id: ObjectId) -> Result<(), RuntimeErrorKind> {
        match self.objects.get_mut(id.0) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(RuntimeErrorKind::InvalidHeapAccess { id, field: None }),
        }
    }

    pub fn object(&self, id: ObjectId) -> Option<&Fields> {
        self.objects.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_field(&self, id: ObjectId, field: &str) -> Result<&Value, RuntimeErrorKind> {
        let object = self
            .object(id)
            .ok_or(RuntimeErrorKind::InvalidHeapAccess { id, field: None })?;
        object
            .get(field)
            .ok_or_else(|| RuntimeErrorKind::InvalidHeapAccess {
                id,
                field: Some(field.into()),
            })
    }

    /// Overwrite a field the object was allocated with.
    pub fn set_field(
        &mut self,
        id: ObjectId,
        field: &str,
        value: Value,
    ) -> Result<(), RuntimeErrorKind> {
        let object = self
            .objects
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(RuntimeErrorKind::InvalidHeapAccess { id, field: None })?;
        let slot = object
            .get_mut(field)
            .ok_or_else(|| RuntimeErrorKind::InvalidHeapAccess {
                id,
                field: Some(field.into()),
            })?;
        *slot = value;
        Ok(())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.object(id).is_some()
    }

    /// Number of objects allocated and not yet freed.
    pub fn live_objects(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of objects ever allocated.
    pub fn allocated(&self) -> usize {
        self.objects.len()
    }
}
