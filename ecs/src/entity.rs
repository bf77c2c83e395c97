//! Entity rows stored in the state's entity pool.

use schema::ComponentBits;

/// A live entity: its id plus the mask of attached component types.
///
/// The soft-delete flag lives next to the row inside the pool, so a
/// destroyed entity simply stops being visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Entity {
    id: u32,
    components: ComponentBits,
}

impl Entity {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            components: ComponentBits::EMPTY,
        }
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Bits of every component type currently attached.
    #[must_use]
    pub const fn components(&self) -> ComponentBits {
        self.components
    }

    #[must_use]
    pub const fn has(&self, bit: u32) -> bool {
        self.components.contains(bit)
    }

    pub(crate) fn attach(&mut self, bits: u32) {
        self.components.insert(bits);
    }

    pub(crate) fn detach(&mut self, bits: u32) {
        self.components.remove(bits);
    }

    pub(crate) fn set_components(&mut self, components: ComponentBits) {
        self.components = components;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_and_detach() {
        let mut entity = Entity::new(3);
        assert!(entity.components().is_empty());
        entity.attach(0b110);
        assert!(entity.has(0b010));
        entity.detach(0b010);
        assert!(!entity.has(0b010));
        assert!(entity.has(0b100));
        assert_eq!(entity.id(), 3);
    }
}
