//! Include/exclude predicates over entity component masks.

use std::iter::FusedIterator;

use schema::{Component, ComponentBits};

use crate::entity::Entity;
use crate::error::EcsResult;
use crate::pool::Iter;
use crate::registry::ComponentRegistry;
use crate::state::EcsState;

/// Include and exclude bit lists with per-side ALL/ANY semantics.
///
/// An empty include list matches no entity. An empty exclude list
/// excludes none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMask {
    include: Vec<u32>,
    exclude: Vec<u32>,
    include_any: bool,
    exclude_any: bool,
}

impl ComponentMask {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, bit: u32) -> &mut Self {
        self.include.push(bit);
        self
    }

    pub fn exclude(&mut self, bit: u32) -> &mut Self {
        self.exclude.push(bit);
        self
    }

    /// Any one include bit is enough.
    pub fn include_any(&mut self) -> &mut Self {
        self.include_any = true;
        self
    }

    /// Any one exclude bit is enough to exclude.
    pub fn exclude_any(&mut self) -> &mut Self {
        self.exclude_any = true;
        self
    }

    #[must_use]
    pub fn is_included(&self, mask: ComponentBits) -> bool {
        if self.include.is_empty() {
            return false;
        }
        if self.include_any {
            self.include.iter().any(|&bit| mask.contains(bit))
        } else {
            self.include.iter().all(|&bit| mask.contains(bit))
        }
    }

    #[must_use]
    pub fn is_excluded(&self, mask: ComponentBits) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        if self.exclude_any {
            self.exclude.iter().any(|&bit| mask.contains(bit))
        } else {
            self.exclude.iter().all(|&bit| mask.contains(bit))
        }
    }

    #[must_use]
    pub fn matches(&self, mask: ComponentBits) -> bool {
        self.is_included(mask) && !self.is_excluded(mask)
    }
}

/// A [`ComponentMask`] evaluated against the entities of a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcsFilter {
    mask: ComponentMask,
}

impl EcsFilter {
    pub fn builder(registry: &ComponentRegistry) -> FilterBuilder<'_> {
        FilterBuilder {
            registry,
            mask: ComponentMask::new(),
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub const fn from_mask(mask: ComponentMask) -> Self {
        Self { mask }
    }

    #[must_use]
    pub const fn mask(&self) -> &ComponentMask {
        &self.mask
    }

    /// Lazily yields matching entities in ascending id order.
    ///
    /// The iterator borrows `state`, so entities cannot be created or
    /// destroyed while it is alive. Clone it to restart.
    pub fn iter<'a>(&'a self, state: &'a EcsState) -> FilterIter<'a> {
        FilterIter {
            mask: &self.mask,
            rows: state.entity_rows(),
        }
    }

    pub fn entity_ids(&self, state: &EcsState) -> Vec<u32> {
        self.iter(state).map(Entity::id).collect()
    }

    pub fn count(&self, state: &EcsState) -> usize {
        self.iter(state).count()
    }
}

type Resolve = fn(&ComponentRegistry) -> EcsResult<u32>;

enum Side {
    Include,
    Exclude,
}

/// Builds an [`EcsFilter`]; unregistered types surface at [`build`](Self::build).
pub struct FilterBuilder<'r> {
    registry: &'r ComponentRegistry,
    mask: ComponentMask,
    pending: Vec<(Side, Resolve)>,
}

fn bit_of<C: Component>(registry: &ComponentRegistry) -> EcsResult<u32> {
    Ok(registry.component_type::<C>()?.bit())
}

impl FilterBuilder<'_> {
    #[must_use]
    pub fn include<C: Component>(mut self) -> Self {
        self.pending.push((Side::Include, bit_of::<C>));
        self
    }

    #[must_use]
    pub fn exclude<C: Component>(mut self) -> Self {
        self.pending.push((Side::Exclude, bit_of::<C>));
        self
    }

    #[must_use]
    pub fn include_any(mut self) -> Self {
        self.mask.include_any();
        self
    }

    #[must_use]
    pub fn exclude_any(mut self) -> Self {
        self.mask.exclude_any();
        self
    }

    pub fn build(self) -> EcsResult<EcsFilter> {
        let mut mask = self.mask;
        for (side, resolve) in self.pending {
            let bit = resolve(self.registry)?;
            match side {
                Side::Include => mask.include(bit),
                Side::Exclude => mask.exclude(bit),
            };
        }
        Ok(EcsFilter { mask })
    }
}

/// Iterator returned by [`EcsFilter::iter`].
#[derive(Debug, Clone)]
pub struct FilterIter<'a> {
    mask: &'a ComponentMask,
    rows: Iter<'a, Entity>,
}

impl<'a> Iterator for FilterIter<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let mask = self.mask;
        self.rows
            .find(|(_, entity)| mask.matches(entity.components()))
            .map(|(_, entity)| entity)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.rows.size_hint().1)
    }
}

impl FusedIterator for FilterIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateConfig;
    use crate::testing::{registry, Position, Selected, Velocity};
    use crate::EcsError;

    fn bits(raw: u32) -> ComponentBits {
        ComponentBits::from_raw(raw)
    }

    #[test]
    fn empty_include_matches_nothing() {
        let mask = ComponentMask::new();
        assert!(!mask.matches(bits(0)));
        assert!(!mask.matches(bits(u32::MAX)));
    }

    #[test]
    fn include_all_and_any() {
        let mut mask = ComponentMask::new();
        mask.include(0b10).include(0b1000);
        assert!(mask.is_included(bits(0b1010)));
        assert!(!mask.is_included(bits(0b0010)));
        mask.include_any();
        assert!(mask.is_included(bits(0b0010)));
        assert!(!mask.is_included(bits(0b0100)));
    }

    #[test]
    fn exclude_all_and_any() {
        let mut mask = ComponentMask::new();
        mask.include(0b10).exclude(0b100).exclude(0b1000);
        assert!(mask.matches(bits(0b0110)));
        assert!(!mask.matches(bits(0b1110)));
        mask.exclude_any();
        assert!(!mask.matches(bits(0b0110)));
        assert!(mask.matches(bits(0b0010)));
    }

    #[test]
    fn filter_over_state() {
        let registry = registry();
        let mut state = EcsState::new(registry.clone(), StateConfig::for_testing()).unwrap();
        let both = state.create_entity(0).unwrap();
        state.add_component(both, Position::default()).unwrap();
        state.add_component(both, Velocity::default()).unwrap();
        let only_position = state.create_entity(0).unwrap();
        state.add_component(only_position, Position::default()).unwrap();
        let selected = state.create_entity(0).unwrap();
        state.add_component(selected, Selected).unwrap();

        let moving = EcsFilter::builder(&registry)
            .include::<Position>()
            .include::<Velocity>()
            .build()
            .unwrap();
        assert_eq!(moving.entity_ids(&state), vec![both]);

        let any = EcsFilter::builder(&registry)
            .include::<Velocity>()
            .include::<Selected>()
            .include_any()
            .build()
            .unwrap();
        assert_eq!(any.entity_ids(&state), vec![both, selected]);

        let still = EcsFilter::builder(&registry)
            .include::<Position>()
            .exclude::<Velocity>()
            .build()
            .unwrap();
        assert_eq!(still.entity_ids(&state), vec![only_position]);

        let iter = moving.iter(&state);
        assert_eq!(iter.clone().count(), 1);
        assert_eq!(iter.count(), 1);
    }

    #[test]
    fn unregistered_type_fails_build() {
        #[derive(Debug, Clone, Copy, Default, PartialEq)]
        struct Ghost;
        impl Component for Ghost {
            const NAME: &'static str = "Ghost";
        }

        let registry = registry();
        let result = EcsFilter::builder(&registry).include::<Ghost>().build();
        assert_eq!(
            result,
            Err(EcsError::UnregisteredComponent { name: "Ghost" })
        );
    }
}
