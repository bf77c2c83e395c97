//! Components shared by unit tests.

use std::sync::Arc;

use bitstream::{BitRead, BitResult, BitWrite};
use schema::{Component, PlainResolver, SerializableData};

use crate::ComponentRegistry;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Component for Position {
    const NAME: &'static str = "Position";
}

impl SerializableData for Position {
    fn serialize(&self, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_i32(self.x)?;
        writer.write_i32(self.y)
    }

    fn deserialize(&mut self, reader: &mut dyn BitRead) -> BitResult<()> {
        self.x = reader.read_i32()?;
        self.y = reader.read_i32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub dx: i16,
    pub dy: i16,
}

impl Component for Velocity {
    const NAME: &'static str = "Velocity";
}

impl SerializableData for Velocity {
    fn serialize(&self, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_i16(self.dx)?;
        writer.write_i16(self.dy)
    }

    fn deserialize(&mut self, reader: &mut dyn BitRead) -> BitResult<()> {
        self.dx = reader.read_i16()?;
        self.dy = reader.read_i16()?;
        Ok(())
    }
}

/// Local-only marker, registered without a resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Selected;

impl Component for Selected {
    const NAME: &'static str = "Selected";
}

pub fn registry() -> Arc<ComponentRegistry> {
    Arc::new(
        ComponentRegistry::builder()
            .register_with::<Position, _>(PlainResolver::<Position>::new())
            .register_with::<Velocity, _>(PlainResolver::<Velocity>::new())
            .register::<Selected>()
            .build()
            .unwrap(),
    )
}
