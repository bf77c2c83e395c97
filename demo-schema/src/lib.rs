//! Demo components and their wire adapters for the reference simulation.
//!
//! Positions are fixed-point with [`POS_SCALE`] units per world unit and
//! velocities use [`VEL_SCALE`]. The resolvers here are written by hand in
//! the shape a code generator would emit.

use std::fmt;

use bitstream::{
    BitRead, BitResult, BitWrite, ByteLimit, IntLimit, LimitError, RangedRead, RangedWrite,
    ShortLimit, UShortLimit,
};
use ecs::ComponentRegistry;
use schema::{
    Component, ComponentData, ComponentResolver, DataResolver, PlainResolver, SchemaError,
    SerializableData,
};

pub const POS_SCALE: i32 = 100;
pub const POS_MIN: i32 = -100_000;
pub const POS_MAX: i32 = 100_000;
pub const VEL_SCALE: i16 = 100;
pub const VEL_MIN: i16 = -1_000;
pub const VEL_MAX: i16 = 1_000;
pub const YAW_STEPS: u16 = 4096;
pub const HEALTH_MAX: u8 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Component for Position {
    const NAME: &'static str = "Position";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Velocity {
    pub dx: i16,
    pub dy: i16,
}

impl Component for Velocity {
    const NAME: &'static str = "Velocity";
}

/// Heading in `1 / YAW_STEPS` turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Yaw(pub u16);

impl Component for Yaw {
    const NAME: &'static str = "Yaw";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Health {
    pub current: u8,
    pub max: u8,
    /// Ticks until the next regeneration step. Local only.
    pub regen_timer: u8,
}

impl Component for Health {
    const NAME: &'static str = "Health";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub stunned: bool,
    pub shielded: bool,
}

impl Component for Status {
    const NAME: &'static str = "Status";
}

impl SerializableData for Status {
    fn serialize(&self, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_bool(self.stunned)?;
        writer.write_bool(self.shielded)
    }

    fn deserialize(&mut self, reader: &mut dyn BitRead) -> BitResult<()> {
        self.stunned = reader.read_bool()?;
        self.shielded = reader.read_bool()?;
        Ok(())
    }
}

/// Marks entities driven by the simulation rather than input. Never sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Npc;

impl Component for Npc {
    const NAME: &'static str = "Npc";
}

/// Wire form of [`Health`].
#[derive(Debug, Default)]
pub struct HealthData {
    pub current: u8,
    pub max: u8,
}

impl SerializableData for HealthData {
    fn serialize(&self, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_u8(self.current)?;
        writer.write_u8(self.max)
    }

    fn deserialize(&mut self, reader: &mut dyn BitRead) -> BitResult<()> {
        self.current = reader.read_u8()?;
        self.max = reader.read_u8()?;
        Ok(())
    }
}

impl ComponentData<Health> for HealthData {
    fn fill_from(&mut self, component: &Health) {
        self.current = component.current;
        self.max = component.max;
    }

    fn fill_component(&self, component: &mut Health) {
        component.current = self.current;
        component.max = self.max;
    }
}

/// Value ranges used by the demo resolvers.
#[derive(Debug, Clone, Copy)]
pub struct DemoLimits {
    pub position: IntLimit,
    pub velocity: ShortLimit,
    pub yaw: UShortLimit,
    pub health: ByteLimit,
}

impl DemoLimits {
    pub fn new() -> Result<Self, LimitError> {
        Ok(Self {
            position: IntLimit::new(POS_MIN, POS_MAX)?,
            velocity: ShortLimit::new(VEL_MIN, VEL_MAX)?,
            yaw: UShortLimit::new(0, YAW_STEPS - 1)?,
            health: ByteLimit::new(0, HEALTH_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PositionResolver {
    limit: IntLimit,
}

impl ComponentResolver<Position> for PositionResolver {
    fn serialize(&self, component: &Position, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_limited(component.x, &self.limit)?;
        writer.write_limited(component.y, &self.limit)
    }

    fn deserialize(&self, reader: &mut dyn BitRead) -> BitResult<Position> {
        Ok(Position {
            x: reader.read_limited(&self.limit)?,
            y: reader.read_limited(&self.limit)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VelocityResolver {
    limit: ShortLimit,
}

impl ComponentResolver<Velocity> for VelocityResolver {
    fn serialize(&self, component: &Velocity, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_limited(component.dx, &self.limit)?;
        writer.write_limited(component.dy, &self.limit)
    }

    fn deserialize(&self, reader: &mut dyn BitRead) -> BitResult<Velocity> {
        Ok(Velocity {
            dx: reader.read_limited(&self.limit)?,
            dy: reader.read_limited(&self.limit)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YawResolver {
    limit: UShortLimit,
}

impl ComponentResolver<Yaw> for YawResolver {
    fn serialize(&self, component: &Yaw, writer: &mut dyn BitWrite) -> BitResult<()> {
        writer.write_limited(component.0, &self.limit)
    }

    fn deserialize(&self, reader: &mut dyn BitRead) -> BitResult<Yaw> {
        Ok(Yaw(reader.read_limited(&self.limit)?))
    }
}

/// Errors building the demo registry.
#[derive(Debug, Clone, PartialEq)]
pub enum DemoSchemaError {
    Limit(LimitError),
    Schema(SchemaError),
}

impl fmt::Display for DemoSchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit(e) => write!(f, "demo limit: {e}"),
            Self::Schema(e) => write!(f, "demo schema: {e}"),
        }
    }
}

impl std::error::Error for DemoSchemaError {}

impl From<LimitError> for DemoSchemaError {
    fn from(err: LimitError) -> Self {
        Self::Limit(err)
    }
}

impl From<SchemaError> for DemoSchemaError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

/// Registers the demo components in their fixed declaration order.
pub fn registry() -> Result<ComponentRegistry, DemoSchemaError> {
    let limits = DemoLimits::new()?;
    let registry = ComponentRegistry::builder()
        .register_with::<Position, _>(PositionResolver {
            limit: limits.position,
        })
        .register_with::<Velocity, _>(VelocityResolver {
            limit: limits.velocity,
        })
        .register_with::<Yaw, _>(YawResolver { limit: limits.yaw })
        .register_with::<Health, _>(DataResolver::<Health, HealthData>::new())
        .register_with::<Status, _>(PlainResolver::<Status>::new())
        .register::<Npc>()
        .build()?;
    Ok(registry)
}
