//! Plain-text rendering of location grids.
//!
//! Every location owned by the root is drawn as a block of glyphs, one
//! character per cell, under a header line with its kind, id, and
//! population.

use std::fmt::Write as _;

use zeroplayer_core::{Simulation, TickCallback, TickSummary};
use zeroplayer_types::{EntityId, EntityKind, KindFilter};
use zeroplayer_world::{Cell, WorldMap};

/// Glyph drawn for an empty cell.
pub const EMPTY_GLYPH: char = '.';

/// Glyph drawn for an entity of `kind`.
pub const fn glyph(kind: EntityKind) -> char {
    match kind {
        EntityKind::Root => '@',
        EntityKind::Forest => 'T',
        EntityKind::Field => '_',
        EntityKind::Grass => ',',
        EntityKind::Wheat => '"',
        EntityKind::Mouse => 'm',
        EntityKind::Rabbit => 'r',
        EntityKind::Owl => 'O',
        EntityKind::Fox => 'F',
        EntityKind::MouseMeat => '*',
        EntityKind::RabbitMeat => '%',
        EntityKind::Carcass => 'x',
    }
}

/// Draw one location. Returns `None` if `location` has no grid.
pub fn render_location(world: &WorldMap, location: EntityId) -> Option<String> {
    let kind = world.kind_of(location)?;
    let grid = world.location(location).ok()?.grid();
    let creatures = world.children_by_type(location, KindFilter::Creature).len();

    let mut out = String::new();
    let _ = writeln!(out, "{kind} {location} (creatures: {creatures})");
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let drawn = grid
                .occupant(Cell::new(x, y))
                .and_then(|id| world.kind_of(id))
                .map_or(EMPTY_GLYPH, glyph);
            out.push(drawn);
        }
        out.push('\n');
    }
    Some(out)
}

/// Draw every location owned by the root, separated by blank lines.
pub fn render_world(world: &WorldMap) -> String {
    world
        .children(world.root())
        .filter_map(|location| render_location(world, location))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints the world to stdout every `every` ticks.
#[derive(Debug, Clone, Copy)]
pub struct RenderCallback {
    every: u64,
}

impl RenderCallback {
    /// Render every `every` ticks; zero disables rendering.
    pub const fn new(every: u64) -> Self {
        Self { every }
    }

    /// Whether `tick` is a rendering tick.
    pub const fn due(&self, tick: u64) -> bool {
        match tick.checked_rem(self.every) {
            Some(rest) => rest == 0,
            None => false,
        }
    }
}

impl TickCallback for RenderCallback {
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation) {
        if self.due(summary.tick) {
            println!("== tick {} ==", summary.tick);
            println!("{}", render_world(simulation.world()));
        }
    }
}
