#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turns tower targets into firing orders once per simulated tick.
//!
//! Targeting decides who a tower would shoot; this system decides whether it
//! may shoot now. A tower fires when time advanced in the current batch and
//! its cooldown has fully elapsed, which covers towers that never fired.

use arena_core::{Command, Event, TowerCooldownView, TowerId, TowerTarget};

/// Queues `FireProjectile` commands for towers whose weapons are ready.
#[derive(Debug, Default)]
pub struct TowerCombat {
    ready: Vec<TowerId>,
}

impl TowerCombat {
    /// Creates a combat system with an empty readiness buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits at most one `Command::FireProjectile` per ready, targeted tower.
    ///
    /// Nothing fires unless the batch contains `Event::TimeAdvanced`, and a
    /// batch that ended the game fires nothing. A tower listed with several
    /// targets fires at the first of them.
    pub fn handle(
        &mut self,
        events: &[Event],
        tower_cooldowns: TowerCooldownView,
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if tower_targets.is_empty() || !may_fire(events) {
            return;
        }

        self.ready.clear();
        self.ready.extend(
            tower_cooldowns
                .iter()
                .filter(|cooldown| cooldown.ready_in.is_zero())
                .map(|cooldown| cooldown.tower),
        );

        for target in tower_targets {
            // The view is sorted by tower id; removing spends the shot.
            let Ok(index) = self.ready.binary_search(&target.tower) else {
                continue;
            };
            let _ = self.ready.remove(index);
            out.push(Command::FireProjectile {
                tower: target.tower,
                target: target.enemy,
            });
        }
    }
}

fn may_fire(events: &[Event]) -> bool {
    let mut advanced = false;
    for event in events {
        match event {
            Event::TimeAdvanced { .. } => advanced = true,
            Event::GameOver { .. } => return false,
            _ => {}
        }
    }
    advanced
}
