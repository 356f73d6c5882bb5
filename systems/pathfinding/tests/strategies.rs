use std::f64::consts::SQRT_2;

use arena_core::{CellCoord, Command, Grid, PathStrategy, TowerKind};
use arena_system_pathfinding::{path_cost, Pathfinder};
use arena_world::{self as world, query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn octile(from: CellCoord, to: CellCoord) -> f64 {
    let dx = f64::from(from.column().abs_diff(to.column()));
    let dy = f64::from(from.row().abs_diff(to.row()));
    let diagonal = dx.min(dy);
    let straight = dx.max(dy) - diagonal;
    diagonal * SQRT_2 + straight
}

fn world_with_towers(towers: &[(TowerKind, CellCoord)]) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(&mut world, Command::ConfigureGrid { size: 25 }, &mut events);
    for (kind, cell) in towers {
        world::apply(
            &mut world,
            Command::PlaceTower {
                kind: *kind,
                cell: *cell,
            },
            &mut events,
        );
    }
    world
}

fn random_cell<R: Rng>(rng: &mut R, size: u32) -> CellCoord {
    CellCoord::new(rng.gen_range(0..size), rng.gen_range(0..size))
}

#[test]
fn shortest_paths_match_octile_distance() {
    let mut pathfinder = Pathfinder::new(Grid::new(20));
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..200 {
        let start = random_cell(&mut rng, 20);
        let goal = random_cell(&mut rng, 20);
        let path = pathfinder.find_path(start, goal, PathStrategy::Shortest);

        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        let cost = path_cost(pathfinder.grid(), &path, PathStrategy::Shortest);
        assert!(
            (cost - octile(start, goal)).abs() < 1e-9,
            "{start:?} -> {goal:?} cost {cost}"
        );
    }
}

#[test]
fn safest_paths_are_optimal_under_their_own_weighting() {
    let world = world_with_towers(&[
        (TowerKind::Basic, CellCoord::new(12, 12)),
        (TowerKind::Missile, CellCoord::new(6, 18)),
        (TowerKind::Basic, CellCoord::new(18, 6)),
    ]);
    let grid = query::grid(&world).clone();
    let mut pathfinder = Pathfinder::new(grid);
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    for _ in 0..100 {
        let start = random_cell(&mut rng, 25);
        let goal = random_cell(&mut rng, 25);
        let safest = pathfinder.find_path(start, goal, PathStrategy::Safest);
        let shortest = pathfinder.find_path(start, goal, PathStrategy::Shortest);

        let grid = pathfinder.grid();
        let safest_cost = path_cost(grid, &safest, PathStrategy::Safest);
        let rescored = path_cost(grid, &shortest, PathStrategy::Safest);
        assert!(
            safest_cost <= rescored + 1e-9,
            "safest {safest_cost} worse than rescored shortest {rescored}"
        );
    }
}

#[test]
fn repeated_searches_are_stable() {
    let world = world_with_towers(&[(TowerKind::Laser, CellCoord::new(10, 10))]);
    let grid = query::grid(&world).clone();
    let start = CellCoord::new(0, 3);
    let goal = CellCoord::new(24, 17);

    let mut cached = Pathfinder::new(grid.clone());
    let mut uncached = Pathfinder::with_cache_capacity(grid, 0);
    let reference = uncached.find_path(start, goal, PathStrategy::Adaptive);
    let reference_cost = path_cost(uncached.grid(), &reference, PathStrategy::Adaptive);

    for _ in 0..5 {
        let path = uncached.find_path(start, goal, PathStrategy::Adaptive);
        let cost = path_cost(uncached.grid(), &path, PathStrategy::Adaptive);
        assert_eq!(cost, reference_cost);

        let memoised = cached.find_path(start, goal, PathStrategy::Adaptive);
        assert_eq!(
            path_cost(cached.grid(), &memoised, PathStrategy::Adaptive),
            reference_cost
        );
    }
    assert_eq!(cached.cached_paths(), 1);
    assert_eq!(uncached.cached_paths(), 0);
}

#[test]
fn safest_routes_around_a_single_tower_while_shortest_cuts_through() {
    let world = world_with_towers(&[(TowerKind::Basic, CellCoord::new(12, 12))]);
    let mut pathfinder = Pathfinder::new(Grid::new(25));
    pathfinder.update_grid(query::grid(&world).clone());
    let start = CellCoord::new(0, 12);
    let goal = CellCoord::new(24, 12);

    let shortest = pathfinder.find_path(start, goal, PathStrategy::Shortest);
    assert_eq!(shortest.len(), 25);
    assert!(shortest.iter().all(|cell| cell.row() == 12));
    assert!(shortest.contains(&CellCoord::new(12, 12)));

    let safest = pathfinder.find_path(start, goal, PathStrategy::Safest);
    assert_eq!(safest.first(), Some(&start));
    assert_eq!(safest.last(), Some(&goal));
    assert!(
        safest
            .iter()
            .all(|cell| cell.row() != 12 || cell.column().abs_diff(12) >= 2),
        "safest path should leave row 12 near the tower: {safest:?}"
    );
}

#[test]
fn grid_updates_invalidate_memoised_paths() {
    let start = CellCoord::new(0, 12);
    let goal = CellCoord::new(24, 12);
    let mut pathfinder = Pathfinder::new(Grid::new(25));
    let open_path = pathfinder.find_path(start, goal, PathStrategy::Safest);
    assert!(open_path.contains(&CellCoord::new(12, 12)));

    let world = world_with_towers(&[(TowerKind::Basic, CellCoord::new(12, 12))]);
    pathfinder.update_grid(query::grid(&world).clone());

    let guarded_path = pathfinder.find_path(start, goal, PathStrategy::Safest);
    assert!(!guarded_path.contains(&CellCoord::new(12, 12)));
}
