//! Per-cell value fields built from an arena snapshot
//!
//! * danger: expected cost of standing on a cell, propagated outwards from
//!   walls, traps, rival bodies and the board edge
//! * objects: attraction towards reward cells, discounted where rivals are
//!   closer
//! * center: late-game pull towards the middle of the board
//!
//! The combined field is `min(danger, objects + center)`, so danger always
//! caps reward.

use crate::arena::{Arena, Object};
use crate::config::{CenterConfig, Config, DangerConfig};
use crate::grid::Grid;
use crate::simple_profiler::ProfileGuard;
use crate::types::Coord;

/// All fields of one turn
#[derive(Debug, Clone)]
pub struct ValueFields {
    pub danger: Grid<f64>,
    pub objects: Grid<f64>,
    pub center: Grid<f64>,
    pub combined: Grid<f64>,
}

impl ValueFields {
    /// Builds every field from the arena as received.
    ///
    /// When the centre lock is active and the controlled agent starts inside
    /// the safe zone, walls are placed around the centre while the fields are
    /// computed and removed again before returning.
    pub fn build(arena: &mut Arena, config: &Config) -> ValueFields {
        let _guard = ProfileGuard::new("value_fields");

        let elapsed = config.board.total_ticks - arena.ticks_remaining();
        let in_center = arena
            .me()
            .head()
            .map_or(false, |head| in_safe_zone(head, board_center(arena), &config.center));
        let locked = in_center && elapsed >= config.center.lock_begin_tick;
        let walls = if locked {
            center_lock_cells(board_center(arena), config.center.lock_offset)
        } else {
            Vec::new()
        };

        arena.with_temporary_walls(&walls, |arena| {
            let danger = danger_field(arena, &config.danger);
            let objects = object_value_field(arena, &danger, config);
            let center = if !in_center && elapsed >= config.center.value_begin_tick {
                center_value_field(arena, config)
            } else {
                Grid::filled(arena.height(), arena.width(), 0.0)
            };
            let combined = objects.add(&center).min_with(&danger);

            log::debug!(
                "Built value fields (elapsed {}, in_center {}, locked {})",
                elapsed,
                in_center,
                locked
            );
            if log::log_enabled!(log::Level::Trace) {
                if let Some(head) = arena.me().head() {
                    for (name, field) in [
                        ("danger", &danger),
                        ("objects", &objects),
                        ("center", &center),
                        ("combined", &combined),
                    ]
                    .iter()
                    {
                        log::trace!("{} around {:?}:\n{}", name, head, values_nearby(field, head, NEARBY_RADIUS));
                    }
                }
            }

            ValueFields {
                danger,
                objects,
                center,
                combined,
            }
        })
    }
}

/// Half-width of the window dumped around the head at trace level
const NEARBY_RADIUS: i32 = 3;

/// Renders the window of `field` within `radius` of `at`, one board row per
/// line; cells off the board print as `-`
pub fn values_nearby(field: &Grid<f64>, at: Coord, radius: i32) -> String {
    (at.row - radius..=at.row + radius)
        .map(|row| {
            (at.col - radius..=at.col + radius)
                .map(|col| match field.get(Coord::new(row, col)) {
                    Some(v) => format!("{:>10.1}", v),
                    None => format!("{:>10}", "-"),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn board_center(arena: &Arena) -> Coord {
    Coord::new((arena.height() / 2) as i32, (arena.width() / 2) as i32)
}

/// Whether `at` lies in the safe zone around `center`
pub fn in_safe_zone(at: Coord, center: Coord, cfg: &CenterConfig) -> bool {
    let dr = (at.row - center.row).abs();
    let dc = (at.col - center.col).abs();
    let longer = dr.max(dc);
    let shorter = dr.min(dc);
    (longer <= cfg.safe_long_axis && shorter <= cfg.safe_short_axis)
        || (longer <= cfg.safe_square && shorter <= cfg.safe_square)
}

/// The four axis cells at `offset` from the centre
pub fn center_lock_cells(center: Coord, offset: i32) -> Vec<Coord> {
    vec![
        Coord::new(center.row - offset, center.col),
        Coord::new(center.row + offset, center.col),
        Coord::new(center.row, center.col - offset),
        Coord::new(center.row, center.col + offset),
    ]
}

/// Danger of a cell given its four neighbours' danger: for every way of
/// dropping one neighbour take the worst of the other three, then keep the
/// best of those four options.
pub fn escape_danger(around: [f64; 4]) -> f64 {
    (0..4)
        .map(|skip| {
            around
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, v)| *v)
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .fold(f64::INFINITY, f64::min)
}

/// Propagates danger from traps, walls and rival bodies.
///
/// Cells off the board count as walls. Values only ever decrease during the
/// propagation, so it settles once no cell can be lowered any further.
pub fn danger_field(arena: &Arena, cfg: &DangerConfig) -> Grid<f64> {
    let _guard = ProfileGuard::new("danger_field");

    let death = cfg.death(arena.ticks_remaining());
    let me = arena.self_index();
    let rival_value = if arena.me().is_invulnerable() {
        cfg.rival_when_shielded
    } else {
        death
    };

    let seeds: Vec<(Coord, f64)> = arena
        .cells()
        .iter()
        .filter_map(|(at, cell)| match cell.object {
            Object::Trap => Some((at, cfg.trap)),
            Object::Wall => Some((at, death)),
            _ => match cell.occupant {
                Some(occupant) if occupant != me => Some((at, rival_value)),
                _ => None,
            },
        })
        .collect();

    let mut field = Grid::filled(arena.height(), arena.width(), cfg.unset);
    field.propagate(seeds, |at, relaxation| {
        for next in at.neighbours().iter() {
            if !relaxation.grid().contains(*next) {
                continue;
            }
            let around = next
                .neighbours()
                .map(|n| relaxation.grid().get(n).copied().unwrap_or(death));
            let candidate = escape_danger(around);
            if candidate < relaxation.grid()[*next] {
                relaxation.emit(*next, candidate);
            }
        }
    });
    field
}

/// Breadth-first step counts from `source` for the controlled agent.
///
/// Walls, traps and cells held by other agents block the search; unreachable
/// cells are -1.
pub fn distance_field(arena: &Arena, source: Coord) -> Grid<i32> {
    let me = arena.self_index();
    let passable = |at: Coord| {
        arena.cell(at).map_or(false, |cell| {
            !matches!(cell.object, Object::Wall | Object::Trap)
                && cell.occupant.map_or(true, |occupant| occupant == me)
        })
    };

    let mut field = Grid::filled(arena.height(), arena.width(), -1);
    if !field.contains(source) {
        return field;
    }
    field.propagate(vec![(source, 0)], |at, relaxation| {
        let here = relaxation.grid()[at];
        for next in at.neighbours().iter() {
            if !passable(*next) || relaxation.grid()[*next] != -1 {
                continue;
            }
            relaxation.emit(*next, here + 1);
        }
    });
    field
}

/// `value` at the source, decaying by `decline` per step, 0 where unreachable
pub fn spread_field(arena: &Arena, source: Coord, value: f64, decline: f64) -> Grid<f64> {
    distance_field(arena, source).map(|&d| if d < 0 { 0.0 } else { value * decline.powi(d) })
}

/// Attraction towards reward cells.
///
/// Each reward spreads its own field. Fields are weighted by how strong they
/// are at our head compared with the other rewards, by the overall reward
/// density around us, and are all but dropped when a rival is at least as
/// close to the reward. The weighted fields are merged by maximum, scaled, and
/// traps are marked with a flat penalty.
pub fn object_value_field(arena: &Arena, danger: &Grid<f64>, config: &Config) -> Grid<f64> {
    let cfg = &config.objects;
    let (height, width) = (arena.height(), arena.width());
    let progress = if config.board.total_ticks > 0 {
        arena.ticks_remaining() as f64 / config.board.total_ticks as f64
    } else {
        0.0
    };

    let sources: Vec<(Coord, f64)> = arena
        .cells()
        .iter()
        .filter(|(at, _)| danger[*at] >= 0.0)
        .filter_map(|(at, cell)| {
            let value = match cell.object {
                Object::Score(n) => cfg.base_value_of_score + cfg.value_per_score * n as f64,
                Object::LengthBonus => {
                    cfg.length_value_at_begin * progress + cfg.length_value_at_end * (1.0 - progress)
                }
                _ => 0.0,
            };
            if value != 0.0 {
                Some((at, value))
            } else {
                None
            }
        })
        .collect();

    let fields: Vec<Grid<f64>> = sources
        .iter()
        .map(|&(at, value)| spread_field(arena, at, value, cfg.spread_decline))
        .collect();

    let mut merged = Grid::filled(height, width, 0.0);
    if let Some(head) = arena.me().head() {
        if !fields.is_empty() {
            let sum = fields
                .iter()
                .fold(Grid::filled(height, width, 0.0), |acc, f| acc.add(f));
            let density = sum.normalized(1.0)[head];
            let mean_at_head = sum[head] / fields.len() as f64;

            for field in &fields {
                let mine = field[head];
                let mut weight = if mean_at_head > 0.0 { mine / mean_at_head } else { 0.0 };
                weight *= density;
                for rival in arena.rivals() {
                    let theirs = match rival.head() {
                        Some(rival_head) => strength_at(field, rival_head, cfg.spread_decline),
                        None => continue,
                    };
                    if theirs >= mine {
                        let ratio = if theirs > 0.0 { mine / theirs } else { 0.0 };
                        weight *= cfg.competitive_discount * ratio;
                    }
                }
                merged = merged.max_with(&field.scale(weight));
            }
        }
    }

    let mut result = merged.scale(cfg.correction);
    for (at, cell) in arena.cells().iter() {
        if cell.object == Object::Trap {
            result[at] += cfg.trap_value;
        }
    }
    result
}

/// Field strength as seen from a rival's head. The head itself blocks the
/// distance search, so it is reached one step past its best open neighbour.
fn strength_at(field: &Grid<f64>, at: Coord, decline: f64) -> f64 {
    let through_neighbour = at
        .neighbours()
        .iter()
        .filter_map(|n| field.get(*n).copied())
        .fold(0.0, f64::max)
        * decline;
    field.get(at).copied().unwrap_or(0.0).max(through_neighbour)
}

/// Pull towards the board centre: full value within the inner radius,
/// falling linearly to zero at the board radius
pub fn center_value_field(arena: &Arena, config: &Config) -> Grid<f64> {
    let cfg = &config.center;
    let inner = cfg.inner_radius;
    let outer = config.board.radius();
    distance_field(arena, board_center(arena)).map(|&d| {
        if d < 0 {
            0.0
        } else if d <= inner {
            cfg.value + cfg.inner_bonus
        } else if outer == inner {
            0.0
        } else {
            (cfg.value * (d - outer) as f64 / (inner - outer) as f64).max(0.0)
        }
    })
}
