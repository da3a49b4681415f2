use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::{DEFAULT_FOV_DEG, Pose};

/// Errors raised while building or loading a level.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("grid is empty")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("floor grid is {found:?}, wall grid is {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("border cell ({x}, {y}) is open")]
    OpenBorder { x: usize, y: usize },
    #[error("spawn ({x:.2}, {y:.2}) is not on an open cell")]
    BlockedSpawn { x: f32, y: f32 },
    #[error("invalid cell character {0:?}")]
    BadCell(char),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rectangular row-major grid addressed as `(x, y)`, rows running along y.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, MapError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(MapError::Empty);
        }
        let mut cells = Vec::with_capacity(width * height);
        for (row, r) in rows.into_iter().enumerate() {
            if r.len() != width {
                return Err(MapError::Ragged {
                    row,
                    expected: width,
                    found: r.len(),
                });
            }
            cells.extend(r);
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Bounds-checked read; `None` outside the grid.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<T> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.cells[y as usize * self.width + x as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &c)| (i % self.width, i / self.width, c))
    }

    fn set(&mut self, x: usize, y: usize, value: T) {
        self.cells[y * self.width + x] = value;
    }
}

/// Wall ids: 0 is open floor, anything else names a wall texture.
pub type WallGrid = Grid<u16>;

/// Floor surface variant per cell (0 base floor, 1 carpet, ...).
pub type FloorGrid = Grid<u8>;

impl WallGrid {
    /// True when the cell is inside the grid and has no wall.
    #[inline]
    pub fn is_open(&self, x: i32, y: i32) -> bool {
        self.get(x, y) == Some(0)
    }

    /// Parses rows of digits, one cell per character.
    pub fn from_digit_rows(rows: &[&str]) -> Result<Self, MapError> {
        Self::from_rows(parse_digits(rows)?)
    }
}

impl FloorGrid {
    pub fn from_digit_rows(rows: &[&str]) -> Result<Self, MapError> {
        let rows = parse_digits(rows)?
            .into_iter()
            .map(|r| r.into_iter().map(|c| c as u8).collect())
            .collect();
        Self::from_rows(rows)
    }
}

fn parse_digits(rows: &[&str]) -> Result<Vec<Vec<u16>>, MapError> {
    rows.iter()
        .map(|row| {
            row.chars()
                .map(|c| c.to_digit(10).map(|d| d as u16).ok_or(MapError::BadCell(c)))
                .collect()
        })
        .collect()
}

/// Static billboard prop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub x: f32,
    pub y: f32,
    pub texture: u16,
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Downward shift as a fraction of the unscaled sprite height.
    #[serde(default)]
    pub v_offset: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Sprite {
    pub fn new(x: f32, y: f32, texture: u16) -> Self {
        Self {
            x,
            y,
            texture,
            scale: 1.0,
            v_offset: 0.0,
        }
    }

    pub fn scaled(mut self, scale: f32, v_offset: f32) -> Self {
        self.scale = scale;
        self.v_offset = v_offset;
        self
    }
}

/// Everything immutable about a session: walls, floors, props and the spawn pose.
#[derive(Debug, Clone)]
pub struct Level {
    pub walls: WallGrid,
    pub floors: FloorGrid,
    pub sprites: Vec<Sprite>,
    pub spawn: Pose,
}

/// On-disk level layout.
#[derive(Debug, Deserialize)]
struct LevelFile {
    walls: Vec<Vec<u16>>,
    #[serde(default)]
    floors: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    sprites: Vec<Sprite>,
    #[serde(default)]
    spawn: Option<SpawnFile>,
}

/// Spawn as written in level files. Without a plane the default 0.66 field of view is used.
#[derive(Debug, Deserialize)]
struct SpawnFile {
    x: f32,
    y: f32,
    #[serde(default = "west")]
    dir_x: f32,
    #[serde(default)]
    dir_y: f32,
    plane_x: Option<f32>,
    plane_y: Option<f32>,
}

fn west() -> f32 {
    -1.0
}

impl SpawnFile {
    fn into_pose(self) -> Pose {
        let pos = [self.x, self.y];
        let dir = [self.dir_x, self.dir_y];
        match (self.plane_x, self.plane_y) {
            (Some(px), Some(py)) => Pose::new(pos, dir, [px, py]),
            _ => Pose::looking(pos, dir, DEFAULT_FOV_DEG),
        }
    }
}

impl Level {
    /// Validates shape, border and spawn before accepting the level.
    pub fn new(
        walls: WallGrid,
        floors: FloorGrid,
        sprites: Vec<Sprite>,
        spawn: Pose,
    ) -> Result<Self, MapError> {
        if floors.dims() != walls.dims() {
            return Err(MapError::ShapeMismatch {
                expected: walls.dims(),
                found: floors.dims(),
            });
        }

        let (w, h) = walls.dims();
        for (x, y, id) in walls.iter() {
            let border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            if border && id == 0 {
                return Err(MapError::OpenBorder { x, y });
            }
        }

        let (sx, sy) = spawn.cell();
        if !walls.is_open(sx, sy) {
            return Err(MapError::BlockedSpawn {
                x: spawn.pos[0],
                y: spawn.pos[1],
            });
        }

        for s in &sprites {
            if walls.get(s.x.floor() as i32, s.y.floor() as i32).is_none() {
                tracing::warn!("sprite at ({:.1}, {:.1}) lies outside the grid", s.x, s.y);
            }
        }

        Ok(Self {
            walls,
            floors,
            sprites,
            spawn,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, MapError> {
        let file: LevelFile = serde_json::from_str(text)?;
        let walls = WallGrid::from_rows(file.walls)?;
        let floors = match file.floors {
            Some(rows) => FloorGrid::from_rows(rows)?,
            None => FloorGrid::filled(walls.width(), walls.height(), 0),
        };
        let spawn = file.spawn.map_or_else(Pose::default, SpawnFile::into_pose);
        Self::new(walls, floors, file.sprites, spawn)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let level = Self::from_json(&text)?;
        tracing::info!(
            "loaded level {} ({}x{}, {} sprites)",
            path.as_ref().display(),
            level.walls.width(),
            level.walls.height(),
            level.sprites.len()
        );
        Ok(level)
    }

    /// Built-in 24x24 maze with a carpeted hall and a few props.
    pub fn default_level() -> Result<Self, MapError> {
        let walls = WallGrid::from_digit_rows(&DEFAULT_WALLS)?;
        let mut floors = FloorGrid::filled(walls.width(), walls.height(), 0);
        for y in 9..=15 {
            for x in 10..=14 {
                floors.set(x, y, 1);
            }
        }
        let sprites = vec![
            Sprite::new(20.5, 11.5, 0),
            Sprite::new(12.5, 12.5, 0),
            Sprite::new(18.5, 12.5, 1).scaled(0.5, 0.5),
            Sprite::new(12.5, 11.5, 2).scaled(0.6, 0.3),
            Sprite::new(4.5, 20.5, 1).scaled(0.5, 0.5),
        ];
        Self::new(walls, floors, sprites, Pose::default())
    }
}

const DEFAULT_WALLS: [&str; 24] = [
    "111111111111111111111111",
    "100000000000000000000001",
    "102220000000000033300001",
    "102000000000000000300001",
    "102000004440000000300001",
    "100000004000000000000001",
    "100000004000000555000001",
    "100000000000000505000001",
    "100600000000000000000001",
    "100000000000000000000001",
    "100000000000000000000001",
    "100000000000000000000001",
    "100000000000000000000001",
    "100000000000000000000001",
    "100000000000000000000001",
    "100000006000000000000001",
    "100000000000000222000001",
    "102220000000000202000001",
    "102000000330000000000001",
    "102000000330000000000001",
    "100000000000000000000001",
    "100004440000000000060001",
    "100000000000000000000001",
    "111111111111111111111111",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_valid() {
        let level = Level::default_level().expect("default level");
        assert_eq!(level.walls.dims(), (24, 24));
        assert!(level.walls.is_open(22, 12));
        assert_eq!(level.floors.get(12, 12), Some(1));
        assert_eq!(level.floors.get(2, 2), Some(0));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = WallGrid::from_rows(vec![vec![1, 1, 1], vec![1, 1]]).unwrap_err();
        assert!(matches!(
            err,
            MapError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn open_border_is_rejected() {
        let walls = WallGrid::from_digit_rows(&["111", "100", "111"]).unwrap();
        let floors = FloorGrid::filled(3, 3, 0);
        let err = Level::new(walls, floors, vec![], Pose::new([1.5, 1.5], [1.0, 0.0], [0.0, 0.66]))
            .unwrap_err();
        assert!(matches!(err, MapError::OpenBorder { x: 2, y: 1 }));
    }

    #[test]
    fn spawn_inside_wall_is_rejected() {
        let walls = WallGrid::from_digit_rows(&["1111", "1011", "1111"]).unwrap();
        let floors = FloorGrid::filled(4, 3, 0);
        let err = Level::new(walls, floors, vec![], Pose::new([2.5, 1.5], [1.0, 0.0], [0.0, 0.66]))
            .unwrap_err();
        assert!(matches!(err, MapError::BlockedSpawn { .. }));
    }

    #[test]
    fn floor_shape_must_match() {
        let walls = WallGrid::from_digit_rows(&["111", "101", "111"]).unwrap();
        let floors = FloorGrid::filled(4, 3, 0);
        let err = Level::new(walls, floors, vec![], Pose::new([1.5, 1.5], [1.0, 0.0], [0.0, 0.66]))
            .unwrap_err();
        assert!(matches!(err, MapError::ShapeMismatch { .. }));
    }

    #[test]
    fn json_level_fills_defaults() {
        let text = r#"{
            "walls": [[1,1,1,1],[1,0,0,1],[1,1,1,1]],
            "sprites": [{ "x": 2.5, "y": 1.5, "texture": 0 }],
            "spawn": { "x": 1.5, "y": 1.5, "dir_x": 1.0, "dir_y": 0.0, "plane_x": 0.0, "plane_y": 0.66 }
        }"#;
        let level = Level::from_json(text).expect("parse");
        assert_eq!(level.floors.dims(), (4, 3));
        assert_eq!(level.sprites[0].scale, 1.0);
        assert_eq!(level.sprites[0].v_offset, 0.0);
        assert_eq!(level.spawn.pos, [1.5, 1.5]);
        assert_eq!(level.spawn.dir, [1.0, 0.0]);
        assert_eq!(level.spawn.plane, [0.0, 0.66]);
    }

    #[test]
    fn spawn_without_plane_gets_default_fov() {
        let text = r#"{
            "walls": [[1,1,1,1],[1,0,0,1],[1,1,1,1]],
            "spawn": { "x": 2.5, "y": 1.5 }
        }"#;
        let spawn = Level::from_json(text).expect("parse").spawn;
        assert_eq!(spawn.dir, [-1.0, 0.0]);
        assert!(spawn.plane[0].abs() < 1e-6);
        assert!((spawn.plane[1] - 0.66).abs() < 1e-4);
    }

    #[test]
    fn spawn_missing_position_is_rejected() {
        let text = r#"{ "walls": [[1,1,1],[1,0,1],[1,1,1]], "spawn": { "dir_x": 1.0 } }"#;
        assert!(matches!(Level::from_json(text), Err(MapError::Json(_))));
    }

    #[test]
    fn bad_digit_reports_character() {
        let err = WallGrid::from_digit_rows(&["1x1"]).unwrap_err();
        assert!(matches!(err, MapError::BadCell('x')));
    }
}
