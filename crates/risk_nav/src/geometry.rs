use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell on the grid. `y` grows downwards, so `Up` is `y - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn apply(self, action: Action) -> Self {
        match action {
            Action::Move(direction) => self.step(direction),
            Action::Stay => self,
        }
    }

    pub fn manhattan(self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    width: i32,
    height: i32,
}

impl GridDims {
    pub fn new(width: i32, height: i32) -> Result<Self, GridError> {
        if width <= 0 || height <= 0 {
            return Err(GridError::InvalidDims { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index, `None` outside the grid.
    pub fn index(&self, pos: GridPos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn center(&self) -> GridPos {
        GridPos::new(self.width / 2, self.height / 2)
    }

    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| GridPos::new(x, y)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    InvalidDims { width: i32, height: i32 },
    OutOfBounds { pos: GridPos, width: i32, height: i32 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::InvalidDims { width, height } => {
                write!(f, "grid dimensions must be positive, got {width}x{height}")
            }
            GridError::OutOfBounds { pos, width, height } => {
                write!(f, "cell {pos} is outside the {width}x{height} grid")
            }
        }
    }
}

impl std::error::Error for GridError {}

/// The four grid moves. `Direction::ALL` is the exploration order used by
/// every search, so ties always resolve the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

/// What the agent does on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Action {
    Move(Direction),
    /// Legal no-op, emitted when every neighbour is blocked.
    Stay,
}

impl Action {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Action::Move(direction) => Some(*direction),
            Action::Stay => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Move(direction) => direction.label(),
            Action::Stay => "STAY",
        }
    }
}

impl From<Direction> for Action {
    fn from(direction: Direction) -> Self {
        Action::Move(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_step_and_reverse() {
        let origin = GridPos::new(3, 3);
        for direction in Direction::ALL {
            let there = origin.step(direction);
            assert_eq!(origin.manhattan(there), 1);
            assert_eq!(there.step(direction.opposite()), origin);
        }
        assert_eq!(origin.step(Direction::Up), GridPos::new(3, 2));
        assert_eq!(origin.apply(Action::Stay), origin);
    }

    #[test]
    fn dims_index_row_major() {
        let dims = GridDims::new(4, 3).expect("dims");
        assert_eq!(dims.index(GridPos::new(0, 0)), Some(0));
        assert_eq!(dims.index(GridPos::new(3, 2)), Some(11));
        assert_eq!(dims.index(GridPos::new(4, 0)), None);
        assert_eq!(dims.cells().count(), dims.cell_count());
        assert_eq!(dims.center(), GridPos::new(2, 1));
        assert!(GridDims::new(0, 5).is_err());
    }

    #[test]
    fn action_labels() {
        assert_eq!(Action::from(Direction::Right).label(), "RIGHT");
        assert_eq!(Action::Stay.label(), "STAY");
        assert_eq!(Action::Stay.direction(), None);
    }
}
