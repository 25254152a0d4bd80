//! Cell positions and the neighbor queries the depitter is built on

use std::fmt;

use depit_core::raster::d8::{Direction, NOVALUE, OUTLET};

use super::grid::DemGrid;

/// Position of a cell in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A cell bound to the grid it lives in, carrying its elevation at the
/// time it was read.
///
/// Two nodes are equal when they sit at the same position.
#[derive(Clone, Copy)]
pub struct GridNode<'a> {
    cell: Cell,
    elevation: f64,
    grid: &'a DemGrid,
}

impl<'a> GridNode<'a> {
    pub(crate) fn new(grid: &'a DemGrid, cell: Cell) -> Self {
        Self {
            cell,
            elevation: grid.elevation(cell),
            grid,
        }
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn row(&self) -> usize {
        self.cell.row
    }

    pub fn col(&self) -> usize {
        self.cell.col
    }

    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Whether this cell holds data
    pub fn is_valid(&self) -> bool {
        self.grid.is_valid_value(self.elevation)
    }

    /// In-bounds neighbor towards `dir`, valid or not
    pub fn neighbor(&self, dir: Direction) -> Option<GridNode<'a>> {
        self.grid
            .offset(self.cell, dir)
            .map(|cell| GridNode::new(self.grid, cell))
    }

    /// In-bounds neighbors holding data, in direction-code order.
    pub fn valid_neighbors(&self) -> impl Iterator<Item = (Direction, GridNode<'a>)> + 'a {
        let node = *self;
        Direction::ALL.into_iter().filter_map(move |dir| {
            node.neighbor(dir)
                .filter(GridNode::is_valid)
                .map(|n| (dir, n))
        })
    }

    /// Any of the eight neighbor positions is off the grid.
    pub fn touches_boundary(&self) -> bool {
        Direction::ALL
            .iter()
            .any(|&dir| self.grid.offset(self.cell, dir).is_none())
    }

    /// Any in-bounds neighbor holds no-data.
    pub fn touches_nodata(&self) -> bool {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.neighbor(dir))
            .any(|n| !n.is_valid())
    }

    /// Flow from this cell leaves the analysis domain.
    pub fn is_outlet(&self) -> bool {
        self.is_valid() && (self.touches_boundary() || self.touches_nodata())
    }

    /// Lowest elevation among the valid neighbors, `+inf` when there are none.
    pub fn surrounding_min(&self) -> f64 {
        self.valid_neighbors()
            .map(|(_, n)| n.elevation)
            .fold(f64::INFINITY, f64::min)
    }

    /// Local minimum, ties included: flats count as degenerate pits.
    pub fn is_pit(&self) -> bool {
        self.is_valid() && self.elevation <= self.surrounding_min()
    }

    /// Local minimum with respect to `candidates` only.
    ///
    /// An empty candidate set makes every node a pit.
    pub fn is_pit_relative_to<I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = GridNode<'a>>,
    {
        let min = candidates
            .into_iter()
            .map(|n| n.elevation)
            .fold(f64::INFINITY, f64::min);
        self.elevation <= min
    }

    /// D8 code of the neighbor with the steepest drop.
    ///
    /// The drop is `(own - neighbor) / distance`; on ties the lowest code
    /// wins. Outlets get [`OUTLET`], cells without data or without valid
    /// neighbors get [`NOVALUE`].
    pub fn steepest_descent(&self) -> i32 {
        if !self.is_valid() {
            return NOVALUE;
        }
        if self.is_outlet() {
            return OUTLET;
        }

        let mut best: Option<(f64, Direction)> = None;
        for (dir, n) in self.valid_neighbors() {
            let drop = (self.elevation - n.elevation) / self.grid.distance(dir);
            if best.map_or(true, |(max_drop, _)| drop > max_drop) {
                best = Some((drop, dir));
            }
        }

        best.map_or(NOVALUE, |(_, dir)| dir.code())
    }
}

impl PartialEq for GridNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl Eq for GridNode<'_> {}

impl fmt::Debug for GridNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridNode")
            .field("row", &self.cell.row)
            .field("col", &self.cell.col)
            .field("elevation", &self.elevation)
            .finish()
    }
}

/// First node of minimum elevation, in iteration order.
pub(crate) fn lowest<'a, I>(nodes: I) -> Option<GridNode<'a>>
where
    I: IntoIterator<Item = GridNode<'a>>,
{
    nodes.into_iter().fold(None, |best, n| match best {
        Some(b) if b.elevation <= n.elevation => Some(b),
        _ => Some(n),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use depit_core::{GeoTransform, Raster};

    fn grid(rows: usize, cols: usize, values: &[f64]) -> DemGrid {
        let mut dem = Raster::from_vec(values.to_vec(), rows, cols).unwrap();
        dem.set_nodata(Some(-9999.0));
        DemGrid::from_raster(&dem).unwrap()
    }

    const ND: f64 = -9999.0;

    #[test]
    fn test_valid_neighbors_skip_nodata_and_edges() {
        #[rustfmt::skip]
        let g = grid(3, 3, &[
            5.0, 5.0, 5.0,
            5.0, 4.0, ND,
            5.0, 5.0, 5.0,
        ]);

        let center = g.node(Cell::new(1, 1));
        let dirs: Vec<Direction> = center.valid_neighbors().map(|(d, _)| d).collect();
        assert_eq!(dirs.len(), 7);
        assert!(!dirs.contains(&Direction::E));

        let corner = g.node(Cell::new(0, 0));
        assert_eq!(corner.valid_neighbors().count(), 3);
    }

    #[test]
    fn test_boundary_and_nodata_contact() {
        #[rustfmt::skip]
        let g = grid(4, 4, &[
            9.0, 9.0, 9.0, 9.0,
            9.0, 5.0, 5.0, 9.0,
            9.0, 5.0, 5.0, ND,
            9.0, 9.0, 9.0, 9.0,
        ]);

        let edge = g.node(Cell::new(0, 2));
        assert!(edge.touches_boundary());
        assert!(edge.is_outlet());

        let inner = g.node(Cell::new(1, 1));
        assert!(!inner.touches_boundary());
        assert!(!inner.touches_nodata());
        assert!(!inner.is_outlet());

        let near_hole = g.node(Cell::new(1, 2));
        assert!(!near_hole.touches_boundary());
        assert!(near_hole.touches_nodata());
        assert!(near_hole.is_outlet());

        let hole = g.node(Cell::new(2, 3));
        assert!(!hole.is_valid());
        assert!(!hole.is_outlet());
        assert_eq!(hole.steepest_descent(), NOVALUE);
    }

    #[test]
    fn test_pit_counts_ties() {
        #[rustfmt::skip]
        let g = grid(3, 3, &[
            5.0, 5.0, 5.0,
            5.0, 5.0, 5.0,
            5.0, 5.0, 6.0,
        ]);
        let center = g.node(Cell::new(1, 1));
        assert_eq!(center.surrounding_min(), 5.0);
        assert!(center.is_pit());
        assert!(!g.node(Cell::new(2, 2)).is_pit());
    }

    #[test]
    fn test_surrounding_min_without_neighbors() {
        #[rustfmt::skip]
        let g = grid(3, 3, &[
            ND, ND, ND,
            ND, 1.0, ND,
            ND, ND, ND,
        ]);
        let lonely = g.node(Cell::new(1, 1));
        assert_eq!(lonely.surrounding_min(), f64::INFINITY);
        assert!(lonely.is_pit());
        assert_eq!(lonely.steepest_descent(), OUTLET);
    }

    #[test]
    fn test_pit_relative_to_subset() {
        #[rustfmt::skip]
        let g = grid(3, 3, &[
            3.0, 4.0, 4.0,
            4.0, 3.5, 4.0,
            4.0, 4.0, 4.0,
        ]);
        let center = g.node(Cell::new(1, 1));
        assert!(!center.is_pit());

        let without_corner = center
            .valid_neighbors()
            .map(|(_, n)| n)
            .filter(|n| n.cell() != Cell::new(0, 0));
        assert!(center.is_pit_relative_to(without_corner));
        assert!(center.is_pit_relative_to(std::iter::empty()));
    }

    #[test]
    fn test_steepest_descent_tie_takes_lowest_code() {
        #[rustfmt::skip]
        let g = grid(3, 3, &[
            9.0, 8.0, 9.0,
            8.0, 9.0, 8.0,
            9.0, 8.0, 9.0,
        ]);
        // E, N, W and S all drop by 1
        let center = g.node(Cell::new(1, 1));
        assert_eq!(center.steepest_descent(), Direction::E.code());
    }

    #[test]
    fn test_steepest_descent_weights_diagonals() {
        #[rustfmt::skip]
        let g = grid(3, 3, &[
            9.0, 9.0, 9.0,
            9.0, 9.0, 9.0,
            9.0, 8.2, 7.7,
        ]);
        // S: 0.8 / 1, SE: 1.3 / sqrt(2) = 0.919
        let center = g.node(Cell::new(1, 1));
        assert_eq!(center.steepest_descent(), Direction::SE.code());
    }

    #[test]
    fn test_steepest_descent_uses_anisotropic_resolution() {
        #[rustfmt::skip]
        let values = [
            9.0, 9.0, 9.0,
            9.0, 9.0, 8.0,
            9.0, 4.0, 9.0,
        ];
        let mut dem = Raster::from_vec(values.to_vec(), 3, 3).unwrap();

        dem.set_transform(GeoTransform::new(0.0, 0.0, 1.0, -1.0));
        let square = DemGrid::from_raster(&dem).unwrap();
        assert_eq!(square.node(Cell::new(1, 1)).steepest_descent(), Direction::S.code());

        // Rows 10 units apart: S drops 5 / 10, E drops 1 / 1
        dem.set_transform(GeoTransform::new(0.0, 0.0, 1.0, -10.0));
        let tall = DemGrid::from_raster(&dem).unwrap();
        assert_eq!(tall.node(Cell::new(1, 1)).steepest_descent(), Direction::E.code());
    }

    #[test]
    fn test_lowest_keeps_first_minimum() {
        #[rustfmt::skip]
        let g = grid(1, 4, &[3.0, 1.0, 1.0, 2.0]);
        let nodes = (0..4).map(|c| g.node(Cell::new(0, c)));
        assert_eq!(lowest(nodes).unwrap().cell(), Cell::new(0, 1));
        assert!(lowest(std::iter::empty()).is_none());
    }
}
