use pixmatrix_types::frame::GridSize;

/// Map a linear LED index to the grid coordinate it displays.
///
/// Rows of the strip alternate direction (even rows run right-to-left, odd
/// rows left-to-right) and strip row 0 is the bottom row of the grid, which
/// matches the usual zig-zag wiring of LED matrix panels.
///
/// `index` must lie in `[0, width * height)`.
pub fn map_index(index: usize, width: u32, height: u32) -> (u32, u32) {
    let width = width as usize;
    let height = height as usize;
    debug_assert!(
        index < width * height,
        "LED index {index} outside {width}x{height} grid"
    );

    let row = index / width;
    let col = if row % 2 == 0 {
        (width - 1) - (index % width)
    } else {
        index % width
    };
    (col as u32, ((height - 1) - row) as u32)
}

/// Precomputed LED order for fixed grid dimensions.
///
/// Entry `i` holds the row-major pixel offset that LED `i` displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTable {
    size: GridSize,
    offsets: Vec<usize>,
}

impl AddressTable {
    pub fn new(size: GridSize) -> Self {
        let offsets = (0..size.pixel_count())
            .map(|i| {
                let (x, y) = map_index(i, size.width, size.height);
                y as usize * size.width as usize + x as usize
            })
            .collect();
        Self { size, offsets }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Coordinates in LED order.
    pub fn coordinates(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.size.width as usize;
        self.offsets
            .iter()
            .map(move |offset| ((offset % width) as u32, (offset / width) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mapping_is_a_bijection() {
        for (width, height) in [(16, 16), (5, 3), (1, 7), (8, 1)] {
            let seen: HashSet<(u32, u32)> = (0..(width * height) as usize)
                .map(|i| map_index(i, width, height))
                .collect();
            assert_eq!(seen.len(), (width * height) as usize);
            assert!(seen.iter().all(|&(x, y)| x < width && y < height));
        }
    }

    #[test]
    fn rows_alternate_direction() {
        let (width, height) = (16u32, 16u32);
        for row in 0..height as usize {
            let xs: Vec<u32> = (0..width as usize)
                .map(|col| map_index(row * width as usize + col, width, height).0)
                .collect();
            let decreasing = xs.windows(2).all(|w| w[0] > w[1]);
            let increasing = xs.windows(2).all(|w| w[0] < w[1]);
            if row % 2 == 0 {
                assert!(decreasing, "row {row} should run right-to-left: {xs:?}");
            } else {
                assert!(increasing, "row {row} should run left-to-right: {xs:?}");
            }
        }
    }

    #[test]
    fn strip_starts_at_bottom_right() {
        assert_eq!(map_index(0, 16, 16), (15, 15));
        assert_eq!(map_index(15, 16, 16), (0, 15));
        assert_eq!(map_index(16, 16, 16), (0, 14));
        assert_eq!(map_index(240, 16, 16), (0, 0));
        assert_eq!(map_index(255, 16, 16), (15, 0));
    }

    #[test]
    fn table_matches_mapper() {
        let size = GridSize::new(4, 3);
        let table = AddressTable::new(size);
        let coords: Vec<_> = table.coordinates().collect();
        let expected: Vec<_> = (0..12).map(|i| map_index(i, 4, 3)).collect();
        assert_eq!(coords, expected);
        assert_eq!(table.offsets()[0], 2 * 4 + 3);
    }
}
