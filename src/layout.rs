use crate::coordinate::Coordinate;
use std::collections::BTreeMap;

/// Place `names` on a centred grid over the unit square.
///
/// Names keep their input order: the i-th name lands in row `i / cols`,
/// column `i % cols`, at the centre of its cell. Distinct indices always get
/// distinct coordinates.
pub fn generate_grid_layout<S: AsRef<str>>(names: &[S]) -> BTreeMap<String, Coordinate> {
    let mut layout = BTreeMap::new();
    let n = names.len();
    if n == 0 {
        return layout;
    }

    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);

    for (i, name) in names.iter().enumerate() {
        let row = i / cols;
        let col = i % cols;
        let x = (col as f64 + 0.5) / cols as f64;
        let y = (row as f64 + 0.5) / rows as f64;
        layout.insert(name.as_ref().to_string(), Coordinate::new(x, y));
    }

    layout
}
