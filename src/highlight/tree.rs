//! Detection of directory-tree style output.

const BOX_DRAWING: [char; 4] = ['├', '└', '│', '─'];

/// True when more than 30% of the lines contain a box-drawing character.
///
/// A shell script that prints box characters in string literals can trip
/// this; callers get tree coloring for it.
pub fn is_tree_output(code: &str) -> bool {
    let mut total = 0usize;
    let mut boxed = 0usize;
    for line in code.lines() {
        total += 1;
        if line.contains(BOX_DRAWING) {
            boxed += 1;
        }
    }
    total > 0 && boxed * 10 > total * 3
}
