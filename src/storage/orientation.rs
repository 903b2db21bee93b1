/// Whether a vector's buffer holds a row or a column of its logical matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Row,
    Column,
}

impl Orientation {
    /// Returns the opposite orientation.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}
