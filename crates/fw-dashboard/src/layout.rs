use fw_core::Position;

/// One vertical slot of the dashboard. Indices point into the bus order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Full(usize),
    Columns { left: Vec<usize>, right: Vec<usize> },
}

impl Section {
    pub fn contains(&self, index: usize) -> bool {
        match self {
            Section::Full(i) => *i == index,
            Section::Columns { left, right } => left.contains(&index) || right.contains(&index),
        }
    }
}

/// Consecutive `left`/`right` blocks share a two-column row; a full-width
/// block closes the row.
pub fn sections(positions: &[Position]) -> Vec<Section> {
    let mut out: Vec<Section> = Vec::new();
    for (index, position) in positions.iter().enumerate() {
        match position {
            Position::Full => out.push(Section::Full(index)),
            Position::Left | Position::Right => {
                if !matches!(out.last(), Some(Section::Columns { .. })) {
                    out.push(Section::Columns {
                        left: Vec::new(),
                        right: Vec::new(),
                    });
                }
                if let Some(Section::Columns { left, right }) = out.last_mut() {
                    match position {
                        Position::Left => left.push(index),
                        _ => right.push(index),
                    }
                }
            }
        }
    }
    out
}

pub fn section_of(sections: &[Section], index: usize) -> Option<usize> {
    sections.iter().position(|section| section.contains(index))
}
