//! # Vault Templates
//!
//! Parsing and orientation of hand-authored vault rooms.
//!
//! A template is a rectangular block of text where every character is one
//! cell:
//!
//! | Char | Terrain | Place |
//! |------|---------|-------|
//! | `#`  | wall | |
//! | `.`  | floor | |
//! | `"`  | foliage | |
//! | `:`  | rubble | |
//! | `W`  | translucent wall | |
//! | `+`  | wall until a tunnel claims it | entry point |
//! | `P`  | floor | patrol waypoint |
//! | `!`  | floor | item spot |
//! | `_`  | floor | static object spot |
//! | `?`  | existing terrain is kept | |
//!
//! Parsed templates are immutable; rotating or mirroring one returns a new
//! value.

use crate::{DelveError, DelveResult, Position, TerrainKind};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What a named spot inside a vault is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceKind {
    /// Tunnel attachment point on the vault border
    Entry,
    /// Spot for an item
    Item,
    /// Spot for a static object such as a totem or portal
    StaticObject,
    /// Patrol waypoint for wandering monsters
    Patrol,
}

/// A named spot of a template or placed vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Place {
    pub pos: Position,
    pub kind: PlaceKind,
}

/// One cell of a template pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateCell {
    /// Stamp this terrain kind
    Terrain(TerrainKind),
    /// Leave whatever terrain is already there
    Keep,
}

/// Orientation applied to a template before placement.
///
/// The mirror (left-right flip) is applied first, then `quarter_turns`
/// clockwise rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Transform {
    pub quarter_turns: u8,
    pub mirrored: bool,
}

impl Transform {
    /// Picks a random orientation for a `width` x `height` template.
    ///
    /// Near-square templates take any rotation; very elongated ones are turned
    /// sideways only rarely since the level is much wider than tall.
    pub fn random<R: Rng>(rng: &mut R, width: i32, height: i32) -> Self {
        let long = width.max(height);
        let short = width.min(height);
        let sideways_one_in = if long - short <= 2 {
            2
        } else if long >= 2 * short {
            8
        } else {
            3
        };

        let base = if rng.gen_range(0..sideways_one_in) == 0 { 1 } else { 0 };
        let quarter_turns = base + 2 * rng.gen_range(0..2u8);

        Self {
            quarter_turns,
            mirrored: rng.gen_bool(0.5),
        }
    }
}

/// A parsed vault pattern with its named places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultTemplate {
    width: i32,
    height: i32,
    cells: Vec<TemplateCell>,
    places: Vec<Place>,
}

impl VaultTemplate {
    /// Parses a template from its text form.
    ///
    /// Blank leading and trailing lines and trailing whitespace are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{PlaceKind, VaultTemplate};
    ///
    /// let template = VaultTemplate::parse("#+#\n+P+\n###").unwrap();
    /// assert_eq!((template.width(), template.height()), (3, 3));
    /// assert_eq!(template.places_of(PlaceKind::Entry).count(), 3);
    /// ```
    pub fn parse(text: &str) -> DelveResult<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .skip_while(|line| line.is_empty())
            .collect();
        let rows: Vec<&str> = match rows.iter().rposition(|line| !line.is_empty()) {
            Some(last) => rows[..=last].to_vec(),
            None => {
                return Err(DelveError::InvalidTemplate("template is empty".to_string()));
            }
        };

        let width = rows[0].chars().count();
        let mut cells = Vec::with_capacity(width * rows.len());
        let mut places = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(DelveError::InvalidTemplate(format!(
                    "row {} has width {}, expected {}",
                    y,
                    row.chars().count(),
                    width
                )));
            }
            for (x, glyph) in row.chars().enumerate() {
                let pos = Position::new(x as i32, y as i32);
                let (cell, place) = parse_glyph(glyph).ok_or_else(|| {
                    DelveError::InvalidTemplate(format!(
                        "unknown cell '{}' at ({}, {})",
                        glyph, x, y
                    ))
                })?;
                cells.push(cell);
                if let Some(kind) = place {
                    places.push(Place { pos, kind });
                }
            }
        }

        let template = Self {
            width: width as i32,
            height: rows.len() as i32,
            cells,
            places,
        };

        if template.places_of(PlaceKind::Entry).next().is_none() {
            return Err(DelveError::InvalidTemplate(
                "template has no entry point".to_string(),
            ));
        }
        if let Some(entry) = template
            .places_of(PlaceKind::Entry)
            .find(|&pos| !template.on_edge(pos))
        {
            return Err(DelveError::InvalidTemplate(format!(
                "entry point {:?} is not on the template border",
                entry
            )));
        }

        Ok(template)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// The cell at a template-local position.
    pub fn cell(&self, pos: Position) -> TemplateCell {
        self.cells[(pos.y * self.width + pos.x) as usize]
    }

    /// All named places in template-local coordinates.
    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// Template-local positions of places of one kind.
    pub fn places_of(&self, kind: PlaceKind) -> impl Iterator<Item = Position> + '_ {
        self.places
            .iter()
            .filter(move |place| place.kind == kind)
            .map(|place| place.pos)
    }

    /// Iterates over `(local position, cell)` pairs row by row.
    pub fn cells(&self) -> impl Iterator<Item = (Position, TemplateCell)> + '_ {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, &cell)| {
            let index = index as i32;
            (Position::new(index % width, index / width), cell)
        })
    }

    fn on_edge(&self, pos: Position) -> bool {
        pos.x == 0 || pos.y == 0 || pos.x == self.width - 1 || pos.y == self.height - 1
    }

    /// Returns a copy rotated clockwise by `quarter_turns` quarter turns.
    pub fn rotated(&self, quarter_turns: u8) -> Self {
        (0..quarter_turns % 4).fold(self.clone(), |template, _| {
            // (x, y) -> (h - 1 - y, x)
            let height = template.height;
            template.remap(template.height, template.width, |pos| {
                Position::new(height - 1 - pos.y, pos.x)
            })
        })
    }

    /// Returns a copy flipped left to right.
    pub fn mirrored(&self) -> Self {
        let width = self.width;
        self.remap(self.width, self.height, |pos| {
            Position::new(width - 1 - pos.x, pos.y)
        })
    }

    /// Returns a copy with the transform applied.
    pub fn transformed(&self, transform: Transform) -> Self {
        let oriented = if transform.mirrored {
            self.mirrored()
        } else {
            self.clone()
        };
        oriented.rotated(transform.quarter_turns)
    }

    fn remap(&self, width: i32, height: i32, map: impl Fn(Position) -> Position) -> Self {
        let mut cells = vec![TemplateCell::Keep; (width * height) as usize];
        for (pos, cell) in self.cells() {
            let target = map(pos);
            cells[(target.y * width + target.x) as usize] = cell;
        }
        let places = self
            .places
            .iter()
            .map(|place| Place {
                pos: map(place.pos),
                kind: place.kind,
            })
            .collect();

        Self {
            width,
            height,
            cells,
            places,
        }
    }
}

fn parse_glyph(glyph: char) -> Option<(TemplateCell, Option<PlaceKind>)> {
    use TemplateCell::{Keep, Terrain};

    let parsed = match glyph {
        '#' => (Terrain(TerrainKind::Wall), None),
        '.' => (Terrain(TerrainKind::Floor), None),
        '"' => (Terrain(TerrainKind::Foliage), None),
        ':' => (Terrain(TerrainKind::Rubble), None),
        'W' => (Terrain(TerrainKind::TranslucentWall), None),
        '+' => (Terrain(TerrainKind::Wall), Some(PlaceKind::Entry)),
        'P' => (Terrain(TerrainKind::Floor), Some(PlaceKind::Patrol)),
        '!' => (Terrain(TerrainKind::Floor), Some(PlaceKind::Item)),
        '_' => (Terrain(TerrainKind::Floor), Some(PlaceKind::StaticObject)),
        '?' => (Keep, None),
        _ => return None,
    };
    Some(parsed)
}

/// Size class of a vault request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultSize {
    Big,
    Small,
}

/// The candidate templates for each size class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLibrary {
    big: Vec<VaultTemplate>,
    small: Vec<VaultTemplate>,
}

impl VaultLibrary {
    /// Parses a library from template texts.
    pub fn from_texts<B, S>(big: B, small: S) -> DelveResult<Self>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let big = big
            .into_iter()
            .map(|text| VaultTemplate::parse(text.as_ref()))
            .collect::<DelveResult<Vec<_>>>()?;
        let small = small
            .into_iter()
            .map(|text| VaultTemplate::parse(text.as_ref()))
            .collect::<DelveResult<Vec<_>>>()?;
        Ok(Self { big, small })
    }

    /// The templates shipped with the crate.
    ///
    /// # Panics
    ///
    /// Never in practice: the built-in texts are checked by the unit tests of
    /// this module.
    pub fn builtin() -> Self {
        Self::from_texts(BIG_VAULTS, SMALL_VAULTS).expect("built-in vault templates parse")
    }

    /// Candidate templates for a size class.
    pub fn templates(&self, size: VaultSize) -> &[VaultTemplate] {
        match size {
            VaultSize::Big => &self.big,
            VaultSize::Small => &self.small,
        }
    }
}

impl Default for VaultLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Built-in big vault templates.
pub const BIG_VAULTS: [&str; 6] = [
    "
####+#######
#P.........#
#..##..##..#
+..#!..._#.+
#..##..##..#
#.........P#
#######+####
",
    "
#####+#####
##.......##
#P..#W#..P#
+...W_W...+
#...#.#...#
##...!...##
#####+#####
",
    r##"
###+######+###
#""..P.....""#
#"#..#..#..#"#
+....!._.....+
#"#..#..#..#"#
#""..P.....""#
###+######+###
"##,
    "
##+#################+##
#P.....:...W...:.....P#
#.####.###.!.###.####.#
#......._..........._.#
######+#######+########
",
    "
####+####
##.....##
#P.._..P#
+...!...+
#.......#
##.....##
####+####
",
    "
#####+######+#####
#P....#....#....P#
#.._......!...._.#
#.....#....#.....#
###+############+#
",
];

/// Built-in small vault templates.
pub const SMALL_VAULTS: [&str; 8] = [
    "
##+##
#...#
+.P.+
#.!.#
##+##
",
    "
###+###
#P...:#
+..._.#
#######
",
    "
#+##
#P.#
#.!+
####
",
    r##"
##+###
#"".P#
+."".+
######
"##,
    "
##+####
#P.W.P#
+.._..+
###+###
",
    "
#+#####
#.P..!#
#.###.#
#..P..+
#######
",
    "
####
+P.#
#!.+
####
",
    "
##+##
#:.:#
#.P.#
+._.+
##+##
",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cardinal_neighbors, Rect};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn walkable(cell: TemplateCell) -> bool {
        match cell {
            TemplateCell::Terrain(kind) => kind.is_passable(),
            TemplateCell::Keep => true,
        }
    }

    /// Every entry must touch the interior and the interior must be one piece.
    fn assert_well_formed(template: &VaultTemplate) {
        let bounds = Rect::new(0, 0, template.width(), template.height());
        let entries: HashSet<Position> = template.places_of(PlaceKind::Entry).collect();
        let open: Vec<Position> = template
            .cells()
            .filter(|&(pos, cell)| walkable(cell) || entries.contains(&pos))
            .map(|(pos, _)| pos)
            .collect();

        let mut seen = HashSet::from([open[0]]);
        let mut stack = vec![open[0]];
        while let Some(pos) = stack.pop() {
            for next in cardinal_neighbors(bounds, pos) {
                let cell = template.cell(next);
                if (walkable(cell) || entries.contains(&next)) && seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        assert_eq!(seen.len(), open.len(), "disconnected template {:?}", template);

        for &entry in &entries {
            assert!(
                cardinal_neighbors(bounds, entry).any(|next| walkable(template.cell(next))),
                "entry {:?} does not touch the interior",
                entry
            );
        }
    }

    #[test]
    fn test_builtin_library_is_well_formed() {
        let library = VaultLibrary::builtin();
        assert_eq!(library.templates(VaultSize::Big).len(), BIG_VAULTS.len());
        assert_eq!(library.templates(VaultSize::Small).len(), SMALL_VAULTS.len());
        for template in library
            .templates(VaultSize::Big)
            .iter()
            .chain(library.templates(VaultSize::Small))
        {
            assert_well_formed(template);
            assert!(template.places_of(PlaceKind::Patrol).next().is_some());
        }
    }

    #[test]
    fn test_foliage_templates_parse() {
        let foliage = TemplateCell::Terrain(TerrainKind::Foliage);

        let big = VaultTemplate::parse(BIG_VAULTS[2]).unwrap();
        assert_eq!((big.width(), big.height()), (14, 7));
        for x in [1, 2, 11, 12] {
            assert_eq!(big.cell(Position::new(x, 1)), foliage);
            assert_eq!(big.cell(Position::new(x, 5)), foliage);
        }
        assert_eq!(big.places_of(PlaceKind::Entry).count(), 6);
        assert_eq!(big.places_of(PlaceKind::Patrol).count(), 2);

        let small = VaultTemplate::parse(SMALL_VAULTS[3]).unwrap();
        assert_eq!((small.width(), small.height()), (6, 4));
        assert_eq!(small.cell(Position::new(1, 1)), foliage);
        assert_eq!(small.cell(Position::new(3, 2)), foliage);
        assert_eq!(
            small.places_of(PlaceKind::Patrol).collect::<Vec<_>>(),
            vec![Position::new(4, 1)]
        );
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let result = VaultTemplate::parse("#+#\n##\n###");
        assert!(matches!(result, Err(DelveError::InvalidTemplate(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_glyphs_and_missing_entries() {
        assert!(VaultTemplate::parse("#+#\n#x#\n###").is_err());
        assert!(VaultTemplate::parse("###\n#.#\n###").is_err());
        assert!(VaultTemplate::parse("#####\n#.+.#\n#####").is_err());
        assert!(VaultTemplate::parse("\n  \n").is_err());
    }

    #[test]
    fn test_parse_trims_blank_lines_and_keeps_cells() {
        let template = VaultTemplate::parse("\n\n#+#?\n#P!#\n\n").unwrap();
        assert_eq!((template.width(), template.height()), (4, 2));
        assert_eq!(template.cell(Position::new(3, 0)), TemplateCell::Keep);
        assert_eq!(
            template.cell(Position::new(1, 0)),
            TemplateCell::Terrain(TerrainKind::Wall)
        );
        let patrols: Vec<_> = template.places_of(PlaceKind::Patrol).collect();
        assert_eq!(patrols, vec![Position::new(1, 1)]);
    }

    #[test]
    fn test_rotation_moves_cells_clockwise() {
        // 3x2:  +.#
        //       #P#
        let template = VaultTemplate::parse("+.#\n#P#").unwrap();
        let rotated = template.rotated(1);

        assert_eq!((rotated.width(), rotated.height()), (2, 3));
        // Top-left goes to top-right after a clockwise quarter turn.
        assert_eq!(rotated.places_of(PlaceKind::Entry).next(), Some(Position::new(1, 0)));
        assert_eq!(rotated.places_of(PlaceKind::Patrol).next(), Some(Position::new(0, 1)));
        assert_eq!(
            rotated.cell(Position::new(1, 1)),
            TemplateCell::Terrain(TerrainKind::Floor)
        );
        assert_eq!(template.rotated(4), template);
        assert_eq!(template.rotated(1).rotated(3), template);
    }

    #[test]
    fn test_mirror_and_transform_leave_source_untouched() {
        let template = VaultTemplate::parse("+.#\n#P#").unwrap();
        let snapshot = template.clone();

        let mirrored = template.mirrored();
        assert_eq!(mirrored.places_of(PlaceKind::Entry).next(), Some(Position::new(2, 0)));
        assert_eq!(mirrored.mirrored(), template);

        let transformed = template.transformed(Transform {
            quarter_turns: 2,
            mirrored: true,
        });
        // Mirror then half turn is a vertical flip.
        assert_eq!(transformed.places_of(PlaceKind::Entry).next(), Some(Position::new(0, 1)));
        assert_eq!(template, snapshot);
    }

    #[test]
    fn test_random_transform_rarely_turns_wide_templates() {
        let mut rng = StdRng::seed_from_u64(5);
        let sideways = (0..4000)
            .filter(|_| Transform::random(&mut rng, 23, 5).quarter_turns % 2 == 1)
            .count();
        let square_sideways = (0..4000)
            .filter(|_| Transform::random(&mut rng, 9, 7).quarter_turns % 2 == 1)
            .count();

        assert!(sideways < 800, "wide templates turned {} times", sideways);
        assert!(square_sideways > 1600, "square templates turned {} times", square_sideways);
    }
}
