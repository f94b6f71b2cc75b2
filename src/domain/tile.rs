/// Terrain tags and the tile-id classification table.
/// Properties are queried via methods, not stored as flags,
/// so terrain semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Terrain {
    Climbable,  // the surface the bot clings to
    Wall,       // impassable, cannot be jumped over
    Chasm,      // passable, drops you to the first climbable tile below
    Slippery,   // slide down until the bottom, can be jumped off
    Finish,
    Decoration,
}

/// Authored tile id → terrain. Index = tile id in the map's tileset.
const TILE_TAGS: [Terrain; 9] = [
    Terrain::Climbable,
    Terrain::Wall,
    Terrain::Decoration,
    Terrain::Decoration,
    Terrain::Chasm,
    Terrain::Slippery,
    Terrain::Decoration,
    Terrain::Decoration,
    Terrain::Chasm, // transition tile
];

impl Terrain {
    pub const ALL: [Terrain; 6] = [
        Terrain::Climbable,
        Terrain::Wall,
        Terrain::Chasm,
        Terrain::Slippery,
        Terrain::Finish,
        Terrain::Decoration,
    ];

    /// Classify an authored tile id. `None` means the map uses an id the
    /// table does not know, which the loader reports as an error.
    pub fn from_tile_id(id: u32) -> Option<Terrain> {
        TILE_TAGS.get(id as usize).copied()
    }

    /// Purely visual, never part of a collision response.
    pub fn is_decoration(self) -> bool {
        matches!(self, Terrain::Decoration)
    }

    pub fn name(self) -> &'static str {
        match self {
            Terrain::Climbable => "climbable",
            Terrain::Wall => "wall",
            Terrain::Chasm => "chasm",
            Terrain::Slippery => "slippery",
            Terrain::Finish => "finish",
            Terrain::Decoration => "decoration",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Zero or more terrain tags. Used both on obstacles and as a query filter,
/// where the empty set means "any tag".
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct TagSet(u8);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    pub fn of(tags: &[Terrain]) -> TagSet {
        tags.iter().fold(TagSet::EMPTY, |s, &t| s.with(t))
    }

    pub fn with(self, t: Terrain) -> TagSet {
        TagSet(self.0 | t.bit())
    }

    pub fn contains(self, t: Terrain) -> bool {
        self.0 & t.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Filter semantics: empty filter matches everything.
    pub fn matches(self, tags: TagSet) -> bool {
        self.is_empty() || self.0 & tags.0 != 0
    }

    /// First tag in declaration order.
    pub fn primary(self) -> Option<Terrain> {
        self.iter().next()
    }

    pub fn iter(self) -> impl Iterator<Item = Terrain> {
        Terrain::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}
