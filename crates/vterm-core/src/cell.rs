use bitflags::bitflags;

bitflags! {
    /// Per-cell style bits, mirroring the subset of `alacritty_terminal`'s own
    /// cell flags that a snapshot consumer needs without pulling in the whole
    /// `Term` grid type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u16 {
        const BOLD        = 0b0000_0001;
        const ITALIC      = 0b0000_0010;
        const UNDERLINE   = 0b0000_0100;
        const INVERSE     = 0b0000_1000;
        const STRIKEOUT   = 0b0001_0000;
        const DIM         = 0b0010_0000;
        /// Left half of a double-width (CJK/emoji) glyph. The following cell
        /// is a placeholder and must not be drawn.
        const WIDE_CHAR   = 0b0100_0000;
        const WIDE_SPACER = 0b1000_0000;
    }
}

/// One grid position: a character plus its resolved foreground/background
/// and style flags. `hyperlink_id` is `0` for "no hyperlink"; nonzero ids are
/// assigned by the terminal's URL detector and index into a side table the
/// host can resolve to a URL string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub character: char,
    pub fg: crate::Color,
    pub bg: crate::Color,
    pub flags: CellFlags,
    pub hyperlink_id: u32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            character: ' ',
            fg: crate::Color::WHITE,
            bg: crate::Color::BLACK,
            flags: CellFlags::empty(),
            hyperlink_id: 0,
        }
    }
}

impl Cell {
    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CHAR)
    }

    pub fn is_wide_spacer(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_SPACER)
    }
}
