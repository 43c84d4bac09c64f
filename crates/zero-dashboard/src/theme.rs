use crossterm::style::Color;

// Status colors
pub const PENDING: Color = Color::DarkGrey;
pub const ACTIVE: Color = Color::Yellow;
pub const COMPLETE: Color = Color::Green;
pub const FAILED: Color = Color::Red;

// Chrome
pub const DIM: Color = Color::DarkGrey;
pub const HEADING: Color = Color::Cyan;

pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub const ICON_PENDING: char = '○';
pub const ICON_CLONING: char = '*';
pub const ICON_COMPLETE: char = '✓';
pub const ICON_FAILED: char = '✗';
