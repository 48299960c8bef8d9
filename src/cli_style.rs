use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
    let failure = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
        )
        .invalid(failure)
        .error(failure)
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette - engraving ink on staff paper
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const GOLD: Color = Color::Rgb {
        r: 212,
        g: 175,
        b: 55,
    };
    pub const INK: Color = Color::Rgb {
        r: 230,
        g: 230,
        b: 230,
    };
    pub const STAFF: Color = Color::Rgb {
        r: 110,
        g: 140,
        b: 200,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 80,
        g: 200,
        b: 120,
    };
    pub const ORANGE: Color = Color::Rgb {
        r: 255,
        g: 165,
        b: 0,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
}

mod glyphs {
    pub const TOP_LEFT: &str = "╭";
    pub const TOP_RIGHT: &str = "╮";
    pub const BOTTOM_LEFT: &str = "╰";
    pub const BOTTOM_RIGHT: &str = "╯";
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    pub const NOTE: &str = "♪";
    pub const EMPTY: &str = "○";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        glyphs::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    eprintln!(
        " {} {}",
        glyphs::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sections and key/value blocks
// ═══════════════════════════════════════════════════════════════════════════════

const SECTION_WIDTH: usize = 60;

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;
    let rest = SECTION_WIDTH.saturating_sub(title_len + 4 + padding);

    println!();
    println!(
        "{}{} {} {}{}",
        glyphs::TOP_LEFT.with(colors::GOLD),
        glyphs::HORIZONTAL.repeat(padding).with(colors::GOLD),
        title.with(colors::GOLD).bold().attribute(Attribute::Italic),
        glyphs::HORIZONTAL.repeat(rest).with(colors::GOLD),
        glyphs::TOP_RIGHT.with(colors::GOLD)
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        glyphs::BOTTOM_LEFT.with(colors::GOLD),
        glyphs::HORIZONTAL.repeat(SECTION_WIDTH).with(colors::GOLD),
        glyphs::BOTTOM_RIGHT.with(colors::GOLD)
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        glyphs::NOTE.with(colors::STAFF),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::INK)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        glyphs::EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

/// A box-drawn table whose column widths follow the display width of cells,
/// so composer names with accents or CJK characters stay aligned.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| h.width()).collect(),
        }
    }

    pub fn add_row<S: AsRef<str>>(&mut self, row: &[S]) {
        let row: Vec<String> = row
            .iter()
            .take(self.col_widths.len())
            .map(|cell| cell.as_ref().to_string())
            .collect();
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    fn border(&self, left: &str, joint: &str, right: &str) -> String {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|w| glyphs::HORIZONTAL.repeat(w + 2))
            .collect();
        format!("{}{}{}", left, segments.join(joint), right)
    }

    fn line(&self, cells: &[String]) -> String {
        let mut out = String::from(glyphs::VERTICAL);
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            out.push(' ');
            out.push_str(cell);
            out.push_str(&" ".repeat(width.saturating_sub(cell.width()) + 1));
            out.push_str(glyphs::VERTICAL);
        }
        out
    }

    /// Plain-text rendering, one string per terminal line.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.border(glyphs::TOP_LEFT, glyphs::T_TOP, glyphs::TOP_RIGHT),
            self.line(&self.headers),
            self.border(glyphs::T_LEFT, glyphs::CROSS, glyphs::T_RIGHT),
        ];
        lines.extend(self.rows.iter().map(|row| self.line(row)));
        lines.push(self.border(glyphs::BOTTOM_LEFT, glyphs::T_BOTTOM, glyphs::BOTTOM_RIGHT));
        lines
    }

    pub fn print(&self) {
        for (i, line) in self.render_lines().into_iter().enumerate() {
            // Header row in gold, frame and body in ink
            if i == 1 {
                println!("{}", line.with(colors::GOLD).bold());
            } else {
                println!("{}", line.with(colors::INK));
            }
        }
    }
}
