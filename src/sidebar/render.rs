use super::{AnnotationItem, AnnotationTree, MarkerStyle};

const BRANCH: &str = "\u{251c}\u{2500}\u{2500} ";
const LAST_BRANCH: &str = "\u{2514}\u{2500}\u{2500} ";
const PIPE: &str = "\u{2502}   ";
const BLANK: &str = "    ";

/// ANSI color codes
struct Color;

impl Color {
    const RESET: &'static str = "\x1b[0m";
    const BOLD: &'static str = "\x1b[1m";
    const DIM: &'static str = "\x1b[2m";
    const UNDERLINE: &'static str = "\x1b[4m";
    const REVERSE: &'static str = "\x1b[7m";
}

/// Render the tree as indented text with box-drawing connectors
pub fn render_tree(tree: &AnnotationTree, use_color: bool) -> String {
    let mut lines = Vec::new();

    for section in &tree.sections {
        let indent = "  ".repeat(section.depth);
        let title = if section.header.title.is_empty() {
            "(untitled)"
        } else {
            section.header.title.as_str()
        };
        if use_color {
            lines.push(format!("{}{}{}{}", indent, Color::BOLD, title, Color::RESET));
        } else {
            lines.push(format!("{}{}", indent, title));
        }

        let total = section.items.len();
        for (idx, item) in section.items.iter().enumerate() {
            let is_last = idx + 1 == total;
            let connector = if is_last { LAST_BRANCH } else { BRANCH };
            let child_prefix = if is_last { BLANK } else { PIPE };

            lines.push(format!("{}{}{}", indent, connector, preview(item, use_color)));
            lines.push(format!("{}{}{}", indent, child_prefix, details(item, use_color)));
        }
    }

    lines.join("\n")
}

fn preview(item: &AnnotationItem, use_color: bool) -> String {
    let text = item.preview.trim();
    if !use_color {
        return format!("\"{}\"", text);
    }
    let style = match item.style {
        MarkerStyle::Underline { .. } => Color::UNDERLINE,
        MarkerStyle::Fill { .. } => Color::REVERSE,
    };
    format!("{}{}{}", style, text, Color::RESET)
}

fn details(item: &AnnotationItem, use_color: bool) -> String {
    let line = format!(
        "{} \u{00b7} {} \u{00b7} {}",
        item.progression_label, item.timestamp, item.id
    );
    if use_color {
        format!("{}{}{}", Color::DIM, line, Color::RESET)
    } else {
        line
    }
}
