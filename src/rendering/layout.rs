/// Block layout of a DOM subtree at a fixed CSS width.
///
/// Elements stack vertically. Text wraps on a fixed character grid, tables
/// split their width evenly between cells, images and boxes with an explicit
/// `height` keep that height. Only inline `style` attributes are consulted.

use crate::Viewport;
use scraper::node::Node;
use scraper::ElementRef;

/// Glyph cell width at font scale 1, CSS px
pub const CHAR_WIDTH: u32 = 7;
/// Line height at font scale 1, CSS px
pub const LINE_HEIGHT: u32 = 14;
/// Height of an `<img>` without explicit sizing
pub const DEFAULT_IMAGE_HEIGHT: u32 = 120;
const CELL_PADDING: u32 = 4;

pub type Rgba = [u8; 4];

pub const TEXT_COLOR: Rgba = [17, 24, 39, 255];
const CELL_BORDER: Rgba = [209, 213, 219, 255];
const HEADER_CELL_FILL: Rgba = [243, 244, 246, 255];
const IMAGE_FILL: Rgba = [229, 231, 235, 255];
const IMAGE_BORDER: Rgba = [156, 163, 175, 255];

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxModel {
    pub margin: u32,
    pub border: u32,
    pub padding: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub rect: Rect,
    pub box_model: BoxModel,
}

impl LayoutBox {
    pub fn content_width(&self) -> u32 {
        let total = (self.box_model.border + self.box_model.padding) * 2;
        self.rect.width.saturating_sub(total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Heading,
    Paragraph,
    Cell,
    Block,
    Image,
    Rule,
}

/// Paint-relevant inline styles
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxStyle {
    pub background: Option<Rgba>,
    pub color: Option<Rgba>,
    pub border: Option<(u32, Rgba)>,
    pub height: Option<u32>,
    pub padding: Option<u32>,
}

impl BoxStyle {
    pub fn parse(style: &str) -> Self {
        let mut out = BoxStyle::default();
        for decl in style.split(';') {
            let Some((key, value)) = decl.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "background" | "background-color" => out.background = parse_css_color(value),
                "color" => out.color = parse_css_color(value),
                "height" => out.height = parse_px(value),
                "padding" => out.padding = parse_px(value),
                "border" => {
                    let mut width = None;
                    let mut color = None;
                    for part in value.split_whitespace() {
                        width = width.or_else(|| parse_px(part));
                        color = color.or_else(|| parse_css_color(part));
                    }
                    if let (Some(w), Some(c)) = (width, color) {
                        out.border = Some((w, c));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn of(el: &ElementRef) -> Self {
        el.value().attr("style").map(BoxStyle::parse).unwrap_or_default()
    }
}

/// Lengths are clamped to this many CSS px
pub const MAX_LENGTH_PX: u32 = 1 << 24;

/// `12px` or a bare number
pub fn parse_px(value: &str) -> Option<u32> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v).trim();
    v.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round().min(MAX_LENGTH_PX as f64) as u32)
}

/// `#rgb`, `#rrggbb`, `rgb(r,g,b)` or `rgba(r,g,b,a)`
pub fn parse_css_color(value: &str) -> Option<Rgba> {
    let v = value.trim();
    if v.starts_with('#') {
        let c = crate::config::Color::parse(v).ok()?;
        return Some([c.r, c.g, c.b, 255]);
    }
    let (inner, has_alpha) = if let Some(rest) = v.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = v.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return match v {
            "white" => Some([255, 255, 255, 255]),
            "black" => Some([0, 0, 0, 255]),
            "transparent" => Some([0, 0, 0, 0]),
            _ => None,
        };
    };
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != if has_alpha { 4 } else { 3 } {
        return None;
    }
    let channel = |s: &str| s.parse::<u8>().ok();
    let alpha = if has_alpha {
        let a = parts[3].parse::<f64>().ok()?;
        (a.clamp(0.0, 1.0) * 255.0).round() as u8
    } else {
        255
    };
    Some([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha])
}

/// A laid-out box with the text it paints
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub lb: LayoutBox,
    /// Wrapped text, one line per `\n`
    pub text: String,
    pub elem_type: ElementType,
    /// Font scale (glyph cell multiplier)
    pub scale: u32,
    pub background: Option<Rgba>,
    pub border: Option<(u32, Rgba)>,
    pub color: Rgba,
}

/// Result of laying out one subtree
#[derive(Debug, Clone)]
pub struct LayoutTree {
    pub nodes: Vec<LayoutNode>,
    pub width: u32,
    pub height: u32,
}

/// Lay out `root` at the viewport width. The tree height is the full content
/// height of the subtree; it is not limited by the viewport height.
pub fn layout_subtree(root: ElementRef, viewport: Viewport) -> LayoutTree {
    let mut nodes = Vec::new();
    let height = layout_block(root, 0, 0, viewport.width, TEXT_COLOR, &mut nodes);
    LayoutTree {
        nodes,
        width: viewport.width,
        height: height.max(1),
    }
}

fn is_hidden(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "head" | "title" | "meta" | "link" | "template")
}

fn is_inline(tag: &str) -> bool {
    matches!(tag, "span" | "strong" | "b" | "em" | "i" | "a" | "small" | "sup" | "sub" | "u" | "code")
}

fn heading_scale(tag: &str) -> Option<u32> {
    match tag {
        "h1" => Some(2),
        "h2" | "h3" | "h4" | "h5" | "h6" => Some(1),
        _ => None,
    }
}

fn margin_after(tag: &str) -> u32 {
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => 8,
        "p" | "ul" | "ol" | "table" => 6,
        "li" => 2,
        _ => 0,
    }
}

/// True when the element only holds text and inline markup
fn is_text_leaf(el: &ElementRef) -> bool {
    el.children().all(|child| match child.value() {
        Node::Element(e) => is_inline(e.name()),
        _ => true,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy word wrap on a fixed character grid
pub fn wrap(text: &str, chars_per_line: usize) -> Vec<String> {
    let limit = chars_per_line.max(1);
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let mut word = word;
        // Hard-break words longer than a line
        while word.chars().count() > limit {
            if !cur.is_empty() {
                lines.push(std::mem::take(&mut cur));
            }
            let split = word.char_indices().nth(limit).map(|(i, _)| i).unwrap_or(word.len());
            lines.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }
        if !cur.is_empty() && cur.chars().count() + 1 + word.chars().count() > limit {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn text_node(x: u32, y: u32, width: u32, text: &str, scale: u32, elem_type: ElementType, color: Rgba) -> (LayoutNode, u32) {
    let chars = (width / (CHAR_WIDTH * scale)) as usize;
    let lines = wrap(text, chars);
    let height = lines.len() as u32 * LINE_HEIGHT * scale;
    let node = LayoutNode {
        lb: LayoutBox {
            rect: Rect { x: x as i32, y: y as i32, width, height },
            box_model: BoxModel::default(),
        },
        text: lines.join("\n"),
        elem_type,
        scale,
        background: None,
        border: None,
        color,
    };
    (node, height)
}

/// Lay out `el` with its top-left at (x, y); returns the height consumed
/// including the trailing margin.
fn layout_block(el: ElementRef, x: u32, y: u32, width: u32, inherited: Rgba, out: &mut Vec<LayoutNode>) -> u32 {
    let tag = el.value().name();
    if is_hidden(tag) {
        return 0;
    }
    let style = BoxStyle::of(&el);
    let color = style.color.unwrap_or(inherited);

    match tag {
        "br" => return LINE_HEIGHT,
        "hr" => {
            out.push(LayoutNode {
                lb: LayoutBox {
                    rect: Rect { x: x as i32, y: y.saturating_add(6) as i32, width, height: 1 },
                    box_model: BoxModel { margin: 6, ..BoxModel::default() },
                },
                text: String::new(),
                elem_type: ElementType::Rule,
                scale: 1,
                background: Some(style.background.unwrap_or(CELL_BORDER)),
                border: None,
                color,
            });
            return 13;
        }
        "img" => {
            let height = el
                .value()
                .attr("height")
                .and_then(parse_px)
                .or(style.height)
                .unwrap_or(DEFAULT_IMAGE_HEIGHT);
            let img_width = el.value().attr("width").and_then(parse_px).unwrap_or(width).min(width);
            out.push(LayoutNode {
                lb: LayoutBox {
                    rect: Rect { x: x as i32, y: y as i32, width: img_width, height },
                    box_model: BoxModel { margin: 8, border: 1, padding: 0 },
                },
                text: el.value().attr("alt").map(collapse_whitespace).unwrap_or_default(),
                elem_type: ElementType::Image,
                scale: 1,
                background: Some(style.background.unwrap_or(IMAGE_FILL)),
                border: Some(style.border.unwrap_or((1, IMAGE_BORDER))),
                color,
            });
            return height.saturating_add(8);
        }
        "table" => {
            let height = layout_table(el, x, y, width, color, out);
            return height.saturating_add(margin_after(tag));
        }
        _ => {}
    }

    let padding = style.padding.unwrap_or(0).min(width / 2);
    let border_w = style.border.map(|(w, _)| w).unwrap_or(0).min(width / 2);
    let inset = padding + border_w;
    let inner_x = x + inset;
    let inner_w = width.saturating_sub(inset * 2);

    // Reserve the box slot so its background paints beneath its content
    let slot = out.len();
    let mut content_h = 0u32;

    if is_text_leaf(&el) {
        let text = collapse_whitespace(&el.text().collect::<String>());
        if !text.is_empty() {
            let (scale, kind) = match heading_scale(tag) {
                Some(s) => (s, ElementType::Heading),
                None => (1, ElementType::Paragraph),
            };
            let text = if tag == "li" { format!("- {}", text) } else { text };
            let (node, h) = text_node(inner_x, y.saturating_add(inset), inner_w, &text, scale, kind, color);
            out.push(node);
            content_h = h;
        }
    } else {
        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                let child_y = y.saturating_add(inset).saturating_add(content_h);
                content_h = content_h.saturating_add(layout_block(child_el, inner_x, child_y, inner_w, color, out));
            } else if let Some(text) = child.value().as_text() {
                let text = collapse_whitespace(text);
                if !text.is_empty() {
                    let text_y = y.saturating_add(inset).saturating_add(content_h);
                    let (node, h) = text_node(inner_x, text_y, inner_w, &text, 1, ElementType::Paragraph, color);
                    out.push(node);
                    content_h = content_h.saturating_add(h);
                }
            }
        }
    }

    let height = style.height.unwrap_or(content_h.saturating_add(inset * 2));
    if style.background.is_some() || style.border.is_some() || style.height.is_some() {
        out.insert(
            slot,
            LayoutNode {
                lb: LayoutBox {
                    rect: Rect { x: x as i32, y: y as i32, width, height },
                    box_model: BoxModel { margin: margin_after(tag), border: border_w, padding },
                },
                text: String::new(),
                elem_type: ElementType::Block,
                scale: 1,
                background: style.background,
                border: style.border,
                color,
            },
        );
    }

    if height == 0 {
        return 0;
    }
    height.saturating_add(margin_after(tag))
}

fn layout_table(table: ElementRef, x: u32, y: u32, width: u32, color: Rgba, out: &mut Vec<LayoutNode>) -> u32 {
    let rows = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr");

    let mut height = 0u32;
    for row in rows {
        let cells: Vec<ElementRef> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| matches!(e.value().name(), "td" | "th"))
            .collect();
        if cells.is_empty() {
            continue;
        }
        let col_w = width / cells.len() as u32;
        let row_style = BoxStyle::of(&row);

        let mut texts = Vec::with_capacity(cells.len());
        let mut row_h = LINE_HEIGHT + CELL_PADDING * 2;
        for cell in &cells {
            let text = collapse_whitespace(&cell.text().collect::<String>());
            let lines = wrap(&text, (col_w.saturating_sub(CELL_PADDING * 2) / CHAR_WIDTH) as usize);
            let lines = if text.is_empty() { Vec::new() } else { lines };
            row_h = row_h.max(lines.len() as u32 * LINE_HEIGHT + CELL_PADDING * 2);
            texts.push(lines);
        }

        for (i, (cell, lines)) in cells.iter().zip(texts).enumerate() {
            let cell_style = BoxStyle::of(cell);
            let is_header = cell.value().name() == "th";
            let cell_x = x + i as u32 * col_w;
            // Last column absorbs the rounding remainder
            let cell_w = if i + 1 == cells.len() { width - i as u32 * col_w } else { col_w };
            let background = cell_style
                .background
                .or(row_style.background)
                .or(if is_header { Some(HEADER_CELL_FILL) } else { None });
            out.push(LayoutNode {
                lb: LayoutBox {
                    rect: Rect { x: cell_x as i32, y: y.saturating_add(height) as i32, width: cell_w, height: row_h },
                    box_model: BoxModel { margin: 0, border: 1, padding: CELL_PADDING },
                },
                text: lines.join("\n"),
                elem_type: ElementType::Cell,
                scale: 1,
                background,
                border: Some((1, CELL_BORDER)),
                color: cell_style.color.or(row_style.color).unwrap_or(color),
            });
        }
        height = height.saturating_add(row_h);
    }
    height
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn layout(html: &str, width: u32) -> LayoutTree {
        let doc = Html::parse_document(html);
        let sel = Selector::parse("#root").unwrap();
        let root = doc.select(&sel).next().unwrap();
        layout_subtree(root, Viewport { width, height: 100 })
    }

    #[test]
    fn stacks_heading_and_paragraphs() {
        let tree = layout(
            "<html><body><div id=root><h1>Quotation</h1><p>Hello world</p><p>More text</p></div></body></html>",
            200,
        );
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].elem_type, ElementType::Heading);
        assert_eq!(tree.nodes[0].scale, 2);
        assert_eq!(tree.nodes[1].elem_type, ElementType::Paragraph);
        // h1: 28 + 8, p: 14 + 6, p: 14 + 6
        assert_eq!(tree.nodes[1].lb.rect.y, 36);
        assert_eq!(tree.height, 76);
    }

    #[test]
    fn fixed_height_box_keeps_height() {
        let tree = layout(
            r#"<div id=root><div style="height: 150px; background-color: #eeeeee"></div></div>"#,
            300,
        );
        assert_eq!(tree.height, 150);
        assert_eq!(tree.nodes[0].elem_type, ElementType::Block);
        assert_eq!(tree.nodes[0].background, Some([0xee, 0xee, 0xee, 255]));
    }

    #[test]
    fn table_rows_split_width() {
        let tree = layout(
            "<div id=root><table><tr><th>A</th><th>B</th><th>C</th></tr><tr><td>1</td><td>2</td><td>3</td></tr></table></div>",
            301,
        );
        let cells: Vec<_> = tree.nodes.iter().filter(|n| n.elem_type == ElementType::Cell).collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0].lb.rect.width, 100);
        assert_eq!(cells[2].lb.rect.width, 101);
        assert_eq!(cells[0].background, Some(HEADER_CELL_FILL));
        assert_eq!(cells[3].lb.rect.y, 22);
        assert_eq!(tree.height, 22 * 2 + 6);
    }

    #[test]
    fn wraps_on_character_grid() {
        assert_eq!(wrap("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn parses_inline_styles() {
        let s = BoxStyle::parse("background: rgba(255, 0, 0, 0.5); color:#fff; padding: 8px; border: 2px solid #000");
        assert_eq!(s.background, Some([255, 0, 0, 128]));
        assert_eq!(s.color, Some([255, 255, 255, 255]));
        assert_eq!(s.padding, Some(8));
        assert_eq!(s.border, Some((2, [0, 0, 0, 255])));
    }

    #[test]
    fn hidden_elements_take_no_space() {
        let tree = layout("<div id=root><style>p{}</style><script>var x;</script><p>Only</p></div>", 200);
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.height, 20);
    }

    #[test]
    fn oversized_lengths_saturate() {
        assert_eq!(parse_px("99999999999px"), Some(MAX_LENGTH_PX));
        let tree = layout(
            r#"<div id=root><p style="height: 99999999999px">x</p><img height="4294967295"><div style="height: 4294967295px"></div></div>"#,
            200,
        );
        assert!(tree.height >= 3 * MAX_LENGTH_PX);
    }
}
