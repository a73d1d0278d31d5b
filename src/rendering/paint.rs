/// Display list built from a layout tree

use crate::rendering::layout::{ElementType, LayoutTree, Rgba};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    /// Rectangle outline drawn inside the given bounds
    StrokeRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        line_width: u32,
        rgba: Rgba,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        scale: u32,
        rgba: Rgba,
    },
}

/// Backgrounds, then borders, then text, per node in document order
pub fn build_display_list(tree: &LayoutTree) -> Vec<PaintCommand> {
    let mut cmds = Vec::with_capacity(tree.nodes.len() * 2);
    for node in &tree.nodes {
        let r = &node.lb.rect;
        if let Some(rgba) = node.background {
            cmds.push(PaintCommand::SolidRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                rgba,
            });
        }
        if let Some((line_width, rgba)) = node.border {
            cmds.push(PaintCommand::StrokeRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                line_width,
                rgba,
            });
        }
        if !node.text.is_empty() {
            let inset = (node.lb.box_model.border + node.lb.box_model.padding) as i32;
            let (tx, ty) = match node.elem_type {
                // Caption centred vertically in the placeholder
                ElementType::Image => (r.x + inset + 4, r.y + r.height as i32 / 2 - 7),
                _ => (r.x + inset, r.y + inset),
            };
            cmds.push(PaintCommand::Text {
                x: tx,
                y: ty,
                text: node.text.clone(),
                scale: node.scale,
                rgba: node.color,
            });
        }
    }
    cmds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::{BoxModel, LayoutBox, LayoutNode, Rect};

    #[test]
    fn cell_paints_fill_border_and_text_in_order() {
        let tree = LayoutTree {
            nodes: vec![LayoutNode {
                lb: LayoutBox {
                    rect: Rect { x: 0, y: 0, width: 50, height: 22 },
                    box_model: BoxModel { margin: 0, border: 1, padding: 4 },
                },
                text: "Qty".into(),
                elem_type: ElementType::Cell,
                scale: 1,
                background: Some([1, 2, 3, 255]),
                border: Some((1, [9, 9, 9, 255])),
                color: [0, 0, 0, 255],
            }],
            width: 50,
            height: 22,
        };
        let cmds = build_display_list(&tree);
        assert_eq!(cmds.len(), 3);
        assert!(matches!(cmds[0], PaintCommand::SolidRect { rgba: [1, 2, 3, 255], .. }));
        assert!(matches!(cmds[1], PaintCommand::StrokeRect { line_width: 1, .. }));
        match &cmds[2] {
            PaintCommand::Text { x, y, text, .. } => {
                assert_eq!((*x, *y), (5, 5));
                assert_eq!(text, "Qty");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
