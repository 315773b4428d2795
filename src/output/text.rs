//! Plain text rendering of aggregation trees and hot paths.

use super::schema::{CallSiteSummary, GroupSummary};

/// Render a group as an indented call tree
///
/// **Public** - used by `--summary`
///
/// # Arguments
/// * `group` - Group summary to render
/// * `max_depth` - Deepest level printed, `None` for the whole tree
pub fn render_tree(group: &GroupSummary, max_depth: Option<u32>) -> String {
    let mut lines = vec![format!("{} ({})", group.name, describe(&group.root))];
    for child in &group.root.children {
        render_node(child, 1, max_depth, &mut lines);
    }
    lines.join("\n")
}

fn render_node(node: &CallSiteSummary, level: usize, max_depth: Option<u32>, lines: &mut Vec<String>) {
    if max_depth.is_some_and(|max| node.depth > max) {
        return;
    }
    lines.push(format!("{}{} ({})", "  ".repeat(level), node.symbol, describe(node)));
    for child in &node.children {
        render_node(child, level + 1, max_depth, lines);
    }
}

fn describe(node: &CallSiteSummary) -> String {
    match (node.duration, node.self_time) {
        (Some(duration), Some(self_time)) => {
            let mut text = format!(
                "duration {}, self {}, calls {}",
                duration, self_time, node.calls
            );
            if let Some(cpu_time) = node.cpu_time {
                text.push_str(&format!(", cpu {}", cpu_time));
            }
            text
        }
        _ => format!("count {}", node.calls),
    }
}

/// Generate a text table of a group's hot paths
///
/// **Public** - printed after the tree by `--summary`
pub fn generate_text_summary(group: &GroupSummary, max_lines: usize) -> String {
    let mut lines = Vec::new();

    lines.push(format!("  HOT PATHS: {}", group.name));
    lines.push(format!("  {}", "-".repeat(78)));
    lines.push(format!(
        "  {:<50} {:>12} {:>7} {:>6}",
        "Call Path (Hottest First)", "WEIGHT", "CALLS", "%"
    ));
    lines.push(format!("  {}", "-".repeat(78)));

    for path in group.hot_paths.iter().take(max_lines) {
        // Keep the innermost frames when the path is too long
        let display_stack = if path.stack.chars().count() > 50 {
            let tail: String = path
                .stack
                .chars()
                .rev()
                .take(47)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("...{}", tail)
        } else {
            path.stack.clone()
        };
        lines.push(format!(
            "  {:<50} {:>12} {:>7} {:>5.1}%",
            display_stack, path.weight, path.calls, path.percentage
        ));
    }

    lines.push(format!("  {}", "-".repeat(78)));
    lines.push(format!("  {}", group.distribution.summary()));
    lines.join("\n")
}
