//! Graphviz export of a stage tree.

use ppspeed_ir::Protocol;

use crate::stage::StageId;
use crate::stage_tree::StageTree;

fn dot_escape(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn fill_color(tree: &StageTree, id: StageId) -> &'static str {
    if tree.failed_stages().contains(&id) {
        "gold"
    } else if tree.failed_witness_stages().contains(&id) {
        "darkorchid1"
    } else if tree.true_stages().contains(&id) {
        "deepskyblue1"
    } else if tree.false_stages().contains(&id) {
        "firebrick2"
    } else {
        "azure2"
    }
}

/// Render `tree` in DOT. With `struct_only` nodes carry no labels.
pub fn stage_tree_dot(tree: &StageTree, protocol: &Protocol, struct_only: bool) -> String {
    let mut out = String::from("digraph stages {\n");
    out.push_str("  node [style=filled, fontsize=40];\n");
    for (id, stage) in tree.stages() {
        let color = fill_color(tree, id);
        if struct_only {
            out.push_str(&format!("  s{id} [label=\"\", fillcolor={color}];\n"));
        } else {
            let label = dot_escape(&stage.describe(protocol));
            out.push_str(&format!("  s{id} [label=\"{label}\", fillcolor={color}];\n"));
        }
    }
    for (from, to) in tree.edges() {
        out.push_str(&format!("  s{from} -> s{to};\n"));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::stage_tree::AnalysisOptions;

    fn one_way() -> Protocol {
        let mut p = Protocol::new();
        p.add_state("A").expect("A");
        p.add_state("B").expect("B");
        p.add_transition(("A", "B"), ("B", "B")).expect("t");
        p.add_input("A", "A").expect("input");
        p.add_input("B", "B").expect("input");
        p.set_output("A", false).expect("out");
        p.set_output("B", true).expect("out");
        p
    }

    #[test]
    fn escapes_labels() {
        assert_eq!(dot_escape("E = {A}\nD = \"x\""), "E = {A}\\nD = \\\"x\\\"");
    }

    #[test]
    fn dot_lists_every_stage_and_edge() {
        let p = one_way();
        let options = AnalysisOptions::default();
        let oracle = options.oracle();
        let tree = StageTree::build(Context::new(&p, &oracle), &options).expect("built");

        let dot = stage_tree_dot(&tree, &p, false);
        assert!(dot.starts_with("digraph stages {"));
        assert_eq!(dot.matches("fillcolor=").count(), tree.len());
        assert_eq!(dot.matches(" -> ").count(), tree.len() - 1);
        assert!(dot.contains("K_C = {⟅A, B⟆}"));
        assert!(dot.contains("deepskyblue1"));

        let bare = stage_tree_dot(&tree, &p, true);
        assert!(!bare.contains("E = "));
    }
}
