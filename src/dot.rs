//! Graphviz DOT output for a [`GraphIR`].

use crate::ir::{GraphIR, RelationshipEdge, TableNode};
use std::fmt::Write;

pub struct DotWriter {
    pub rankdir: &'static str,
    pub fontsize: &'static str,
    pub nodesep: &'static str,
    pub ranksep: &'static str,
    pub splines: &'static str,
}

impl Default for DotWriter {
    fn default() -> Self {
        Self {
            rankdir: "LR",
            fontsize: "10",
            nodesep: "1.0",
            ranksep: "1.5",
            splines: "polyline",
        }
    }
}

impl DotWriter {
    pub fn write(&self, ir: &GraphIR) -> String {
        let mut dot = String::new();

        writeln!(&mut dot, "// Database Diagram").unwrap();
        writeln!(&mut dot, "digraph {{").unwrap();
        writeln!(
            &mut dot,
            "\tfontsize={} nodesep={} rankdir={} ranksep={} splines={}",
            self.fontsize, self.nodesep, self.rankdir, self.ranksep, self.splines
        )
        .unwrap();

        for node in &ir.nodes {
            self.write_node(&mut dot, node);
        }
        for edge in &ir.edges {
            self.write_edge(&mut dot, edge);
        }

        writeln!(&mut dot, "}}").unwrap();
        dot
    }

    fn write_node(&self, dot: &mut String, node: &TableNode) {
        let mut label = String::new();
        label.push_str("<TABLE BORDER='1' CELLBORDER='1' CELLSPACING='0'>");
        write!(
            label,
            "<TR><TD COLSPAN='4'><B>{}</B></TD></TR>",
            escape_html(&node.name)
        )
        .unwrap();
        label.push_str(concat!(
            "<TR><TD><B>Column Name</B></TD><TD><B>Data Type</B></TD>",
            "<TD><B>Key</B></TD><TD><B>Index</B></TD></TR>",
        ));
        for c in &node.columns {
            write!(
                label,
                "<TR><TD>{}</TD><TD>{}</TD><TD>{}</TD><TD>{}</TD></TR>",
                escape_html(&c.column_name),
                escape_html(&c.type_label()),
                c.key_type.marker(),
                c.index_marker()
            )
            .unwrap();
        }
        label.push_str("</TABLE>");

        writeln!(
            dot,
            "\t{} [label=<{}> shape=plaintext]",
            quote_id(&node.name),
            label
        )
        .unwrap();
    }

    fn write_edge(&self, dot: &mut String, edge: &RelationshipEdge) {
        writeln!(
            dot,
            "\t{} -> {} [label={}]",
            quote_id(&edge.from),
            quote_id(&edge.to),
            quote_id(&edge.column)
        )
        .unwrap();
    }
}

/// Quoted DOT identifier.
fn quote_id(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
