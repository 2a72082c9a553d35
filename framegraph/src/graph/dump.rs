//! Graphviz dump of a frame graph.

use std::fmt::Write;

use crate::compiler::CompiledGraph;

use super::resource::{Ownership, ResourceRegistry};
use super::Pass;

pub(crate) fn dump_dot(
    passes: &[Pass<'_>],
    registry: &ResourceRegistry,
    compiled: Option<&CompiledGraph>,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_dot(&mut out, passes, registry, compiled);
    out
}

fn write_dot(
    out: &mut String,
    passes: &[Pass<'_>],
    registry: &ResourceRegistry,
    compiled: Option<&CompiledGraph>,
) -> std::fmt::Result {
    writeln!(out, "digraph FrameGraph {{")?;
    writeln!(out, "  rankdir=LR;")?;
    writeln!(out, "  node [fontname=\"monospace\"];")?;

    let culled = |index: usize| compiled.is_some_and(|c| c.is_culled(passes[index].id()));

    match compiled {
        Some(compiled) => {
            for level in compiled.levels() {
                writeln!(out, "  subgraph cluster_level_{} {{", level.index())?;
                writeln!(out, "    label=\"level {}\";", level.index())?;
                for &pass in level.passes() {
                    write_pass(out, &passes[pass.index()], Some(compiled), "    ")?;
                }
                writeln!(out, "  }}")?;
            }
            for pass in passes.iter().filter(|pass| compiled.is_culled(pass.id())) {
                write_pass(out, pass, Some(compiled), "  ")?;
            }
        }
        None => {
            for pass in passes {
                write_pass(out, pass, None, "  ")?;
            }
        }
    }

    for resource in registry.resources() {
        let shape = match resource.ownership() {
            Ownership::Transient => "ellipse",
            Ownership::Imported(_) => "doubleoctagon",
            Ownership::ExportTarget(_) => "octagon",
        };
        let allocated = compiled.map_or(true, |c| c.lifetime(resource.id()).is_some());
        writeln!(
            out,
            "  r{} [label=\"{}\", shape={}{}];",
            resource.id().index(),
            resource.name(),
            shape,
            if allocated { "" } else { ", style=dashed" }
        )?;
    }

    for (index, pass) in passes.iter().enumerate() {
        let style = if culled(index) { ", style=dashed" } else { "" };
        for &resource in pass.reads() {
            writeln!(out, "  r{} -> p{} [color=blue{}];", resource.index(), index, style)?;
        }
        for &resource in pass.writes() {
            writeln!(out, "  p{} -> r{} [color=red{}];", index, resource.index(), style)?;
        }
    }

    if let Some(compiled) = compiled {
        for pass in passes {
            for &next in compiled.successors(pass.id()) {
                writeln!(
                    out,
                    "  p{} -> p{} [style=dotted, color=gray];",
                    pass.id().index(),
                    next.index()
                )?;
            }
        }
    }

    writeln!(out, "}}")
}

fn write_pass(
    out: &mut String,
    pass: &Pass<'_>,
    compiled: Option<&CompiledGraph>,
    indent: &str,
) -> std::fmt::Result {
    let mut label = format!("{}\\n{:?}", pass.name(), pass.pass_type());
    let mut style = "solid";
    if let Some(compiled) = compiled {
        if compiled.is_culled(pass.id()) {
            style = "dashed";
            label.push_str("\\nculled");
        }
        let sync = compiled.sync(pass.id());
        if let Some(value) = sync.wait_value {
            let _ = write!(label, "\\nwait {}", value);
        }
        if let Some(value) = sync.signal_value {
            let _ = write!(label, "\\nsignal {}", value);
        }
    }
    writeln!(
        out,
        "{}p{} [label=\"{}\", shape=box, style={}];",
        indent,
        pass.id().index(),
        label,
        style
    )
}
