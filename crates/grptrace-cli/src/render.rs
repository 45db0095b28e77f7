//! Human-readable and JSON rendering of command results.

use std::fmt;

use serde::Serialize;

use grptrace_directory::MemberFilter;
use grptrace_domain::model::Subject;
use grptrace_domain::{TraceNode, TraceResult};

const INDENT: &str = "  ";

/// Text report for a [`TraceResult`]: header, indented path tree, footer.
///
/// ```text
/// Subject: jdoe (Jane Doe)
/// Group:   org:apps:admins (App Admins)
/// Result:  MEMBER
///
/// ⊕ COMPOSITE org:apps:admins (UNION of org:apps:admins:manual, org:apps:admins:auto)
///   ✓ IMMEDIATE org:apps:admins:manual
/// ```
pub struct TextReport<'a>(pub &'a TraceResult);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;

        write!(f, "Subject: {}", result.subject_id)?;
        if let Some(name) = &result.subject_name {
            write!(f, " ({name})")?;
        }
        writeln!(f)?;

        write!(f, "Group:   {}", result.target_group_name)?;
        if let Some(display_name) = &result.target_group_display_name {
            write!(f, " ({display_name})")?;
        }
        writeln!(f)?;

        if !result.is_member {
            return writeln!(f, "Result:  NOT a member");
        }
        writeln!(f, "Result:  MEMBER")?;
        writeln!(f)?;

        for node in &result.paths {
            write_node(f, node, 0)?;
        }

        if !result.cycles.is_empty() {
            writeln!(f)?;
            writeln!(f, "Cycles detected: {}", result.cycles.join(", "))?;
        }
        if result.max_depth_reached {
            if result.cycles.is_empty() {
                writeln!(f)?;
            }
            writeln!(
                f,
                "Warning: maximum depth reached; some paths were not fully traced"
            )?;
        }
        Ok(())
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &TraceNode, level: usize) -> fmt::Result {
    f.write_str(&INDENT.repeat(level))?;
    let label = label(node);

    match node {
        TraceNode::Immediate { .. } => writeln!(f, "✓ IMMEDIATE {label}")?,
        TraceNode::Effective { via, .. } if via.is_empty() => {
            writeln!(f, "↳ EFFECTIVE {label} (no intermediate group resolved)")?
        }
        TraceNode::Effective { .. } => writeln!(f, "↳ EFFECTIVE {label} via")?,
        TraceNode::Composite {
            operator,
            left_group,
            right_group,
            ..
        } => {
            write!(f, "⊕ COMPOSITE {label}")?;
            match (operator, left_group, right_group) {
                (Some(op), Some(left), Some(right)) => {
                    writeln!(f, " ({op} of {left}, {right})")?
                }
                (Some(op), _, _) => writeln!(f, " ({op}, factor groups unknown)")?,
                (None, _, _) => writeln!(f, " (operator unknown)")?,
            }
        }
        TraceNode::CycleDetected { .. } => writeln!(f, "⟲ CYCLE {label} (already visited)")?,
        TraceNode::MaxDepthReached { depth, .. } => {
            writeln!(f, "⋯ MAX DEPTH {label} (stopped at depth {depth})")?
        }
        TraceNode::Unknown { raw_type, .. } => {
            writeln!(f, "? UNKNOWN {label} (membership type '{raw_type}')")?
        }
    }

    for child in node.via() {
        write_node(f, child, level + 1)?;
    }
    Ok(())
}

/// Group name, followed by the display name when it adds information.
fn label(node: &TraceNode) -> String {
    let group = node.group();
    match group.display_name.as_deref() {
        Some(display) if display != group.name => format!("{} [{display}]", group.name),
        _ => group.name.clone(),
    }
}

/// Member listing of one group.
///
/// ```text
/// Members of group "org:staff" (2 total, filter All):
///
/// • jdoe (Jane Doe) [ldap]
/// • mem-00000002 (org:staff:eng) [g:gsa]
/// ```
#[derive(Debug, Serialize)]
pub struct MemberReport<'a> {
    pub group_name: &'a str,
    pub filter: MemberFilter,
    pub members: &'a [Subject],
}

impl fmt::Display for MemberReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Members of group \"{}\" ({} total, filter {}):",
            self.group_name,
            self.members.len(),
            self.filter
        )?;
        if self.members.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        for member in self.members {
            write!(f, "• {}", member.id)?;
            if let Some(name) = &member.name {
                write!(f, " ({name})")?;
            }
            if let Some(source_id) = &member.source_id {
                write!(f, " [{source_id}]")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Result of a subject lookup. A lookup can match several subjects when no
/// source is given.
#[derive(Debug, Serialize)]
pub struct SubjectReport<'a> {
    pub query: &'a str,
    pub subjects: &'a [Subject],
}

impl fmt::Display for SubjectReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subjects.is_empty() {
            return writeln!(f, "Subject not found: {}", self.query);
        }
        for (i, subject) in self.subjects.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "Subject ID: {}", subject.id)?;
            if let Some(name) = &subject.name {
                writeln!(f, "Name:       {name}")?;
            }
            if let Some(identifier) = &subject.identifier {
                writeln!(f, "Identifier: {identifier}")?;
            }
            if let Some(source_id) = &subject.source_id {
                writeln!(f, "Source:     {source_id}")?;
            }
        }
        Ok(())
    }
}

/// Pretty-printed JSON of any command result.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
