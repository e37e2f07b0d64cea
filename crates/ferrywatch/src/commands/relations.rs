//! `ferrywatch relations`: print the relation table in effect.

use std::collections::BTreeMap;

use ferrywatch_core::{KeyTemplate, ResourceKind};

use crate::cli::{GlobalOpts, RelationsArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Palette};

pub fn handle(args: &RelationsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let table = config::resolve_relations(global)?;
    let kinds: Vec<ResourceKind> = match args.kind {
        Some(kind) if kind.is_wildcard() => {
            return Err(CliError::Validation {
                field: "kind".into(),
                reason: "relations are declared per concrete kind".into(),
            });
        }
        Some(kind) => vec![kind],
        None => ResourceKind::concrete().collect(),
    };

    let view: BTreeMap<String, &[KeyTemplate]> = kinds
        .iter()
        .map(|kind| (kind.to_string(), table.templates(*kind)))
        .collect();

    let rendered = match output::render_structured(global.output, &view)? {
        Some(json) => json,
        None => {
            let palette = Palette::new(global.color);
            kinds
                .iter()
                .map(|kind| {
                    let templates = table.templates(*kind);
                    let described = if templates.is_empty() {
                        "(direct key only)".to_owned()
                    } else {
                        templates.iter().map(describe).collect::<Vec<_>>().join(", ")
                    };
                    let required = table.required_fields(*kind);
                    let mut line = format!("{:<14} {described}", palette.heading(kind.as_ref()));
                    if !required.is_empty() {
                        line.push_str(&format!("  requires {}", required.join(" ")));
                    }
                    line
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn describe(template: &KeyTemplate) -> String {
    match template {
        KeyTemplate::List { kind } => format!("list({kind})"),
        KeyTemplate::Related { kind, field } => format!("related({kind}, {field})"),
        KeyTemplate::Owner => "owner".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_read_naturally() {
        assert_eq!(describe(&KeyTemplate::list(ResourceKind::Node)), "list(Node)");
        assert_eq!(
            describe(&KeyTemplate::related(ResourceKind::Node, "/ownerId")),
            "related(Node, /ownerId)"
        );
        assert_eq!(describe(&KeyTemplate::Owner), "owner");
    }
}
