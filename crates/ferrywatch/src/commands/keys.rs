//! `ferrywatch keys`: decode events offline and print their cache keys.

use std::io::Read;
use std::sync::Arc;

use ferrywatch_core::{Decoder, InvalidationMapper, RelationTable};

use crate::cli::{GlobalOpts, KeysArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::EventRow;

pub fn handle(args: &KeysArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let relations = if args.direct_only {
        RelationTable::direct_only()
    } else {
        config::resolve_relations(global)?
    };
    let relations = Arc::new(relations);
    let decoder = Decoder::new(Arc::clone(&relations));
    let mapper = InvalidationMapper::new(relations);

    let input = read_input(args)?;
    let rows = decode_all(&input, &decoder, &mapper)?;

    let rendered = match output::render_structured(global.output, &rows)? {
        Some(json) => json,
        None => rows
            .iter()
            .flat_map(|row| row.keys.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn read_input(args: &KeysArgs) -> Result<String, CliError> {
    if let Some(ref path) = args.file {
        return Ok(std::fs::read_to_string(path)?);
    }
    match args.event.as_deref() {
        Some("-") | None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(event) => Ok(event.to_owned()),
    }
}

/// Decode a stream of concatenated JSON documents (newline-separated or not).
fn decode_all(
    input: &str,
    decoder: &Decoder,
    mapper: &InvalidationMapper,
) -> Result<Vec<EventRow>, CliError> {
    let mut rows = Vec::new();
    for (index, value) in serde_json::Deserializer::from_str(input)
        .into_iter::<serde_json::Value>()
        .enumerate()
    {
        let raw = serde_json::to_vec(&value?)?;
        let notification = decoder.decode(&raw).map_err(|e| CliError::Validation {
            field: format!("event #{}", index + 1),
            reason: e.to_string(),
        })?;
        rows.push(EventRow::new(&notification, &mapper.keys_for(&notification)));
    }

    if rows.is_empty() {
        return Err(CliError::Validation {
            field: "event".into(),
            reason: "no events in input".into(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn standard() -> (Decoder, InvalidationMapper) {
        let relations = Arc::new(RelationTable::standard());
        (Decoder::new(Arc::clone(&relations)), InvalidationMapper::new(relations))
    }

    #[test]
    fn decodes_concatenated_documents() {
        let (decoder, mapper) = standard();
        let input = r#"{"action":0,"resource":{"kind":"Instance","id":"i-1"}}
            {"action":2,"resource":{"kind":"Machine","id":"vm-1","ownerId":"node-7"}}"#;

        let rows = decode_all(input, &decoder, &mapper).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys, vec!["Instance", "Instance/i-1"]);
        assert_eq!(rows[1].keys, vec!["Machine", "Machine/vm-1", "Node/node-7"]);
    }

    #[test]
    fn names_the_failing_event() {
        let (decoder, mapper) = standard();
        let input = r#"{"action":0,"resource":{"kind":"Instance","id":"i-1"}}
            {"action":1,"resource":{"kind":"Machine","id":"vm-1"}}"#;

        let err = decode_all(input, &decoder, &mapper).unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "event #2"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let (decoder, mapper) = standard();
        assert!(decode_all("  \n", &decoder, &mapper).is_err());
    }
}
