//! Details command - show full documents.

use super::{accept_partial, parse_filter_arg};
use crate::app::App;
use crate::OutputFormat;
use serde::Serialize;
use std::collections::HashMap;
use waymark_core::{select_ids, Config, Entity};

/// An entity as printed in JSON output, with the backend that served it.
#[derive(Serialize)]
struct DetailRecord<'a> {
    #[serde(flatten)]
    entity: &'a Entity,

    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<&'a str>,
}

/// Run the details command.
pub fn run(
    config: Config,
    ids: Vec<String>,
    filter: Option<&str>,
    strict: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let filter = parse_filter_arg(filter, strict)?;
    if ids.is_empty() && filter.is_none() {
        anyhow::bail!("provide one or more ids, or --filter");
    }

    let app = App::new(&config)?;

    let requested = match filter {
        Some(ref filter) => {
            let summaries = accept_partial(app.backend.get_summary());
            merge_ids(select_ids(&summaries, Some(filter)), ids)
        }
        None => ids,
    };

    let entities = accept_partial(app.backend.get_details(&requested));
    let (found, missing) = order_by_request(&requested, entities);

    for id in &missing {
        eprintln!("not found: {}", id);
    }

    match output {
        OutputFormat::Text => {
            for entity in &found {
                print!("{}", format_entity(entity));
            }
        }
        OutputFormat::Json => {
            let records: Vec<DetailRecord> = found
                .iter()
                .map(|entity| DetailRecord {
                    entity,
                    backend: entity.originating_backend.as_deref(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    Ok(())
}

/// Ids selected by a filter, followed by explicitly listed ids not already
/// selected.
fn merge_ids(mut selected: Vec<String>, listed: Vec<String>) -> Vec<String> {
    for id in listed {
        if !selected.contains(&id) {
            selected.push(id);
        }
    }
    selected
}

/// Put entities in request order and report ids nothing was found for.
fn order_by_request(requested: &[String], entities: Vec<Entity>) -> (Vec<Entity>, Vec<String>) {
    let mut by_id: HashMap<String, Entity> = entities
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();

    let mut found = Vec::with_capacity(by_id.len());
    let mut missing = Vec::new();
    for id in requested {
        match by_id.remove(id) {
            Some(entity) => found.push(entity),
            None if !found.iter().any(|e: &Entity| &e.id == id) => missing.push(id.clone()),
            None => {}
        }
    }

    (found, missing)
}

fn format_entity(entity: &Entity) -> String {
    let mut out = String::new();

    match entity.tier {
        Some(tier) => out.push_str(&format!("== {} ({}, {}) ==\n", entity.id, entity.kind, tier)),
        None => out.push_str(&format!("== {} ({}) ==\n", entity.id, entity.kind)),
    }
    out.push_str(&format!("source:  {}\n", entity.resource_locator));
    if let Some(ref backend) = entity.originating_backend {
        out.push_str(&format!("backend: {}\n", backend));
    }
    out.push_str(&format!(
        "updated: {}\n",
        entity.last_updated.format("%Y-%m-%d %H:%M:%S")
    ));

    let tags = entity.tags();
    if !tags.is_empty() {
        out.push_str(&format!("tags:    {}\n", tags.join(", ")));
    }
    if let Some(description) = entity.description() {
        out.push_str(&format!("description: {}\n", description));
    }

    out.push('\n');
    if !entity.body.is_empty() {
        out.push_str(&entity.body);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use waymark_core::{EntityKind, Metadata, Tier};

    fn entity(id: &str) -> Entity {
        let mut metadata = Metadata::new();
        metadata.insert("description".to_string(), "Run tests".into());
        metadata.insert("tags".to_string(), serde_json::json!(["scope:core"]));
        Entity {
            id: id.to_string(),
            kind: EntityKind::Behavior,
            tier: Some(Tier::Must),
            body: "Always.".to_string(),
            resource_locator: format!("/g/{}.bhv", id),
            metadata,
            last_updated: Utc::now(),
            originating_backend: Some("team".to_string()),
        }
    }

    fn ids(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_order_by_request() {
        let requested: Vec<String> = ["b", "missing-id", "a", "b"].iter().map(|s| s.to_string()).collect();
        let (found, missing) = order_by_request(&requested, vec![entity("a"), entity("b")]);
        assert_eq!(ids(&found), vec!["b", "a"]);
        assert_eq!(missing, vec!["missing-id"]);
    }

    #[test]
    fn test_merge_ids() {
        let merged = merge_ids(
            vec!["a".to_string(), "b".to_string()],
            vec!["b".to_string(), "c".to_string()],
        );
        assert_eq!(merged, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_format_entity() {
        let text = format_entity(&entity("run-tests"));
        assert!(text.starts_with("== run-tests (behavior, must) ==\n"));
        assert!(text.contains("source:  /g/run-tests.bhv\n"));
        assert!(text.contains("backend: team\n"));
        assert!(text.contains("tags:    scope:core\n"));
        assert!(text.contains("description: Run tests\n"));
        assert!(text.ends_with("\nAlways.\n\n"));
    }

    #[test]
    fn test_json_record_includes_backend() {
        let e = entity("a");
        let record = DetailRecord {
            entity: &e,
            backend: e.originating_backend.as_deref(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["backend"], "team");
        assert_eq!(json["resourceLocator"], "/g/a.bhv");
    }
}
