//! YAML/JSON import and export for the language-neutral workflow definition.
//!
//! A serde-based wire struct with `from_str`/`from_file`/`to_yaml`/`to_json` methods and a
//! structural check that name-checks edge references before anything downstream sees the
//! document. Both JSON and YAML are accepted by the importer.
//!
//! The importer only checks the document is *structurally* well-formed (ids present, at least
//! one node referenced) — whether it is *executable* (acyclic, no dangling references, no
//! duplicate ids) is the static validator's job.

pub mod document;

use document::{EdgeDocument, MetadataDocument, NodeDocument, WorkflowDocument};
use std::path::Path;
use wave_model::{EngineError, Loop, Result};

/// Deterministic namespace used to mint a workflow id from its name when a document doesn't
/// carry one. Fixed at random but constant so the same name always yields the same id across
/// import runs.
const WORKFLOW_ID_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x3a, 0x9b, 0x2c, 0x17, 0x4e, 0x8d, 0x45, 0x2a, 0x9f, 0x61, 0x0c, 0xd3, 0x77, 0xa8, 0x5e, 0x02,
]);

/// Parses a YAML workflow definition and hands back an engine [`wave_model::Workflow`].
pub fn import_yaml(yaml: &str) -> Result<wave_model::Workflow> {
    let doc: WorkflowDocument = serde_yaml::from_str(yaml)
        .map_err(|e| EngineError::validation(format!("invalid workflow YAML: {e}")))?;
    document_to_workflow(doc)
}

/// Parses a JSON workflow definition and hands back an engine [`wave_model::Workflow`].
pub fn import_json(json: &str) -> Result<wave_model::Workflow> {
    let doc: WorkflowDocument = serde_json::from_str(json)
        .map_err(|e| EngineError::validation(format!("invalid workflow JSON: {e}")))?;
    document_to_workflow(doc)
}

/// Reads `path` and imports it, dispatching on extension (`.yaml`/`.yml` vs `.json`).
/// Unrecognized extensions are treated as YAML, the more permissive of the two.
pub fn import_file(path: impl AsRef<Path>) -> Result<wave_model::Workflow> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| EngineError::validation(format!("could not read '{}': {e}", path.display())))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => import_json(&content),
        _ => import_yaml(&content),
    }
}

/// Structural checks the importer performs before handing the document to the static
/// validator: non-empty workflow name, and every edge referencing a node id that
/// actually appears in `nodes[]`. Deeper rules (acyclicity, duplicate ids, registered types)
/// are `wave-validate`'s job, not the importer's.
fn check_structure(doc: &WorkflowDocument) -> Result<()> {
    if doc.metadata.name.trim().is_empty() {
        return Err(EngineError::validation("workflow definition is missing metadata.name"));
    }
    let node_ids: std::collections::HashSet<&str> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &doc.edges {
        if !node_ids.contains(edge.from.as_str()) {
            return Err(EngineError::validation(format!(
                "edge '{}' references unknown source node '{}'",
                edge.id, edge.from
            )));
        }
        if !node_ids.contains(edge.to.as_str()) {
            return Err(EngineError::validation(format!(
                "edge '{}' references unknown target node '{}'",
                edge.id, edge.to
            )));
        }
    }
    Ok(())
}

fn document_to_workflow(doc: WorkflowDocument) -> Result<wave_model::Workflow> {
    check_structure(&doc)?;

    let id = doc.id.clone().unwrap_or_else(|| {
        uuid::Uuid::new_v5(&WORKFLOW_ID_NAMESPACE, doc.metadata.name.as_bytes()).to_string()
    });

    let nodes = doc
        .nodes
        .into_iter()
        .map(|n: NodeDocument| wave_model::Node {
            id: n.id,
            name: n.name,
            node_type: n.node_type,
            config: n.config,
            description: n.description,
            metadata: n.metadata,
        })
        .collect();

    let edges = doc
        .edges
        .into_iter()
        .map(|e: EdgeDocument| wave_model::Edge {
            id: e.id,
            from: e.from,
            to: e.to,
            source_handle: e.source_handle,
            condition: e.condition,
            loop_spec: e.loop_spec.map(|l| Loop { max_iterations: l.max_iterations }),
            metadata: e.metadata,
        })
        .collect();

    Ok(wave_model::Workflow {
        id,
        name: doc.metadata.name,
        version: doc.metadata.version.unwrap_or(1),
        status: wave_model::WorkflowStatus::Draft,
        nodes,
        edges,
        variables: doc.variables,
        metadata: None,
        trigger: doc.trigger,
    })
}

fn workflow_to_document(workflow: &wave_model::Workflow) -> WorkflowDocument {
    WorkflowDocument {
        id: Some(workflow.id.clone()),
        metadata: MetadataDocument {
            name: workflow.name.clone(),
            description: None,
            version: Some(workflow.version),
            tags: Vec::new(),
        },
        variables: workflow.variables.clone(),
        nodes: workflow
            .nodes
            .iter()
            .map(|n| NodeDocument {
                id: n.id.clone(),
                name: n.name.clone(),
                node_type: n.node_type.clone(),
                description: n.description.clone(),
                config: n.config.clone(),
                position: None,
                metadata: n.metadata.clone(),
            })
            .collect(),
        edges: workflow
            .edges
            .iter()
            .map(|e| EdgeDocument {
                id: e.id.clone(),
                from: e.from.clone(),
                to: e.to.clone(),
                source_handle: e.source_handle.clone(),
                condition: e.condition.clone(),
                loop_spec: e.loop_spec.map(|l| document::LoopDocument { max_iterations: l.max_iterations }),
                metadata: e.metadata.clone(),
            })
            .collect(),
        trigger: workflow.trigger.clone(),
    }
}

/// Exports a [`wave_model::Workflow`] back to a YAML definition. Round-trips with
/// [`import_yaml`]: re-importing the result yields a `Workflow` equal in every field that
/// matters (ids, names, types, configs, edges, variables).
pub fn export_yaml(workflow: &wave_model::Workflow) -> Result<String> {
    serde_yaml::to_string(&workflow_to_document(workflow))
        .map_err(|e| EngineError::internal(format!("failed to serialize workflow to YAML: {e}")))
}

/// Exports a [`wave_model::Workflow`] back to a JSON definition.
pub fn export_json(workflow: &wave_model::Workflow) -> Result<String> {
    serde_json::to_string_pretty(&workflow_to_document(workflow))
        .map_err(|e| EngineError::internal(format!("failed to serialize workflow to JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
metadata:
  name: "three node pipeline"
  version: 2
variables:
  greeting: "hi"
nodes:
  - id: a
    name: "Node A"
    type: echo
    config:
      value: "{{input.x}}"
  - id: b
    name: "Node B"
    type: echo
edges:
  - id: e1
    from: a
    to: b
    condition: "input.x >= 1"
"#;

    #[test]
    fn imports_yaml_into_engine_workflow() {
        let wf = import_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(wf.name, "three node pipeline");
        assert_eq!(wf.version, 2);
        assert_eq!(wf.nodes.len(), 2);
        assert_eq!(wf.edges.len(), 1);
        assert_eq!(wf.edges[0].condition.as_deref(), Some("input.x >= 1"));
        assert_eq!(wf.variables.get("greeting"), Some(&wave_model::Value::String("hi".into())));
    }

    #[test]
    fn same_name_yields_same_generated_id() {
        let a = import_yaml(SAMPLE_YAML).unwrap();
        let b = import_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn rejects_edge_with_unknown_node_reference() {
        let yaml = r#"
metadata:
  name: "broken"
nodes:
  - id: a
    name: "A"
    type: echo
edges:
  - id: e1
    from: a
    to: missing
"#;
        assert!(import_yaml(yaml).is_err());
    }

    #[test]
    fn rejects_missing_workflow_name() {
        let yaml = r#"
metadata:
  name: ""
nodes:
  - id: a
    name: "A"
    type: echo
edges: []
"#;
        assert!(import_yaml(yaml).is_err());
    }

    #[test]
    fn round_trips_through_yaml_export_and_reimport() {
        let original = import_yaml(SAMPLE_YAML).unwrap();
        let exported = export_yaml(&original).unwrap();
        let reimported = import_yaml(&exported).unwrap();

        assert_eq!(original.id, reimported.id);
        assert_eq!(original.name, reimported.name);
        assert_eq!(original.version, reimported.version);
        assert_eq!(original.variables, reimported.variables);
        for (a, b) in original.nodes.iter().zip(reimported.nodes.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
            assert_eq!(a.node_type, b.node_type);
            assert_eq!(a.config, b.config);
        }
        for (a, b) in original.edges.iter().zip(reimported.edges.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.from, b.from);
            assert_eq!(a.to, b.to);
            assert_eq!(a.condition, b.condition);
        }
    }

    #[test]
    fn json_and_yaml_agree_on_the_same_definition() {
        let from_yaml = import_yaml(SAMPLE_YAML).unwrap();
        let as_json = export_json(&from_yaml).unwrap();
        let from_json = import_json(&as_json).unwrap();
        assert_eq!(from_yaml.id, from_json.id);
        assert_eq!(from_yaml.nodes.len(), from_json.nodes.len());
        assert_eq!(from_yaml.edges.len(), from_json.edges.len());
    }

    #[test]
    fn loop_edges_round_trip() {
        let yaml = r#"
metadata:
  name: "loop wf"
nodes:
  - id: a
    name: "A"
    type: echo
  - id: b
    name: "B"
    type: echo
edges:
  - id: e1
    from: a
    to: b
  - id: e2
    from: b
    to: a
    loop:
      max_iterations: 3
"#;
        let wf = import_yaml(yaml).unwrap();
        let loop_edge = wf.edges.iter().find(|e| e.id == "e2").unwrap();
        assert_eq!(loop_edge.loop_spec.unwrap().max_iterations, 3);

        let exported = export_yaml(&wf).unwrap();
        let reimported = import_yaml(&exported).unwrap();
        let reimported_loop = reimported.edges.iter().find(|e| e.id == "e2").unwrap();
        assert_eq!(reimported_loop.loop_spec.unwrap().max_iterations, 3);
    }
}
