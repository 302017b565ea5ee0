//! Pipeline DAG validation: structural rule checks, cycle
//! detection via Kahn's algorithm, and bus resource catalog assembly.

use crate::error::{ConfigError, ValidationWarning};
use crate::resource::{aligned_size_bytes, resolve_size_spec, BusResourceDescriptor};
use livecalc_config::{NodeConfig, PipelineConfig};
use std::collections::{HashMap, HashSet, VecDeque};

/// Result of a successful validation: a topological node order and the
/// bus resource catalog derived from producer/consumer edges.
#[derive(Debug, Clone)]
pub struct ValidatedPipeline {
    pub topo_order: Vec<String>,
    pub resources: Vec<BusResourceDescriptor>,
    pub warnings: Vec<ValidationWarning>,
}

fn is_valid_id(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_valid_engine_ref(s: &str) -> bool {
    for prefix in ["native://", "script://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return is_valid_id(rest);
        }
    }
    false
}

fn is_valid_bus_ref(s: &str) -> bool {
    match s.strip_prefix("bus://") {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .chars()
                    .next()
                    .map(|c| c.is_ascii_alphabetic())
                    .unwrap_or(false)
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '/')
        }
        None => false,
    }
}

/// Run the full rule pipeline against a parsed pipeline config.
pub fn validate(config: &PipelineConfig) -> Result<ValidatedPipeline, Vec<ConfigError>> {
    if config.nodes.is_empty() {
        return Err(vec![ConfigError::EmptyPipeline]);
    }

    let mut errors = Vec::new();
    check_ids_and_refs(&config.nodes, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    check_uniqueness(&config.nodes, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    let (producer_of, mut errors) = map_producers(&config.nodes);
    if !errors.is_empty() {
        return Err(errors);
    }

    check_inputs_resolve(&config.nodes, &producer_of, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    let topo_order = match topological_sort(&config.nodes, &producer_of) {
        Ok(order) => order,
        Err(cycle_nodes) => return Err(vec![ConfigError::CircularDependency { cycle_nodes }]),
    };

    let mut resources = match build_resource_catalog(&config.nodes, &producer_of, &topo_order) {
        Ok(r) => r,
        Err(e) => return Err(vec![e]),
    };
    resources.sort_by(|a, b| {
        let idx_a = topo_order.iter().position(|n| n == &a.producer).unwrap_or(usize::MAX);
        let idx_b = topo_order.iter().position(|n| n == &b.producer).unwrap_or(usize::MAX);
        idx_a.cmp(&idx_b).then_with(|| a.name.cmp(&b.name))
    });

    let warnings = collect_warnings(&config.nodes, &resources);
    for warning in &warnings {
        tracing::debug!(?warning, "validation warning");
    }

    Ok(ValidatedPipeline {
        topo_order,
        resources,
        warnings,
    })
}

fn check_ids_and_refs(nodes: &[NodeConfig], errors: &mut Vec<ConfigError>) {
    for node in nodes {
        if !is_valid_id(&node.id) {
            errors.push(ConfigError::InvalidNodeId(node.id.clone()));
        }
        if !is_valid_engine_ref(&node.engine) {
            errors.push(ConfigError::InvalidEngineRef {
                node: node.id.clone(),
                engine: node.engine.clone(),
            });
        }
        if node.outputs.is_empty() {
            errors.push(ConfigError::NoOutputs(node.id.clone()));
        }
        for output in &node.outputs {
            if !is_valid_bus_ref(output) {
                errors.push(ConfigError::InvalidOutputRef {
                    node: node.id.clone(),
                    output: output.clone(),
                });
            }
        }
        for input in &node.inputs {
            if !NodeConfig::is_reserved_input(input) && !is_valid_bus_ref(input) {
                errors.push(ConfigError::InvalidInputRef {
                    node: node.id.clone(),
                    input: input.clone(),
                });
            }
        }
    }
}

fn check_uniqueness(nodes: &[NodeConfig], errors: &mut Vec<ConfigError>) {
    let mut seen_ids = HashSet::new();
    for node in nodes {
        if !seen_ids.insert(node.id.as_str()) {
            errors.push(ConfigError::DuplicateNodeId(node.id.clone()));
        }
    }

    let mut seen_outputs: HashMap<&str, &str> = HashMap::new();
    for node in nodes {
        for output in &node.outputs {
            if seen_outputs.contains_key(output.as_str()) {
                errors.push(ConfigError::DuplicateResource(output.clone()));
            } else {
                seen_outputs.insert(output.as_str(), node.id.as_str());
            }
        }
    }
}

/// Map each bus resource name to the id of the node that produces it.
fn map_producers(nodes: &[NodeConfig]) -> (HashMap<String, String>, Vec<ConfigError>) {
    let mut producer_of = HashMap::new();
    for node in nodes {
        for output in &node.outputs {
            producer_of.insert(output.clone(), node.id.clone());
        }
    }
    (producer_of, Vec::new())
}

fn check_inputs_resolve(
    nodes: &[NodeConfig],
    producer_of: &HashMap<String, String>,
    errors: &mut Vec<ConfigError>,
) {
    for node in nodes {
        for input in &node.inputs {
            if NodeConfig::is_reserved_input(input) {
                continue;
            }
            if !producer_of.contains_key(input) {
                errors.push(ConfigError::OrphanInput {
                    node: node.id.clone(),
                    input: input.clone(),
                });
            }
        }
    }
}

/// Kahn's algorithm. Returns the residual unordered node set on a cycle.
fn topological_sort(
    nodes: &[NodeConfig],
    producer_of: &HashMap<String, String>,
) -> Result<Vec<String>, Vec<String>> {
    let mut indegree: HashMap<&str, usize> = nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    let mut edges: HashMap<&str, Vec<&str>> = nodes.iter().map(|n| (n.id.as_str(), Vec::new())).collect();

    for node in nodes {
        for input in &node.inputs {
            if let Some(producer) = producer_of.get(input) {
                edges.get_mut(producer.as_str()).unwrap().push(node.id.as_str());
                *indegree.get_mut(node.id.as_str()).unwrap() += 1;
            }
        }
    }

    // Deterministic order: process ready nodes in declaration order.
    let declared_order: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut queue: VecDeque<&str> = declared_order
        .iter()
        .copied()
        .filter(|id| indegree[id] == 0)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        let mut newly_ready = Vec::new();
        for &next in &edges[id] {
            let d = indegree.get_mut(next).unwrap();
            *d -= 1;
            if *d == 0 {
                newly_ready.push(next);
            }
        }
        for next in declared_order.iter().filter(|id| newly_ready.contains(id)) {
            queue.push_back(next);
        }
    }

    if order.len() == nodes.len() {
        Ok(order)
    } else {
        let ordered_set: HashSet<&str> = order.iter().map(|s| s.as_str()).collect();
        let cycle_nodes = declared_order
            .into_iter()
            .filter(|id| !ordered_set.contains(id))
            .map(|s| s.to_string())
            .collect();
        Err(cycle_nodes)
    }
}

fn build_resource_catalog(
    nodes: &[NodeConfig],
    producer_of: &HashMap<String, String>,
    _topo_order: &[String],
) -> Result<Vec<BusResourceDescriptor>, ConfigError> {
    let nodes_by_id: HashMap<&str, &NodeConfig> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut resources = Vec::new();

    for node in nodes {
        for output in &node.outputs {
            let resource_name = output.strip_prefix("bus://").unwrap_or(output).to_string();
            let (element_type, element_count) = resolve_size_spec(&node.id, &resource_name, &node.config)?;
            let size_bytes = aligned_size_bytes(element_type, element_count);
            let consumers: Vec<String> = nodes
                .iter()
                .filter(|n| n.inputs.iter().any(|i| i == output))
                .map(|n| n.id.clone())
                .collect();
            resources.push(BusResourceDescriptor {
                name: resource_name,
                element_type,
                element_count,
                size_bytes,
                producer: node.id.clone(),
                consumers,
            });
        }
    }

    let _ = (producer_of, nodes_by_id);
    Ok(resources)
}

fn collect_warnings(nodes: &[NodeConfig], resources: &[BusResourceDescriptor]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    for resource in resources {
        if resource.consumers.is_empty() {
            warnings.push(ValidationWarning::UnusedOutput {
                node: resource.producer.clone(),
                resource: resource.name.clone(),
            });
        }
    }
    for node in nodes {
        let has_consumed_output = resources
            .iter()
            .any(|r| r.producer == node.id && !r.consumers.is_empty());
        if !node.outputs.is_empty() && !has_consumed_output {
            warnings.push(ValidationWarning::SinkNode { node: node.id.clone() });
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecalc_config::parse_pipeline_config;

    fn nodes(json: &str) -> PipelineConfig {
        parse_pipeline_config(json).unwrap().pipeline
    }

    #[test]
    fn rejects_empty_pipeline() {
        let cfg = nodes(r#"{"pipeline": {"nodes": []}}"#);
        assert_eq!(validate(&cfg).unwrap_err(), vec![ConfigError::EmptyPipeline]);
    }

    #[test]
    fn accepts_linear_two_node_pipeline() {
        let cfg = nodes(
            r#"{"pipeline": {"nodes": [
                {"id": "gen", "engine": "native://gen", "outputs": ["bus://prices"]},
                {"id": "sum", "engine": "native://sum", "inputs": ["bus://prices"], "outputs": ["bus://total"]}
            ]}}"#,
        );
        let validated = validate(&cfg).unwrap();
        assert_eq!(validated.topo_order, vec!["gen", "sum"]);
        assert_eq!(validated.resources.len(), 2);
    }

    #[test]
    fn detects_cycle() {
        let cfg = nodes(
            r#"{"pipeline": {"nodes": [
                {"id": "a", "engine": "native://a", "inputs": ["bus://b_out"], "outputs": ["bus://a_out"]},
                {"id": "b", "engine": "native://b", "inputs": ["bus://a_out"], "outputs": ["bus://b_out"]}
            ]}}"#,
        );
        let err = validate(&cfg).unwrap_err();
        assert_eq!(err.len(), 1);
        match &err[0] {
            ConfigError::CircularDependency { cycle_nodes } => {
                assert_eq!(cycle_nodes.len(), 2);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn reserved_inputs_never_require_a_producer() {
        let cfg = nodes(
            r#"{"pipeline": {"nodes": [
                {"id": "gen", "engine": "native://gen", "inputs": ["$policies"], "outputs": ["bus://prices"]}
            ]}}"#,
        );
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn orphan_input_is_rejected() {
        let cfg = nodes(
            r#"{"pipeline": {"nodes": [
                {"id": "sum", "engine": "native://sum", "inputs": ["bus://missing"], "outputs": ["bus://total"]}
            ]}}"#,
        );
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err[0], ConfigError::OrphanInput { .. }));
    }

    #[test]
    fn sink_node_and_unused_output_warnings_surface() {
        let cfg = nodes(
            r#"{"pipeline": {"nodes": [
                {"id": "gen", "engine": "native://gen", "outputs": ["bus://prices"]}
            ]}}"#,
        );
        let validated = validate(&cfg).unwrap();
        assert_eq!(validated.warnings.len(), 2);
    }
}
