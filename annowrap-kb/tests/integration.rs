//! Integration tests for the knowledge-base wrappers over a memory graph.

use annowrap_core::{
    wrap_list, FeatureValue, Graph, GraphError, MemoryGraph, NodeHandle, StageConfig, TypeSystem,
    WrapError, WrapperId, WrapperIndexer,
};
use annowrap_kb::schema::{feature, CONCEPT, CONCEPT_MENTION, ENTITY, QUESTION, RELATION};
use annowrap_kb::{
    ConceptMentionWrapper, ConceptWrapper, EntityWrapper, QuestionType, QuestionWrapper,
    RelationWrapper,
};
use std::sync::Arc;

fn types() -> TypeSystem {
    annowrap_kb::type_system().unwrap()
}

fn indexer() -> WrapperIndexer {
    WrapperIndexer::new(Arc::new(annowrap_kb::registry(&types()).unwrap()))
}

fn graph() -> MemoryGraph {
    MemoryGraph::new(types())
}

fn entity(graph: &mut MemoryGraph, name: &str) -> NodeHandle {
    graph
        .create(
            ENTITY,
            [
                (feature::NAME, FeatureValue::from(name)),
                (feature::IDS, FeatureValue::from(vec![format!("id:{name}")])),
            ],
        )
        .unwrap()
}

fn relation(graph: &mut MemoryGraph, name: &str, arguments: Vec<NodeHandle>) -> NodeHandle {
    graph
        .create(
            RELATION,
            [
                (feature::NAME, FeatureValue::from(name)),
                (feature::ARGUMENTS, FeatureValue::from(arguments)),
            ],
        )
        .unwrap()
}

fn argument_names(indexer: &WrapperIndexer, relation: WrapperId) -> Vec<String> {
    indexer
        .get::<RelationWrapper>(relation)
        .unwrap()
        .arguments
        .iter()
        .map(|id| indexer.get::<EntityWrapper>(*id).unwrap().name().to_string())
        .collect()
}

/// Relation `treats(aspirin)` where aspirin's only mention points back at the relation.
fn cyclic_graph() -> (MemoryGraph, NodeHandle, NodeHandle, NodeHandle) {
    let mut g = graph();
    let aspirin = entity(&mut g, "aspirin");
    let treats = relation(&mut g, "treats", vec![aspirin]);
    let mention = g
        .create(
            CONCEPT_MENTION,
            [
                (feature::BEGIN, FeatureValue::Int(0)),
                (feature::END, FeatureValue::Int(7)),
                (feature::TEXT, FeatureValue::from("aspirin")),
                (feature::CONCEPT, FeatureValue::from(treats)),
            ],
        )
        .unwrap();
    g.set_feature(aspirin, feature::MENTIONS, vec![mention].into())
        .unwrap();
    (g, treats, aspirin, mention)
}

#[test]
fn relation_entity_mention_cycle_wraps_once() {
    let (g, treats, aspirin, mention) = cyclic_graph();
    let mut indexer = indexer();

    let relations = indexer.wrappers_of_type(&g, RELATION).unwrap().clone();
    assert_eq!(relations.len(), 1);
    assert_eq!(indexer.len(), 3);

    let relation_id = indexer.wrapper_for(treats).unwrap();
    let entity_id = indexer.wrapper_for(aspirin).unwrap();
    let mention_id = indexer.wrapper_for(mention).unwrap();
    assert!(relations.contains(&relation_id));

    let relation = indexer.get::<RelationWrapper>(relation_id).unwrap();
    assert_eq!(relation.arguments, vec![entity_id]);
    let entity = indexer.get::<EntityWrapper>(entity_id).unwrap();
    assert_eq!(entity.concept.mentions, vec![mention_id]);
    let mention = indexer.get::<ConceptMentionWrapper>(mention_id).unwrap();
    assert_eq!(mention.concept, Some(relation_id));

    // Querying the entity type reuses the wrapper built through the relation
    let entities = indexer.wrappers_of_type(&g, ENTITY).unwrap().clone();
    assert_eq!(entities.into_iter().collect::<Vec<_>>(), vec![entity_id]);
    assert_eq!(indexer.len(), 3);
    assert!(indexer.content_key(relation_id).is_ok());
}

#[test]
fn cyclic_relation_unwraps_to_one_node_each() {
    let (g, treats, _, _) = cyclic_graph();
    let mut indexer = indexer();
    let relation_id = indexer.wrap_node(&g, treats).unwrap();

    let mut target = graph();
    let relation_node = indexer.unwrap(relation_id, &mut target).unwrap();
    assert_eq!(target.len(), 3);

    let Some(FeatureValue::RefArray(arguments)) =
        target.feature(relation_node, feature::ARGUMENTS).unwrap()
    else {
        panic!("expected argument array");
    };
    let Some(FeatureValue::RefArray(mentions)) =
        target.feature(arguments[0], feature::MENTIONS).unwrap()
    else {
        panic!("expected mention array");
    };
    assert_eq!(
        target.feature(mentions[0], feature::CONCEPT).unwrap(),
        Some(&FeatureValue::Ref(relation_node))
    );

    let rewrapped = indexer.wrap_node(&target, relation_node).unwrap();
    assert!(indexer.content_eq(relation_id, rewrapped).unwrap());
}

#[test]
fn failed_unwrap_unregisters_nested_wrappers() {
    let (mut g, treats, aspirin, _) = cyclic_graph();
    // The relation is mentioned too, so its mention is unwrapped before its arguments
    let mention = g
        .create(
            CONCEPT_MENTION,
            [
                (feature::BEGIN, FeatureValue::Int(10)),
                (feature::END, FeatureValue::Int(16)),
                (feature::CONCEPT, FeatureValue::from(treats)),
            ],
        )
        .unwrap();
    g.set_feature(treats, feature::MENTIONS, vec![mention].into())
        .unwrap();
    let mut indexer = indexer();
    let relation_id = indexer.wrap_node(&g, treats).unwrap();
    let mention_id = indexer.wrapper_for(mention).unwrap();
    let entity_id = indexer.wrapper_for(aspirin).unwrap();

    let mut no_entities = TypeSystem::new();
    no_entities
        .declare(CONCEPT, "kb.Concept", None)
        .unwrap()
        .declare(RELATION, "kb.Relation", Some(CONCEPT))
        .unwrap()
        .declare(CONCEPT_MENTION, "kb.ConceptMention", None)
        .unwrap();
    let mut partial = MemoryGraph::new(no_entities);

    assert!(matches!(
        indexer.unwrap(relation_id, &mut partial),
        Err(WrapError::Graph(GraphError::UnknownType(ENTITY)))
    ));
    assert!(!indexer.is_unwrapped(relation_id));
    assert!(!indexer.is_unwrapped(mention_id));
    assert!(!indexer.is_unwrapped(entity_id));

    // A retry into a complete graph emits one node per wrapper
    let mut target = graph();
    let relation_node = indexer.unwrap(relation_id, &mut target).unwrap();
    let mention_node = indexer.node_for(mention_id).unwrap();
    assert_eq!(target.enumerate(RELATION), vec![relation_node]);
    assert_eq!(target.len(), 4);
    assert_eq!(
        target.feature(mention_node, feature::CONCEPT).unwrap(),
        Some(&FeatureValue::Ref(relation_node))
    );
}

#[test]
fn equal_entities_are_listed_once() {
    let mut g = graph();
    let first = entity(&mut g, "aspirin");
    let second = entity(&mut g, "aspirin");
    let mut indexer = indexer();

    let entities = indexer.wrappers_of_type(&g, ENTITY).unwrap().clone();

    assert_eq!(entities.len(), 1);
    assert!(indexer.is_wrapped(first));
    assert!(indexer.is_wrapped(second));
    let first_id = indexer.wrapper_for(first).unwrap();
    let second_id = indexer.wrapper_for(second).unwrap();
    assert_ne!(first_id, second_id);
    assert!(indexer.content_eq(first_id, second_id).unwrap());
}

#[test]
fn mention_keeps_concept_subtype() {
    let (g, _, _, mention) = cyclic_graph();
    let mut indexer = indexer();

    let mention_id = indexer.wrap_as::<ConceptMentionWrapper>(&g, mention).unwrap();
    let concept_id = indexer
        .get::<ConceptMentionWrapper>(mention_id)
        .unwrap()
        .concept
        .unwrap();

    assert!(indexer.get::<RelationWrapper>(concept_id).is_some());
    assert!(indexer.get::<ConceptWrapper>(concept_id).is_none());
    assert_eq!(indexer.declared_type(concept_id), Some(RELATION));
}

#[test]
fn plain_concepts_use_the_base_wrapper() {
    let mut g = graph();
    let node = g
        .create(CONCEPT, [(feature::NAME, FeatureValue::from("disease"))])
        .unwrap();
    let mut indexer = indexer();

    let id = indexer.wrap_node(&g, node).unwrap();
    let concept = indexer.get::<ConceptWrapper>(id).unwrap();
    assert_eq!(concept.name, "disease");
    assert!(concept.ids.is_empty());
    assert!(concept.mentions.is_empty());
}

#[test]
fn argument_order_survives_round_trip() {
    let mut g = graph();
    let e1 = entity(&mut g, "e1");
    let e2 = entity(&mut g, "e2");
    let e3 = entity(&mut g, "e3");
    let rel = relation(&mut g, "between", vec![e1, e2, e3]);
    let mut indexer = indexer();
    let id = indexer.wrap_node(&g, rel).unwrap();
    assert_eq!(argument_names(&indexer, id), vec!["e1", "e2", "e3"]);

    let mut target = graph();
    let node = indexer.unwrap(id, &mut target).unwrap();
    let rewrapped = indexer.wrap_node(&target, node).unwrap();

    assert_eq!(argument_names(&indexer, rewrapped), vec!["e1", "e2", "e3"]);
    assert!(indexer.content_eq(id, rewrapped).unwrap());
}

#[test]
fn relations_compare_by_value() {
    let mut g = graph();
    let subject_a = entity(&mut g, "aspirin");
    let object_a = entity(&mut g, "headache");
    let subject_b = entity(&mut g, "aspirin");
    let object_b = entity(&mut g, "headache");
    let first = relation(&mut g, "treats", vec![subject_a, object_a]);
    let second = relation(&mut g, "treats", vec![subject_b, object_b]);
    let mut indexer = indexer();

    let first_id = indexer.wrap_node(&g, first).unwrap();
    let second_id = indexer.wrap_node(&g, second).unwrap();
    assert_ne!(first_id, second_id);
    assert!(indexer.content_eq(first_id, second_id).unwrap());
    assert_eq!(
        indexer.content_key(first_id).unwrap(),
        indexer.content_key(second_id).unwrap()
    );

    // Swapping in a different argument breaks equality
    let fever = indexer.insert(EntityWrapper::new(
        ConceptWrapper::new("fever", vec!["id:fever".to_string()], vec![]),
        None,
    ));
    let mut edited = indexer.get::<RelationWrapper>(second_id).unwrap().clone();
    edited.arguments[1] = fever;
    let edited_id = indexer.insert(edited);
    assert!(!indexer.content_eq(first_id, edited_id).unwrap());
}

#[test]
fn provenance_is_carried_but_not_compared() {
    let mut g = graph();
    let plain = entity(&mut g, "aspirin");
    let tagged = entity(&mut g, "aspirin");
    g.set_feature(tagged, feature::PROVENANCE, "dictionary-lookup".into())
        .unwrap();
    let mut indexer = indexer();

    let plain_id = indexer.wrap_node(&g, plain).unwrap();
    let tagged_id = indexer.wrap_node(&g, tagged).unwrap();
    assert!(indexer.content_eq(plain_id, tagged_id).unwrap());
    assert_eq!(
        indexer.wrapper(tagged_id).unwrap().provenance(),
        Some("dictionary-lookup")
    );

    let mut target = graph();
    let node = indexer.unwrap(tagged_id, &mut target).unwrap();
    assert_eq!(
        target.feature(node, feature::PROVENANCE).unwrap(),
        Some(&FeatureValue::from("dictionary-lookup"))
    );
}

#[test]
fn entity_list_is_fail_fast() {
    let mut g = graph();
    let first = entity(&mut g, "first");
    let malformed = g.allocate(ENTITY).unwrap();
    let third = entity(&mut g, "third");
    let mut indexer = indexer();

    let result = wrap_list::<EntityWrapper>(&mut indexer, &g, &[first, malformed, third]);

    assert!(matches!(
        result,
        Err(WrapError::MissingFeature { ref feature, .. }) if feature == "name"
    ));
    assert!(!indexer.is_wrapped(third));
}

#[test]
fn relation_argument_must_be_an_entity() {
    let mut g = graph();
    let mention = g
        .create(
            CONCEPT_MENTION,
            [
                (feature::BEGIN, FeatureValue::Int(0)),
                (feature::END, FeatureValue::Int(1)),
            ],
        )
        .unwrap();
    let rel = relation(&mut g, "broken", vec![mention]);
    let mut indexer = indexer();

    let result = indexer.wrap_node(&g, rel);
    assert!(matches!(
        result,
        Err(WrapError::TypeMismatch { expected: ENTITY, found: CONCEPT_MENTION, .. })
    ));
    assert!(!indexer.is_wrapped(rel));
}

#[test]
fn relation_without_arguments_is_missing_a_feature() {
    let mut g = graph();
    let rel = g
        .create(RELATION, [(feature::NAME, FeatureValue::from("lonely"))])
        .unwrap();
    let mut indexer = indexer();

    assert!(matches!(
        indexer.wrap_node(&g, rel),
        Err(WrapError::MissingFeature { ref feature, .. }) if feature == "arguments"
    ));
}

fn question(graph: &mut MemoryGraph, question_type: &str) -> NodeHandle {
    graph
        .create(
            QUESTION,
            [
                (feature::BEGIN, FeatureValue::Int(0)),
                (feature::END, FeatureValue::Int(30)),
                (feature::ID, FeatureValue::from("q-1")),
                (feature::SOURCE, FeatureValue::from("trec")),
                (feature::TEXT, FeatureValue::from("What does aspirin treat?")),
                (feature::QUESTION_TYPE, FeatureValue::from(question_type)),
            ],
        )
        .unwrap()
}

#[test]
fn question_round_trip() {
    let mut g = graph();
    let node = question(&mut g, "FACTOID");
    let mut indexer = indexer();

    let questions = indexer.wrappers_of_type(&g, QUESTION).unwrap().clone();
    let id = *questions.first().unwrap();
    let wrapped = indexer.get::<QuestionWrapper>(id).unwrap();
    assert_eq!(wrapped.question_type, QuestionType::Factoid);
    assert_eq!(wrapped.text, "What does aspirin treat?");
    assert_eq!(indexer.wrapper_for(node), Some(id));

    let mut target = graph();
    let emitted = indexer.unwrap(id, &mut target).unwrap();
    assert_eq!(
        target.feature(emitted, feature::QUESTION_TYPE).unwrap(),
        Some(&FeatureValue::from("FACTOID"))
    );
    let rewrapped = indexer.wrap_node(&target, emitted).unwrap();
    assert!(indexer.content_eq(id, rewrapped).unwrap());
}

#[test]
fn unknown_question_type_is_invalid() {
    let mut g = graph();
    let node = question(&mut g, "RHETORICAL");
    let mut indexer = indexer();

    assert!(matches!(
        indexer.wrap_node(&g, node),
        Err(WrapError::InvalidValue { ref value, .. }) if value == "RHETORICAL"
    ));
}

#[test]
fn stage_config_drives_type_queries() {
    let config = StageConfig::from_toml_str(
        r#"
        stage = "relation-extraction"
        query = ["kb.Relation", "kb.Entity"]
        "#,
    )
    .unwrap();
    let types = types();
    let registry = annowrap_kb::registry(&types).unwrap();
    let codes = config.resolve(&types, &registry).unwrap();
    assert_eq!(codes, vec![RELATION, ENTITY]);

    let (g, _, _, _) = cyclic_graph();
    let mut indexer = WrapperIndexer::new(Arc::new(registry));
    let sets = indexer.wrappers_of_types(&g, &codes).unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].len(), 1);
    assert_eq!(sets[1].len(), 1);
}

#[test]
fn each_unit_owns_its_indexer() {
    let (g, treats, _, _) = cyclic_graph();

    let mut first_unit = indexer();
    let first = first_unit.wrap_node(&g, treats).unwrap();
    drop(first_unit);

    let mut second_unit = indexer();
    assert!(!second_unit.is_wrapped(treats));
    let second = second_unit.wrap_node(&g, treats).unwrap();
    assert_eq!(second_unit.len(), 3);
    assert_eq!(first.as_raw(), second.as_raw());
}
