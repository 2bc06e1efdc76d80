//! Prompt text for extraction, query understanding, answering and the agent.

use crate::config::ExtractionConfig;
use crate::store::SchemaSummary;

const TIMESTAMP_FORMAT: &str = "YYYY-MM-DD for a day, YYYY for a year, YYYY-Qn for a quarter";

/// System prompt asking for temporal entity and relation records.
pub fn extraction_system(config: &ExtractionConfig) -> String {
    let t = &config.tuple_delimiter;
    let r = &config.record_delimiter;
    format!(
        r#"You build a temporal knowledge graph from text.

1. Find every time expression that anchors an event: dates, years, fiscal quarters.
   Normalize each name as {format}.
   Emit ("entity"{t}<normalized time>{t}timestamp{t}<what happened at that time>)

2. Find the entities that take part in those events. Allowed types: [{types}].
   Skip bare numbers and amounts.
   Emit ("entity"{t}<capitalized name>{t}<type>{t}<role of the entity in the text>)

3. For each pair of entities clearly related at a specific time, emit
   ("relationship"{t}<time name from step 1>{t}<source entity>{t}<target entity>{t}<what happened between them>)

Return all records as one list separated by {r}. Output nothing else.

Example
Text: On 2008-09-15 Lehman Brothers filed for bankruptcy, which triggered the Global Financial Crisis.
Output:
("entity"{t}"2008-09-15"{t}"timestamp"{t}"Lehman Brothers filed for bankruptcy"){r}
("entity"{t}"Lehman Brothers"{t}"company"{t}"Investment bank that filed for bankruptcy"){r}
("entity"{t}"Global Financial Crisis"{t}"event"{t}"Worldwide downturn triggered by the collapse"){r}
("relationship"{t}"2008-09-15"{t}"Lehman Brothers"{t}"Global Financial Crisis"{t}"The bankruptcy of Lehman Brothers triggered the Global Financial Crisis")"#,
        format = TIMESTAMP_FORMAT,
        types = config.entity_types.join(", "),
    )
}

pub fn extraction_user(config: &ExtractionConfig, text: &str) -> String {
    format!(
        "Entity types: {}\nText:\n{}\n\nOutput:",
        config.entity_types.join(", "),
        text
    )
}

/// System prompt asking for the entities and time expressions of a question.
pub fn query_system(config: &ExtractionConfig) -> String {
    let t = &config.tuple_delimiter;
    let r = &config.record_delimiter;
    format!(
        r#"Extract the named entities and time expressions mentioned in a question.

Time expressions use one of the types [{time_types}] and are normalized as {format}.
Other entities use one of the types [{types}].

Emit each as ("entity"{t}<name>{t}<type>) and separate records with {r}.
Output nothing else. If the question mentions nothing, output nothing.

Example
Question: What did Acme Corp acquire in Q1 2021?
Output:
("entity"{t}"Acme Corp"{t}"company"){r}
("entity"{t}"2021-Q1"{t}"quarter")"#,
        time_types = config.time_types.join(", "),
        format = TIMESTAMP_FORMAT,
        types = config.entity_types.join(", "),
    )
}

pub fn query_user(question: &str) -> String {
    format!("Question: {}\n\nOutput:", question)
}

pub const ANSWER_SYSTEM: &str = "Answer the question using only the evidence provided.
Lines tagged [chunk:...] are source text; lines tagged [edge:...] are dated facts with the chunk they came from.
Answer directly and keep temporal details exact.
When the evidence only partly answers the question, give what it supports and say what is missing.
When it does not answer the question at all, say so.";

pub fn answer_user(question: &str, context: &str) -> String {
    format!(
        "Evidence:\n{}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}

/// Schema of the graph as written by ingestion.
pub const GRAPH_SCHEMA: &str = "(:Entity {id, name, type, description, normalized_name, aliases: [string], embedding})
(:Chunk {id, text, embedding})
(:Source {id})
(:Chunk)-[:MENTIONS]->(:Entity)
(:Chunk)-[:FROM_SOURCE]->(:Source)
(:Entity)-[:RELATED_TO {relation_text, start_date, end_date, source_id, chunk_id, embedding}]->(:Entity)
Full-text index: entity_name_aliases on Entity.name, Entity.aliases
Vector indexes: chunk_embedding, entity_embedding, relation_embedding
Dates are strings: YYYY-MM-DD";

/// System prompt for the exploratory Cypher agent.
///
/// `introspection` is the live schema, or the error that prevented reading it.
pub fn agent_system(introspection: Result<&SchemaSummary, String>) -> String {
    let live = match introspection {
        Ok(summary) => format!(
            "Labels: {}\nRelationship types: {}\nProperty keys: {}",
            summary.labels.join(", "),
            summary.relationship_types.join(", "),
            summary.property_keys.join(", ")
        ),
        Err(e) => format!("Introspection failed: {}", e),
    };

    format!(
        r#"You answer questions by querying a Neo4j graph, one query per turn.

Reply with exactly one of:
QUERY: <one read-only Cypher query>
FINAL: <the answer>

Keep queries read-only and as simple as possible.
Use only labels, relationship types and properties that exist.
`aliases` is a list: use ANY(a IN e.aliases WHERE toLower(a) CONTAINS 'x'), never toLower(e.aliases).

Schema:
{schema}

Database:
{live}"#,
        schema = GRAPH_SCHEMA,
    )
}

pub fn agent_question(question: &str) -> String {
    format!("Question:\n{}", question)
}

pub fn agent_observation(cypher: &str, rows_json: &str) -> String {
    format!("Query:\n{}\n\nResults (JSON):\n{}", cypher, rows_json)
}
