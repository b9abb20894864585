//! Cypher statements issued by the smoke test. Every statement is keyed on
//! the run's `$id` tag.

/// Create the tagged node. Returns one row when the write happened.
pub const CREATE_TEST_NODE: &str = "\
CREATE (t:TestNode {id: $id, name: $name, created_at: $timestamp})
RETURN t.id AS id";

/// Look the tagged node up again.
pub const READ_TEST_NODE: &str = "\
MATCH (t:TestNode {id: $id})
RETURN t.name AS name, t.created_at AS created_at";

/// Hang a metadata node off the tagged node and report its status.
pub const LINK_TEST_METADATA: &str = "\
MATCH (t:TestNode {id: $id})
CREATE (t)-[:HAS_TEST {timestamp: $timestamp}]->(m:TestMetadata {status: 'OK'})
RETURN m.status AS status";

/// Remove the tagged node and the metadata nodes linked from it. Matching
/// nothing is not an error, so running it twice is harmless.
pub const CLEANUP_TEST_NODES: &str = "\
MATCH (t:TestNode {id: $id})
OPTIONAL MATCH (t)-[:HAS_TEST]->(m:TestMetadata)
DETACH DELETE t, m";
