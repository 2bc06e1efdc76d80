//! Schema repository: constraints, indexes and introspection.

use crate::error::AppError;
use crate::graph::{CypherExecutor, QueryExt};
use crate::store::{IndexDimensions, SchemaSummary};

pub struct SchemaRepository<'a, E: CypherExecutor + ?Sized> {
    graph: &'a E,
}

impl<'a, E: CypherExecutor + ?Sized> SchemaRepository<'a, E> {
    pub fn new(graph: &'a E) -> Self {
        Self { graph }
    }

    /// Create constraints and indexes. Idempotent.
    pub async fn ensure(&self, dimensions: IndexDimensions) -> Result<(), AppError> {
        self.create_constraints().await?;
        self.create_fulltext_index().await?;
        self.create_vector_indexes(dimensions).await
    }

    async fn create_constraints(&self) -> Result<(), AppError> {
        let constraints = [
            "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (e:Entity) REQUIRE e.id IS UNIQUE",
            "CREATE CONSTRAINT chunk_id IF NOT EXISTS FOR (c:Chunk) REQUIRE c.id IS UNIQUE",
            "CREATE CONSTRAINT source_id IF NOT EXISTS FOR (s:Source) REQUIRE s.id IS UNIQUE",
        ];

        for constraint in constraints {
            self.graph.query(constraint).run().await?;
        }
        Ok(())
    }

    async fn create_fulltext_index(&self) -> Result<(), AppError> {
        self.graph
            .query(
                "CREATE FULLTEXT INDEX entity_name_aliases IF NOT EXISTS
                 FOR (e:Entity) ON EACH [e.name, e.aliases]",
            )
            .run()
            .await
    }

    /// Vector index DDL does not accept parameters, so dimensions are
    /// formatted in. Relationship vector indexes need Neo4j 5.18+; failures
    /// are logged rather than fatal.
    async fn create_vector_indexes(&self, dimensions: IndexDimensions) -> Result<(), AppError> {
        let options = |dims: usize| {
            format!(
                "OPTIONS {{indexConfig: {{`vector.dimensions`: {dims}, `vector.similarity_function`: 'cosine'}}}}"
            )
        };
        let indexes = [
            format!(
                "CREATE VECTOR INDEX chunk_embedding IF NOT EXISTS
                 FOR (c:Chunk) ON c.embedding {}",
                options(dimensions.text)
            ),
            format!(
                "CREATE VECTOR INDEX entity_embedding IF NOT EXISTS
                 FOR (e:Entity) ON e.embedding {}",
                options(dimensions.entity)
            ),
            format!(
                "CREATE VECTOR INDEX relation_embedding IF NOT EXISTS
                 FOR ()-[r:RELATED_TO]-() ON r.embedding {}",
                options(dimensions.text)
            ),
        ];

        for index in &indexes {
            if let Err(e) = self.graph.query(index).run().await {
                tracing::warn!("Could not create vector index: {}", e);
            }
        }
        Ok(())
    }

    /// Labels, relationship types and property keys currently in the graph.
    pub async fn summary(&self) -> Result<SchemaSummary, AppError> {
        Ok(SchemaSummary {
            labels: self
                .collect("CALL db.labels() YIELD label RETURN collect(label) AS items")
                .await?,
            relationship_types: self
                .collect(
                    "CALL db.relationshipTypes() YIELD relationshipType
                     RETURN collect(relationshipType) AS items",
                )
                .await?,
            property_keys: self
                .collect("CALL db.propertyKeys() YIELD propertyKey RETURN collect(propertyKey) AS items")
                .await?,
        })
    }

    async fn collect(&self, cypher: &str) -> Result<Vec<String>, AppError> {
        let row = self.graph.query(cypher).fetch_one().await?;
        match row {
            Some(row) => {
                let mut items: Vec<String> = row.get_opt("items")?.unwrap_or_default();
                items.sort();
                Ok(items)
            }
            None => Ok(Vec::new()),
        }
    }
}
