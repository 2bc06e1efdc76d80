//! Entity resolution: match a mention to an existing entity or create one.

use std::sync::Arc;

use tracing::debug;

use crate::config::{MatchStrategy, ResolverConfig};
use crate::error::AppError;
use crate::llm::Embedder;
use crate::models::{Entity, ExtractedEntity, LinkMethod, ScoredEntity};
use crate::store::{GraphReader, Mutation};

use super::lexical::{alias_overlap, tokens};

/// What happened to a mention.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Merged { score: f64, method: LinkMethod },
    Created,
}

/// The resolved entity id and the write, if any, that resolution requires.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub entity_id: String,
    pub outcome: ResolutionOutcome,
    /// `CreateEntity` for a new entity, `AddAlias` for a merge under a new
    /// surface name, `None` when the name is already known.
    pub mutation: Option<Mutation>,
}

struct Candidate {
    entity: ScoredEntity,
    score: f64,
    method: LinkMethod,
}

/// Resolves extracted entity mentions against the graph.
///
/// Stateless across calls: reads go through whatever reader is passed in, so
/// resolving inside a transaction sees entities created earlier in it.
#[derive(Clone)]
pub struct EntityResolver {
    strategy: MatchStrategy,
    type_strict: bool,
    embedder: Option<Arc<dyn Embedder>>,
}

impl EntityResolver {
    /// Fails when the strategy needs name embeddings and no embedder is given.
    pub fn new(config: &ResolverConfig, embedder: Option<Arc<dyn Embedder>>) -> Result<Self, AppError> {
        if config.strategy.uses_embeddings() && embedder.is_none() {
            return Err(AppError::MissingConfig("entity_embedding.model"));
        }
        Ok(Self {
            strategy: config.strategy.clone(),
            type_strict: config.type_strict,
            embedder,
        })
    }

    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    pub async fn resolve<R: GraphReader + ?Sized>(
        &self,
        reader: &R,
        mention: &ExtractedEntity,
    ) -> Result<Resolution, AppError> {
        let entity_type = self.type_strict.then_some(mention.entity_type.as_str());

        let (candidate, embedding) = match &self.strategy {
            MatchStrategy::LexicalOverlap {
                candidate_k,
                threshold,
            } => {
                let candidate = self
                    .match_lexical(reader, mention, entity_type, *candidate_k, *threshold)
                    .await?;
                (candidate, None)
            }
            MatchStrategy::ThresholdVector {
                fulltext_threshold,
                vector_threshold,
                vector_k,
            } => {
                self.match_threshold_vector(
                    reader,
                    mention,
                    entity_type,
                    *fulltext_threshold,
                    *vector_threshold,
                    *vector_k,
                )
                .await?
            }
        };

        match candidate {
            Some(candidate) => Ok(Self::merge(mention, candidate)),
            None => Ok(self.create(mention, embedding).await?),
        }
    }

    /// Top-K full-text candidates re-scored by alias Jaccard.
    async fn match_lexical<R: GraphReader + ?Sized>(
        &self,
        reader: &R,
        mention: &ExtractedEntity,
        entity_type: Option<&str>,
        candidate_k: usize,
        threshold: f64,
    ) -> Result<Option<Candidate>, AppError> {
        let name_tokens = tokens(&mention.name);
        let mut best: Option<Candidate> = None;

        for entity in reader
            .search_entities(&mention.name, entity_type, candidate_k)
            .await?
        {
            let score = alias_overlap(&name_tokens, &entity.aliases);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Candidate {
                    entity,
                    score,
                    method: LinkMethod::LexicalOverlap,
                });
            }
        }

        Ok(best.filter(|b| b.score >= threshold))
    }

    /// Full-text top hit, else nearest name embedding. Returns the computed
    /// embedding so a new entity can store it.
    async fn match_threshold_vector<R: GraphReader + ?Sized>(
        &self,
        reader: &R,
        mention: &ExtractedEntity,
        entity_type: Option<&str>,
        fulltext_threshold: f64,
        vector_threshold: f64,
        vector_k: usize,
    ) -> Result<(Option<Candidate>, Option<Vec<f32>>), AppError> {
        let top = reader
            .search_entities(&mention.name, entity_type, 1)
            .await?
            .into_iter()
            .next();
        if let Some(entity) = top.filter(|e| e.score >= fulltext_threshold) {
            let score = entity.score;
            return Ok((
                Some(Candidate {
                    entity,
                    score,
                    method: LinkMethod::Fulltext,
                }),
                None,
            ));
        }

        // Name only: embedding descriptions merges distinct people.
        let embedding = self.embed_name(&mention.name).await?;
        let nearest = reader
            .nearest_entities(&embedding, entity_type, vector_k)
            .await?
            .into_iter()
            .next()
            .filter(|e| e.score >= vector_threshold)
            .map(|entity| Candidate {
                score: entity.score,
                entity,
                method: LinkMethod::Vector,
            });

        Ok((nearest, Some(embedding)))
    }

    async fn embed_name(&self, name: &str) -> Result<Vec<f32>, AppError> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or(AppError::MissingConfig("entity_embedding.model"))?;
        embedder.embed_one(name.trim()).await
    }

    fn merge(mention: &ExtractedEntity, candidate: Candidate) -> Resolution {
        let known = candidate.entity.name == mention.name
            || candidate.entity.aliases.iter().any(|a| a == &mention.name);

        debug!(
            mention = %mention.name,
            entity = %candidate.entity.name,
            score = candidate.score,
            method = ?candidate.method,
            new_alias = !known,
            "Merged mention into existing entity"
        );

        Resolution {
            mutation: (!known).then(|| Mutation::AddAlias {
                entity_id: candidate.entity.id.clone(),
                alias: mention.name.clone(),
            }),
            entity_id: candidate.entity.id,
            outcome: ResolutionOutcome::Merged {
                score: candidate.score,
                method: candidate.method,
            },
        }
    }

    async fn create(
        &self,
        mention: &ExtractedEntity,
        embedding: Option<Vec<f32>>,
    ) -> Result<Resolution, AppError> {
        let mut entity = Entity::new(
            mention.name.clone(),
            mention.entity_type.clone(),
            mention.description.clone(),
        );
        if self.strategy.uses_embeddings() {
            let embedding = match embedding {
                Some(embedding) => embedding,
                None => self.embed_name(&mention.name).await?,
            };
            entity = entity.with_embedding(embedding);
        }

        debug!(mention = %mention.name, entity_id = %entity.id, "Created new entity");

        Ok(Resolution {
            entity_id: entity.id.clone(),
            outcome: ResolutionOutcome::Created,
            mutation: Some(Mutation::CreateEntity { entity }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::HashEmbedder;
    use crate::store::{GraphStore, MemoryStore, UnitOfWork};

    fn company(name: &str) -> ExtractedEntity {
        ExtractedEntity::new(name, "company", "")
    }

    fn lexical() -> EntityResolver {
        EntityResolver::new(&ResolverConfig::default(), None).unwrap()
    }

    /// Resolves and applies each mention in its own committed unit of work.
    async fn resolve_all(
        resolver: &EntityResolver,
        store: &MemoryStore,
        names: &[&str],
    ) -> Vec<Resolution> {
        let mut out = Vec::new();
        for name in names {
            let mut unit = UnitOfWork::begin(store).await.unwrap();
            let resolution = resolver.resolve(unit.reader(), &company(name)).await.unwrap();
            if let Some(mutation) = resolution.mutation.clone() {
                unit.push(mutation).await.unwrap();
            }
            unit.commit().await.unwrap();
            out.push(resolution);
        }
        out
    }

    #[tokio::test]
    async fn test_eog_resources_merges() {
        let store = MemoryStore::new();
        let resolutions =
            resolve_all(&lexical(), &store, &["EOG Resources Inc", "EOG Resources"]).await;

        assert_eq!(resolutions[0].outcome, ResolutionOutcome::Created);
        assert_eq!(resolutions[1].entity_id, resolutions[0].entity_id);
        assert!(matches!(
            resolutions[1].mutation,
            Some(Mutation::AddAlias { ref alias, .. }) if alias == "EOG Resources"
        ));

        let entity = store.entity(&resolutions[0].entity_id).await.unwrap();
        assert_eq!(entity.name, "EOG Resources Inc");
        assert_eq!(entity.aliases.len(), 2);
    }

    #[tokio::test]
    async fn test_lone_token_does_not_merge_via_single_token_alias() {
        let store = MemoryStore::new();
        let mut seeded = Entity::new("EOG Resources Inc".into(), "company".into(), String::new());
        seeded.aliases.insert("EOG".to_string());
        UnitOfWork::execute(&store, vec![Mutation::CreateEntity { entity: seeded.clone() }])
            .await
            .unwrap();

        let resolutions = resolve_all(&lexical(), &store, &["EOG"]).await;

        assert_eq!(resolutions[0].outcome, ResolutionOutcome::Created);
        assert_ne!(resolutions[0].entity_id, seeded.id);
        assert_eq!(store.entity_count().await, 2);
    }

    #[tokio::test]
    async fn test_lone_token_merges_at_threshold_through_two_token_alias() {
        let store = MemoryStore::new();
        let resolutions = resolve_all(
            &lexical(),
            &store,
            &["EOG Resources Inc", "EOG Resources", "EOG"],
        )
        .await;

        // Jaccard({eog}, {eog, resources}) is exactly the 0.5 threshold.
        assert_eq!(
            resolutions[2].outcome,
            ResolutionOutcome::Merged {
                score: 0.5,
                method: LinkMethod::LexicalOverlap
            }
        );
        assert_eq!(resolutions[2].entity_id, resolutions[0].entity_id);
        assert_eq!(store.entity_count().await, 1);
    }

    #[tokio::test]
    async fn test_single_alias_entity_still_matches_single_token() {
        let store = MemoryStore::new();
        let resolutions = resolve_all(&lexical(), &store, &["EOG", "EOG"]).await;
        assert_eq!(resolutions[1].entity_id, resolutions[0].entity_id);
        assert!(resolutions[1].mutation.is_none());
    }

    #[tokio::test]
    async fn test_type_strict_keeps_types_apart() {
        let store = MemoryStore::new();
        let resolver = lexical();
        let mut unit = UnitOfWork::begin(&store).await.unwrap();

        let first = resolver
            .resolve(unit.reader(), &ExtractedEntity::new("Apple", "company", ""))
            .await
            .unwrap();
        unit.push(first.mutation.clone().unwrap()).await.unwrap();
        let second = resolver
            .resolve(unit.reader(), &ExtractedEntity::new("Apple", "product", ""))
            .await
            .unwrap();

        assert_ne!(first.entity_id, second.entity_id);
        unit.rollback().await.unwrap();
        assert_eq!(store.entity_count().await, 0);
    }

    #[tokio::test]
    async fn test_threshold_vector_requires_embedder() {
        let config = ResolverConfig {
            strategy: MatchStrategy::ThresholdVector {
                fulltext_threshold: 0.75,
                vector_threshold: 0.9,
                vector_k: 3,
            },
            type_strict: true,
        };
        assert!(matches!(
            EntityResolver::new(&config, None),
            Err(AppError::MissingConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_threshold_vector_fulltext_then_vector() {
        let config = ResolverConfig {
            strategy: MatchStrategy::ThresholdVector {
                fulltext_threshold: 0.75,
                vector_threshold: 0.9,
                vector_k: 3,
            },
            type_strict: true,
        };
        let embedder = Arc::new(HashEmbedder::new(64));
        let resolver = EntityResolver::new(&config, Some(embedder)).unwrap();
        let store = MemoryStore::new();

        let resolutions = resolve_all(
            &resolver,
            &store,
            &["Beta LLC", "Beta LLC", "beta  llc", "Gamma Partners"],
        )
        .await;

        let Some(Mutation::CreateEntity { entity }) = &resolutions[0].mutation else {
            panic!("expected entity creation");
        };
        assert!(entity.embedding.is_some());

        assert_eq!(
            resolutions[1].outcome,
            ResolutionOutcome::Merged {
                score: 1.0,
                method: LinkMethod::Fulltext
            }
        );
        assert_eq!(resolutions[2].entity_id, resolutions[0].entity_id);
        assert_ne!(resolutions[3].entity_id, resolutions[0].entity_id);
    }
}
