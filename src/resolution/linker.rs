//! Query-time linking of question entities to graph entities.

use tracing::debug;

use crate::error::AppError;
use crate::models::{LinkMethod, LinkedEntity, QueryEntity};
use crate::store::GraphReader;

use super::lexical::{alias_overlap, tokens};

/// Links each query entity to every full-text candidate whose best alias
/// overlap reaches `threshold`.
///
/// When several query entities reach the same graph entity the highest score
/// is kept. Results stay in first-linked order.
pub async fn link_entities<R: GraphReader + ?Sized>(
    reader: &R,
    entities: &[QueryEntity],
    k: usize,
    threshold: f64,
    type_strict: bool,
) -> Result<Vec<LinkedEntity>, AppError> {
    let mut linked: Vec<LinkedEntity> = Vec::new();

    for query_entity in entities {
        let entity_type = type_strict.then_some(query_entity.entity_type.as_str());
        let name_tokens = tokens(&query_entity.name);

        for candidate in reader
            .search_entities(&query_entity.name, entity_type, k)
            .await?
        {
            let score = alias_overlap(&name_tokens, &candidate.aliases);
            if score < threshold {
                continue;
            }

            match linked.iter_mut().find(|l| l.entity_id == candidate.id) {
                Some(existing) => existing.score = existing.score.max(score),
                None => linked.push(LinkedEntity {
                    entity_id: candidate.id,
                    name: candidate.name,
                    entity_type: candidate.entity_type,
                    score,
                    method: LinkMethod::LexicalOverlap,
                }),
            }
        }
    }

    debug!(query_entities = entities.len(), linked = linked.len(), "Linked query entities");
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;
    use crate::store::{MemoryStore, Mutation, UnitOfWork};

    async fn seeded() -> (MemoryStore, Entity) {
        let store = MemoryStore::new();
        let mut eog = Entity::new("EOG Resources Inc".into(), "company".into(), String::new());
        eog.aliases.insert("EOG Resources".to_string());
        UnitOfWork::execute(&store, vec![Mutation::CreateEntity { entity: eog.clone() }])
            .await
            .unwrap();
        (store, eog)
    }

    #[tokio::test]
    async fn test_links_by_alias_overlap() {
        let (store, eog) = seeded().await;
        let linked = link_entities(
            &store,
            &[QueryEntity::new("EOG Resources", "company")],
            5,
            0.5,
            true,
        )
        .await
        .unwrap();

        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].entity_id, eog.id);
        assert_eq!(linked[0].score, 1.0);
        assert_eq!(linked[0].method, LinkMethod::LexicalOverlap);
    }

    #[tokio::test]
    async fn test_duplicate_links_keep_highest_score() {
        let (store, _) = seeded().await;
        let linked = link_entities(
            &store,
            &[
                QueryEntity::new("EOG Resources Corp", "company"),
                QueryEntity::new("EOG Resources", "company"),
            ],
            5,
            0.5,
            true,
        )
        .await
        .unwrap();

        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_type_and_threshold_filter() {
        let (store, _) = seeded().await;
        let wrong_type = link_entities(
            &store,
            &[QueryEntity::new("EOG Resources", "person")],
            5,
            0.5,
            true,
        )
        .await
        .unwrap();
        assert!(wrong_type.is_empty());

        let weak = link_entities(
            &store,
            &[QueryEntity::new("EOG Holdings Group", "company")],
            5,
            0.5,
            false,
        )
        .await
        .unwrap();
        assert!(weak.is_empty());
    }
}
