//! Vector index backed by a Qdrant collection
//!
//! Payloads are flat key/value maps; `text` holds the chunk and the rest is
//! split into [`ChunkMetadata`] fields.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        condition::ConditionOneOf, point_id::PointIdOptions, r#match::MatchValue, value::Kind,
        Condition, FieldCondition, Filter, Match as QdrantMatch, RepeatedStrings,
        SearchPointsBuilder, Value,
    },
    Qdrant,
};
use turf_advisor_config::VectorStoreConfig;
use turf_advisor_core::{ChunkMetadata, Degraded, IndexStats, Match, MetadataFilter, VectorIndex};

use crate::RagError;

const STAGE: &str = "vector_index";

pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    timeout: Duration,
}

impl QdrantIndex {
    pub fn connect(config: &VectorStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

fn to_qdrant_filter(filter: &MetadataFilter) -> Filter {
    let condition = Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: filter.field.clone(),
            r#match: Some(QdrantMatch {
                match_value: Some(MatchValue::Keywords(RepeatedStrings {
                    strings: filter.values.clone(),
                })),
            }),
            ..Default::default()
        })),
    };
    Filter {
        must: vec![condition],
        ..Default::default()
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value.kind? {
        Kind::StringValue(s) => Some(s),
        Kind::IntegerValue(i) => Some(i.to_string()),
        Kind::DoubleValue(d) => Some(d.to_string()),
        Kind::BoolValue(b) => Some(b.to_string()),
        _ => None,
    }
}

fn point_id_to_string(options: Option<PointIdOptions>) -> String {
    match options {
        Some(PointIdOptions::Uuid(u)) => u,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Match>, Degraded> {
        let mut search = SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
            .with_payload(true);
        if let Some(f) = filter {
            search = search.filter(to_qdrant_filter(f));
        }

        let response = tokio::time::timeout(self.timeout, self.client.search_points(search))
            .await
            .map_err(|_| Degraded::timeout(STAGE, format!("search exceeded {:?}", self.timeout)))?
            .map_err(|e| Degraded::unavailable(STAGE, e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let fields: HashMap<String, String> = point
                    .payload
                    .into_iter()
                    .filter_map(|(k, v)| value_to_string(v).map(|s| (k, s)))
                    .collect();
                Match {
                    id: point_id_to_string(point.id.and_then(|id| id.point_id_options)),
                    score: point.score,
                    metadata: ChunkMetadata::from_fields(fields),
                }
            })
            .collect())
    }

    async fn describe_stats(&self) -> Result<IndexStats, Degraded> {
        let info = tokio::time::timeout(self.timeout, self.client.collection_info(&self.collection))
            .await
            .map_err(|_| Degraded::timeout(STAGE, "collection info timed out"))?
            .map_err(|e| Degraded::unavailable(STAGE, e.to_string()))?;

        Ok(IndexStats {
            total_vectors: info.result.and_then(|r| r.points_count).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_conversion() {
        let filter = MetadataFilter::any_of("type", &["pesticide_label", "pesticide_product"]);
        let q = to_qdrant_filter(&filter);
        assert_eq!(q.must.len(), 1);
        match &q.must[0].condition_one_of {
            Some(ConditionOneOf::Field(field)) => {
                assert_eq!(field.key, "type");
                match field.r#match.as_ref().and_then(|m| m.match_value.clone()) {
                    Some(MatchValue::Keywords(k)) => assert_eq!(k.strings.len(), 2),
                    other => panic!("unexpected match value: {:?}", other),
                }
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_value_conversion() {
        let v: Value = "Heritage".to_string().into();
        assert_eq!(value_to_string(v), Some("Heritage".to_string()));
        let n: Value = 3i64.into();
        assert_eq!(value_to_string(n), Some("3".to_string()));
    }

    #[test]
    fn test_point_ids() {
        assert_eq!(point_id_to_string(Some(PointIdOptions::Num(7))), "7");
        assert_eq!(point_id_to_string(None), "");
    }
}
