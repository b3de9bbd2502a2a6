//! DynamoDB backend
//!
//! Label enumeration runs as a `Scan` with a filter on the partition key
//! (DynamoDB only allows equality on the hash key in a `Query`); per-label
//! lookups run as a `Query`. `LastEvaluatedKey` becomes the continuation
//! token and is handed back as `ExclusiveStartKey` on the next call.

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, ProvideErrorMetadata},
    types::AttributeValue,
    Client as DynamoDbClient,
};
use std::collections::HashMap;

use super::{
    ContinuationToken, IndexRecord, KeyCondition, Page, PageRequest, ReadMode, StoreError,
    StoreResult, TableStore,
};
use crate::config::StoreConfig;

/// Attribute names of the label table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    pub partition_key: String,
    pub sort_key: String,
    pub label: String,
    pub object_key: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            partition_key: "PK".to_string(),
            sort_key: "SK".to_string(),
            label: "Label".to_string(),
            object_key: "ObjectKey".to_string(),
        }
    }
}

impl AttributeNames {
    /// Decode an item; non-string or missing attributes come back empty
    pub fn record_from_item(&self, item: &HashMap<String, AttributeValue>) -> IndexRecord {
        let string_attr = |name: &str| item.get(name).and_then(|v| v.as_s().ok()).cloned();

        IndexRecord {
            partition_key: string_attr(&self.partition_key).unwrap_or_default(),
            sort_key: string_attr(&self.sort_key).unwrap_or_default(),
            label: string_attr(&self.label),
            object_key: string_attr(&self.object_key),
        }
    }
}

impl From<&StoreConfig> for AttributeNames {
    fn from(config: &StoreConfig) -> Self {
        Self {
            partition_key: config.partition_key_attr.clone(),
            sort_key: config.sort_key_attr.clone(),
            label: config.label_attr.clone(),
            object_key: config.object_key_attr.clone(),
        }
    }
}

/// DynamoDB-backed label table
#[derive(Clone)]
pub struct DynamoTable {
    client: DynamoDbClient,
    table_name: String,
    attrs: AttributeNames,
}

impl DynamoTable {
    /// Build a client from the default AWS provider chain.
    ///
    /// The client is created once and reused for every request.
    pub async fn connect(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        tracing::debug!(
            table_name = %config.table_name,
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "DynamoDB client configured"
        );

        Self::from_client(
            DynamoDbClient::new(&sdk_config),
            config.table_name.clone(),
            AttributeNames::from(config),
        )
    }

    pub fn from_client(client: DynamoDbClient, table_name: String, attrs: AttributeNames) -> Self {
        Self {
            client,
            table_name,
            attrs,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn start_key(cursor: Option<&ContinuationToken>) -> Option<HashMap<String, AttributeValue>> {
        cursor.map(|token| {
            token
                .iter()
                .map(|(name, value)| (name.to_string(), AttributeValue::S(value.to_string())))
                .collect()
        })
    }

    fn token_from_key(key: &HashMap<String, AttributeValue>) -> StoreResult<ContinuationToken> {
        key.iter().try_fold(ContinuationToken::new(), |token, (name, value)| {
            let value = value.as_s().map_err(|_| {
                StoreError::InvalidCursor(format!("non-string key attribute '{}'", name))
            })?;
            Ok(token.with(name.clone(), value.clone()))
        })
    }

    fn finish_page(
        &self,
        items: &[HashMap<String, AttributeValue>],
        last_key: Option<&HashMap<String, AttributeValue>>,
    ) -> StoreResult<Page> {
        let records = items
            .iter()
            .map(|item| self.attrs.record_from_item(item))
            .collect();
        let next = last_key.map(Self::token_from_key).transpose()?;
        Ok(Page { records, next })
    }

    async fn scan_page(&self, request: &PageRequest) -> StoreResult<Page> {
        let (filter, values) = match &request.condition {
            KeyCondition::Range { lower, upper } => (
                "#pk >= :lo AND #pk < :hi",
                vec![
                    (":lo", AttributeValue::S(lower.clone())),
                    (":hi", AttributeValue::S(upper.clone())),
                ],
            ),
            KeyCondition::Equals(value) => {
                ("#pk = :pk", vec![(":pk", AttributeValue::S(value.clone()))])
            }
        };

        let mut scan = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression(filter)
            .expression_attribute_names("#pk", &self.attrs.partition_key)
            .set_limit(request.limit.map(|l| l as i32))
            .set_exclusive_start_key(Self::start_key(request.cursor.as_ref()));

        for (placeholder, value) in values {
            scan = scan.expression_attribute_values(placeholder, value);
        }

        let output = scan.send().await.map_err(|e| {
            let message = DisplayErrorContext(&e).to_string();
            classify_error(e.code(), message)
        })?;

        self.finish_page(output.items(), output.last_evaluated_key())
    }

    async fn query_page(&self, request: &PageRequest, partition_key: &str) -> StoreResult<Page> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", &self.attrs.partition_key)
            .expression_attribute_values(":pk", AttributeValue::S(partition_key.to_string()))
            .set_limit(request.limit.map(|l| l as i32))
            .set_exclusive_start_key(Self::start_key(request.cursor.as_ref()))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                classify_error(e.code(), message)
            })?;

        self.finish_page(output.items(), output.last_evaluated_key())
    }
}

#[async_trait]
impl TableStore for DynamoTable {
    fn backend(&self) -> &'static str {
        "dynamodb"
    }

    async fn fetch_page(&self, request: &PageRequest) -> StoreResult<Page> {
        request.validate()?;

        match (&request.mode, &request.condition) {
            (ReadMode::Query, KeyCondition::Equals(pk)) => self.query_page(request, pk).await,
            (ReadMode::Query, KeyCondition::Range { .. }) => Err(StoreError::UnsupportedCondition(
                "range conditions on the partition key require a scan".to_string(),
            )),
            (ReadMode::Scan, _) => self.scan_page(request).await,
        }
    }
}

/// Map a DynamoDB error code onto the store taxonomy
pub(crate) fn classify_error(code: Option<&str>, message: String) -> StoreError {
    match code {
        Some(
            "ProvisionedThroughputExceededException"
            | "ThrottlingException"
            | "RequestLimitExceeded",
        ) => StoreError::Throttled(message),
        Some(
            "AccessDeniedException"
            | "UnrecognizedClientException"
            | "InvalidSignatureException"
            | "ExpiredTokenException",
        ) => StoreError::AccessDenied(message),
        _ => StoreError::Unavailable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> AttributeNames {
        AttributeNames {
            object_key: "S3ObjectKey".to_string(),
            ..AttributeNames::default()
        }
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error(Some("ProvisionedThroughputExceededException"), "x".into()),
            StoreError::Throttled(_)
        ));
        assert!(matches!(
            classify_error(Some("AccessDeniedException"), "x".into()),
            StoreError::AccessDenied(_)
        ));
        assert!(matches!(
            classify_error(Some("ResourceNotFoundException"), "x".into()),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify_error(None, "dispatch failure".into()),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_record_from_item_uses_configured_names() {
        let item = HashMap::from([
            ("PK".to_string(), AttributeValue::S("LABEL#cats".into())),
            ("SK".to_string(), AttributeValue::S("cat1.mp4".into())),
            ("Label".to_string(), AttributeValue::S("cats".into())),
            ("S3ObjectKey".to_string(), AttributeValue::S("cat1.mp4".into())),
        ]);

        let record = attrs().record_from_item(&item);
        assert_eq!(record, IndexRecord::label_association("cats", "cat1.mp4"));
    }

    #[test]
    fn test_non_string_attributes_are_absent() {
        let item = HashMap::from([
            ("PK".to_string(), AttributeValue::S("LABEL#cats".into())),
            ("Label".to_string(), AttributeValue::N("7".into())),
        ]);

        let record = attrs().record_from_item(&item);
        assert_eq!(record.label, None);
        assert_eq!(record.object_key, None);
    }

    #[test]
    fn test_token_round_trips_through_start_key() {
        let last_key = HashMap::from([
            ("PK".to_string(), AttributeValue::S("LABEL#cats".into())),
            ("SK".to_string(), AttributeValue::S("cat2.mp4".into())),
        ]);

        let token = DynamoTable::token_from_key(&last_key).unwrap();
        assert_eq!(token.get("PK"), Some("LABEL#cats"));
        assert_eq!(DynamoTable::start_key(Some(&token)), Some(last_key));
    }

    #[test]
    fn test_numeric_key_attribute_is_rejected() {
        let last_key = HashMap::from([("PK".to_string(), AttributeValue::N("1".into()))]);
        assert!(matches!(
            DynamoTable::token_from_key(&last_key),
            Err(StoreError::InvalidCursor(_))
        ));
    }
}
