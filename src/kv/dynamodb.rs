//! DynamoDB-backed key-value store

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;

use super::{Item, ItemValue, KeyScalar, KeyValueStore, KvError, ResumeKey, ScanPage};

/// Key-value store backed by a DynamoDB client.
///
/// The client is cheap to clone and safe to share across requests.
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a store from shared SDK config, with an optional endpoint
    /// override (e.g. a local DynamoDB or LocalStack)
    pub fn from_sdk_config(sdk_config: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    async fn scan(
        &self,
        table: &str,
        limit: u32,
        resume: Option<ResumeKey>,
    ) -> Result<ScanPage, KvError> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .set_exclusive_start_key(resume.as_ref().map(key_to_attributes))
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_resource_not_found_exception() => KvError::TableNotFound {
                    table: table.to_string(),
                },
                _ => KvError::Upstream(DisplayErrorContext(&err).to_string()),
            })?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(attributes_to_item)
            .collect();

        let resume = match output.last_evaluated_key {
            Some(key) if !key.is_empty() => Some(attributes_to_key(key)?),
            _ => None,
        };

        Ok(ScanPage { items, resume })
    }

    async fn get_item(&self, table: &str, key: &ResumeKey) -> Result<Option<Item>, KvError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key_to_attributes(key)))
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_resource_not_found_exception() => KvError::TableNotFound {
                    table: table.to_string(),
                },
                _ => KvError::Upstream(DisplayErrorContext(&err).to_string()),
            })?;

        Ok(output.item.map(attributes_to_item))
    }
}

fn key_to_attributes(key: &ResumeKey) -> HashMap<String, AttributeValue> {
    key.iter()
        .map(|(name, value)| {
            let attr = match value {
                KeyScalar::Str(s) => AttributeValue::S(s.clone()),
                KeyScalar::Num(n) => AttributeValue::N(n.clone()),
            };
            (name.clone(), attr)
        })
        .collect()
}

fn attributes_to_key(attrs: HashMap<String, AttributeValue>) -> Result<ResumeKey, KvError> {
    attrs
        .into_iter()
        .map(|(name, value)| match value {
            AttributeValue::S(s) => Ok((name, KeyScalar::Str(s))),
            AttributeValue::N(n) => Ok((name, KeyScalar::Num(n))),
            other => Err(KvError::Upstream(format!(
                "unsupported key attribute type for '{}': {:?}",
                name, other
            ))),
        })
        .collect()
}

fn attributes_to_item(attrs: HashMap<String, AttributeValue>) -> Item {
    attrs
        .into_iter()
        .filter_map(|(name, value)| attribute_to_value(value).map(|v| (name, v)))
        .collect()
}

/// Binary attributes have no counterpart in [`ItemValue`] and are dropped.
fn attribute_to_value(value: AttributeValue) -> Option<ItemValue> {
    match value {
        AttributeValue::S(s) => Some(ItemValue::Str(s)),
        AttributeValue::N(n) => Some(ItemValue::Num(n)),
        AttributeValue::Bool(b) => Some(ItemValue::Bool(b)),
        AttributeValue::Null(_) => Some(ItemValue::Null),
        AttributeValue::Ss(set) => Some(ItemValue::StrSet(set)),
        AttributeValue::Ns(set) => Some(ItemValue::List(
            set.into_iter().map(ItemValue::Num).collect(),
        )),
        AttributeValue::L(list) => Some(ItemValue::List(
            list.into_iter().filter_map(attribute_to_value).collect(),
        )),
        AttributeValue::M(map) => Some(ItemValue::Map(
            map.into_iter()
                .filter_map(|(k, v)| attribute_to_value(v).map(|v| (k, v)))
                .collect(),
        )),
        _ => None,
    }
}
