//! Response bodies of the EVI listing endpoints.
//!
//! All fields default when absent and unknown fields are ignored, so minor
//! API additions do not break decoding.

use serde::{Deserialize, Serialize};

/// One page of `GET /evi/configs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigsPage {
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub configs_page: Vec<ConfigSummary>,
}

/// A saved EVI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSummary {
    pub id: String,
    pub version: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evi_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_description: Option<String>,
    /// Creation time, milliseconds since the epoch.
    pub created_on: i64,
    pub modified_on: i64,
}

/// One page of `GET /evi/chats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatsPage {
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_direction: Option<String>,
    pub chats_page: Vec<ChatSummary>,
}

/// A past or ongoing chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSummary {
    pub id: String,
    pub chat_group_id: String,
    /// e.g. `ACTIVE`, `USER_ENDED`, `ERROR`.
    pub status: String,
    pub start_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigRef>,
}

/// Configuration a chat ran with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRef {
    pub id: String,
    pub version: u32,
}
