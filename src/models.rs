use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subscription tier of a user account. Bounds how many non-archived
/// mindmaps the account may own (see `Config::mindmap_limit`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
    Enterprise,
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Enterprise => "enterprise",
        };
        write!(f, "{}", name)
    }
}

/// Permission level of a collaborator grant.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CollabPermission {
    View,
    Edit,
    Admin,
}

/// Whether a collaborator has accepted their invitation. Only accepted
/// grants count for access checks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CollabStatus {
    Pending,
    Accepted,
}

/// Represents a registered user account.
#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub subscription_type: SubscriptionTier,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Represents a mindmap and its canvas viewport.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct MindMap {
    pub map_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub theme: String,
    pub is_public: bool,
    pub canvas_width: i64,
    pub canvas_height: i64,
    pub zoom_level: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub is_archived: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
}

/// A mindmap row joined with its owner and category for read responses.
#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct MindMapHeader {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub mindmap: MindMap,
    pub owner_username: String,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
}

/// Represents a single node within a mindmap.
///
/// `node_type` is an open set; clients currently send central, main and sub.
/// `priority` and `status` likewise stay plain text (low/medium/high,
/// pending/in_progress/completed).
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Node {
    pub node_id: Uuid,
    pub map_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub node_text: String,
    pub node_type: String,
    pub position_x: f64,
    pub position_y: f64,
    pub width: i64,
    pub height: i64,
    pub color: String,
    pub background_color: String,
    pub text_color: String,
    pub font_size: i64,
    pub font_weight: String,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub order_index: i64,
    pub is_collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A node with its resolved tag names, attached by the repository in a
/// second query rather than N+1 lookups.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NodeWithTags {
    #[serde(flatten)]
    pub node: Node,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Represents an explicit, non-hierarchical link between two nodes.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Connection {
    pub connection_id: Uuid,
    pub from_node_id: Uuid,
    pub to_node_id: Uuid,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A collaborator grant joined with the collaborator's account details.
#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct CollaboratorInfo {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub permission: CollabPermission,
    pub status: CollabStatus,
    pub created_at: DateTime<Utc>,
}

/// Full read model of a mindmap: header plus embedded nodes, connections
/// and accepted collaborators.
#[derive(Serialize, Debug, Clone)]
pub struct MindMapDetail {
    #[serde(flatten)]
    pub mindmap: MindMapHeader,
    pub nodes: Vec<NodeWithTags>,
    pub connections: Vec<Connection>,
    pub collaborators: Vec<CollaboratorInfo>,
}

/// One row of the mindmap listing: map fields, the owner's username, the
/// computed permission label ("owner" or the collaborator permission) and
/// a live node count.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct MindMapSummary {
    pub map_id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_username: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub theme: String,
    pub is_public: bool,
    pub is_archived: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub permission: String,
    pub node_count: i64,
}

/// Aggregate counters shown on the profile endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct UserStatistics {
    pub total_mindmaps: i64,
    pub public_mindmaps: i64,
    pub collaborations: i64,
}

// Input data for registering a new account.
#[derive(Deserialize, Debug, Clone)]
pub struct RegisterUserData {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful login response: bearer token plus the account summary.
#[derive(Serialize, Debug)]
pub struct LoginData {
    pub token: String,
    pub user: User,
}

/// Profile response: account details plus usage statistics.
#[derive(Serialize, Debug)]
pub struct ProfileData {
    pub user: User,
    pub statistics: UserStatistics,
}

// Input data for creating a mindmap. Missing fields fall back to the
// canvas and theme defaults in `constants`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CreateMindMapData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub theme: Option<String>,
    pub is_public: Option<bool>,
    /// When set, the new map is seeded with one central node carrying
    /// this text.
    pub central_node: Option<String>,
}

// Input data for creating a node. node_text and both positions are
// required; everything else falls back to the node defaults.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CreateNodeData {
    pub node_text: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub parent_id: Option<Uuid>,
    pub node_type: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub font_size: Option<i64>,
    pub font_weight: Option<String>,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub order_index: Option<i64>,
    pub is_collapsed: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Distinguishes a key that is absent from one that is explicitly `null`:
/// absent stays `None`, `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Allow-listed fields of a mindmap update. Unknown keys in the request
/// body are dropped during deserialization; an all-empty patch is invalid.
/// Sending `category_id: null` clears the category, while leaving the key
/// out keeps it.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MindMapPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_y: Option<f64>,
}

impl MindMapPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.theme.is_none()
            && self.is_public.is_none()
            && self.canvas_width.is_none()
            && self.canvas_height.is_none()
            && self.zoom_level.is_none()
            && self.center_x.is_none()
            && self.center_y.is_none()
    }
}

/// Allow-listed fields of a node update. `parent_id` and `map_id` are
/// deliberately absent: nodes never move between maps, and re-parenting is
/// not part of the update surface. A present `tags` list replaces the
/// node's entire tag set.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_collapsed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl NodePatch {
    /// True when at least one column-backed field is set. `tags` does not
    /// count; it is applied through the tag tables, not the nodes row.
    pub fn has_column_changes(&self) -> bool {
        self.node_text.is_some()
            || self.node_type.is_some()
            || self.color.is_some()
            || self.background_color.is_some()
            || self.text_color.is_some()
            || self.position_x.is_some()
            || self.position_y.is_some()
            || self.width.is_some()
            || self.height.is_some()
            || self.font_size.is_some()
            || self.font_weight.is_some()
            || self.icon.is_some()
            || self.image_url.is_some()
            || self.priority.is_some()
            || self.status.is_some()
            || self.due_date.is_some()
            || self.notes.is_some()
            || self.order_index.is_some()
            || self.is_collapsed.is_some()
    }
}

/// Filters for the mindmap listing. `archived` defaults to showing only
/// live maps; `search` is a case-insensitive substring over title and
/// description.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MindMapFilters {
    pub category_id: Option<Uuid>,
    pub archived: Option<bool>,
    pub search: Option<String>,
}
