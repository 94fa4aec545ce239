use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::activity::ActivityLog;
use crate::auth;
use crate::config::Config;
use crate::constants;
use crate::error::ApiError;
use crate::export::{self, ExportFormat};
use crate::models::*;
use crate::repositories::{
    collaborator_repository, connection_repository, mindmap_repository, node_repository,
    tag_repository, user_repository,
};

/// Application service for accounts, mindmaps and their nodes. Multi-row
/// operations run inside one transaction; audit entries and last-accessed
/// touches happen after commit and never fail the request.
pub struct MindMapService {
    pool: SqlitePool,
    config: Arc<Config>,
    activity: ActivityLog,
}

impl MindMapService {
    pub fn new(pool: SqlitePool, config: Arc<Config>) -> Self {
        let activity = ActivityLog::new(pool.clone());
        Self {
            pool,
            config,
            activity,
        }
    }

    /// Registers a new free-tier account with a bcrypt-hashed password.
    pub async fn register_user(&self, data: RegisterUserData) -> Result<User, ApiError> {
        let username = data.username.trim().to_string();
        let email = data.email.trim().to_lowercase();
        let password = data.password;

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidInput(
                "Username, email and password are required".to_string(),
            ));
        }
        if !auth::valid_email(&email) {
            return Err(ApiError::InvalidInput("Invalid email format".to_string()));
        }
        if password.chars().count() < constants::MIN_PASSWORD_LENGTH {
            return Err(ApiError::InvalidInput(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let password_hash = auth::hash_password(&password)?;
        let mut tx = self.pool.begin().await?;
        if user_repository::identifier_taken(&mut *tx, &username, &email).await? {
            return Err(ApiError::InvalidInput(
                "User already exists with this username or email".to_string(),
            ));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            subscription_type: SubscriptionTier::Free,
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        };
        user_repository::insert_user(&mut *tx, &user).await?;
        tx.commit().await?;

        self.activity
            .record(user.user_id, "user_registered", None, None)
            .await;
        Ok(user)
    }

    /// Authenticates by username or email and mints a bearer token. Unknown
    /// accounts and wrong passwords fail identically.
    pub async fn login_user(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<LoginData, ApiError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidInput(
                "Username and password are required".to_string(),
            ));
        }

        let mut conn = self.pool.acquire().await?;
        let mut user =
            match user_repository::find_active_by_identifier(&mut *conn, identifier).await? {
                Some(user) => user,
                None => return Err(ApiError::InvalidInput("Invalid credentials".to_string())),
            };
        if !auth::verify_password(password, &user.password_hash)? {
            return Err(ApiError::InvalidInput("Invalid credentials".to_string()));
        }

        let now = Utc::now();
        user_repository::touch_last_login(&mut *conn, user.user_id, now).await?;
        user.last_login = Some(now);

        let token = auth::mint_token(user.user_id, &user.username, &self.config.token_key)?;
        self.activity
            .record(user.user_id, "user_login", None, None)
            .await;
        Ok(LoginData { token, user })
    }

    /// Account details plus aggregate usage statistics.
    pub async fn user_profile(&self, user_id: Uuid) -> Result<ProfileData, ApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = user_repository::find_by_id(&mut *conn, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        let statistics = user_repository::fetch_statistics(&mut *conn, user_id).await?;
        Ok(ProfileData { user, statistics })
    }

    /// Creates a mindmap for `owner_id`, enforcing the subscription cap over
    /// non-archived maps. When `central_node` text is supplied the map is
    /// seeded with one central node in the same transaction.
    pub async fn create_mind_map(
        &self,
        owner_id: Uuid,
        data: CreateMindMapData,
    ) -> Result<Uuid, ApiError> {
        let title = data.title.as_deref().map(str::trim).unwrap_or("");
        if title.is_empty() {
            return Err(ApiError::InvalidInput("Title is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        self.check_mindmap_limit(&mut tx, owner_id).await?;

        let now = Utc::now();
        let mindmap = MindMap {
            map_id: Uuid::new_v4(),
            user_id: owner_id,
            title: title.to_string(),
            description: data.description.unwrap_or_default(),
            category_id: data.category_id,
            theme: data
                .theme
                .unwrap_or_else(|| constants::DEFAULT_THEME.to_string()),
            is_public: data.is_public.unwrap_or(false),
            canvas_width: constants::DEFAULT_CANVAS_WIDTH,
            canvas_height: constants::DEFAULT_CANVAS_HEIGHT,
            zoom_level: constants::DEFAULT_ZOOM_LEVEL,
            center_x: constants::DEFAULT_CENTER_X,
            center_y: constants::DEFAULT_CENTER_Y,
            is_archived: false,
            version: 1,
            created_at: now,
            updated_at: now,
            last_accessed: None,
        };
        mindmap_repository::insert_mindmap(&mut *tx, &mindmap).await?;

        if let Some(text) = data.central_node.as_deref().map(str::trim) {
            if !text.is_empty() {
                let node = Node {
                    node_id: Uuid::new_v4(),
                    map_id: mindmap.map_id,
                    parent_id: None,
                    node_text: text.to_string(),
                    node_type: "central".to_string(),
                    position_x: constants::DEFAULT_CENTER_X,
                    position_y: constants::DEFAULT_CENTER_Y,
                    width: constants::DEFAULT_NODE_WIDTH,
                    height: constants::DEFAULT_NODE_HEIGHT,
                    color: constants::DEFAULT_NODE_COLOR.to_string(),
                    background_color: constants::DEFAULT_NODE_BACKGROUND.to_string(),
                    text_color: constants::DEFAULT_NODE_TEXT_COLOR.to_string(),
                    font_size: constants::DEFAULT_NODE_FONT_SIZE,
                    font_weight: constants::DEFAULT_NODE_FONT_WEIGHT.to_string(),
                    icon: None,
                    image_url: None,
                    priority: constants::DEFAULT_NODE_PRIORITY.to_string(),
                    status: constants::DEFAULT_NODE_STATUS.to_string(),
                    due_date: None,
                    notes: None,
                    order_index: 0,
                    is_collapsed: false,
                    created_at: now,
                    updated_at: now,
                };
                node_repository::insert_node(&mut *tx, &node).await?;
            }
        }
        tx.commit().await?;

        self.activity
            .record(
                owner_id,
                "mindmap_created",
                Some(mindmap.map_id),
                Some(json!({ "title": mindmap.title })),
            )
            .await;
        Ok(mindmap.map_id)
    }

    /// Loads the full map: header, nodes with tags, connections and accepted
    /// collaborators. Readable by the owner, anyone on a public map, or an
    /// accepted collaborator.
    pub async fn get_mind_map(
        &self,
        map_id: Uuid,
        requester_id: Uuid,
    ) -> Result<MindMapDetail, ApiError> {
        let mut conn = self.pool.acquire().await?;
        let header = mindmap_repository::fetch_header(&mut *conn, map_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Mindmap not found".to_string()))?;
        require_read_access(&mut *conn, &header.mindmap, requester_id).await?;
        let detail = load_detail(&mut *conn, header).await?;

        // Post-read bookkeeping must not fail the read.
        if let Err(e) = mindmap_repository::touch_last_accessed(&mut *conn, map_id, Utc::now()).await
        {
            warn!(error = %e, map_id = %map_id, "Failed to update last_accessed");
        }
        self.activity
            .record(requester_id, "mindmap_viewed", Some(map_id), None)
            .await;
        Ok(detail)
    }

    /// Summaries of every map the requester owns or collaborates on.
    pub async fn list_mind_maps(
        &self,
        requester_id: Uuid,
        filters: MindMapFilters,
    ) -> Result<Vec<MindMapSummary>, ApiError> {
        let mut conn = self.pool.acquire().await?;
        let summaries = mindmap_repository::list_for_user(&mut *conn, requester_id, &filters).await?;
        Ok(summaries)
    }

    /// Applies an allow-listed patch to the map row. The version increments
    /// exactly once per successful update, regardless of field count.
    pub async fn update_mind_map(
        &self,
        map_id: Uuid,
        requester_id: Uuid,
        patch: MindMapPatch,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let mindmap = load_map(&mut *tx, map_id).await?;
        require_edit_access(&mut *tx, &mindmap, requester_id).await?;
        if patch.is_empty() {
            return Err(ApiError::InvalidInput(
                "No valid fields to update".to_string(),
            ));
        }
        mindmap_repository::update_mindmap(&mut *tx, map_id, &patch, Utc::now()).await?;
        tx.commit().await?;

        self.activity
            .record(
                requester_id,
                "mindmap_updated",
                Some(map_id),
                serde_json::to_value(&patch).ok(),
            )
            .await;
        Ok(())
    }

    /// Archives or unarchives a map. Archived maps do not count against the
    /// owner's subscription cap.
    pub async fn archive_mind_map(
        &self,
        map_id: Uuid,
        requester_id: Uuid,
        archive: bool,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let mindmap = load_map(&mut *tx, map_id).await?;
        require_edit_access(&mut *tx, &mindmap, requester_id).await?;
        mindmap_repository::set_archived(&mut *tx, map_id, archive, Utc::now()).await?;
        tx.commit().await?;

        let action = if archive {
            "mindmap_archived"
        } else {
            "mindmap_unarchived"
        };
        self.activity
            .record(requester_id, action, Some(map_id), None)
            .await;
        Ok(())
    }

    /// Deletes a map and everything under it. Owner only; collaborators of
    /// any permission level are refused.
    pub async fn delete_mind_map(&self, map_id: Uuid, requester_id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let mindmap = load_map(&mut *tx, map_id).await?;
        if mindmap.user_id != requester_id {
            return Err(ApiError::AccessDenied(
                "Only the owner can delete a mindmap".to_string(),
            ));
        }
        mindmap_repository::delete_mindmap(&mut *tx, map_id).await?;
        tx.commit().await?;

        self.activity
            .record(
                requester_id,
                "mindmap_deleted",
                Some(map_id),
                Some(json!({ "title": mindmap.title })),
            )
            .await;
        Ok(())
    }

    /// Deep-copies a map the requester can read into a fresh private map
    /// owned by the requester. Counts against the requester's cap.
    pub async fn duplicate_mind_map(
        &self,
        map_id: Uuid,
        requester_id: Uuid,
        new_title: &str,
    ) -> Result<Uuid, ApiError> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(ApiError::InvalidInput("Title is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let source = load_map(&mut *tx, map_id).await?;
        require_read_access(&mut *tx, &source, requester_id).await?;
        self.check_mindmap_limit(&mut tx, requester_id).await?;

        let now = Utc::now();
        let copy = MindMap {
            map_id: Uuid::new_v4(),
            user_id: requester_id,
            title: new_title.to_string(),
            description: source.description.clone(),
            category_id: source.category_id,
            theme: source.theme.clone(),
            is_public: false,
            canvas_width: constants::DEFAULT_CANVAS_WIDTH,
            canvas_height: constants::DEFAULT_CANVAS_HEIGHT,
            zoom_level: constants::DEFAULT_ZOOM_LEVEL,
            center_x: constants::DEFAULT_CENTER_X,
            center_y: constants::DEFAULT_CENTER_Y,
            is_archived: false,
            version: 1,
            created_at: now,
            updated_at: now,
            last_accessed: None,
        };
        mindmap_repository::insert_mindmap(&mut *tx, &copy).await?;

        let nodes = node_repository::fetch_nodes_for_map(&mut *tx, map_id).await?;
        let mut id_map: HashMap<Uuid, Uuid> = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            id_map.insert(node.node_id, Uuid::new_v4());
        }
        // First pass inserts every node unparented so insertion order cannot
        // break the parent foreign key.
        for node in &nodes {
            let mut cloned = node.clone();
            cloned.node_id = id_map[&node.node_id];
            cloned.map_id = copy.map_id;
            cloned.parent_id = None;
            cloned.created_at = now;
            cloned.updated_at = now;
            node_repository::insert_node(&mut *tx, &cloned).await?;
            tag_repository::copy_node_tags(&mut *tx, node.node_id, cloned.node_id).await?;
        }
        // Second pass rewires parents through the old-to-new id map.
        for node in &nodes {
            if let Some(parent_id) = node.parent_id {
                if let Some(&new_parent) = id_map.get(&parent_id) {
                    node_repository::set_parent(&mut *tx, id_map[&node.node_id], new_parent)
                        .await?;
                }
            }
        }

        for connection in connection_repository::fetch_for_map(&mut *tx, map_id).await? {
            let (from, to) = match (
                id_map.get(&connection.from_node_id),
                id_map.get(&connection.to_node_id),
            ) {
                (Some(&from), Some(&to)) => (from, to),
                _ => continue,
            };
            let copied = Connection {
                connection_id: Uuid::new_v4(),
                from_node_id: from,
                to_node_id: to,
                label: connection.label.clone(),
                created_at: now,
            };
            connection_repository::insert_connection(&mut *tx, &copied).await?;
        }
        tx.commit().await?;

        self.activity
            .record(
                requester_id,
                "mindmap_duplicated",
                Some(copy.map_id),
                Some(json!({ "source_map_id": source.map_id })),
            )
            .await;
        Ok(copy.map_id)
    }

    /// Adds a node to a map the requester can edit. A supplied parent must
    /// already exist in the same map.
    pub async fn create_node(
        &self,
        map_id: Uuid,
        requester_id: Uuid,
        data: CreateNodeData,
    ) -> Result<Uuid, ApiError> {
        let text = data.node_text.as_deref().map(str::trim).unwrap_or("");
        let (position_x, position_y) = match (data.position_x, data.position_y) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(ApiError::InvalidInput(
                    "Missing required node data".to_string(),
                ))
            }
        };
        if text.is_empty() {
            return Err(ApiError::InvalidInput(
                "Missing required node data".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let mindmap = load_map(&mut *tx, map_id).await?;
        require_edit_access(&mut *tx, &mindmap, requester_id).await?;

        if let Some(parent_id) = data.parent_id {
            let parent = node_repository::fetch_node(&mut *tx, parent_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Parent node not found".to_string()))?;
            if parent.map_id != map_id {
                return Err(ApiError::InvalidInput(
                    "Parent node belongs to a different mindmap".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let node = Node {
            node_id: Uuid::new_v4(),
            map_id,
            parent_id: data.parent_id,
            node_text: text.to_string(),
            node_type: data
                .node_type
                .unwrap_or_else(|| constants::DEFAULT_NODE_TYPE.to_string()),
            position_x,
            position_y,
            width: data.width.unwrap_or(constants::DEFAULT_NODE_WIDTH),
            height: data.height.unwrap_or(constants::DEFAULT_NODE_HEIGHT),
            color: data
                .color
                .unwrap_or_else(|| constants::DEFAULT_NODE_COLOR.to_string()),
            background_color: data
                .background_color
                .unwrap_or_else(|| constants::DEFAULT_NODE_BACKGROUND.to_string()),
            text_color: data
                .text_color
                .unwrap_or_else(|| constants::DEFAULT_NODE_TEXT_COLOR.to_string()),
            font_size: data.font_size.unwrap_or(constants::DEFAULT_NODE_FONT_SIZE),
            font_weight: data
                .font_weight
                .unwrap_or_else(|| constants::DEFAULT_NODE_FONT_WEIGHT.to_string()),
            icon: data.icon,
            image_url: data.image_url,
            priority: data
                .priority
                .unwrap_or_else(|| constants::DEFAULT_NODE_PRIORITY.to_string()),
            status: data
                .status
                .unwrap_or_else(|| constants::DEFAULT_NODE_STATUS.to_string()),
            due_date: data.due_date,
            notes: data.notes,
            order_index: data.order_index.unwrap_or(0),
            is_collapsed: data.is_collapsed.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };
        node_repository::insert_node(&mut *tx, &node).await?;
        if let Some(tags) = &data.tags {
            tag_repository::replace_node_tags(&mut *tx, node.node_id, tags).await?;
        }
        tx.commit().await?;
        Ok(node.node_id)
    }

    /// Patches a node. Node edits refresh the node's updated_at but never
    /// touch the map version. A present tag list replaces the whole tag set.
    pub async fn update_node(
        &self,
        node_id: Uuid,
        requester_id: Uuid,
        patch: NodePatch,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let node = node_repository::fetch_node(&mut *tx, node_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Node not found".to_string()))?;
        let mindmap = load_map(&mut *tx, node.map_id).await?;
        require_edit_access(&mut *tx, &mindmap, requester_id).await?;
        if !patch.has_column_changes() && patch.tags.is_none() {
            return Err(ApiError::InvalidInput(
                "No valid fields to update".to_string(),
            ));
        }

        if patch.has_column_changes() {
            node_repository::update_node(&mut *tx, node_id, &patch, Utc::now()).await?;
        }
        if let Some(tags) = &patch.tags {
            tag_repository::replace_node_tags(&mut *tx, node_id, tags).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Deletes a node. Children are promoted to roots; connections and tag
    /// links go with the node.
    pub async fn delete_node(&self, node_id: Uuid, requester_id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let node = node_repository::fetch_node(&mut *tx, node_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Node not found".to_string()))?;
        let mindmap = load_map(&mut *tx, node.map_id).await?;
        require_edit_access(&mut *tx, &mindmap, requester_id).await?;
        node_repository::delete_node(&mut *tx, node_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Renders a map the requester can read as export bytes. Collaborators
    /// are excluded from export payloads.
    pub async fn export_mind_map(
        &self,
        map_id: Uuid,
        requester_id: Uuid,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ApiError> {
        let mut conn = self.pool.acquire().await?;
        let header = mindmap_repository::fetch_header(&mut *conn, map_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Mindmap not found".to_string()))?;
        require_read_access(&mut *conn, &header.mindmap, requester_id).await?;
        let detail = load_detail(&mut *conn, header).await?;
        export::render(&detail, format)
    }

    async fn check_mindmap_limit(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        owner_id: Uuid,
    ) -> Result<(), ApiError> {
        let owner = user_repository::find_by_id(&mut **tx, owner_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        let limit = self.config.mindmap_limit(owner.subscription_type);
        if limit < 0 {
            return Ok(());
        }
        let active = mindmap_repository::count_active_for_user(&mut **tx, owner_id).await?;
        if active >= limit {
            return Err(ApiError::LimitExceeded(format!(
                "Mindmap limit reached for {} subscription",
                owner.subscription_type
            )));
        }
        Ok(())
    }
}

async fn load_map(conn: &mut SqliteConnection, map_id: Uuid) -> Result<MindMap, ApiError> {
    mindmap_repository::fetch_mindmap(conn, map_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Mindmap not found".to_string()))
}

/// Owner, public map, or accepted collaborator (any permission).
async fn require_read_access(
    conn: &mut SqliteConnection,
    mindmap: &MindMap,
    requester_id: Uuid,
) -> Result<(), ApiError> {
    if mindmap.user_id == requester_id || mindmap.is_public {
        return Ok(());
    }
    if collaborator_repository::find_accepted(conn, mindmap.map_id, requester_id)
        .await?
        .is_some()
    {
        return Ok(());
    }
    Err(ApiError::AccessDenied("Access denied".to_string()))
}

/// Owner, or accepted collaborator with edit or admin permission.
async fn require_edit_access(
    conn: &mut SqliteConnection,
    mindmap: &MindMap,
    requester_id: Uuid,
) -> Result<(), ApiError> {
    if mindmap.user_id == requester_id {
        return Ok(());
    }
    match collaborator_repository::find_accepted(conn, mindmap.map_id, requester_id).await? {
        Some(CollabPermission::Edit) | Some(CollabPermission::Admin) => Ok(()),
        _ => Err(ApiError::AccessDenied("Access denied".to_string())),
    }
}

/// Assembles the detail payload: nodes with their tags attached from one
/// join query, connections and accepted collaborators.
async fn load_detail(
    conn: &mut SqliteConnection,
    header: MindMapHeader,
) -> Result<MindMapDetail, ApiError> {
    let map_id = header.mindmap.map_id;
    let nodes = node_repository::fetch_nodes_for_map(&mut *conn, map_id).await?;
    let mut tags_by_node: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (node_id, name) in tag_repository::tags_for_map(&mut *conn, map_id).await? {
        tags_by_node.entry(node_id).or_default().push(name);
    }
    let nodes = nodes
        .into_iter()
        .map(|node| {
            let tags = tags_by_node.remove(&node.node_id).unwrap_or_default();
            NodeWithTags { node, tags }
        })
        .collect();
    let connections = connection_repository::fetch_for_map(&mut *conn, map_id).await?;
    let collaborators = collaborator_repository::fetch_accepted_for_map(&mut *conn, map_id).await?;
    Ok(MindMapDetail {
        mindmap: header,
        nodes,
        connections,
        collaborators,
    })
}
