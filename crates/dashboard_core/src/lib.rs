use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{multipart, Client};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{AnnouncementId, AttachmentId, RoleId, TenantContext, UserId, UserStatus},
    error::{ApiException, ErrorCode},
    protocol::{
        AnnouncementRecord, AttachmentRecord, BulkRoleRequest, BulkStatusRequest, ListResponse,
        MutationAck, RoleSummary, RoleTag, RolesEnvelope, ServerMessage, SingleResponse,
        UserRecord,
    },
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

mod query_state;
mod selection;

pub use query_state::{DebounceTicket, QueryState, RequestDescriptor};
pub use selection::{SelectAllState, SelectionTracker};

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Roles the backend reserves: the platform-operator role and the seed
/// role every tenant starts with. Never offered for assignment, filtered
/// out where the catalog is fetched.
pub const RESERVED_ROLES: [&str; 2] = ["Super Admin", "Default"];

/// Binds one list resource to the controller: the wire payload rows arrive
/// as, the normalized row they become, and the stable id used for selection
/// and bulk payloads.
pub trait TableRow: Clone + Send + Sync + 'static {
    type Wire: DeserializeOwned + Send;
    type Id: Clone + Eq + std::hash::Hash + Serialize + Send + Sync + 'static;

    fn from_wire(wire: Self::Wire) -> Self;
    fn id(&self) -> Self::Id;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub username: String,
    /// Role references as delivered; ids feed edit prefill, names feed display.
    pub roles: Vec<RoleTag>,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl UserRow {
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|role| role.name.as_str()).collect()
    }
}

impl TableRow for UserRow {
    type Wire = UserRecord;
    type Id = UserId;

    fn from_wire(wire: UserRecord) -> Self {
        Self {
            id: wire.id,
            full_name: wire.full_name.or(wire.name).unwrap_or_default(),
            email: wire.email.unwrap_or_default(),
            username: wire.username.unwrap_or_default(),
            roles: wire.roles,
            status: UserStatus::from_flag(wire.status),
            phone: wire.phone,
            avatar: wire.image,
        }
    }

    fn id(&self) -> UserId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementRow {
    pub id: AnnouncementId,
    pub title: String,
    pub description: String,
    pub attachments: Vec<AttachmentRecord>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TableRow for AnnouncementRow {
    type Wire = AnnouncementRecord;
    type Id = AnnouncementId;

    fn from_wire(wire: AnnouncementRecord) -> Self {
        Self {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            attachments: wire.attachments,
            created_at: wire.created_at,
        }
    }

    fn id(&self) -> AnnouncementId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub enum ListEvent {
    StatusChanged(FetchStatus),
    RowsReplaced { rows: usize, total: u64 },
    Notice { level: NoticeLevel, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    SetStatus(UserStatus),
    AssignRoles(Vec<RoleId>),
}

/// Uncommitted bulk intent held while the caller shows its confirmation
/// step. The affected ids are a snapshot of the selection at request time.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction<K> {
    pub action: BulkAction,
    pub affected: Vec<K>,
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Rejected(#[from] ApiException),
    #[error("mutation not acknowledged: {message}")]
    Unacknowledged { message: String },
}

impl ListError {
    /// The server-provided message, when there is one to surface.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ListError::Rejected(rejection) => Some(&rejection.message),
            ListError::Unacknowledged { message } => Some(message),
            ListError::Transport(_) => None,
        }
    }
}

/// Endpoint catalog of the dashboard backend, relative to the base URL.
#[derive(Debug, Clone)]
pub struct DashboardEndpoints {
    pub users_list: String,
    pub users_bulk_status: String,
    pub users_bulk_roles: String,
    pub user_status_update: String,
    pub users_sync: String,
    pub roles_catalog: String,
    pub announcements_list: String,
    pub announcements_save: String,
    pub announcements_delete: String,
    pub attachment_delete: String,
}

impl Default for DashboardEndpoints {
    fn default() -> Self {
        Self {
            users_list: "user-get".to_string(),
            users_bulk_status: "users/status-toggle-multiple".to_string(),
            users_bulk_roles: "users/roles-toggle-multiple".to_string(),
            user_status_update: "user-status-update".to_string(),
            users_sync: "microsoftFetchUsers".to_string(),
            roles_catalog: "roles-show".to_string(),
            announcements_list: "announcements-get".to_string(),
            announcements_save: "announcements-add".to_string(),
            announcements_delete: "announcements-delete".to_string(),
            attachment_delete: "announcements-delete-image".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub base_url: String,
    pub tenant: TenantContext,
    pub endpoints: DashboardEndpoints,
    pub debounce_window: Duration,
    pub request_timeout: Duration,
    pub page_size: u32,
}

impl ControllerConfig {
    pub fn new(base_url: impl Into<String>, tenant: TenantContext) -> Self {
        Self {
            base_url: base_url.into(),
            tenant,
            endpoints: DashboardEndpoints::default(),
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Wire form of a request descriptor. `page` is 1-based on the wire.
#[derive(Serialize)]
struct ListQuery {
    #[serde(skip_serializing_if = "String::is_empty")]
    search: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role_id: Option<RoleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<UserStatus>,
    page: u32,
    per_page: u32,
}

impl ListQuery {
    fn from_descriptor(descriptor: &RequestDescriptor) -> Self {
        Self {
            search: descriptor.search.clone(),
            role_id: descriptor.role,
            status: descriptor.status,
            page: descriptor.page_index + 1,
            per_page: descriptor.page_size,
        }
    }
}

struct NormalizedPage<R> {
    rows: Vec<R>,
    total: u64,
    active_count: u64,
    inactive_count: u64,
}

enum PageOutcome<R> {
    Rows(NormalizedPage<R>),
    NoData { message: String },
}

struct ListState<R> {
    rows: Vec<R>,
    total: u64,
    active_count: u64,
    inactive_count: u64,
    status: FetchStatus,
    fetch_seq: u64,
}

/// One tabular list view against the dashboard backend: filter and page
/// state, fetch orchestration with last-issued-wins sequencing, row
/// selection, and the bulk mutation flow. Notifications and state changes
/// go out on a broadcast channel; current state is read through the
/// snapshot accessors.
pub struct ListController<R: TableRow> {
    http: Client,
    config: ControllerConfig,
    list_path: String,
    resource_label: &'static str,
    query: Mutex<QueryState>,
    selection: Mutex<SelectionTracker<R::Id>>,
    pending: Mutex<Option<PendingAction<R::Id>>>,
    inner: Mutex<ListState<R>>,
    events: broadcast::Sender<ListEvent>,
}

impl<R: TableRow> ListController<R> {
    fn with_list_path(
        config: ControllerConfig,
        list_path: String,
        resource_label: &'static str,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            http: Client::new(),
            query: Mutex::new(QueryState::new(config.debounce_window, config.page_size)),
            selection: Mutex::new(SelectionTracker::new()),
            pending: Mutex::new(None),
            inner: Mutex::new(ListState {
                rows: Vec::new(),
                total: 0,
                active_count: 0,
                inactive_count: 0,
                status: FetchStatus::Idle,
                fetch_seq: 0,
            }),
            list_path,
            resource_label,
            config,
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.config.tenant
    }

    pub async fn fetch_status(&self) -> FetchStatus {
        self.inner.lock().await.status
    }

    pub async fn rows(&self) -> Vec<R> {
        self.inner.lock().await.rows.clone()
    }

    pub async fn total_rows(&self) -> u64 {
        self.inner.lock().await.total
    }

    /// Active/inactive tallies the server reports alongside user lists.
    pub async fn status_counts(&self) -> (u64, u64) {
        let state = self.inner.lock().await;
        (state.active_count, state.inactive_count)
    }

    pub async fn descriptor(&self) -> RequestDescriptor {
        self.query.lock().await.descriptor()
    }

    pub async fn draft_query(&self) -> String {
        self.query.lock().await.draft_query().to_string()
    }

    /// Records a keystroke and schedules the debounced commit. The draft is
    /// visible immediately through [`draft_query`](Self::draft_query); the
    /// fetch only fires if no further edit lands within the window.
    pub async fn set_search(self: &Arc<Self>, text: impl Into<String>) {
        let ticket = { self.query.lock().await.set_draft_query(text.into()) };
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(ticket.window).await;
            controller.settle_search(ticket.generation).await;
        });
    }

    async fn settle_search(&self, generation: u64) {
        let descriptor = { self.query.lock().await.settle_query(generation) };
        if let Some(descriptor) = descriptor {
            self.run_fetch(descriptor).await;
        }
    }

    pub async fn set_role_filter(&self, role: Option<RoleId>) {
        let descriptor = { self.query.lock().await.set_role_filter(role) };
        if let Some(descriptor) = descriptor {
            self.run_fetch(descriptor).await;
        }
    }

    pub async fn set_status_filter(&self, status: Option<UserStatus>) {
        let descriptor = { self.query.lock().await.set_status_filter(status) };
        if let Some(descriptor) = descriptor {
            self.run_fetch(descriptor).await;
        }
    }

    pub async fn set_page_index(&self, page_index: u32) {
        let descriptor = { self.query.lock().await.set_page_index(page_index) };
        if let Some(descriptor) = descriptor {
            self.run_fetch(descriptor).await;
        }
    }

    pub async fn set_page_size(&self, page_size: u32) {
        let descriptor = { self.query.lock().await.set_page_size(page_size) };
        if let Some(descriptor) = descriptor {
            self.run_fetch(descriptor).await;
        }
    }

    /// Re-reads the list with the current descriptor.
    pub async fn refresh(&self) {
        let descriptor = { self.query.lock().await.descriptor() };
        self.run_fetch(descriptor).await;
    }

    /// Issues the read behind `descriptor` and applies the outcome unless a
    /// newer fetch was issued in the meantime. Errors stop here: the caller
    /// sees only FetchStatus and events.
    async fn run_fetch(&self, descriptor: RequestDescriptor) {
        let seq = {
            let mut state = self.inner.lock().await;
            state.fetch_seq += 1;
            state.status = FetchStatus::Loading;
            state.fetch_seq
        };
        let _ = self
            .events
            .send(ListEvent::StatusChanged(FetchStatus::Loading));
        info!(
            endpoint = %self.list_path,
            page = descriptor.page_index,
            search = %descriptor.search,
            "list: refresh"
        );

        let outcome = self.fetch_page(&descriptor).await;

        let mut state = self.inner.lock().await;
        if state.fetch_seq != seq {
            info!(
                endpoint = %self.list_path,
                superseded_seq = seq,
                "list: discarding superseded response"
            );
            return;
        }
        match outcome {
            Ok(PageOutcome::Rows(page)) => {
                let rows = page.rows.len();
                state.rows = page.rows;
                state.total = page.total;
                state.active_count = page.active_count;
                state.inactive_count = page.inactive_count;
                state.status = FetchStatus::Success;
                drop(state);
                let _ = self
                    .events
                    .send(ListEvent::StatusChanged(FetchStatus::Success));
                let _ = self.events.send(ListEvent::RowsReplaced {
                    rows,
                    total: page.total,
                });
            }
            Ok(PageOutcome::NoData { message }) => {
                state.rows.clear();
                state.total = 0;
                state.active_count = 0;
                state.inactive_count = 0;
                state.status = FetchStatus::Error;
                drop(state);
                info!(endpoint = %self.list_path, "list: server reported no data");
                let _ = self
                    .events
                    .send(ListEvent::StatusChanged(FetchStatus::Error));
                let _ = self.events.send(ListEvent::RowsReplaced { rows: 0, total: 0 });
                let _ = self.events.send(ListEvent::Notice {
                    level: NoticeLevel::Warning,
                    message,
                });
            }
            Err(err) => {
                state.rows.clear();
                state.total = 0;
                state.active_count = 0;
                state.inactive_count = 0;
                state.status = FetchStatus::Error;
                drop(state);
                warn!(endpoint = %self.list_path, "list: fetch failed: {err}");
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Failed to fetch {}", self.resource_label));
                let _ = self
                    .events
                    .send(ListEvent::StatusChanged(FetchStatus::Error));
                let _ = self.events.send(ListEvent::Notice {
                    level: NoticeLevel::Error,
                    message,
                });
            }
        }
    }

    async fn fetch_page(&self, descriptor: &RequestDescriptor) -> Result<PageOutcome<R>, ListError> {
        let response = self
            .http
            .get(self.endpoint_url(&self.list_path))
            .timeout(self.config.request_timeout)
            .query(&ListQuery::from_descriptor(descriptor))
            .send()
            .await?;
        let response = check_server_response(response).await?;
        let body: ListResponse<R::Wire> = response.json().await?;
        Ok(normalize_page(body))
    }

    /// Single-entity read on the list endpoint, used for edit prefill.
    /// A message-only body means the id is unknown; that is `None`, not an
    /// error.
    pub async fn fetch_row(&self, id: R::Id) -> Result<Option<R>, ListError> {
        let response = self
            .http
            .get(self.endpoint_url(&self.list_path))
            .timeout(self.config.request_timeout)
            .query(&[("id", &id)])
            .send()
            .await?;
        let response = check_server_response(response).await?;
        let body: SingleResponse<R::Wire> = response.json().await?;
        Ok(match body {
            SingleResponse::Found(envelope) => Some(R::from_wire(envelope.data)),
            SingleResponse::Missing(sentinel) => {
                info!(
                    endpoint = %self.list_path,
                    "list: single read found nothing: {}",
                    sentinel.message
                );
                None
            }
        })
    }

    pub async fn toggle_selection(&self, id: R::Id) {
        self.selection.lock().await.toggle(id);
    }

    pub async fn select_all_visible(&self, selected: bool) {
        let visible = self.visible_ids().await;
        self.selection.lock().await.set_all_visible(&visible, selected);
    }

    /// The select-all keyboard shortcut: equivalent to `select_all_visible`
    /// with the complement of the all-selected check.
    pub async fn toggle_select_all_visible(&self) {
        let visible = self.visible_ids().await;
        self.selection.lock().await.toggle_all_visible(&visible);
    }

    pub async fn clear_selection(&self) {
        self.selection.lock().await.clear();
    }

    pub async fn selected_ids(&self) -> Vec<R::Id> {
        self.selection.lock().await.snapshot()
    }

    pub async fn is_selected(&self, id: &R::Id) -> bool {
        self.selection.lock().await.is_selected(id)
    }

    pub async fn select_all_state(&self) -> SelectAllState {
        let visible = self.visible_ids().await;
        self.selection.lock().await.select_all_state(&visible)
    }

    pub async fn pending_action(&self) -> Option<PendingAction<R::Id>> {
        self.pending.lock().await.clone()
    }

    /// Dismisses the pending confirmation, discarding both the pending
    /// action and the selection it was built from. A cancel with nothing
    /// pending does nothing.
    pub async fn cancel_pending_action(&self) {
        let discarded = self.pending.lock().await.take();
        if discarded.is_some() {
            self.selection.lock().await.clear();
            info!("bulk: pending action cancelled");
        }
    }

    async fn visible_ids(&self) -> Vec<R::Id> {
        self.inner
            .lock()
            .await
            .rows
            .iter()
            .map(|row| row.id())
            .collect()
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_json_mutation<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<MutationAck, ListError> {
        let response = self
            .http
            .post(self.endpoint_url(path))
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await?;
        let response = check_server_response(response).await?;
        let ack: MutationAck = response.json().await?;
        ack_to_result(ack)
    }

    async fn post_multipart_mutation(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<MutationAck, ListError> {
        let response = self
            .http
            .post(self.endpoint_url(path))
            .timeout(self.config.request_timeout)
            .multipart(form)
            .send()
            .await?;
        let response = check_server_response(response).await?;
        let ack: MutationAck = response.json().await?;
        ack_to_result(ack)
    }

    async fn send_delete(&self, path: &str, id: i64) -> Result<MutationAck, ListError> {
        let response = self
            .http
            .delete(format!("{}/{}", self.endpoint_url(path), id))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let response = check_server_response(response).await?;
        let ack: MutationAck = response.json().await?;
        ack_to_result(ack)
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let _ = self.events.send(ListEvent::Notice {
            level,
            message: message.into(),
        });
    }
}

impl ListController<UserRow> {
    /// Controller over the user directory list.
    pub fn users(config: ControllerConfig) -> Arc<Self> {
        let list_path = config.endpoints.users_list.clone();
        Self::with_list_path(config, list_path, "users")
    }

    /// Fetches the role catalog with the reserved roles removed. This is
    /// the only place the exclusion happens; bulk role mutations trust
    /// their input to come from here.
    pub async fn assignable_roles(&self) -> Result<Vec<RoleSummary>, ListError> {
        let response = self
            .http
            .get(self.endpoint_url(&self.config.endpoints.roles_catalog))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let response = check_server_response(response).await?;
        let envelope: RolesEnvelope = response.json().await?;
        Ok(envelope
            .data
            .into_iter()
            .filter(|role| !RESERVED_ROLES.contains(&role.name.as_str()))
            .collect())
    }

    /// Opens the confirmation step for a bulk action over the current
    /// selection. With nothing selected this warns and stays idle; no
    /// request leaves the process.
    pub async fn request_bulk_action(&self, action: BulkAction) -> bool {
        let mut affected = { self.selection.lock().await.snapshot() };
        if affected.is_empty() {
            warn!("bulk: action requested with empty selection");
            self.notify(NoticeLevel::Warning, "Please select at least one user.");
            return false;
        }
        affected.sort_by_key(|id| id.0);
        info!(count = affected.len(), "bulk: action pending confirmation");
        *self.pending.lock().await = Some(PendingAction { action, affected });
        true
    }

    /// Sends the pending mutation. Success refreshes the list, clears the
    /// selection and notifies; failure notifies with the server message but
    /// leaves the selection alone. Either way the pending action is spent.
    pub async fn confirm_bulk_action(&self) -> bool {
        let Some(pending) = self.pending.lock().await.take() else {
            warn!("bulk: confirm called with nothing pending");
            return false;
        };

        let result = match &pending.action {
            BulkAction::SetStatus(status) => {
                let request = BulkStatusRequest {
                    user_ids: pending.affected.clone(),
                    school_id: self.config.tenant.school_id,
                    tenant_id: self.config.tenant.tenant_id.clone(),
                    status: status.flag(),
                };
                self.post_json_mutation(&self.config.endpoints.users_bulk_status, &request)
                    .await
            }
            BulkAction::AssignRoles(roles) => {
                let request = BulkRoleRequest {
                    user_ids: pending.affected.clone(),
                    roles_ids: roles.clone(),
                    school_id: self.config.tenant.school_id,
                    tenant_id: self.config.tenant.tenant_id.clone(),
                };
                self.post_json_mutation(&self.config.endpoints.users_bulk_roles, &request)
                    .await
            }
        };

        match result {
            Ok(_) => {
                info!(count = pending.affected.len(), "bulk: mutation applied");
                self.refresh().await;
                self.selection.lock().await.clear();
                let message = match &pending.action {
                    BulkAction::SetStatus(UserStatus::Active) => "Users activated successfully",
                    BulkAction::SetStatus(UserStatus::Inactive) => "Users deactivated successfully",
                    BulkAction::AssignRoles(_) => "Roles updated successfully!",
                };
                self.notify(NoticeLevel::Success, message);
                true
            }
            Err(err) => {
                warn!("bulk: mutation failed: {err}");
                let fallback = match &pending.action {
                    BulkAction::SetStatus(_) => "Failed to update user status",
                    BulkAction::AssignRoles(_) => "Error updating roles",
                };
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback.to_string());
                self.notify(NoticeLevel::Error, message);
                false
            }
        }
    }

    /// Flips one user's status, the deactivate/restore path of the row
    /// menu. Clears the selection afterwards since the flipped row may be
    /// part of it.
    pub async fn set_user_status(&self, user_id: UserId, status: UserStatus) -> bool {
        let form = multipart::Form::new()
            .text("user_id", user_id.0.to_string())
            .text("school_id", self.config.tenant.school_id.0.to_string())
            .text("tenant_id", self.config.tenant.tenant_id.as_str().to_string())
            .text("status", status.flag().to_string());

        let result = self
            .post_multipart_mutation(&self.config.endpoints.user_status_update, form)
            .await;
        self.selection.lock().await.clear();
        match result {
            Ok(ack) => {
                info!(user_id = user_id.0, flag = status.flag(), "users: status updated");
                let message = ack
                    .message
                    .unwrap_or_else(|| "User status updated successfully".to_string());
                self.notify(NoticeLevel::Success, message);
                self.refresh().await;
                true
            }
            Err(err) => {
                warn!(user_id = user_id.0, "users: status update failed: {err}");
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Failed to update user status".to_string());
                self.notify(NoticeLevel::Error, message);
                false
            }
        }
    }

    /// Imports the tenant's users from the linked Microsoft directory,
    /// then re-reads the list. The backend keys the import on the scope
    /// ids carried in the path.
    pub async fn sync_users(&self) -> bool {
        match self.request_directory_sync().await {
            Ok(ack) => {
                info!("users: directory sync applied");
                let message = ack
                    .message
                    .unwrap_or_else(|| "Users synced successfully".to_string());
                self.notify(NoticeLevel::Success, message);
                self.refresh().await;
                true
            }
            Err(err) => {
                warn!("users: directory sync failed: {err}");
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Failed to sync users".to_string());
                self.notify(NoticeLevel::Error, message);
                false
            }
        }
    }

    async fn request_directory_sync(&self) -> Result<MutationAck, ListError> {
        let response = self
            .http
            .get(format!(
                "{}/{}/{}",
                self.endpoint_url(&self.config.endpoints.users_sync),
                self.config.tenant.school_id.0,
                self.config.tenant.tenant_id.as_str(),
            ))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let response = check_server_response(response).await?;
        let ack: MutationAck = response.json().await?;
        ack_to_result(ack)
    }
}

/// Attachment queued for upload alongside an announcement.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Announcement form content. `id: None` creates; the wire encodes that as
/// id "0".
#[derive(Debug, Clone, Default)]
pub struct AnnouncementDraft {
    pub id: Option<AnnouncementId>,
    pub title: String,
    pub description: String,
    pub attachments: Vec<AttachmentUpload>,
}

impl ListController<AnnouncementRow> {
    /// Controller over the announcements list.
    pub fn announcements(config: ControllerConfig) -> Arc<Self> {
        let list_path = config.endpoints.announcements_list.clone();
        Self::with_list_path(config, list_path, "announcements")
    }

    /// Creates or updates an announcement as one multipart post, files
    /// included as indexed `attachments[i]` parts.
    pub async fn save_announcement(&self, draft: AnnouncementDraft) -> bool {
        let is_update = draft.id.is_some();
        let form = match self.announcement_form(draft) {
            Ok(form) => form,
            Err(err) => {
                warn!("announcements: rejected attachment: {err}");
                self.notify(NoticeLevel::Error, "Something went wrong");
                return false;
            }
        };

        match self
            .post_multipart_mutation(&self.config.endpoints.announcements_save, form)
            .await
        {
            Ok(ack) => {
                info!(update = is_update, "announcements: saved");
                let message = ack
                    .message
                    .unwrap_or_else(|| "Announcement saved successfully".to_string());
                self.notify(NoticeLevel::Success, message);
                self.refresh().await;
                true
            }
            Err(err) => {
                warn!("announcements: save failed: {err}");
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Something went wrong".to_string());
                self.notify(NoticeLevel::Error, message);
                false
            }
        }
    }

    fn announcement_form(&self, draft: AnnouncementDraft) -> Result<multipart::Form, ListError> {
        let id_field = draft
            .id
            .map(|id| id.0.to_string())
            .unwrap_or_else(|| "0".to_string());
        let mut form = multipart::Form::new()
            .text("id", id_field)
            .text("school_id", self.config.tenant.school_id.0.to_string())
            .text("tenant_id", self.config.tenant.tenant_id.as_str().to_string())
            .text("title", draft.title)
            .text("description", draft.description);
        for (index, attachment) in draft.attachments.into_iter().enumerate() {
            let mut part =
                multipart::Part::bytes(attachment.bytes).file_name(attachment.filename);
            if let Some(mime) = &attachment.mime_type {
                part = part.mime_str(mime)?;
            }
            form = form.part(format!("attachments[{index}]"), part);
        }
        Ok(form)
    }

    pub async fn delete_announcement(&self, id: AnnouncementId) -> bool {
        match self
            .send_delete(&self.config.endpoints.announcements_delete, id.0)
            .await
        {
            Ok(ack) => {
                info!(announcement_id = id.0, "announcements: deleted");
                let message = ack
                    .message
                    .unwrap_or_else(|| "Announcement deleted successfully".to_string());
                self.notify(NoticeLevel::Success, message);
                self.refresh().await;
                true
            }
            Err(err) => {
                warn!(announcement_id = id.0, "announcements: delete failed: {err}");
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Failed to delete announcement".to_string());
                self.notify(NoticeLevel::Error, message);
                false
            }
        }
    }

    /// Removes one stored file from an existing announcement. The list is
    /// not refreshed; the caller updates its own preview state.
    pub async fn delete_attachment(&self, id: AttachmentId) -> bool {
        match self
            .send_delete(&self.config.endpoints.attachment_delete, id.0)
            .await
        {
            Ok(ack) => {
                info!(attachment_id = id.0, "announcements: attachment deleted");
                let message = ack
                    .message
                    .unwrap_or_else(|| "File deleted successfully!".to_string());
                self.notify(NoticeLevel::Success, message);
                true
            }
            Err(err) => {
                warn!(attachment_id = id.0, "announcements: attachment delete failed: {err}");
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Failed to delete file".to_string());
                self.notify(NoticeLevel::Error, message);
                false
            }
        }
    }
}

fn normalize_page<R: TableRow>(body: ListResponse<R::Wire>) -> PageOutcome<R> {
    match body {
        ListResponse::Paged(envelope) => {
            let rows: Vec<R> = envelope
                .data
                .data
                .into_iter()
                .map(R::from_wire)
                .collect();
            let total = envelope.data.total.unwrap_or(rows.len() as u64);
            PageOutcome::Rows(NormalizedPage {
                total,
                active_count: envelope.active_count.unwrap_or(0),
                inactive_count: envelope.inactive_count.unwrap_or(0),
                rows,
            })
        }
        ListResponse::Flat(wires) => {
            let rows: Vec<R> = wires.into_iter().map(R::from_wire).collect();
            let total = rows.len() as u64;
            PageOutcome::Rows(NormalizedPage {
                total,
                active_count: 0,
                inactive_count: 0,
                rows,
            })
        }
        ListResponse::Sentinel(sentinel) => PageOutcome::NoData {
            message: sentinel.message,
        },
    }
}

/// Turns a non-2xx response into a rejection carrying the server's message
/// when the body has one.
async fn check_server_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, ListError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = ErrorCode::from_http_status(status.as_u16());
    let message = match response.json::<ServerMessage>().await {
        Ok(body) => body.message,
        Err(_) => format!("request failed with status {status}"),
    };
    Err(ListError::Rejected(ApiException::new(code, message)))
}

fn ack_to_result(ack: MutationAck) -> Result<MutationAck, ListError> {
    if ack.is_success() {
        return Ok(ack);
    }
    Err(ListError::Unacknowledged {
        message: ack
            .message
            .clone()
            .unwrap_or_else(|| format!("mutation returned status {}", ack.status)),
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
