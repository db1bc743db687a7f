//! User manager - view state and the operations that mutate it
//!
//! All state lives in one `ViewState` behind a mutex. Operations snapshot what
//! they need, release the lock, await the remote call and only then apply the
//! result, so a failed request never leaves the state half-updated. The lock is
//! never held across an `.await`.
//!
//! Each request operation has a synchronous `start_*` half that validates,
//! snapshots the form and sets busy, returning the request as a `Pending`
//! future. The async wrappers just await it.

use crate::api::UsersApi;
use crate::error::{Error, Result};
use crate::types::{User, UserForm};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Called after every state change so the view can redraw.
pub type ChangeNotifier = Arc<dyn Fn() + Send + Sync>;

/// A request that has already claimed the busy flag.
pub type Pending = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

#[derive(Debug, Default)]
pub struct ViewState {
    pub users: Vec<User>,
    pub form: UserForm,
    /// Id of the user being edited, `None` in create mode
    pub editing: Option<u64>,
    pub busy: bool,
}

impl ViewState {
    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_editing() {
            "Update User"
        } else {
            "Create User"
        }
    }
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the busy flag for one request; clears it when dropped.
struct BusyGuard {
    state: Arc<Mutex<ViewState>>,
    notify: ChangeNotifier,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        lock(&self.state).busy = false;
        (self.notify)();
    }
}

#[derive(Clone)]
pub struct UserManager {
    api: Arc<dyn UsersApi>,
    state: Arc<Mutex<ViewState>>,
    notify: ChangeNotifier,
}

impl UserManager {
    pub fn new(api: Arc<dyn UsersApi>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(ViewState::default())),
            notify: Arc::new(|| {}),
        }
    }

    pub fn with_notifier(mut self, notify: impl Fn() + Send + Sync + 'static) -> Self {
        self.notify = Arc::new(notify);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.state)
    }

    fn changed(&self) {
        (self.notify)();
    }

    fn begin_request(&self, op: &'static str) -> Result<BusyGuard> {
        {
            let mut state = self.state();
            if state.busy {
                warn!(op, "Request already in progress, ignoring");
                return Err(Error::Busy);
            }
            state.busy = true;
        }
        debug!(op, "Request started");
        self.changed();
        Ok(BusyGuard {
            state: self.state.clone(),
            notify: self.notify.clone(),
        })
    }

    /// Replace the local list with the remote collection.
    pub async fn load_all(&self) -> Result<()> {
        self.start_load()?.await
    }

    /// Mark busy now; the returned future fetches the collection.
    pub fn start_load(&self) -> Result<Pending> {
        let busy = self.begin_request("load")?;
        let this = self.clone();
        Ok(Box::pin(async move {
            let _busy = busy;
            match this.api.list().await {
                Ok(users) => {
                    info!(count = users.len(), "Users loaded");
                    this.state().users = users;
                    this.changed();
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "Error fetching users");
                    Err(e)
                }
            }
        }))
    }

    /// Submit the form: update in edit mode, create otherwise.
    pub async fn submit(&self) -> Result<()> {
        self.start_submit()?.await
    }

    /// Pick create or update from the mode at call time, not when the request runs.
    pub fn start_submit(&self) -> Result<Pending> {
        let editing = self.state().is_editing();
        if editing {
            self.start_update()
        } else {
            self.start_create()
        }
    }

    pub async fn submit_create(&self) -> Result<()> {
        self.start_create()?.await
    }

    pub fn start_create(&self) -> Result<Pending> {
        let payload = {
            let state = self.state();
            if let Err(e) = state.form.validate() {
                warn!(error = %e, "Create rejected");
                return Err(e.into());
            }
            state.form.to_payload()
        };

        let busy = self.begin_request("create")?;
        let this = self.clone();
        Ok(Box::pin(async move {
            let _busy = busy;
            match this.api.create(&payload).await {
                Ok(user) => {
                    info!(id = user.id, name = %user.name, "User created");
                    {
                        let mut state = this.state();
                        state.users.push(user);
                        state.form.clear();
                    }
                    this.changed();
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "Error creating user");
                    Err(e)
                }
            }
        }))
    }

    /// Copy a listed user into the form and enter edit mode.
    pub fn begin_edit(&self, id: u64) -> Result<()> {
        {
            let mut state = self.state();
            let Some(form) = state.users.iter().find(|u| u.id == id).map(UserForm::from_user) else {
                warn!(id, "Cannot edit unknown user");
                return Err(Error::UserNotFound(id));
            };
            state.form = form;
            state.editing = Some(id);
        }
        debug!(id, "Editing user");
        self.changed();
        Ok(())
    }

    pub fn cancel_edit(&self) {
        {
            let mut state = self.state();
            state.editing = None;
            state.form.clear();
        }
        self.changed();
    }

    /// Send the form as a full replacement of the user under edit.
    pub async fn submit_update(&self) -> Result<()> {
        self.start_update()?.await
    }

    pub fn start_update(&self) -> Result<Pending> {
        let (id, payload) = {
            let state = self.state();
            let Some(id) = state.editing else {
                warn!("Update submitted outside edit mode");
                return Err(Error::NotEditing);
            };
            if let Err(e) = state.form.validate() {
                warn!(id, error = %e, "Update rejected");
                return Err(e.into());
            }
            (id, state.form.to_payload())
        };

        let busy = self.begin_request("update")?;
        let this = self.clone();
        Ok(Box::pin(async move {
            let _busy = busy;
            match this.api.update(id, &payload).await {
                Ok(updated) => {
                    info!(id, name = %updated.name, "User updated");
                    {
                        let mut state = this.state();
                        for user in state.users.iter_mut().filter(|u| u.id == id) {
                            *user = updated.clone();
                        }
                        state.editing = None;
                        state.form.clear();
                    }
                    this.changed();
                    Ok(())
                }
                Err(e) => {
                    error!(id, error = %e, "Error updating user");
                    Err(e)
                }
            }
        }))
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.start_delete(id)?.await
    }

    pub fn start_delete(&self, id: u64) -> Result<Pending> {
        let busy = self.begin_request("delete")?;
        let this = self.clone();
        Ok(Box::pin(async move {
            let _busy = busy;
            match this.api.delete(id).await {
                Ok(()) => {
                    {
                        let mut state = this.state();
                        let before = state.users.len();
                        state.users.retain(|u| u.id != id);
                        if state.editing == Some(id) {
                            state.editing = None;
                            state.form.clear();
                        }
                        info!(id, removed = before - state.users.len(), "User deleted");
                    }
                    this.changed();
                    Ok(())
                }
                Err(e) => {
                    error!(id, error = %e, "Error deleting user");
                    Err(e)
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserPayload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn user(id: u64, name: &str, email: &str, phone: &str) -> User {
        User {
            id,
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            extra: Default::default(),
        }
    }

    fn request_error() -> Error {
        Error::Request(reqwest::Client::new().get("not a url").build().unwrap_err())
    }

    /// Pauses a request until the test releases it.
    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    /// In-memory stand-in for the remote collection.
    #[derive(Default)]
    struct MockApi {
        users: Mutex<Vec<User>>,
        next_id: Mutex<u64>,
        fail: AtomicBool,
        calls: Mutex<Vec<String>>,
        gate: Option<Arc<Gate>>,
    }

    impl MockApi {
        fn with_users(users: Vec<User>) -> Self {
            let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
            Self {
                users: Mutex::new(users),
                next_id: Mutex::new(next_id),
                ..Default::default()
            }
        }

        fn gated(mut self, gate: Arc<Gate>) -> Self {
            self.gate = Some(gate);
            self
        }

        async fn call(&self, name: String) -> Result<()> {
            self.calls.lock().unwrap().push(name);
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(request_error());
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UsersApi for MockApi {
        async fn list(&self) -> Result<Vec<User>> {
            self.call("list".into()).await?;
            Ok(self.users.lock().unwrap().clone())
        }

        async fn create(&self, payload: &UserPayload) -> Result<User> {
            self.call("create".into()).await?;
            let mut next_id = self.next_id.lock().unwrap();
            let created = user(*next_id, &payload.name, &payload.email, &payload.phone);
            *next_id += 1;
            Ok(created)
        }

        async fn update(&self, id: u64, payload: &UserPayload) -> Result<User> {
            self.call(format!("update {id}")).await?;
            Ok(user(id, &payload.name, &payload.email, &payload.phone))
        }

        async fn delete(&self, id: u64) -> Result<()> {
            self.call(format!("delete {id}")).await
        }
    }

    fn setup(api: MockApi) -> (UserManager, Arc<MockApi>) {
        let api = Arc::new(api);
        (UserManager::new(api.clone()), api)
    }

    fn set_form(manager: &UserManager, name: &str, email: &str, phone: &str) {
        let mut state = manager.state();
        state.form.name = name.into();
        state.form.email = email.into();
        state.form.phone = phone.into();
    }

    async fn loaded(users: Vec<User>) -> (UserManager, Arc<MockApi>) {
        let (manager, api) = setup(MockApi::with_users(users));
        manager.load_all().await.unwrap();
        (manager, api)
    }

    #[tokio::test]
    async fn crud_scenario() {
        let (manager, _api) = setup(MockApi::with_users(vec![user(1, "Ana", "a@x.com", "1")]));
        assert!(manager.state().users.is_empty());

        manager.load_all().await.unwrap();
        assert_eq!(manager.state().users, vec![user(1, "Ana", "a@x.com", "1")]);

        set_form(&manager, "Bo", "b@x.com", "2");
        manager.submit().await.unwrap();
        {
            let state = manager.state();
            assert_eq!(state.users.len(), 2);
            assert_eq!(state.users[1], user(2, "Bo", "b@x.com", "2"));
            assert_eq!(state.form, UserForm::default());
        }

        manager.begin_edit(1).unwrap();
        {
            let state = manager.state();
            assert_eq!(state.editing, Some(1));
            assert_eq!(state.form.name, "Ana");
            assert_eq!(state.form.email, "a@x.com");
            assert_eq!(state.form.phone, "1");
            assert_eq!(state.submit_label(), "Update User");
        }

        manager.state().form.name = "Anna".into();
        manager.submit().await.unwrap();
        {
            let state = manager.state();
            assert_eq!(state.users[0], user(1, "Anna", "a@x.com", "1"));
            assert_eq!(state.editing, None);
            assert_eq!(state.form, UserForm::default());
            assert_eq!(state.submit_label(), "Create User");
        }

        manager.delete(2).await.unwrap();
        assert_eq!(manager.state().users, vec![user(1, "Anna", "a@x.com", "1")]);
    }

    #[tokio::test]
    async fn each_create_appends_one_server_record() {
        let (manager, _api) = loaded(vec![user(1, "Ana", "a@x.com", "1")]).await;
        for (i, name) in ["Bo", "Cy", "Di"].into_iter().enumerate() {
            set_form(&manager, name, "n@x.com", "5");
            manager.submit_create().await.unwrap();
            let state = manager.state();
            assert_eq!(state.users.len(), 2 + i);
            let last = state.users.last().unwrap();
            assert_eq!(last.id, 2 + i as u64);
            assert_eq!(last.name, name);
        }
    }

    #[tokio::test]
    async fn unchanged_update_keeps_record() {
        let original = vec![user(1, "Ana", "a@x.com", "1"), user(2, "Bo", "b@x.com", "2")];
        let (manager, api) = loaded(original.clone()).await;
        manager.begin_edit(2).unwrap();
        manager.submit_update().await.unwrap();
        assert_eq!(manager.state().users, original);
        assert_eq!(api.calls(), vec!["list", "update 2"]);
    }

    #[tokio::test]
    async fn delete_removes_only_matching_record() {
        let (manager, _api) = loaded(vec![
            user(1, "Ana", "a@x.com", "1"),
            user(2, "Bo", "b@x.com", "2"),
            user(3, "Cy", "c@x.com", "3"),
        ])
        .await;
        manager.delete(2).await.unwrap();
        let ids: Vec<u64> = manager.state().users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn deleting_edited_user_leaves_edit_mode() {
        let (manager, _api) = loaded(vec![user(1, "Ana", "a@x.com", "1")]).await;
        manager.begin_edit(1).unwrap();
        manager.delete(1).await.unwrap();
        let state = manager.state();
        assert!(state.users.is_empty());
        assert_eq!(state.editing, None);
        assert_eq!(state.form, UserForm::default());
    }

    #[tokio::test]
    async fn failed_operations_leave_state_unchanged() {
        let original = vec![user(1, "Ana", "a@x.com", "1"), user(2, "Bo", "b@x.com", "2")];
        let (manager, api) = loaded(original.clone()).await;
        api.fail.store(true, Ordering::SeqCst);

        set_form(&manager, "Cy", "c@x.com", "3");
        assert!(matches!(manager.submit_create().await, Err(Error::Request(_))));
        assert_eq!(manager.state().users, original);
        assert_eq!(manager.state().form.name, "Cy");

        manager.begin_edit(1).unwrap();
        manager.state().form.name = "Anna".into();
        assert!(matches!(manager.submit_update().await, Err(Error::Request(_))));
        {
            let state = manager.state();
            assert_eq!(state.users, original);
            assert_eq!(state.editing, Some(1));
            assert_eq!(state.form.name, "Anna");
        }

        assert!(matches!(manager.delete(2).await, Err(Error::Request(_))));
        assert!(matches!(manager.load_all().await, Err(Error::Request(_))));
        let state = manager.state();
        assert_eq!(state.users, original);
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn invalid_form_sends_nothing() {
        let (manager, api) = loaded(vec![]).await;
        set_form(&manager, "Bo", "", "2");
        assert!(matches!(
            manager.submit().await,
            Err(Error::InvalidForm(crate::types::FormError::MissingEmail))
        ));
        assert_eq!(api.calls(), vec!["list"]);
        assert!(!manager.state().busy);
    }

    #[tokio::test]
    async fn begin_edit_unknown_id_is_rejected() {
        let (manager, _api) = loaded(vec![user(1, "Ana", "a@x.com", "1")]).await;
        set_form(&manager, "draft", "", "");
        assert!(matches!(manager.begin_edit(9), Err(Error::UserNotFound(9))));
        let state = manager.state();
        assert_eq!(state.editing, None);
        assert_eq!(state.form.name, "draft");
    }

    #[tokio::test]
    async fn update_requires_edit_mode() {
        let (manager, api) = loaded(vec![user(1, "Ana", "a@x.com", "1")]).await;
        set_form(&manager, "Ana", "a@x.com", "1");
        assert!(matches!(manager.submit_update().await, Err(Error::NotEditing)));
        assert_eq!(api.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn cancel_edit_returns_to_create_mode() {
        let (manager, _api) = loaded(vec![user(1, "Ana", "a@x.com", "1")]).await;
        manager.begin_edit(1).unwrap();
        manager.cancel_edit();
        let state = manager.state();
        assert_eq!(state.editing, None);
        assert_eq!(state.form, UserForm::default());
    }

    #[tokio::test]
    async fn busy_spans_the_request() {
        let gate = Arc::new(Gate::default());
        let (manager, api) =
            setup(MockApi::with_users(vec![user(1, "Ana", "a@x.com", "1")]).gated(gate.clone()));
        assert!(!manager.state().busy);

        let task = tokio::spawn({
            let manager = manager.clone();
            async move { manager.load_all().await }
        });
        gate.entered.notified().await;
        assert!(manager.state().busy);

        // A second operation is refused while the first is outstanding
        assert!(matches!(manager.delete(1).await, Err(Error::Busy)));
        assert_eq!(api.calls(), vec!["list"]);

        gate.release.notify_one();
        task.await.unwrap().unwrap();
        assert!(!manager.state().busy);
        assert_eq!(manager.state().users.len(), 1);
    }

    #[tokio::test]
    async fn busy_clears_after_failure() {
        let gate = Arc::new(Gate::default());
        let (manager, api) = setup(MockApi::default().gated(gate.clone()));
        api.fail.store(true, Ordering::SeqCst);

        let task = tokio::spawn({
            let manager = manager.clone();
            async move { manager.delete(4).await }
        });
        gate.entered.notified().await;
        assert!(manager.state().busy);
        gate.release.notify_one();
        assert!(task.await.unwrap().is_err());
        assert!(!manager.state().busy);
    }

    #[tokio::test]
    async fn every_change_notifies_view() {
        let count = Arc::new(AtomicUsize::new(0));
        let api = Arc::new(MockApi::with_users(vec![user(1, "Ana", "a@x.com", "1")]));
        let manager = UserManager::new(api).with_notifier({
            let count = count.clone();
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        // busy on, list applied, busy off
        manager.load_all().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);

        manager.begin_edit(1).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn busy_spans_create() {
        let gate = Arc::new(Gate::default());
        let (manager, api) = setup(MockApi::default().gated(gate.clone()));
        set_form(&manager, "Bo", "b@x.com", "2");

        let task = tokio::spawn(manager.start_create().unwrap());
        gate.entered.notified().await;
        assert!(manager.state().busy);
        assert!(matches!(manager.load_all().await, Err(Error::Busy)));

        gate.release.notify_one();
        task.await.unwrap().unwrap();
        let state = manager.state();
        assert!(!state.busy);
        assert_eq!(state.users.len(), 1);
        assert_eq!(api.calls(), vec!["create"]);
    }

    #[tokio::test]
    async fn busy_spans_update() {
        let gate = Arc::new(Gate::default());
        let (manager, api) = setup(MockApi::default().gated(gate.clone()));
        manager.state().users = vec![user(1, "Ana", "a@x.com", "1")];
        manager.begin_edit(1).unwrap();
        manager.state().form.name = "Anna".into();

        let task = tokio::spawn(manager.start_update().unwrap());
        gate.entered.notified().await;
        {
            let state = manager.state();
            assert!(state.busy);
            assert_eq!(state.editing, Some(1));
        }

        gate.release.notify_one();
        task.await.unwrap().unwrap();
        let state = manager.state();
        assert!(!state.busy);
        assert_eq!(state.editing, None);
        assert_eq!(state.users[0].name, "Anna");
        assert_eq!(api.calls(), vec!["update 1"]);
    }

    #[tokio::test]
    async fn submit_mode_is_fixed_when_started() {
        let (manager, api) = setup(MockApi::with_users(vec![user(1, "Ana", "a@x.com", "1")]));
        manager.state().users = vec![user(1, "Ana", "a@x.com", "1")];
        set_form(&manager, "Bo", "b@x.com", "2");

        let pending = manager.start_submit().unwrap();
        // Busy is claimed before the request is ever polled
        assert!(manager.state().busy);

        // Edit clicked before the runtime picks the request up
        manager.begin_edit(1).unwrap();
        pending.await.unwrap();

        let state = manager.state();
        assert_eq!(api.calls(), vec!["create"]);
        assert_eq!(state.users.len(), 2);
        assert_eq!(state.users[1].name, "Bo");
        assert_eq!(state.users[0].name, "Ana");
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn dropped_request_releases_busy() {
        let (manager, api) = setup(MockApi::default());
        let pending = manager.start_delete(1).unwrap();
        assert!(manager.state().busy);
        drop(pending);
        assert!(!manager.state().busy);
        assert!(api.calls().is_empty());
    }
}
