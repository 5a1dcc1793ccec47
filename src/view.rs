//! Drive listing view: fetch state machine, selection and toasts.
//!
//! [`ViewModel`] is the plain state with synchronous transition functions.
//! [`DriveView`] owns one behind a mutex and runs the network operations,
//! discarding any response that arrives after [`DriveView::unmount`].

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use glob::Pattern;
use indexmap::IndexSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::client::BackendClient;
use crate::error::{DriveError, Result};
use crate::grouping::{group_by_extension, Grouping};
use crate::models::DriveFile;

/// Extensions rendered, in no particular order; grouping order wins.
pub const DISPLAYED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Files in this group get a checkbox for bulk conversion.
pub const SELECTABLE_EXTENSION: &str = "txt";

/// Files in this group get the single-file process action.
pub const PROCESSABLE_EXTENSION: &str = "md";

pub const TOAST_DURATION: Duration = Duration::from_millis(2000);

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized, redirecting...";
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching data from API";
pub const DOWNLOAD_SUCCESS_MESSAGE: &str = "File process initiated successfully!";
pub const DOWNLOAD_FAILURE_MESSAGE: &str = "Error initiating file process.";
pub const CONVERT_FAILURE_MESSAGE: &str = "Error converting files to Markdown.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Failure,
}

/// Transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
    duration: Duration,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind, shown_at: Instant) -> Self {
        Self {
            message: message.into(),
            kind,
            shown_at,
            duration: TOAST_DURATION,
        }
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < self.duration
    }
}

/// One rendered file row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub file: DriveFile,
    /// Shows a conversion checkbox.
    pub selectable: bool,
    pub selected: bool,
    /// Offers the single-file process action.
    pub processable: bool,
}

/// One rendered extension group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub extension: String,
    pub rows: Vec<FileRow>,
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The result was applied to the view.
    Applied,
    /// Nothing to do; no request was sent.
    Skipped,
    /// The view was unmounted before the result arrived.
    Discarded,
}

/// State owned by the listing view.
#[derive(Debug)]
pub struct ViewModel {
    state: ViewState,
    grouping: Grouping,
    selection: IndexSet<String>,
    toast: Option<Toast>,
    redirect: Option<String>,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModel {
    pub fn new() -> Self {
        Self {
            state: ViewState::Idle,
            grouping: Grouping::new(),
            selection: IndexSet::new(),
            toast: None,
            redirect: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    pub fn selection(&self) -> &IndexSet<String> {
        &self.selection
    }

    /// Pending full-page navigation, set when the backend reports 401.
    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    pub fn begin_loading(&mut self) {
        self.state = ViewState::Loading;
    }

    pub fn apply_listing(&mut self, files: Vec<DriveFile>) {
        self.regroup(files);
        self.state = ViewState::Ready;
    }

    pub fn apply_unauthorized(&mut self, redirect: String) {
        self.state = ViewState::Error(UNAUTHORIZED_MESSAGE.to_string());
        self.redirect = Some(redirect);
    }

    pub fn apply_fetch_error(&mut self) {
        self.state = ViewState::Error(FETCH_ERROR_MESSAGE.to_string());
    }

    /// Replace the grouping with the listing returned by a conversion.
    ///
    /// A fetch still in flight keeps the view `Loading`; whichever result
    /// lands last owns the grouping.
    pub fn apply_converted(&mut self, files: Vec<DriveFile>) {
        self.regroup(files);
        if self.state != ViewState::Loading {
            self.state = ViewState::Ready;
        }
    }

    /// Check or uncheck a file. Set semantics; the ID is not validated.
    pub fn set_selected(&mut self, file_id: &str, checked: bool) {
        if checked {
            self.selection.insert(file_id.to_string());
        } else {
            self.selection.shift_remove(file_id);
        }
    }

    /// Select every selectable file whose name matches `pattern`.
    ///
    /// Returns how many IDs were newly selected.
    pub fn select_matching(&mut self, pattern: &str) -> Result<usize> {
        let pattern = Pattern::new(pattern)?;
        let matches: Vec<String> = self
            .selectable_files()
            .filter(|f| pattern.matches(&f.name))
            .map(|f| f.id.clone())
            .collect();

        Ok(matches
            .into_iter()
            .filter(|id| self.selection.insert(id.clone()))
            .count())
    }

    pub fn can_convert(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn show_toast(&mut self, message: &str, kind: ToastKind, now: Instant) {
        self.toast = Some(Toast::new(message, kind, now));
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    /// The toast, if still visible at `now`.
    pub fn toast_at(&self, now: Instant) -> Option<&Toast> {
        self.toast.as_ref().filter(|t| t.is_visible_at(now))
    }

    /// Groups to display, in grouping order, restricted to the displayed extensions.
    pub fn render(&self) -> Vec<GroupView> {
        self.grouping
            .iter()
            .filter(|(ext, _)| DISPLAYED_EXTENSIONS.contains(&ext.as_str()))
            .map(|(ext, files)| GroupView {
                extension: ext.clone(),
                rows: files
                    .iter()
                    .map(|file| FileRow {
                        selectable: ext == SELECTABLE_EXTENSION,
                        selected: self.selection.contains(&file.id),
                        processable: ext == PROCESSABLE_EXTENSION,
                        file: file.clone(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn selectable_files(&self) -> impl Iterator<Item = &DriveFile> {
        self.grouping
            .get(SELECTABLE_EXTENSION)
            .into_iter()
            .flatten()
    }

    /// Rebuild the grouping and drop selections no longer selectable.
    fn regroup(&mut self, files: Vec<DriveFile>) {
        self.grouping = group_by_extension(files);

        let selectable: IndexSet<&str> =
            self.selectable_files().map(|f| f.id.as_str()).collect();
        let before = self.selection.len();
        let kept: IndexSet<String> = self
            .selection
            .iter()
            .filter(|id| selectable.contains(id.as_str()))
            .cloned()
            .collect();
        self.selection = kept;

        if self.selection.len() < before {
            info!(dropped = before - self.selection.len(), "pruned stale selections");
        }
    }
}

/// Listing view bound to a backend client.
///
/// Clones share the same state and lifetime.
#[derive(Clone)]
pub struct DriveView {
    client: BackendClient,
    model: Arc<Mutex<ViewModel>>,
    alive: CancellationToken,
}

impl DriveView {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            model: Arc::new(Mutex::new(ViewModel::new())),
            alive: CancellationToken::new(),
        }
    }

    /// Fetch the listing: `Idle -> Loading -> Ready | Error`.
    pub async fn mount(&self) -> ActionOutcome {
        if !self.apply(ViewModel::begin_loading) {
            return ActionOutcome::Discarded;
        }
        info!("loading file listing");

        let Some(result) = self.guarded(self.client.list_files()).await else {
            return ActionOutcome::Discarded;
        };

        let applied = match result {
            Ok(files) => {
                info!(count = files.len(), "listing ready");
                self.apply(|m| m.apply_listing(files))
            }
            Err(DriveError::Unauthorized { redirect }) => {
                warn!(%redirect, "unauthorized, redirecting");
                self.apply(|m| m.apply_unauthorized(redirect))
            }
            Err(e) => {
                error!(error = %e, "error fetching data from API");
                self.apply(ViewModel::apply_fetch_error)
            }
        };

        if applied {
            ActionOutcome::Applied
        } else {
            ActionOutcome::Discarded
        }
    }

    pub fn set_selected(&self, file_id: &str, checked: bool) {
        self.apply(|m| m.set_selected(file_id, checked));
    }

    pub fn select_matching(&self, pattern: &str) -> Result<usize> {
        if !self.is_mounted() {
            return Ok(0);
        }
        self.lock().select_matching(pattern)
    }

    /// Convert the selected files to Markdown and regroup from the response.
    ///
    /// Does nothing when the selection is empty.
    pub async fn convert_selected(&self) -> ActionOutcome {
        let file_ids: Vec<String> = self.lock().selection().iter().cloned().collect();
        if file_ids.is_empty() {
            return ActionOutcome::Skipped;
        }
        info!(count = file_ids.len(), "converting selection to markdown");

        let Some(result) = self.guarded(self.client.convert_to_markdown(file_ids)).await else {
            return ActionOutcome::Discarded;
        };

        let applied = match result {
            Ok(files) => self.apply(|m| m.apply_converted(files)),
            Err(e) => {
                error!(error = %e, "error updating file extensions");
                self.apply(|m| {
                    m.show_toast(CONVERT_FAILURE_MESSAGE, ToastKind::Failure, Instant::now())
                })
            }
        };

        if applied {
            ActionOutcome::Applied
        } else {
            ActionOutcome::Discarded
        }
    }

    /// Ask the backend to process one file and report the result as a toast.
    pub async fn download_file(&self, file_id: &str) -> ActionOutcome {
        let Some(result) = self.guarded(self.client.request_download(file_id)).await else {
            return ActionOutcome::Discarded;
        };

        let (message, kind) = match result {
            Ok(()) => (DOWNLOAD_SUCCESS_MESSAGE, ToastKind::Success),
            Err(e) => {
                error!(file_id, error = %e, "error processing file");
                (DOWNLOAD_FAILURE_MESSAGE, ToastKind::Failure)
            }
        };

        if self.apply(|m| m.show_toast(message, kind, Instant::now())) {
            ActionOutcome::Applied
        } else {
            ActionOutcome::Discarded
        }
    }

    pub fn dismiss_toast(&self) {
        self.apply(ViewModel::dismiss_toast);
    }

    /// Tear the view down. Later responses are dropped.
    pub fn unmount(&self) {
        self.alive.cancel();
    }

    pub fn is_mounted(&self) -> bool {
        !self.alive.is_cancelled()
    }

    pub fn state(&self) -> ViewState {
        self.lock().state().clone()
    }

    pub fn render(&self) -> Vec<GroupView> {
        self.lock().render()
    }

    pub fn grouping(&self) -> Grouping {
        self.lock().grouping().clone()
    }

    pub fn selection(&self) -> Vec<String> {
        self.lock().selection().iter().cloned().collect()
    }

    pub fn can_convert(&self) -> bool {
        self.lock().can_convert()
    }

    pub fn toast(&self) -> Option<Toast> {
        self.lock().toast_at(Instant::now()).cloned()
    }

    pub fn redirect(&self) -> Option<String> {
        self.lock().redirect().map(str::to_string)
    }

    fn lock(&self) -> MutexGuard<'_, ViewModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the model unless the view is gone.
    fn apply<F: FnOnce(&mut ViewModel)>(&self, f: F) -> bool {
        if self.alive.is_cancelled() {
            return false;
        }
        f(&mut *self.lock());
        true
    }

    /// Await `fut`, or `None` once the view is unmounted.
    async fn guarded<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.alive.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, name: &str) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            web_view_link: format!("https://drive.google.com/file/d/{}/view", id),
            web_content_link: format!("https://drive.google.com/uc?id={}&export=download", id),
        }
    }

    fn listing() -> Vec<DriveFile> {
        vec![
            file("1", "a.txt"),
            file("2", "b.md"),
            file("3", "c"),
            file("4", "d.pdf"),
            file("5", "e.txt"),
        ]
    }

    #[test]
    fn test_initial_state() {
        let model = ViewModel::new();
        assert_eq!(model.state(), &ViewState::Idle);
        assert!(model.render().is_empty());
        assert!(!model.can_convert());
        assert!(model.redirect().is_none());
    }

    #[test]
    fn test_render_filters_to_displayed_extensions() {
        let mut model = ViewModel::new();
        model.begin_loading();
        model.apply_listing(listing());

        assert_eq!(model.state(), &ViewState::Ready);
        assert!(model.grouping().contains_key("pdf"));

        let groups = model.render();
        let exts: Vec<&str> = groups.iter().map(|g| g.extension.as_str()).collect();
        assert_eq!(exts, vec!["txt", "md"]);

        let txt: Vec<&str> = groups[0].rows.iter().map(|r| r.file.name.as_str()).collect();
        assert_eq!(txt, vec!["a.txt", "e.txt"]);
        assert!(groups[0].rows.iter().all(|r| r.selectable && !r.processable));
        assert!(groups[1].rows.iter().all(|r| !r.selectable && r.processable));
    }

    #[test]
    fn test_toggle_on_then_off_restores_selection() {
        let mut model = ViewModel::new();
        model.apply_listing(listing());
        model.set_selected("5", true);
        let before = model.selection().clone();

        model.set_selected("1", true);
        model.set_selected("1", true);
        assert_eq!(model.selection().len(), 2);
        model.set_selected("1", false);
        model.set_selected("1", false);

        assert_eq!(model.selection(), &before);
    }

    #[test]
    fn test_render_marks_selected_rows() {
        let mut model = ViewModel::new();
        model.apply_listing(listing());
        model.set_selected("5", true);

        let rows = &model.render()[0].rows;
        assert!(!rows[0].selected);
        assert!(rows[1].selected);
    }

    #[test]
    fn test_regroup_prunes_stale_selection() {
        let mut model = ViewModel::new();
        model.apply_listing(listing());
        model.set_selected("1", true);
        model.set_selected("5", true);
        model.set_selected("gone", true);

        model.apply_converted(vec![file("1", "a.md"), file("5", "e.txt")]);

        assert_eq!(model.selection().iter().collect::<Vec<_>>(), vec!["5"]);
    }

    #[test]
    fn test_select_matching() {
        let mut model = ViewModel::new();
        model.apply_listing(listing());
        model.set_selected("1", true);

        assert_eq!(model.select_matching("*.txt").unwrap(), 1);
        assert_eq!(model.select_matching("b.*").unwrap(), 0);
        assert_eq!(model.selection().len(), 2);
        assert!(model.select_matching("[").is_err());
    }

    #[test]
    fn test_unauthorized_sets_error_and_redirect() {
        let mut model = ViewModel::new();
        model.begin_loading();
        model.apply_unauthorized("http://api/auth/google".to_string());

        assert_eq!(
            model.state(),
            &ViewState::Error(UNAUTHORIZED_MESSAGE.to_string())
        );
        assert_eq!(model.redirect(), Some("http://api/auth/google"));
        assert!(model.render().is_empty());
    }

    #[test]
    fn test_toast_auto_dismisses() {
        let mut model = ViewModel::new();
        let now = Instant::now();
        model.show_toast(DOWNLOAD_SUCCESS_MESSAGE, ToastKind::Success, now);

        let toast = model.toast_at(now + Duration::from_millis(1999)).unwrap();
        assert_eq!(toast.message, DOWNLOAD_SUCCESS_MESSAGE);
        assert!(model.toast_at(now + TOAST_DURATION).is_none());
    }

    #[test]
    fn test_toast_explicit_dismiss() {
        let mut model = ViewModel::new();
        let now = Instant::now();
        model.show_toast(DOWNLOAD_FAILURE_MESSAGE, ToastKind::Failure, now);
        model.dismiss_toast();
        assert!(model.toast_at(now).is_none());
    }

    #[test]
    fn test_converted_during_fetch_stays_loading() {
        let mut model = ViewModel::new();
        model.begin_loading();
        model.apply_converted(vec![file("1", "a.md")]);

        assert_eq!(model.state(), &ViewState::Loading);
        assert!(model.grouping().contains_key("md"));

        model.apply_listing(listing());
        assert_eq!(model.state(), &ViewState::Ready);
        assert!(model.grouping().contains_key("txt"));
    }
}
