use tracing::{info, warn};

use crate::data::{
    FetchError, FetchPayload, FetchRequest, LayoutPayload, merge_links, selection_links,
};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn request_text_search(&mut self) {
        self.results_fetch.request(FetchRequest::Text {
            query: self.search.clone(),
            limit: self.max_results,
        });
    }

    pub(in crate::app) fn request_selection_search(&mut self) {
        let snapshot = self.selection.snapshot();
        self.results_fetch.request(FetchRequest::BySelection {
            current: snapshot.current,
            negative: snapshot.negative,
            limit: self.max_results,
        });
    }

    fn request_layout(&mut self) {
        self.layout_fetch.request(FetchRequest::Layout {
            ids: self.results.clone(),
        });
    }

    pub(in crate::app) fn is_fetching(&self) -> bool {
        self.results_fetch.is_pending() || self.layout_fetch.is_pending()
    }

    /// Applies whatever the fetch workers have answered since the last frame.
    pub(in crate::app) fn poll_fetches(&mut self) {
        if self.stopped {
            return;
        }

        match self.results_fetch.poll() {
            Some(Ok(FetchPayload::Results(ids))) => {
                info!(results = ids.len(), "results received");
                self.results = ids;
                self.request_layout();
            }
            Some(Ok(FetchPayload::Layout(_))) => {
                warn!("results fetch answered with a layout payload");
            }
            Some(Err(error)) => self.report_fetch_error("search", &error),
            None => {}
        }

        match self.layout_fetch.poll() {
            Some(Ok(FetchPayload::Layout(payload))) => self.apply_layout(payload),
            Some(Ok(FetchPayload::Results(_))) => {
                warn!("layout fetch answered with a results payload");
            }
            Some(Err(error)) => self.report_fetch_error("distance", &error),
            None => {}
        }
    }

    fn apply_layout(&mut self, payload: LayoutPayload) {
        let mut links = payload.links;
        links.extend(self.session_links.iter().cloned());
        match self.engine.set_items(&payload.ids, payload.matrix, &links) {
            Ok(diff) => {
                self.dragging = None;
                if !diff.is_noop() {
                    info!(
                        created = diff.created.len(),
                        retained = diff.retained.len(),
                        removed = diff.removed.len(),
                        "embedding view updated"
                    );
                }
            }
            Err(error) => {
                warn!("rejected layout input: {error}");
                self.notice = Some(format!("Could not lay out the results: {error}"));
            }
        }
    }

    /// Records links between the selected items: the chosen kind among
    /// current picks, negative from current to negative picks.
    pub(in crate::app) fn link_selection(&mut self) {
        let snapshot = self.selection.snapshot();
        let derived = selection_links(&snapshot.current, &snapshot.negative, self.link_kind);
        let offered = derived.len();

        let before = self.session_links.len();
        let added = merge_links(&mut self.session_links, derived);
        let shown = self.engine.add_links(&self.session_links[before..]);
        info!(offered, added, shown, "links derived from selection");
        self.notice = Some(format!(
            "Added {added} link(s) from the selection, {shown} shown in the current layout."
        ));
    }

    fn report_fetch_error(&mut self, what: &str, error: &FetchError) {
        warn!("{what} request failed: {error}");
        self.notice = Some(format!("The {what} request failed: {error}"));
    }
}
