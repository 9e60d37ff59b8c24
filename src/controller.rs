//! The stream controller: a state machine reconciling the push-based
//! live channel with pull-based history paging.
//!
//! One controller instance owns the line buffer, the pause buffer and
//! every mode/flag field for the active log source. Mode transitions are
//! the only legal mutator of that state; the render scheduler and the
//! filter only ever read. Controller methods are synchronous: they
//! return [`Action`]s for the event loop to perform, and async results
//! are fed back in through [`StreamController::on_history`] and
//! [`StreamController::on_live_event`].

use crate::buffer::LineBuffer;
use crate::config::Config;
use crate::filter::LineFilter;
use crate::live::LiveEvent;
use crate::protocol::{Direction, HistoryRequest, HistoryResponse};
use crate::render::RenderScheduler;
use crate::surface::Row;

/// Viewing mode. Owned exclusively by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Tailing the live channel; new lines append as they arrive.
    Live,
    /// Live channel still attached, but new lines divert to the pause
    /// buffer until resume.
    Paused,
    /// Paging through history; no live subscription exists.
    Historical,
}

/// Live-channel health, for the header badge only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Live,
    Offline,
}

/// File facts supplied once per connection. `total_lines` is revised
/// upward as live lines arrive, never downward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileMetadata {
    pub total_lines: u64,
    pub size_bytes: u64,
    pub size_human: String,
}

/// Identifies one outstanding history fetch. A response is applied only
/// if its ticket still matches the controller's in-flight slot exactly;
/// anything else is stale and silently discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub direction: Direction,
    /// Seed fetches reset the buffer when applied (clear-then-fill).
    pub seed: bool,
}

/// Work the event loop must perform after a controller call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Spawn this history query; deliver the result with the ticket.
    Fetch(FetchTicket, HistoryRequest),
    /// Tear down the live subscription.
    CloseLive,
    /// (Re)open the live subscription.
    OpenLive,
}

/// Scroll-position facts the presentation surface reports after the
/// user moves.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScrollTelemetry {
    /// The first rendered row is visible.
    pub at_top_edge: bool,
    /// The last rendered row is visible.
    pub at_bottom_edge: bool,
    /// Within the sticky zone at the very bottom.
    pub at_live_edge: bool,
}

pub struct StreamController {
    mode: Mode,
    buffer: LineBuffer,
    /// Lines accumulated while paused, flushed as one batch on resume.
    pending: Vec<String>,
    metadata: Option<FileMetadata>,
    filter: Option<LineFilter>,
    sticky_bottom: bool,
    is_at_top: bool,
    /// Bumped on source switch and on every transition away from
    /// Historical; makes tickets from a previous life unmatchable.
    generation: u64,
    in_flight: Option<FetchTicket>,
    link: LinkStatus,
    page_size: u64,
}

impl StreamController {
    pub fn new(config: &Config) -> Self {
        Self {
            mode: Mode::Live,
            buffer: LineBuffer::new(config.max_lines),
            pending: Vec::new(),
            metadata: None,
            filter: None,
            sticky_bottom: true,
            is_at_top: false,
            generation: 0,
            in_flight: None,
            link: LinkStatus::Connecting,
            page_size: config.page_size,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn link(&self) -> LinkStatus {
        self.link
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    pub fn filter(&self) -> Option<&LineFilter> {
        self.filter.as_ref()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_at_top(&self) -> bool {
        self.is_at_top
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Full reset for a new log source. Yields an empty buffer and zero
    /// bounds before any data from the new source is applied.
    pub fn switch_source(&mut self, scheduler: &mut RenderScheduler) -> Vec<Action> {
        self.generation += 1;
        self.in_flight = None;
        self.mode = Mode::Live;
        self.buffer.reset();
        self.pending.clear();
        self.metadata = None;
        self.is_at_top = false;
        self.sticky_bottom = true;
        self.link = LinkStatus::Connecting;
        scheduler.clear();
        scheduler.set_visible(true);
        vec![Action::CloseLive, Action::OpenLive]
    }

    /// Feed one event from the live channel.
    pub fn on_live_event(&mut self, event: LiveEvent, scheduler: &mut RenderScheduler) {
        match event {
            LiveEvent::Metadata(md) => {
                // The server replays the last page after metadata; number
                // the replay so it ends exactly at total_lines.
                let origin = replay_origin(md.total_lines, self.page_size);
                self.buffer.reset_at(origin);
                self.is_at_top = origin <= 1;
                self.metadata = Some(md);
                self.link = LinkStatus::Live;
                scheduler.rebuild(&self.buffer, self.filter.as_ref(), self.sticky_bottom);
            }
            LiveEvent::LiveStart => {
                scheduler.append(vec![Row::Divider], self.sticky_bottom);
            }
            LiveEvent::System(msg) => {
                scheduler.append(vec![Row::System(msg)], self.sticky_bottom);
            }
            LiveEvent::Line(text) => self.ingest(vec![text], scheduler),
            LiveEvent::Batch(lines) => self.ingest(lines, scheduler),
            LiveEvent::Closed(reason) => {
                if self.mode != Mode::Historical {
                    tracing::warn!(reason = reason.as_deref(), "live channel closed");
                    self.link = LinkStatus::Offline;
                }
            }
        }
    }

    fn ingest(&mut self, lines: Vec<String>, scheduler: &mut RenderScheduler) {
        if lines.is_empty() {
            return;
        }
        match self.mode {
            Mode::Paused => {
                self.pending.extend(lines);
            }
            Mode::Historical => {
                // Raced in before the teardown finished
                tracing::debug!(count = lines.len(), "dropping live lines in historical mode");
            }
            Mode::Live => {
                self.buffer.append(&lines);
                let end = self.buffer.end_line();
                if let Some(md) = &mut self.metadata {
                    if end > md.total_lines {
                        md.total_lines = end;
                    }
                }
                let first = end + 1 - lines.len() as u64;
                let rows = self.filtered_rows(first, &lines);
                scheduler.append(rows, self.sticky_bottom);
            }
        }
    }

    /// Divert live lines into the pause buffer.
    pub fn pause(&mut self) {
        if self.mode == Mode::Live {
            self.mode = Mode::Paused;
        }
    }

    /// Flush the pause buffer into the line buffer as one batch, in
    /// arrival order, and resume tailing.
    pub fn resume(&mut self, scheduler: &mut RenderScheduler) {
        if self.mode != Mode::Paused {
            return;
        }
        self.mode = Mode::Live;
        if !self.pending.is_empty() {
            let flushed = std::mem::take(&mut self.pending);
            self.ingest(flushed, scheduler);
        }
    }

    pub fn toggle_pause(&mut self, scheduler: &mut RenderScheduler) {
        match self.mode {
            Mode::Live => self.pause(),
            Mode::Paused => self.resume(scheduler),
            Mode::Historical => {}
        }
    }

    /// Jump to the first page of the file.
    pub fn jump_to_top(&mut self) -> Vec<Action> {
        if self.is_at_top && self.buffer.start_line() <= 1 {
            // Whole top is already in memory; scrolling there is the
            // surface's business.
            return Vec::new();
        }
        match self.mode {
            Mode::Historical => {
                if self.in_flight.is_some() {
                    return Vec::new();
                }
                vec![self.start_fetch(HistoryRequest::top(self.page_size), true)]
            }
            Mode::Live | Mode::Paused => {
                self.enter_historical();
                let fetch = self.start_fetch(HistoryRequest::top(self.page_size), true);
                vec![Action::CloseLive, fetch]
            }
        }
    }

    /// Return to tailing the newest lines.
    pub fn jump_to_bottom(&mut self, scheduler: &mut RenderScheduler) -> Vec<Action> {
        match self.mode {
            Mode::Historical => self.to_live(scheduler),
            Mode::Paused => {
                self.resume(scheduler);
                self.sticky_bottom = true;
                Vec::new()
            }
            Mode::Live => {
                self.sticky_bottom = true;
                Vec::new()
            }
        }
    }

    /// Digest scroll telemetry: maintain stickiness and trigger paging
    /// when the user reaches a loaded edge.
    pub fn on_scroll(
        &mut self,
        telemetry: ScrollTelemetry,
        scheduler: &mut RenderScheduler,
    ) -> Vec<Action> {
        self.sticky_bottom = self.mode == Mode::Live && telemetry.at_live_edge;
        if telemetry.at_top_edge {
            self.request_older()
        } else if telemetry.at_bottom_edge {
            self.request_newer(scheduler)
        } else {
            Vec::new()
        }
    }

    fn request_older(&mut self) -> Vec<Action> {
        if self.is_at_top || self.in_flight.is_some() || self.buffer.is_empty() {
            return Vec::new();
        }
        let before = self.buffer.start_line();
        if before <= 1 {
            self.is_at_top = true;
            return Vec::new();
        }
        match self.mode {
            Mode::Live | Mode::Paused => {
                self.enter_historical();
                let fetch = self.start_fetch(HistoryRequest::up(before, self.page_size), true);
                vec![Action::CloseLive, fetch]
            }
            Mode::Historical => {
                vec![self.start_fetch(HistoryRequest::up(before, self.page_size), false)]
            }
        }
    }

    fn request_newer(&mut self, scheduler: &mut RenderScheduler) -> Vec<Action> {
        if self.in_flight.is_some() || self.buffer.is_empty() {
            return Vec::new();
        }
        match self.mode {
            Mode::Historical => {
                if let Some(md) = &self.metadata {
                    if self.buffer.end_line() >= md.total_lines {
                        // Already holding the known end of file
                        return self.to_live(scheduler);
                    }
                }
                let after = self.buffer.end_line();
                vec![self.start_fetch(HistoryRequest::down(after, self.page_size), false)]
            }
            Mode::Paused => {
                // The window is frozen; only page forward if the file
                // actually grew while paused.
                if self.pending.is_empty() {
                    return Vec::new();
                }
                let after = self.buffer.end_line();
                self.enter_historical();
                let fetch = self.start_fetch(HistoryRequest::down(after, self.page_size), true);
                vec![Action::CloseLive, fetch]
            }
            // The bottom edge is the live edge
            Mode::Live => Vec::new(),
        }
    }

    /// Apply (or discard) the result of a history fetch.
    pub fn on_history(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<HistoryResponse>,
        scheduler: &mut RenderScheduler,
    ) -> Vec<Action> {
        if self.in_flight != Some(ticket) {
            tracing::debug!("discarding stale history response");
            return Vec::new();
        }
        self.in_flight = None;
        if self.mode != Mode::Historical {
            tracing::debug!("discarding history response outside historical mode");
            return Vec::new();
        }
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "history fetch failed");
                return Vec::new();
            }
        };
        if let Some(err) = &resp.error {
            tracing::warn!(error = %err, "history endpoint returned an error");
            return Vec::new();
        }

        if resp.is_boundary() {
            return match ticket.direction {
                Direction::Top | Direction::Up => {
                    self.is_at_top = true;
                    Vec::new()
                }
                // Nothing newer: we were already at the end of file
                Direction::Down => self.to_live(scheduler),
            };
        }

        if ticket.seed {
            self.buffer.reset_at(resp.start_line.max(1));
            self.buffer.append(&resp.lines);
            self.is_at_top = match ticket.direction {
                Direction::Top => true,
                Direction::Up => !resp.has_more || resp.start_line <= 1,
                Direction::Down => resp.start_line <= 1,
            };
            scheduler.rebuild(&self.buffer, self.filter.as_ref(), false);
            if ticket.direction == Direction::Down && !resp.has_more {
                return self.to_live(scheduler);
            }
            return Vec::new();
        }

        match ticket.direction {
            Direction::Top | Direction::Up => {
                if self.buffer.is_empty() || resp.end_line + 1 != self.buffer.start_line() {
                    tracing::warn!(
                        got = resp.end_line,
                        want = self.buffer.start_line(),
                        "discarding non-contiguous upward page"
                    );
                    return Vec::new();
                }
                self.buffer.prepend(&resp.lines);
                self.is_at_top = !resp.has_more || resp.start_line <= 1;
                let rows = self.filtered_rows(resp.start_line, &resp.lines);
                scheduler.prepend(rows);
                Vec::new()
            }
            Direction::Down => {
                if self.buffer.is_empty() || resp.start_line != self.buffer.end_line() + 1 {
                    tracing::warn!(
                        got = resp.start_line,
                        want = self.buffer.end_line() + 1,
                        "discarding non-contiguous downward page"
                    );
                    return Vec::new();
                }
                self.buffer.append(&resp.lines);
                let rows = self.filtered_rows(resp.start_line, &resp.lines);
                scheduler.append(rows, false);
                if !resp.has_more {
                    // Reached the true end of file while paging forward
                    return self.to_live(scheduler);
                }
                Vec::new()
            }
        }
    }

    /// Apply a new filter term and re-derive the view from the buffer.
    pub fn set_filter(&mut self, term: &str, scheduler: &mut RenderScheduler) {
        let next = LineFilter::new(term);
        if next == self.filter {
            return;
        }
        self.filter = next;
        scheduler.rebuild(&self.buffer, self.filter.as_ref(), self.sticky_bottom);
    }

    fn enter_historical(&mut self) {
        self.mode = Mode::Historical;
        self.pending.clear();
        self.sticky_bottom = false;
    }

    fn to_live(&mut self, scheduler: &mut RenderScheduler) -> Vec<Action> {
        self.generation += 1;
        self.in_flight = None;
        self.mode = Mode::Live;
        self.buffer.reset();
        self.pending.clear();
        self.metadata = None;
        self.is_at_top = false;
        self.sticky_bottom = true;
        self.link = LinkStatus::Connecting;
        scheduler.clear();
        vec![Action::OpenLive]
    }

    fn start_fetch(&mut self, req: HistoryRequest, seed: bool) -> Action {
        let ticket = FetchTicket {
            generation: self.generation,
            direction: req.direction,
            seed,
        };
        self.in_flight = Some(ticket);
        Action::Fetch(ticket, req)
    }

    fn filtered_rows(&self, first: u64, lines: &[String]) -> Vec<Row> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| self.filter.as_ref().map_or(true, |f| f.matches(line)))
            .map(|(i, line)| Row::log(first + i as u64, line.clone()))
            .collect()
    }
}

/// Absolute number of the first line of the connect replay: the server
/// replays the last `page_size` lines, ending at `total_lines`.
fn replay_origin(total_lines: u64, page_size: u64) -> u64 {
    total_lines - total_lines.min(page_size) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    fn setup() -> (StreamController, RenderScheduler, RecordingSurface) {
        let config = Config::default();
        let controller = StreamController::new(&config);
        let scheduler = RenderScheduler::new(config.chunk_size, config.chunk_threshold);
        (controller, scheduler, RecordingSurface::new())
    }

    fn drain(scheduler: &mut RenderScheduler, surface: &mut RecordingSurface) {
        while scheduler.has_work() {
            scheduler.step(surface);
        }
    }

    fn metadata(total_lines: u64) -> LiveEvent {
        LiveEvent::Metadata(FileMetadata {
            total_lines,
            size_bytes: total_lines * 80,
            size_human: "a while".to_string(),
        })
    }

    fn batch(range: std::ops::RangeInclusive<u64>) -> LiveEvent {
        LiveEvent::Batch(range.map(|n| format!("line {}", n)).collect())
    }

    /// Connect and run the server's replay of the last page.
    fn connect(
        controller: &mut StreamController,
        scheduler: &mut RenderScheduler,
        total_lines: u64,
    ) {
        controller.switch_source(scheduler);
        controller.on_live_event(metadata(total_lines), scheduler);
        let first = total_lines - total_lines.min(500) + 1;
        controller.on_live_event(batch(first..=total_lines), scheduler);
        controller.on_live_event(LiveEvent::LiveStart, scheduler);
    }

    fn scroll_top() -> ScrollTelemetry {
        ScrollTelemetry {
            at_top_edge: true,
            ..ScrollTelemetry::default()
        }
    }

    fn scroll_bottom() -> ScrollTelemetry {
        ScrollTelemetry {
            at_bottom_edge: true,
            at_live_edge: true,
            ..ScrollTelemetry::default()
        }
    }

    fn fetch_action(actions: &[Action]) -> (FetchTicket, HistoryRequest) {
        actions
            .iter()
            .find_map(|a| match a {
                Action::Fetch(ticket, req) => Some((*ticket, req.clone())),
                _ => None,
            })
            .expect("expected a fetch action")
    }

    fn page(range: std::ops::RangeInclusive<u64>, has_more: bool) -> HistoryResponse {
        HistoryResponse {
            lines: range.clone().map(|n| format!("line {}", n)).collect(),
            start_line: *range.start(),
            end_line: *range.end(),
            has_more,
            error: None,
        }
    }

    #[test]
    fn test_initial_window_is_last_page() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 10_000);
        assert_eq!(controller.buffer().start_line(), 9_501);
        assert_eq!(controller.buffer().end_line(), 10_000);
        assert_eq!(controller.mode(), Mode::Live);
    }

    #[test]
    fn test_small_file_connects_at_top() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 300);
        assert_eq!(controller.buffer().start_line(), 1);
        assert_eq!(controller.buffer().end_line(), 300);
        assert!(controller.is_at_top());
    }

    #[test]
    fn test_live_growth_revises_total_upward() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 1_000);
        controller.on_live_event(LiveEvent::Line("WARN disk low".to_string()), &mut scheduler);
        assert_eq!(controller.buffer().end_line(), 1_001);
        assert_eq!(controller.metadata().unwrap().total_lines, 1_001);
    }

    #[test]
    fn test_pause_diverts_and_resume_flushes_in_order() {
        let (mut controller, mut scheduler, mut surface) = setup();
        connect(&mut controller, &mut scheduler, 1_000);
        drain(&mut scheduler, &mut surface);

        controller.pause();
        for i in 0..5 {
            controller.on_live_event(LiveEvent::Line(format!("pending {}", i)), &mut scheduler);
        }
        assert_eq!(controller.pending_count(), 5);
        assert_eq!(controller.buffer().end_line(), 1_000);

        controller.resume(&mut scheduler);
        drain(&mut scheduler, &mut surface);
        assert_eq!(controller.pending_count(), 0);
        assert_eq!(controller.buffer().end_line(), 1_005);
        let tail: Vec<&str> = surface.log_texts().into_iter().rev().take(5).collect();
        assert_eq!(
            tail,
            vec!["pending 4", "pending 3", "pending 2", "pending 1", "pending 0"]
        );
    }

    #[test]
    fn test_scroll_to_top_enters_historical_with_exact_query() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 1_000);
        controller.on_live_event(LiveEvent::Line("WARN disk low".to_string()), &mut scheduler);
        assert_eq!(controller.buffer().end_line(), 1_001);

        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        assert!(actions.contains(&Action::CloseLive));
        let (ticket, req) = fetch_action(&actions);
        assert_eq!(req, HistoryRequest::up(501, 500));
        assert_eq!(controller.mode(), Mode::Historical);
        assert!(controller.is_loading());

        let next = controller.on_history(ticket, Ok(page(1..=500, false)), &mut scheduler);
        assert!(next.is_empty());
        assert!(controller.is_at_top());
        assert_eq!(controller.buffer().start_line(), 1);

        // Boundary reached: the next scroll-to-top issues nothing
        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_historical_pages_upward_contiguously() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 5_000);

        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        let (ticket, _) = fetch_action(&actions);
        controller.on_history(ticket, Ok(page(4_001..=4_500, true)), &mut scheduler);
        assert_eq!(controller.buffer().start_line(), 4_001);
        assert!(!controller.is_at_top());

        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        let (ticket, req) = fetch_action(&actions);
        assert_eq!(req, HistoryRequest::up(4_001, 500));
        controller.on_history(ticket, Ok(page(3_501..=4_000, true)), &mut scheduler);
        assert_eq!(controller.buffer().start_line(), 3_501);
        assert_eq!(controller.buffer().end_line(), 4_500);
    }

    #[test]
    fn test_in_flight_fetch_blocks_new_requests() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 5_000);

        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        assert_eq!(fetch_action(&actions).1.direction, Direction::Up);

        // Same direction and the opposite one are both blocked
        assert!(controller.on_scroll(scroll_top(), &mut scheduler).is_empty());
        let bottom = ScrollTelemetry {
            at_bottom_edge: true,
            ..ScrollTelemetry::default()
        };
        assert!(controller.on_scroll(bottom, &mut scheduler).is_empty());
    }

    #[test]
    fn test_jump_to_top_seeds_first_page() {
        let (mut controller, mut scheduler, mut surface) = setup();
        connect(&mut controller, &mut scheduler, 10_000);
        drain(&mut scheduler, &mut surface);

        let actions = controller.jump_to_top();
        assert!(actions.contains(&Action::CloseLive));
        let (ticket, req) = fetch_action(&actions);
        assert_eq!(req, HistoryRequest::top(500));

        controller.on_history(ticket, Ok(page(1..=500, true)), &mut scheduler);
        drain(&mut scheduler, &mut surface);
        assert_eq!(controller.buffer().start_line(), 1);
        assert_eq!(controller.buffer().end_line(), 500);
        assert!(controller.is_at_top());
        assert_eq!(surface.log_texts().first(), Some(&"line 1"));
    }

    #[test]
    fn test_forward_paging_to_end_returns_to_live() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 2_000);

        let actions = controller.jump_to_top();
        let (ticket, _) = fetch_action(&actions);
        controller.on_history(ticket, Ok(page(1..=500, true)), &mut scheduler);

        let actions = controller.on_scroll(scroll_bottom(), &mut scheduler);
        let (ticket, req) = fetch_action(&actions);
        assert_eq!(req, HistoryRequest::down(500, 500));
        controller.on_history(ticket, Ok(page(501..=1_000, true)), &mut scheduler);
        assert_eq!(controller.buffer().end_line(), 1_000);

        // Last page of the file: controller flips back to tailing
        let actions = controller.on_scroll(scroll_bottom(), &mut scheduler);
        let (ticket, _) = fetch_action(&actions);
        let actions = controller.on_history(ticket, Ok(page(1_001..=2_000, false)), &mut scheduler);
        assert_eq!(actions, vec![Action::OpenLive]);
        assert_eq!(controller.mode(), Mode::Live);
        assert!(controller.buffer().is_empty());
    }

    #[test]
    fn test_switch_source_resets_everything() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 1_000);
        controller.pause();
        controller.on_live_event(LiveEvent::Line("x".to_string()), &mut scheduler);

        let actions = controller.switch_source(&mut scheduler);
        assert_eq!(actions, vec![Action::CloseLive, Action::OpenLive]);
        assert!(controller.buffer().is_empty());
        assert_eq!(controller.buffer().start_line(), 0);
        assert_eq!(controller.buffer().end_line(), 0);
        assert_eq!(controller.pending_count(), 0);
        assert_eq!(controller.mode(), Mode::Live);
        assert!(controller.metadata().is_none());
    }

    #[test]
    fn test_stale_response_after_source_switch_is_discarded() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 5_000);
        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        let (ticket, _) = fetch_action(&actions);

        controller.switch_source(&mut scheduler);
        connect_after_switch(&mut controller, &mut scheduler);

        let before = (
            controller.buffer().start_line(),
            controller.buffer().end_line(),
        );
        controller.on_history(ticket, Ok(page(4_001..=4_500, true)), &mut scheduler);
        let after = (
            controller.buffer().start_line(),
            controller.buffer().end_line(),
        );
        assert_eq!(before, after);
        assert_eq!(controller.mode(), Mode::Live);
    }

    fn connect_after_switch(controller: &mut StreamController, scheduler: &mut RenderScheduler) {
        controller.on_live_event(metadata(9_000), scheduler);
        controller.on_live_event(batch(8_501..=9_000), scheduler);
    }

    #[test]
    fn test_stale_response_after_jump_to_bottom_is_discarded() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 5_000);
        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        let (ticket, _) = fetch_action(&actions);

        let actions = controller.jump_to_bottom(&mut scheduler);
        assert_eq!(actions, vec![Action::OpenLive]);
        connect_after_switch(&mut controller, &mut scheduler);

        controller.on_history(ticket, Ok(page(4_001..=4_500, true)), &mut scheduler);
        assert_eq!(controller.buffer().start_line(), 8_501);
        assert_eq!(controller.buffer().end_line(), 9_000);
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_transport_error_clears_in_flight_and_keeps_mode() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 5_000);
        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        let (ticket, _) = fetch_action(&actions);

        let before = controller.buffer().len();
        let result = controller.on_history(
            ticket,
            Err(anyhow::anyhow!("connection refused")),
            &mut scheduler,
        );
        assert!(result.is_empty());
        assert_eq!(controller.mode(), Mode::Historical);
        assert!(!controller.is_loading());
        assert_eq!(controller.buffer().len(), before);

        // Cleared flag allows a retry
        let actions = controller.on_scroll(scroll_top(), &mut scheduler);
        assert!(!actions.is_empty());
    }

    #[test]
    fn test_filter_round_trip_restores_unfiltered_view() {
        let (mut controller, mut scheduler, mut surface) = setup();
        controller.switch_source(&mut scheduler);
        controller.on_live_event(metadata(4), &mut scheduler);
        controller.on_live_event(
            LiveEvent::Batch(vec![
                "INFO starting".to_string(),
                "ERROR disk full".to_string(),
                "INFO retrying".to_string(),
                "error again".to_string(),
            ]),
            &mut scheduler,
        );
        drain(&mut scheduler, &mut surface);
        let unfiltered = surface.rows.clone();

        controller.set_filter("ERROR", &mut scheduler);
        drain(&mut scheduler, &mut surface);
        assert_eq!(surface.log_texts(), vec!["ERROR disk full", "error again"]);

        controller.set_filter("", &mut scheduler);
        drain(&mut scheduler, &mut surface);
        assert_eq!(surface.rows, unfiltered);
    }

    #[test]
    fn test_filter_applies_to_new_live_lines() {
        let (mut controller, mut scheduler, mut surface) = setup();
        connect(&mut controller, &mut scheduler, 1_000);
        controller.set_filter("ERROR", &mut scheduler);
        drain(&mut scheduler, &mut surface);

        controller.on_live_event(LiveEvent::Line("INFO quiet".to_string()), &mut scheduler);
        controller.on_live_event(LiveEvent::Line("ERROR loud".to_string()), &mut scheduler);
        drain(&mut scheduler, &mut surface);

        assert_eq!(surface.log_texts(), vec!["ERROR loud"]);
        // The buffer still holds both; only the view is filtered
        assert_eq!(controller.buffer().end_line(), 1_002);
    }

    #[test]
    fn test_paused_bottom_edge_pages_forward_when_grown() {
        let (mut controller, mut scheduler, _surface) = setup();
        connect(&mut controller, &mut scheduler, 1_000);
        controller.pause();

        // Nothing arrived: no reason to leave the frozen window
        let idle = ScrollTelemetry {
            at_bottom_edge: true,
            ..ScrollTelemetry::default()
        };
        assert!(controller.on_scroll(idle, &mut scheduler).is_empty());

        controller.on_live_event(LiveEvent::Line("grew".to_string()), &mut scheduler);
        let actions = controller.on_scroll(idle, &mut scheduler);
        assert!(actions.contains(&Action::CloseLive));
        let (ticket, req) = fetch_action(&actions);
        assert_eq!(req, HistoryRequest::down(1_000, 500));
        assert_eq!(controller.mode(), Mode::Historical);
        assert!(ticket.seed);
    }
}
