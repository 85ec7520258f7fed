// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Searchable, paginated list picker state.
//!
//! The selector owns no I/O. It emits [`FetchRequest`]s and is fed the
//! matching [`FetchResponse`]s by whoever runs it, so the same state machine
//! works against the REST client, a worker thread, or an in-memory catalog.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{ListItem, RequestId};

/// A page shorter than this ends pagination.
pub const PAGE_SIZE_THRESHOLD: usize = 20;
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
/// Distance from the bottom of the list (in rows) that triggers the next page.
pub const LOAD_MORE_THRESHOLD: usize = 10;
pub const DEFAULT_RESPONSIVE_BREAKPOINT: u16 = 100;
const DEFAULT_COLUMN_WIDTH: u16 = 12;
const NARROW_COLUMN_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub title: String,
    pub search_placeholder: String,
    pub display_field_keys: Vec<String>,
    pub header_names: Vec<String>,
    pub column_widths: Vec<u16>,
    pub search_fields: Vec<String>,
    pub responsive_breakpoint: u16,
}

impl SelectorConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            search_placeholder: String::from("search"),
            display_field_keys: Vec::new(),
            header_names: Vec::new(),
            column_widths: Vec::new(),
            search_fields: Vec::new(),
            responsive_breakpoint: DEFAULT_RESPONSIVE_BREAKPOINT,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.search_placeholder = placeholder.into();
        self
    }

    pub fn column(mut self, key: impl Into<String>, header: impl Into<String>, width: u16) -> Self {
        self.display_field_keys.push(key.into());
        self.header_names.push(header.into());
        self.column_widths.push(width);
        self
    }

    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn breakpoint(mut self, columns: u16) -> Self {
        self.responsive_breakpoint = columns;
        self
    }

    /// Columns to render at `available_width`; narrow layouts keep the first two.
    pub fn visible_columns(&self, available_width: u16) -> Vec<SelectorColumn<'_>> {
        let limit = if available_width < self.responsive_breakpoint {
            NARROW_COLUMN_COUNT
        } else {
            self.display_field_keys.len()
        };

        self.display_field_keys
            .iter()
            .enumerate()
            .take(limit)
            .map(|(index, key)| SelectorColumn {
                key,
                header: self
                    .header_names
                    .get(index)
                    .map(String::as_str)
                    .unwrap_or(key),
                width: self
                    .column_widths
                    .get(index)
                    .copied()
                    .unwrap_or(DEFAULT_COLUMN_WIDTH),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorColumn<'a> {
    pub key: &'a str,
    pub header: &'a str,
    pub width: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Reset,
    More,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: RequestId,
    pub page: u32,
    pub search: String,
    pub kind: FetchKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub request_id: RequestId,
    pub result: Result<Vec<ListItem>, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKey {
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
    Backspace,
    Char { ch: char, modified: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorFocus {
    #[default]
    Search,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorEvent {
    FetchRequested(FetchRequest),
    Selected(ListItem),
    SearchCleared,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingFetch {
    id: RequestId,
    page: u32,
    search: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorState {
    config: SelectorConfig,
    open: bool,
    focus: SelectorFocus,
    search_text: String,
    applied_search: String,
    raw_items: Vec<ListItem>,
    items: Vec<ListItem>,
    page: u32,
    loading_initial: bool,
    loading_more: bool,
    has_more: bool,
    highlighted: Option<usize>,
    search_deadline: Option<Instant>,
    last_request: RequestId,
    pending_reset: Option<PendingFetch>,
    pending_more: Option<PendingFetch>,
}

impl SelectorState {
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            open: false,
            focus: SelectorFocus::Search,
            search_text: String::new(),
            applied_search: String::new(),
            raw_items: Vec::new(),
            items: Vec::new(),
            page: 1,
            loading_initial: false,
            loading_more: false,
            has_more: true,
            highlighted: None,
            search_deadline: None,
            last_request: RequestId::new(0),
            pending_reset: None,
            pending_more: None,
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn focus(&self) -> SelectorFocus {
        self.focus
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Ranked rows as displayed.
    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    /// Rows in the order the server returned them.
    pub fn raw_items(&self) -> &[ListItem] {
        &self.raw_items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_initial(&self) -> bool {
        self.loading_initial
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn search_pending(&self) -> bool {
        self.search_deadline.is_some()
    }

    /// Opens the overlay and requests the first page. Re-opening an open
    /// selector does nothing.
    pub fn open(&mut self, initial_search: &str) -> Vec<SelectorEvent> {
        if self.open {
            return Vec::new();
        }

        self.discard_session();
        self.open = true;
        self.search_text = initial_search.to_owned();
        vec![SelectorEvent::FetchRequested(self.issue_reset())]
    }

    pub fn close(&mut self) -> Vec<SelectorEvent> {
        if !self.open {
            return Vec::new();
        }
        self.discard_session();
        vec![SelectorEvent::Closed]
    }

    pub fn handle_key(&mut self, key: SelectorKey, now: Instant) -> Vec<SelectorEvent> {
        if !self.open {
            return Vec::new();
        }

        match key {
            SelectorKey::ArrowDown => {
                self.focus = SelectorFocus::List;
                self.move_highlight(1);
                Vec::new()
            }
            SelectorKey::ArrowUp => {
                self.focus = SelectorFocus::List;
                self.move_highlight(-1);
                Vec::new()
            }
            SelectorKey::Enter => match self.highlighted {
                Some(index) => self.select(index),
                None => Vec::new(),
            },
            SelectorKey::Escape => self.close(),
            SelectorKey::Backspace => {
                self.focus = SelectorFocus::Search;
                if self.search_text.pop().is_some() {
                    self.search_deadline = Some(now + SEARCH_DEBOUNCE);
                }
                Vec::new()
            }
            SelectorKey::Char { ch, modified } => {
                if modified || ch.is_control() {
                    return Vec::new();
                }
                self.focus = SelectorFocus::Search;
                self.search_text.push(ch);
                self.search_deadline = Some(now + SEARCH_DEBOUNCE);
                Vec::new()
            }
        }
    }

    /// Confirms the row under the pointer.
    pub fn click(&mut self, index: usize) -> Vec<SelectorEvent> {
        if !self.open || index >= self.items.len() {
            return Vec::new();
        }
        self.select(index)
    }

    /// Fires the debounced search once typing has paused long enough.
    pub fn poll(&mut self, now: Instant) -> Vec<SelectorEvent> {
        let Some(deadline) = self.search_deadline else {
            return Vec::new();
        };
        if !self.open || now < deadline {
            return Vec::new();
        }
        vec![SelectorEvent::FetchRequested(self.issue_reset())]
    }

    /// Reports how far the viewport is from the end of the list.
    pub fn scrolled(&mut self, distance_from_bottom: usize) -> Vec<SelectorEvent> {
        if distance_from_bottom > LOAD_MORE_THRESHOLD {
            return Vec::new();
        }
        self.load_more()
    }

    pub fn load_more(&mut self) -> Vec<SelectorEvent> {
        if !self.open || self.loading_initial || self.loading_more || !self.has_more {
            return Vec::new();
        }

        let id = self.next_request_id();
        let page = self.page.saturating_add(1);
        let search = self.applied_search.clone();
        self.loading_more = true;
        self.pending_more = Some(PendingFetch {
            id,
            page,
            search: search.clone(),
        });
        debug!(request = %id, page, search = %search, "requesting next selector page");
        vec![SelectorEvent::FetchRequested(FetchRequest {
            id,
            page,
            search,
            kind: FetchKind::More,
        })]
    }

    /// Applies a fetch result. Returns false when the response belongs to a
    /// superseded request or a closed overlay and was dropped.
    pub fn apply_fetch(&mut self, response: FetchResponse) -> bool {
        if !self.open {
            debug!(request = %response.request_id, "dropping fetch result for closed selector");
            return false;
        }

        if self
            .pending_reset
            .as_ref()
            .is_some_and(|pending| pending.id == response.request_id)
        {
            let Some(pending) = self.pending_reset.take() else {
                return false;
            };
            self.apply_reset(pending, response.result);
            return true;
        }

        if self
            .pending_more
            .as_ref()
            .is_some_and(|pending| pending.id == response.request_id)
        {
            let Some(pending) = self.pending_more.take() else {
                return false;
            };
            self.apply_more(pending, response.result);
            return true;
        }

        debug!(request = %response.request_id, "dropping stale selector fetch result");
        false
    }

    fn apply_reset(&mut self, pending: PendingFetch, result: Result<Vec<ListItem>, String>) {
        self.loading_initial = false;
        match result {
            Ok(items) => {
                self.has_more = items.len() >= PAGE_SIZE_THRESHOLD;
                self.page = pending.page;
                self.items = rank_items(&items, &pending.search, &self.config.search_fields);
                self.raw_items = items;
                self.applied_search = pending.search;
                self.highlighted = if self.items.is_empty() { None } else { Some(0) };
            }
            Err(error) => {
                warn!(
                    title = %self.config.title,
                    search = %pending.search,
                    %error,
                    "selector load failed"
                );
                self.raw_items.clear();
                self.items.clear();
                self.highlighted = None;
                self.has_more = false;
            }
        }
    }

    fn apply_more(&mut self, pending: PendingFetch, result: Result<Vec<ListItem>, String>) {
        self.loading_more = false;
        match result {
            Ok(items) => {
                self.has_more = items.len() >= PAGE_SIZE_THRESHOLD;
                self.page = pending.page;
                let ranked = rank_items(&items, &pending.search, &self.config.search_fields);
                self.raw_items.extend(items);
                self.items.extend(ranked);
                if self.highlighted.is_none() && !self.items.is_empty() {
                    self.highlighted = Some(0);
                }
            }
            Err(error) => {
                warn!(
                    title = %self.config.title,
                    page = pending.page,
                    %error,
                    "selector load-more failed"
                );
            }
        }
    }

    fn select(&mut self, index: usize) -> Vec<SelectorEvent> {
        let Some(item) = self.items.get(index).cloned() else {
            return Vec::new();
        };
        let mut events = vec![SelectorEvent::Selected(item), SelectorEvent::SearchCleared];
        events.extend(self.close());
        events
    }

    fn move_highlight(&mut self, delta: isize) {
        if self.items.is_empty() {
            self.highlighted = None;
            return;
        }
        let last = self.items.len() - 1;
        self.highlighted = Some(match self.highlighted {
            None => 0,
            Some(current) => current.saturating_add_signed(delta).min(last),
        });
    }

    fn issue_reset(&mut self) -> FetchRequest {
        let id = self.next_request_id();
        let search = self.search_text.clone();
        self.search_deadline = None;
        self.loading_initial = true;
        self.loading_more = false;
        self.pending_more = None;
        self.pending_reset = Some(PendingFetch {
            id,
            page: 1,
            search: search.clone(),
        });
        debug!(request = %id, search = %search, "requesting first selector page");
        FetchRequest {
            id,
            page: 1,
            search,
            kind: FetchKind::Reset,
        }
    }

    fn next_request_id(&mut self) -> RequestId {
        self.last_request = self.last_request.next();
        self.last_request
    }

    fn discard_session(&mut self) {
        let config = std::mem::replace(&mut self.config, SelectorConfig::new(""));
        let last_request = self.last_request;
        *self = Self::new(config);
        self.last_request = last_request;
    }
}

/// Orders a page so rows whose search field starts with `search` come
/// first, then rows that only contain it, then the rest. Server order is kept
/// inside each group.
pub fn rank_items(items: &[ListItem], search: &str, search_fields: &[String]) -> Vec<ListItem> {
    let needle = search.to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }

    let mut ranked = items
        .iter()
        .map(|item| (match_tier(item, &needle, search_fields), item))
        .collect::<Vec<_>>();
    ranked.sort_by_key(|(tier, _)| *tier);
    ranked.into_iter().map(|(_, item)| item.clone()).collect()
}

fn match_tier(item: &ListItem, needle: &str, search_fields: &[String]) -> u8 {
    let mut tier = 2;
    for field in search_fields {
        let value = item.field(field).to_lowercase();
        if value.starts_with(needle) {
            return 0;
        }
        if value.contains(needle) {
            tier = 1;
        }
    }
    tier
}
